/*
[INPUT]:  Authorized client with an active session
[OUTPUT]: Contributor profile and dashboard data
[POS]:    HTTP layer - user data endpoints (require bearer auth)
[UPDATE]: When adding new user endpoints or changing response shapes
*/

// ### User Endpoints

use crate::http::{AuthorizedClient, Result};
use crate::types::{DashboardSummary, Profile};

impl AuthorizedClient {
    /// Query the authenticated contributor's profile
    ///
    /// GET /user/profile
    pub async fn get_profile(&self) -> Result<Profile> {
        self.get("/user/profile").await
    }

    /// Query points, redeemable tokens and recent contributions
    ///
    /// GET /user/dashboard
    pub async fn get_dashboard(&self) -> Result<DashboardSummary> {
        self.get("/user/dashboard").await
    }
}
