/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod auth;
pub mod authorized;
pub mod client;
pub mod error;
pub mod user;

pub use error::{ContribError, Result};

pub use auth::AuthBackend;
pub use authorized::AuthorizedClient;
pub use client::{ClientConfig, ContribClient};
