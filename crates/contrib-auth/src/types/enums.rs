/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Kind of contribution a user can submit proof for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Hackathon,
    Bounty,
    OpenSource,
}

impl ContributionType {
    /// Discriminant used by the rewards contract
    pub fn contract_id(self) -> u8 {
        match self {
            ContributionType::Hackathon => 0,
            ContributionType::Bounty => 1,
            ContributionType::OpenSource => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Verified,
    Rejected,
    #[serde(alias = "redeemed")]
    Claimed,
}
