/*
[INPUT]:  Contribution type, points, proof URL
[OUTPUT]: Submission receipts and reward estimates
[POS]:    Contract layer - rewards contract collaborator interface
[UPDATE]: When contract methods or reward math change
*/

use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use tracing::info;

use crate::http::{ContribError, Result};
use crate::types::ContributionType;

/// Receipt of an on-chain contribution submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub tx_hash: String,
    pub contribution_id: u64,
}

/// Rewards contract as seen by the client. The session authenticator does
/// not depend on it.
#[async_trait]
pub trait ContributionContract: Send + Sync {
    async fn submit_contribution(
        &self,
        kind: ContributionType,
        points: u64,
        proof_url: &str,
        nonce: [u8; 32],
    ) -> Result<SubmissionReceipt>;

    async fn base_points(&self, kind: ContributionType) -> Result<u64>;

    /// Tokens minted per point
    async fn conversion_ratio(&self) -> Result<Decimal>;
}

/// Fresh random nonce for replay protection of one submission
pub fn new_submission_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// `0x`-prefixed bytes32 form of a nonce
pub fn nonce_hex(nonce: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(nonce))
}

/// Tokens a contribution of `kind` is expected to earn
pub async fn estimate_reward(
    contract: &dyn ContributionContract,
    kind: ContributionType,
) -> Result<Decimal> {
    let points = contract.base_points(kind).await?;
    let ratio = contract.conversion_ratio().await?;
    Ok(Decimal::from(points) * ratio)
}

/// Submit a contribution worth its base points under a fresh nonce
pub async fn submit_with_base_points(
    contract: &dyn ContributionContract,
    kind: ContributionType,
    proof_url: &str,
) -> Result<SubmissionReceipt> {
    let proof_url = proof_url.trim();
    if proof_url.is_empty() {
        return Err(ContribError::InvalidInput(
            "proof_url must not be empty".to_string(),
        ));
    }

    let points = contract.base_points(kind).await?;
    let nonce = new_submission_nonce();
    let receipt = contract
        .submit_contribution(kind, points, proof_url, nonce)
        .await?;
    info!(
        kind = ?kind,
        points,
        nonce = %nonce_hex(&nonce),
        tx_hash = %receipt.tx_hash,
        contribution_id = receipt.contribution_id,
        "contribution submitted"
    );
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockContract {
        submitted: Mutex<Vec<(ContributionType, u64, String, [u8; 32])>>,
    }

    #[async_trait]
    impl ContributionContract for MockContract {
        async fn submit_contribution(
            &self,
            kind: ContributionType,
            points: u64,
            proof_url: &str,
            nonce: [u8; 32],
        ) -> Result<SubmissionReceipt> {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((kind, points, proof_url.to_string(), nonce));
            Ok(SubmissionReceipt {
                tx_hash: format!("0xtx{}", submitted.len()),
                contribution_id: submitted.len() as u64,
            })
        }

        async fn base_points(&self, kind: ContributionType) -> Result<u64> {
            Ok(match kind {
                ContributionType::Hackathon => 500,
                ContributionType::Bounty => 200,
                ContributionType::OpenSource => 100,
            })
        }

        async fn conversion_ratio(&self) -> Result<Decimal> {
            Ok(Decimal::from_str("0.25").unwrap())
        }
    }

    #[tokio::test]
    async fn test_estimate_reward() {
        let contract = MockContract::default();
        let reward = estimate_reward(&contract, ContributionType::Bounty)
            .await
            .unwrap();
        assert_eq!(reward, Decimal::from(50));
    }

    #[tokio::test]
    async fn test_submissions_use_distinct_nonces() {
        let contract = MockContract::default();
        for _ in 0..2 {
            submit_with_base_points(&contract, ContributionType::Hackathon, " https://proof/1 ")
                .await
                .unwrap();
        }

        let submitted = contract.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].1, 500);
        assert_eq!(submitted[0].2, "https://proof/1");
        assert_ne!(submitted[0].3, submitted[1].3);
    }

    #[tokio::test]
    async fn test_empty_proof_url_rejected() {
        let contract = MockContract::default();
        let err = submit_with_base_points(&contract, ContributionType::OpenSource, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, ContribError::InvalidInput(_)));
        assert!(contract.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_nonce_hex() {
        let nonce = [0xab; 32];
        let encoded = nonce_hex(&nonce);
        assert_eq!(encoded.len(), 66);
        assert!(encoded.starts_with("0xabab"));
    }
}
