use async_trait::async_trait;
use committee_core::BatchDataResponse;
use committee_gateway::{AvailabilityGatewayClient, GatewayError};

/// The subset of the availability gateway surface the batch validator actually drives. Kept as
/// its own trait (rather than depending on `AvailabilityGatewayClient` directly) so the loop in
/// `committer.rs` can be exercised against a fake in tests without a live HTTP server, the same
/// seam `echonet_tx_filter_client.rs` draws around its own downstream client.
#[async_trait]
pub trait BatchGateway: Send + Sync {
    async fn get_batch_data(&self, batch_id: u64, validate_rollup: Option<bool>) -> Result<BatchDataResponse, GatewayError>;

    async fn approve_new_roots(
        &self,
        batch_id: i64,
        signature_hex: &str,
        member_key_hex: &str,
        claim_hash_hex: &str,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
impl BatchGateway for AvailabilityGatewayClient {
    async fn get_batch_data(&self, batch_id: u64, validate_rollup: Option<bool>) -> Result<BatchDataResponse, GatewayError> {
        AvailabilityGatewayClient::get_batch_data(self, batch_id, validate_rollup).await
    }

    async fn approve_new_roots(
        &self,
        batch_id: i64,
        signature_hex: &str,
        member_key_hex: &str,
        claim_hash_hex: &str,
    ) -> Result<(), GatewayError> {
        AvailabilityGatewayClient::approve_new_roots(self, batch_id, signature_hex, member_key_hex, claim_hash_hex).await
    }
}
