use async_trait::async_trait;
use committee_core::StateUpdate;

/// A pluggable third-party check run against every fetched state update before it is applied.
/// The default always accepts, matching the original system's unconditional `True`.
#[async_trait]
pub trait ValidationHook: Send + Sync {
    async fn is_valid(&self, state_update: &StateUpdate) -> bool;
}

#[derive(Clone, Copy, Default)]
pub struct AlwaysValid;

#[async_trait]
impl ValidationHook for AlwaysValid {
    async fn is_valid(&self, _state_update: &StateUpdate) -> bool {
        true
    }
}
