use committee_core::CoreError;
use committee_gateway::GatewayError;
use thiserror::Error;

/// Everything that can abort a single batch-validator iteration. The loop in
/// [`crate::committer::Committer::run`] catches every variant, logs it, and retries the same
/// batch id after the polling interval — none of these are fatal to the process.
#[derive(Debug, Error)]
pub enum BatchIterationError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("{object} root mismatch: computed 0x{computed}, declared 0x{declared}")]
    RootMismatch { object: String, computed: String, declared: String },
    #[error("declared root for {0} is not present or not valid hex")]
    InvalidDeclaredRoot(String),
    #[error("state update rejected by the validation hook")]
    ValidationRejected,
    #[error("no vault or position object is configured to fill the claim's vaults slot")]
    MissingVaultsObject,
    #[error("no order object is configured to fill the claim's trades slot")]
    MissingTradesObject,
}

pub type BatchIterationResult<T> = Result<T, BatchIterationError>;

/// Startup failures: these abort `main` before the service loop begins.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] committee_config::ConfigError),
    #[error(transparent)]
    Signer(#[from] committee_signer::SignerError),
    #[error(transparent)]
    Gateway(#[from] committee_gateway::GatewayError),
    #[error(transparent)]
    Core(#[from] committee_core::CoreError),
    #[error("invalid availability gateway endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
