// common/src/utils.rs
use sha2::{Digest, Sha256};
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across services.
///
/// Unknown level names fall back to `INFO`.
pub fn setup_tracing(level: &str) -> Result<(), SetGlobalDefaultError> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Short SHA-256 fingerprint of a token, safe to write to logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
