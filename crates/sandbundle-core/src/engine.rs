//! Process-wide engine state.
//!
//! The engine owns resources shared by every build in the process, today the
//! HTTP client used for CDN fetches. Initialization is idempotent: the first
//! call wins and later calls succeed without touching the existing state.

use reqwest::Client;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::config::BuildConfig;
use crate::error::{codes, BuildError};

/// Engine lifecycle errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug)]
struct EngineState {
    http: Client,
}

static ENGINE: RwLock<Option<EngineState>> = RwLock::new(None);

/// Start the engine. Fails with [`EngineError::AlreadyInitialized`] when it
/// is already running.
pub fn start(config: &BuildConfig) -> Result<(), EngineError> {
    let mut engine = ENGINE.write().unwrap_or_else(PoisonError::into_inner);
    if engine.is_some() {
        return Err(EngineError::AlreadyInitialized);
    }

    let http = Client::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.as_str())
        .build()?;

    *engine = Some(EngineState { http });
    tracing::debug!(
        connect_timeout_ms = config.connect_timeout_ms,
        timeout_ms = config.timeout_ms,
        "engine initialized"
    );
    Ok(())
}

/// Make sure the engine is running. Safe to call any number of times.
pub fn initialize(config: &BuildConfig) -> Result<(), BuildError> {
    match start(config) {
        Ok(()) | Err(EngineError::AlreadyInitialized) => Ok(()),
        Err(err) => Err(BuildError::new(codes::ENGINE_INIT_FAILED, err.to_string())),
    }
}

#[must_use]
pub fn is_initialized() -> bool {
    ENGINE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Drop the engine state. Returns `true` if the engine was running.
pub fn teardown() -> bool {
    let was_running = ENGINE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some();
    if was_running {
        tracing::debug!("engine torn down");
    }
    was_running
}

/// The shared HTTP client, if the engine is running.
#[must_use]
pub fn http_client() -> Option<Client> {
    ENGINE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|state| state.http.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_initialize_is_idempotent() {
        teardown();
        let config = BuildConfig::default();
        assert!(initialize(&config).is_ok());
        assert!(initialize(&config).is_ok());
        assert!(is_initialized());
        teardown();
    }

    #[test]
    #[serial]
    fn test_start_reports_already_initialized() {
        teardown();
        let config = BuildConfig::default();
        start(&config).unwrap();
        assert!(matches!(start(&config), Err(EngineError::AlreadyInitialized)));
        teardown();
    }

    #[test]
    #[serial]
    fn test_teardown_resets_state() {
        teardown();
        initialize(&BuildConfig::default()).unwrap();
        assert!(http_client().is_some());
        assert!(teardown());
        assert!(!is_initialized());
        assert!(http_client().is_none());
        assert!(!teardown());
    }
}
