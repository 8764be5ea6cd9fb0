//! Driver configuration.

use std::time::Duration;

use tracing::Dispatch;

use crate::engine::{EngineConfig, DEFAULT_READ_TIMEOUT, DEFAULT_REQUEST_ATTEMPTS, DEFAULT_WRITE_TIMEOUT};
use crate::handshake::DEFAULT_HANDSHAKE_ATTEMPTS;
use crate::error::DriverResult;
use crate::profile::{DeviceModel, DeviceProfile, ProfileTable};

/// Everything needed to bring up a [`Driver`](crate::Driver).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Transport identifier, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    /// Board model name, as used in logs and errors.
    pub model: String,
    /// Constants for the board, resolved from the model.
    pub profile: DeviceProfile,
    /// Per-attempt read window.
    pub read_timeout: Duration,
    /// Per-attempt write window.
    pub write_timeout: Duration,
    /// Attempts for ordinary requests.
    pub request_attempts: u32,
    /// Attempts for the handshake.
    pub handshake_attempts: u32,
    /// Ask the driver to flash firmware before use. Not supported.
    pub auto_bootstrap: bool,
    /// Subscriber for driver events. Falls back to the caller's default.
    pub dispatch: Option<Dispatch>,
}

impl DriverConfig {
    /// Configuration with defaults for `model` on `port`.
    pub fn new(port: impl Into<String>, model: DeviceModel) -> Self {
        DriverConfig::with_named_profile(port, model.name(), model.profile())
    }

    /// Configuration for the board named `model` in `profiles`.
    ///
    /// Unlike [`new`](Self::new), this reaches boards added from a profile
    /// file as well as the builtin models.
    pub fn from_table(
        port: impl Into<String>,
        model: &str,
        profiles: &ProfileTable,
    ) -> DriverResult<Self> {
        let profile = profiles.resolve(model)?;
        Ok(DriverConfig::with_named_profile(
            port,
            &model.to_ascii_lowercase(),
            profile,
        ))
    }

    fn with_named_profile(port: impl Into<String>, model: &str, profile: DeviceProfile) -> Self {
        DriverConfig {
            port: port.into(),
            model: model.to_string(),
            profile,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
            handshake_attempts: DEFAULT_HANDSHAKE_ATTEMPTS,
            auto_bootstrap: false,
            dispatch: None,
        }
    }

    /// Override the device profile.
    #[must_use]
    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set both per-attempt timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    /// Set the attempt budget for ordinary requests.
    #[must_use]
    pub fn with_request_attempts(mut self, attempts: u32) -> Self {
        self.request_attempts = attempts;
        self
    }

    /// Set the attempt budget for the handshake.
    #[must_use]
    pub fn with_handshake_attempts(mut self, attempts: u32) -> Self {
        self.handshake_attempts = attempts;
        self
    }

    /// Request automatic firmware deployment.
    #[must_use]
    pub fn with_auto_bootstrap(mut self, enabled: bool) -> Self {
        self.auto_bootstrap = enabled;
        self
    }

    /// Route driver events to `dispatch`.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// The profile in effect.
    pub fn resolved_profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Engine timing derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    #[test]
    fn test_new_uses_builtin_profile() {
        let config = DriverConfig::new("/dev/ttyACM0", DeviceModel::Mega2560);
        assert_eq!(config.model, "mega2560");
        assert_eq!(config.resolved_profile(), DeviceModel::Mega2560.profile());
    }

    #[test]
    fn test_from_table_reaches_added_board() {
        let mut table = ProfileTable::builtin();
        let custom = DeviceProfile {
            baud_rate: 57_600,
            startup_grace_ms: 1000,
            requires_redeploy: false,
        };
        table.insert("My-Board", custom);

        let config = DriverConfig::from_table("COM3", "my-board", &table).unwrap();
        assert_eq!(config.model, "my-board");
        assert_eq!(config.resolved_profile(), custom);
    }

    #[test]
    fn test_from_table_rejects_unknown_board() {
        let err = DriverConfig::from_table("COM3", "esp32", &ProfileTable::builtin()).unwrap_err();
        assert!(matches!(err, DriverError::UnknownModel(name) if name == "esp32"));
    }
}
