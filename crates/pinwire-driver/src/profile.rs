//! Per-model device constants.
//!
//! Everything model-specific lives here and is resolved once when a driver
//! is constructed. The engine never branches on the model.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Baud rate spoken by the reference firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Time an auto-reset board spends in its bootloader after the port opens.
pub const AUTO_RESET_GRACE_MS: u64 = 4000;

/// Supported microcontroller boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceModel {
    /// ATmega328P with USB-serial bridge; resets when DTR is asserted.
    Uno,
    /// ATmega328P, same reset behaviour as the Uno.
    Nano,
    /// ATmega2560 with USB-serial bridge; resets on open.
    Mega2560,
    /// ATmega32U4 with native USB; does not reset on open.
    Leonardo,
    /// ATmega32U4 with native USB; does not reset on open.
    Micro,
}

impl DeviceModel {
    /// All builtin models.
    pub const ALL: [DeviceModel; 5] = [
        DeviceModel::Uno,
        DeviceModel::Nano,
        DeviceModel::Mega2560,
        DeviceModel::Leonardo,
        DeviceModel::Micro,
    ];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceModel::Uno => "uno",
            DeviceModel::Nano => "nano",
            DeviceModel::Mega2560 => "mega2560",
            DeviceModel::Leonardo => "leonardo",
            DeviceModel::Micro => "micro",
        }
    }

    /// Builtin profile for this model.
    pub fn profile(&self) -> DeviceProfile {
        match self {
            DeviceModel::Uno | DeviceModel::Nano | DeviceModel::Mega2560 => DeviceProfile {
                baud_rate: DEFAULT_BAUD_RATE,
                startup_grace_ms: AUTO_RESET_GRACE_MS,
                requires_redeploy: false,
            },
            DeviceModel::Leonardo | DeviceModel::Micro => DeviceProfile {
                baud_rate: DEFAULT_BAUD_RATE,
                startup_grace_ms: 0,
                requires_redeploy: false,
            },
        }
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceModel {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        DeviceModel::ALL
            .into_iter()
            .find(|model| model.name() == lower)
            .ok_or_else(|| DriverError::UnknownModel(s.to_string()))
    }
}

/// Constants for one board model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Serial line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Wait after opening the port before the first handshake, in milliseconds.
    #[serde(default)]
    pub startup_grace_ms: u64,
    /// Whether the board must be reflashed before every session.
    #[serde(default)]
    pub requires_redeploy: bool,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl DeviceProfile {
    /// Startup grace period as a duration.
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceModel::Leonardo.profile()
    }
}

/// Named profiles, seeded with the builtin models and extendable from
/// configuration.
///
/// ```yaml
/// uno:
///   startup_grace_ms: 2500
/// my-custom-board:
///   baud_rate: 57600
///   startup_grace_ms: 1000
/// ```
///
/// Any entry, builtin or added, is selected by name through
/// [`DriverConfig::from_table`](crate::DriverConfig::from_table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileTable {
    profiles: BTreeMap<String, DeviceProfile>,
}

impl ProfileTable {
    /// Table containing only the builtin models.
    pub fn builtin() -> Self {
        let profiles = DeviceModel::ALL
            .into_iter()
            .map(|model| (model.name().to_string(), model.profile()))
            .collect();
        ProfileTable { profiles }
    }

    /// Add or replace entries with those from `other`.
    pub fn merge(&mut self, other: ProfileTable) {
        for (name, profile) in other.profiles {
            self.profiles.insert(name.to_ascii_lowercase(), profile);
        }
    }

    /// Insert or replace one entry.
    pub fn insert(&mut self, name: &str, profile: DeviceProfile) {
        self.profiles.insert(name.to_ascii_lowercase(), profile);
    }

    /// Look up a profile by model name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Result<DeviceProfile, DriverError> {
        self.profiles
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| DriverError::UnknownModel(name.to_string()))
    }

    /// Iterate over `(name, profile)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceProfile)> {
        self.profiles.iter().map(|(name, profile)| (name.as_str(), profile))
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        ProfileTable::builtin()
    }
}
