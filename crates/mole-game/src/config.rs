//! Engine configuration

use std::time::Duration;

use thiserror::Error;

use mole_core::{PLAYER_ID_LEN, SESSION_ID_LEN};

/// Default collection holding every session
pub const DEFAULT_COLLECTION: &str = "games";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid duration in {var}: {source}")]
    InvalidDuration {
        var: &'static str,
        #[source]
        source: humantime::DurationError,
    },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Session rules shared by every client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    /// Store collection holding the sessions
    pub collection: String,
    pub session_id_len: usize,
    pub player_id_len: usize,
    /// Spy count written at creation
    pub default_spies: u32,
    pub min_spies: u32,
    pub max_spies: u32,
    /// Roster size from which the host is offered the spy-count selector
    pub spy_count_unlock_players: usize,
    /// Name used when the creator leaves theirs empty
    pub default_host_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            collection: DEFAULT_COLLECTION.to_string(),
            session_id_len: SESSION_ID_LEN,
            player_id_len: PLAYER_ID_LEN,
            default_spies: 1,
            min_spies: 1,
            max_spies: 3,
            spy_count_unlock_players: 6,
            default_host_name: "Game Master".to_string(),
        }
    }
}

impl GameConfig {
    /// Large tables: up to five spies, selector always available
    pub fn party() -> Self {
        GameConfig {
            max_spies: 5,
            spy_count_unlock_players: 0,
            ..GameConfig::default()
        }
    }

    /// Clamp a requested spy count into the configured range
    pub fn clamp_spies(&self, requested: u32) -> u32 {
        requested.clamp(self.min_spies, self.max_spies.max(self.min_spies))
    }
}

/// Stale-session sweep configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Maximum session age, measured from `createdAt`
    pub ttl: Duration,
    pub collection: String,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        ReaperConfig {
            interval: Duration::from_secs(30 * 60),
            ttl: Duration::from_secs(5 * 60 * 60),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl ReaperConfig {
    pub const INTERVAL_VAR: &'static str = "MOLE_REAPER_INTERVAL";
    pub const TTL_VAR: &'static str = "MOLE_REAPER_TTL";

    /// Read `MOLE_REAPER_INTERVAL` and `MOLE_REAPER_TTL` (e.g. `30m`, `5h`),
    /// keeping defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ReaperConfig::default();
        if let Some(raw) = lookup(Self::INTERVAL_VAR) {
            config.interval = parse_duration(Self::INTERVAL_VAR, &raw)?;
        }
        if let Some(raw) = lookup(Self::TTL_VAR) {
            config.ttl = parse_duration(Self::TTL_VAR, &raw)?;
        }
        Ok(config)
    }
}

fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(raw.trim())
        .map_err(|source| ConfigError::InvalidDuration { var, source })?;
    if duration.is_zero() {
        return Err(ConfigError::ZeroDuration(var));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_spies() {
        let config = GameConfig::default();
        assert_eq!(config.clamp_spies(0), 1);
        assert_eq!(config.clamp_spies(2), 2);
        assert_eq!(config.clamp_spies(9), 3);
        assert_eq!(GameConfig::party().clamp_spies(9), 5);
    }

    #[test]
    fn test_reaper_defaults() {
        let config = ReaperConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ReaperConfig::default());
        assert_eq!(config.ttl, Duration::from_secs(18_000));
    }

    #[test]
    fn test_reaper_from_lookup() {
        let config = ReaperConfig::from_lookup(|var| match var {
            ReaperConfig::INTERVAL_VAR => Some("5m".to_string()),
            ReaperConfig::TTL_VAR => Some("2h 30m".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.ttl, Duration::from_secs(9_000));
    }

    #[test]
    fn test_reaper_rejects_bad_values() {
        let err = ReaperConfig::from_lookup(|var| {
            (var == ReaperConfig::TTL_VAR).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { var: "MOLE_REAPER_TTL", .. }));

        let err = ReaperConfig::from_lookup(|var| {
            (var == ReaperConfig::INTERVAL_VAR).then(|| "0s".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDuration("MOLE_REAPER_INTERVAL")));
    }
}
