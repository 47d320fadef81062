use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_FRESHNESS_THRESHOLD;

/// Token validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenValidatorConfig {
    /// Clock skew tolerated past a token's `exp`.
    #[serde(with = "humantime_duration")]
    pub expiration_leeway: Duration,
}

impl Default for TokenValidatorConfig {
    fn default() -> Self {
        Self {
            expiration_leeway: Duration::ZERO,
        }
    }
}

/// Mutual authentication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MutualAuthConfig {
    /// Maximum age of a challenge or service response timestamp.
    #[serde(with = "humantime_duration")]
    pub freshness_threshold: Duration,
}

impl Default for MutualAuthConfig {
    fn default() -> Self {
        Self {
            freshness_threshold: DEFAULT_FRESHNESS_THRESHOLD,
        }
    }
}

/// Serde adapter for human readable durations such as `"1h"` or `"90s"`.
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// # Errors
    /// Fails when the value is not a valid duration string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_one_hour_and_no_leeway() {
        assert_eq!(
            MutualAuthConfig::default().freshness_threshold,
            Duration::from_secs(3600)
        );
        assert_eq!(
            TokenValidatorConfig::default().expiration_leeway,
            Duration::ZERO
        );
    }

    #[test]
    fn durations_parse_from_human_strings() {
        let cfg: MutualAuthConfig =
            serde_json::from_str(r#"{"freshness_threshold":"90s"}"#).unwrap();
        assert_eq!(cfg.freshness_threshold, Duration::from_secs(90));

        let empty: MutualAuthConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, MutualAuthConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<TokenValidatorConfig, _> =
            serde_json::from_str(r#"{"leeway":"5s"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn durations_serialize_back_to_human_strings() {
        let json = serde_json::to_string(&MutualAuthConfig::default()).unwrap();
        assert_eq!(json, r#"{"freshness_threshold":"1h"}"#);
    }
}
