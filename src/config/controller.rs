//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Requeue interval after a failed pass (seconds)
    pub error_requeue_secs: u64,
    /// Requeue interval after a successful pass (seconds)
    pub success_requeue_secs: u64,
    /// Domain suffix for `<name>.<suffix>` certificate and ingress hosts
    pub domain_suffix: String,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Maximum concurrent passes across distinct environments
    pub max_concurrent_reconciliations: u16,
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// Global log level / filter directive
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Delay before restarting the watch stream (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            error_requeue_secs: DEFAULT_ERROR_REQUEUE_SECS,
            success_requeue_secs: DEFAULT_SUCCESS_REQUEUE_SECS,
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
            watch_namespace: None,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        Self {
            error_requeue_secs: parse_or(&lookup, "ERROR_REQUEUE_SECS", DEFAULT_ERROR_REQUEUE_SECS),
            success_requeue_secs: parse_or(
                &lookup,
                "SUCCESS_REQUEUE_SECS",
                DEFAULT_SUCCESS_REQUEUE_SECS,
            ),
            domain_suffix: lookup("DOMAIN_SUFFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DOMAIN_SUFFIX.to_string()),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|v| !v.trim().is_empty()),
            max_concurrent_reconciliations: parse_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            metrics_port: parse_or(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            watch_restart_delay_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
        }
    }

    /// Get error requeue duration
    #[must_use]
    pub fn error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    /// Get success requeue duration
    #[must_use]
    pub fn success_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.success_requeue_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read a value and parse it, falling back to the default when unset or malformed
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reschedule_contract() {
        let config = ControllerConfig::from_lookup(|_| None);
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.error_requeue_duration(), Duration::from_secs(60));
        assert_eq!(config.success_requeue_duration(), Duration::from_secs(600));
        assert_eq!(config.domain_suffix, "developerenv.adityajoshi.online");
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("ERROR_REQUEUE_SECS", "30"),
            ("DOMAIN_SUFFIX", "dev.example.com"),
            ("WATCH_NAMESPACE", "sandboxes"),
            ("MAX_CONCURRENT_RECONCILIATIONS", "4"),
            ("LOG_FORMAT", "json"),
        ]));
        assert_eq!(config.error_requeue_secs, 30);
        assert_eq!(config.success_requeue_secs, 600);
        assert_eq!(config.domain_suffix, "dev.example.com");
        assert_eq!(config.watch_namespace.as_deref(), Some("sandboxes"));
        assert_eq!(config.max_concurrent_reconciliations, 4);
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_malformed_and_blank_values_fall_back() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("SUCCESS_REQUEUE_SECS", "ten minutes"),
            ("METRICS_PORT", "99999"),
            ("DOMAIN_SUFFIX", "  "),
            ("WATCH_NAMESPACE", ""),
        ]));
        assert_eq!(config.success_requeue_secs, 600);
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.domain_suffix, "developerenv.adityajoshi.online");
        assert!(config.watch_namespace.is_none());
    }
}
