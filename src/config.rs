use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// Connect timeout applied when nothing else is configured
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Initial accumulator size; only a hint
pub const DEFAULT_INITIAL_CAPACITY: usize = 1000;

/// Upper bound for the initial accumulator size
pub const MAX_INITIAL_CAPACITY: usize = 100_000;

/// Per-scan settings, passed explicitly into every scan call
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub connect_timeout: Duration,
    pub initial_capacity: usize,
    /// Echo every discovered path at debug level
    pub debug: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            debug: false,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source shaped like the environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connect_timeout_seconds = match lookup("FTP_CONNECT_TIMEOUT_SECONDS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("Invalid FTP_CONNECT_TIMEOUT_SECONDS '{}': {}", value, e))?,
            None => DEFAULT_CONNECT_TIMEOUT_SECONDS,
        };

        if connect_timeout_seconds == 0 {
            return Err(anyhow!("FTP_CONNECT_TIMEOUT_SECONDS must be greater than zero"));
        }

        let initial_capacity = match lookup("FTP_SCAN_INITIAL_CAPACITY") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow!("Invalid FTP_SCAN_INITIAL_CAPACITY '{}': {}", value, e))?,
            None => DEFAULT_INITIAL_CAPACITY,
        };

        Ok(ScanConfig {
            connect_timeout: Duration::from_secs(connect_timeout_seconds),
            initial_capacity: initial_capacity.min(MAX_INITIAL_CAPACITY),
            // Any non-empty value turns it on
            debug: lookup("DEBUG").map(|v| !v.is_empty()).unwrap_or(false),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Accumulator pre-size, bounded by `MAX_INITIAL_CAPACITY`
    pub fn accumulator_capacity(&self) -> usize {
        self.initial_capacity.min(MAX_INITIAL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_uses_five_second_timeout() {
        let config = ScanConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.initial_capacity, 1000);
        assert!(!config.debug);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ScanConfig::default()
            .with_connect_timeout(Duration::from_secs(12))
            .with_debug(true);
        assert_eq!(config.connect_timeout, Duration::from_secs(12));
        assert!(config.debug);
    }

    #[test]
    fn test_lookup_without_values_uses_defaults() {
        let config = ScanConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(!config.debug);
    }

    #[test]
    fn test_lookup_reads_all_settings() {
        let config = ScanConfig::from_lookup(lookup(&[
            ("FTP_CONNECT_TIMEOUT_SECONDS", " 30 "),
            ("FTP_SCAN_INITIAL_CAPACITY", "250"),
            ("DEBUG", "1"),
        ]))
        .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.initial_capacity, 250);
        assert!(config.debug);
    }

    #[test]
    fn test_empty_debug_value_stays_off() {
        let config = ScanConfig::from_lookup(lookup(&[("DEBUG", "")])).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        for value in ["soon", "0", "-1"] {
            let vars = lookup(&[("FTP_CONNECT_TIMEOUT_SECONDS", value)]);
            assert!(ScanConfig::from_lookup(vars).is_err(), "accepted {:?}", value);
        }
    }

    #[test]
    fn test_invalid_capacity_is_rejected() {
        let vars = lookup(&[("FTP_SCAN_INITIAL_CAPACITY", "lots")]);
        let err = ScanConfig::from_lookup(vars).unwrap_err();
        assert!(err.to_string().contains("FTP_SCAN_INITIAL_CAPACITY"));
    }

    #[test]
    fn test_huge_capacity_is_clamped() {
        let huge = usize::MAX.to_string();
        let vars = lookup(&[("FTP_SCAN_INITIAL_CAPACITY", huge.as_str())]);
        let config = ScanConfig::from_lookup(vars).unwrap();
        assert_eq!(config.initial_capacity, MAX_INITIAL_CAPACITY);

        let manual = ScanConfig {
            initial_capacity: usize::MAX,
            ..ScanConfig::default()
        };
        assert_eq!(manual.accumulator_capacity(), MAX_INITIAL_CAPACITY);
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        env::set_var("FTP_SCAN_INITIAL_CAPACITY", "42");
        let config = ScanConfig::from_env();
        env::remove_var("FTP_SCAN_INITIAL_CAPACITY");

        assert_eq!(config.unwrap().initial_capacity, 42);
    }
}
