use crate::error::{ConfigError, LnPayResult};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Top-level configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LnPayConfig {
    pub pay: PayConfig,
    pub logging: LoggingConfig,
}

/// Defaults and policy for the `pay` command
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PayConfig {
    /// Riskfactor used when the caller gives none
    pub default_riskfactor: f64,
    /// Fee ceiling, in percent, used when the caller gives none
    pub default_maxfeepercent: f64,
    /// Wait before retrying after a suspected block height disagreement
    pub blockheight_retry_delay_secs: u64,
}

impl Default for PayConfig {
    fn default() -> Self {
        Self {
            default_riskfactor: 1.0,
            default_maxfeepercent: 0.5,
            blockheight_retry_delay_secs: 3,
        }
    }
}

impl PayConfig {
    pub fn blockheight_retry_delay(&self) -> Duration {
        Duration::from_secs(self.blockheight_retry_delay_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "lnpay_core=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LnPayConfig {
    /// Load defaults, then `path` if given, then `LNPAY_*` environment
    /// variables (`LNPAY_PAY__DEFAULT_MAXFEEPERCENT=1.0`).
    pub fn load(path: Option<&Path>) -> LnPayResult<Self> {
        let defaults = Config::try_from(&Self::default()).map_err(ConfigError::from)?;
        let mut builder = Config::builder().add_source(defaults);

        match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from: {:?}", path);
                builder = builder.add_source(File::from(path));
            }
            Some(path) => {
                warn!("Configuration file {:?} not found, using defaults", path);
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("LNPAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: LnPayConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let maxfee = self.pay.default_maxfeepercent;
        if !(0.0..=100.0).contains(&maxfee) {
            return Err(ConfigError::InvalidValue(format!(
                "pay.default_maxfeepercent must be within [0, 100], got {}",
                maxfee
            )));
        }
        if !self.pay.default_riskfactor.is_finite() {
            return Err(ConfigError::InvalidValue(format!(
                "pay.default_riskfactor must be finite, got {}",
                self.pay.default_riskfactor
            )));
        }
        if self.pay.blockheight_retry_delay_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "pay.blockheight_retry_delay_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LnPayError;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LnPayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pay.default_maxfeepercent, 0.5);
        assert_eq!(config.pay.default_riskfactor, 1.0);
        assert_eq!(config.pay.blockheight_retry_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[pay]\ndefault_maxfeepercent = 1.5\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = LnPayConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.pay.default_maxfeepercent, 1.5);
        assert_eq!(config.pay.default_riskfactor, 1.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_rejects_out_of_range_maxfee() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[pay]\ndefault_maxfeepercent = 150.0").unwrap();

        assert!(matches!(
            LnPayConfig::load(Some(file.path())),
            Err(LnPayError::Config(ConfigError::InvalidValue(_)))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = LnPayConfig::load(Some(Path::new("/nonexistent/lnpay.toml"))).unwrap();
        assert_eq!(config, LnPayConfig::default());
    }
}
