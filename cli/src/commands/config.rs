use anyhow::{Context, Result};
use lnpay_core::LnPayConfig;

/// Print the effective configuration as TOML
pub fn show(config: &LnPayConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
