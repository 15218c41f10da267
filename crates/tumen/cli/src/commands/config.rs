//! Effective configuration

use crate::error::CliResult;
use crate::output::{print_json, OutputFormat};
use tumen_runtime::HierarchyConfig;

/// Print the configuration the hierarchy would run with
pub fn execute(config: &HierarchyConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
