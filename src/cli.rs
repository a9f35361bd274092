//! Arguments and startup shared by the three binaries.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::{self, CliOverrides, Config};
use crate::error::AppError;
use crate::logger;

/// Flags every binary accepts.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Log at debug level regardless of the configured level.
    #[arg(short, long)]
    pub debug: bool,

    /// TOML configuration file (defaults to config/default.toml when present).
    #[arg(long, env = "CASE_DFXML_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Load `.env`, resolve configuration, apply `overrides`, and start logging.
pub fn bootstrap(common: &CommonArgs, overrides: &CliOverrides) -> Result<Config, AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let mut config = config::load(common.config.as_deref())?;
    config.apply_cli(overrides)?;

    logger::init(logger::effective_level(common.debug, &config.log_level), true)?;

    info!(
        log_level = %config.log_level,
        kb_prefix = %config.graph.kb_prefix_iri,
        inherent_uuids = config.graph.use_inherent_uuids,
        deterministic = config.identifiers.deterministic,
        "config loaded"
    );
    Ok(config)
}

/// The process arguments joined with spaces, for DFXML `command_line`.
pub fn command_line() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn common_flags_parse() {
        let h = Harness::try_parse_from(["prog", "-d", "--config", "x.toml"]).unwrap();
        assert!(h.common.debug);
        assert_eq!(h.common.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn debug_defaults_off() {
        let h = Harness::try_parse_from(["prog"]).unwrap();
        assert!(!h.common.debug);
    }
}
