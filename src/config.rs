//! Configuration loading with env-var overrides.
//!
//! Reads an optional TOML file (an explicit `--config` path, else
//! `config/default.toml` when it exists relative to the current working
//! directory), then applies `CASE_DFXML_*` env overrides. Command-line flags
//! are applied last by the binaries through [`Config::apply_cli`].
//!
//! ```toml
//! [logging]
//! log_level = "info"
//!
//! [graph]
//! kb_prefix_label = "kb"
//! kb_prefix_iri = "http://example.org/kb/"
//! use_inherent_uuids = false
//!
//! [identifiers]
//! deterministic = false
//! seed = "case-dfxml"
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Graph-side naming and identity options.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Prefix label bound to `kb_prefix_iri` in serialized output.
    pub kb_prefix_label: String,
    /// Namespace IRI for every individual the emitter creates.
    pub kb_prefix_iri: String,
    /// Derive facet and hash identifiers from their content.
    pub use_inherent_uuids: bool,
}

/// Identifier generation policy.
#[derive(Debug, Clone)]
pub struct IdentifierConfig {
    /// Replace random UUIDs with a seeded monotonic sequence.
    /// Meant for regenerating version-controlled fixtures, not for casework.
    pub deterministic: bool,
    pub seed: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub graph: GraphConfig,
    pub identifiers: IdentifierConfig,
}

/// Environment overrides, read once by [`load`] and passed explicitly to
/// [`load_from`] so tests never mutate the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub log_level: Option<String>,
    pub kb_prefix_iri: Option<String>,
    pub deterministic: Option<String>,
    pub seed: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("CASE_DFXML_LOG_LEVEL").ok(),
            kb_prefix_iri: env::var("CASE_DFXML_KB_PREFIX_IRI").ok(),
            deterministic: env::var("CASE_DFXML_DETERMINISTIC").ok(),
            seed: env::var("CASE_DFXML_SEED").ok(),
        }
    }
}

/// Command-line values that override the file and environment.
/// `None`/`false` leaves the resolved value untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub kb_prefix_label: Option<String>,
    pub kb_prefix_iri: Option<String>,
    pub use_inherent_uuids: bool,
    pub deterministic: bool,
}

impl Config {
    pub fn apply_cli(&mut self, cli: &CliOverrides) -> Result<(), AppError> {
        if let Some(label) = &cli.kb_prefix_label {
            self.graph.kb_prefix_label = label.clone();
        }
        if let Some(iri) = &cli.kb_prefix_iri {
            check_namespace(iri)?;
            self.graph.kb_prefix_iri = iri.clone();
        }
        if cli.use_inherent_uuids {
            self.graph.use_inherent_uuids = true;
        }
        if cli.deterministic {
            self.identifiers.deterministic = true;
        }
        Ok(())
    }
}

/// Raw TOML shape, before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    logging: RawLogging,
    #[serde(default)]
    graph: RawGraph,
    #[serde(default)]
    identifiers: RawIdentifiers,
}

#[derive(Deserialize)]
struct RawLogging {
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default = "default_kb_prefix_label")]
    kb_prefix_label: String,
    #[serde(default = "default_kb_prefix_iri")]
    kb_prefix_iri: String,
    #[serde(default)]
    use_inherent_uuids: bool,
}

#[derive(Deserialize)]
struct RawIdentifiers {
    #[serde(default)]
    deterministic: bool,
    #[serde(default = "default_seed")]
    seed: String,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

impl Default for RawGraph {
    fn default() -> Self {
        Self {
            kb_prefix_label: default_kb_prefix_label(),
            kb_prefix_iri: default_kb_prefix_iri(),
            use_inherent_uuids: false,
        }
    }
}

impl Default for RawIdentifiers {
    fn default() -> Self {
        Self { deterministic: false, seed: default_seed() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_kb_prefix_label() -> String { "kb".to_string() }
fn default_kb_prefix_iri() -> String { "http://example.org/kb/".to_string() }
fn default_seed() -> String { "case-dfxml".to_string() }

/// Load config from `explicit` (or `config/default.toml` if present), then
/// apply env-var overrides.
pub fn load(explicit: Option<&Path>) -> Result<Config, AppError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    };
    load_from(path.as_deref(), &EnvOverrides::from_env())
}

/// Loader with an explicit path and overrides.
/// `path = None` resolves built-in defaults.
pub fn load_from(path: Option<&Path>, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let parsed: RawConfig = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
            toml::from_str(&raw)
                .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?
        }
        None => RawConfig::default(),
    };

    let deterministic = match overrides.deterministic.as_deref() {
        Some(v) => parse_flag(v)?,
        None => parsed.identifiers.deterministic,
    };

    let kb_prefix_iri = overrides
        .kb_prefix_iri
        .clone()
        .unwrap_or(parsed.graph.kb_prefix_iri);
    check_namespace(&kb_prefix_iri)?;

    let log_level = overrides.log_level.clone().unwrap_or(parsed.logging.log_level);
    logger::validate_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    Ok(Config {
        log_level,
        graph: GraphConfig {
            kb_prefix_label: parsed.graph.kb_prefix_label,
            kb_prefix_iri,
            use_inherent_uuids: parsed.graph.use_inherent_uuids,
        },
        identifiers: IdentifierConfig {
            deterministic,
            seed: overrides.seed.clone().unwrap_or(parsed.identifiers.seed),
        },
    })
}

fn check_namespace(iri: &str) -> Result<(), AppError> {
    if iri.ends_with('/') || iri.ends_with('#') {
        Ok(())
    } else {
        Err(AppError::Config(format!("kb_prefix_iri must end with '/' or '#': {iri}")))
    }
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!("expected a boolean flag, got '{other}'"))),
    }
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Reproducible `Config`: deterministic identifiers, default namespace.
impl Config {
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            graph: GraphConfig {
                kb_prefix_label: default_kb_prefix_label(),
                kb_prefix_iri: default_kb_prefix_iri(),
                use_inherent_uuids: false,
            },
            identifiers: IdentifierConfig { deterministic: true, seed: "test".into() },
        }
    }
}
