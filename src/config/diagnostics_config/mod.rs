//! Diagnostics configuration support
//!
//! Loads per-installation configuration from `homediag.toml` or
//! `.homediagrc.json`, or from an explicit `--config` path. Every field has a
//! default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};


pub const TOML_CONFIG_NAME: &str = "homediag.toml";
pub const JSON_CONFIG_NAME: &str = ".homediagrc.json";

/// Errors raised when an explicitly requested config file cannot be used
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Full diagnostics configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Which analyzers run
    #[serde(default)]
    pub capabilities: Capabilities,

    #[serde(default)]
    pub mesh: MeshConfig,

    #[serde(default)]
    pub orphans: OrphanConfig,

    #[serde(default)]
    pub conflicts: ConflictConfig,

    #[serde(default)]
    pub energy: EnergyConfig,

    #[serde(default)]
    pub entities: EntityConfig,

    #[serde(default)]
    pub batteries: BatteryConfig,

    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

fn enabled() -> bool {
    true
}

/// Capability switches, one per analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default = "enabled")]
    pub entities: bool,
    #[serde(default = "enabled")]
    pub batteries: bool,
    #[serde(default = "enabled")]
    pub logs: bool,
    #[serde(default = "enabled")]
    pub repairs: bool,
    #[serde(default = "enabled")]
    pub updates: bool,
    #[serde(default = "enabled")]
    pub mesh: bool,
    #[serde(default = "enabled")]
    pub orphans: bool,
    #[serde(default = "enabled")]
    pub conflicts: bool,
    #[serde(default = "enabled")]
    pub energy: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            entities: true,
            batteries: true,
            logs: true,
            repairs: true,
            updates: true,
            mesh: true,
            orphans: true,
            conflicts: true,
            energy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Links below this LQI count as weak
    #[serde(default = "default_weak_lqi_threshold")]
    pub weak_lqi_threshold: u8,

    /// Share of weak links above which the mesh is flagged
    #[serde(default = "default_weak_link_fraction")]
    pub weak_link_fraction: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            weak_lqi_threshold: default_weak_lqi_threshold(),
            weak_link_fraction: default_weak_link_fraction(),
        }
    }
}

fn default_weak_lqi_threshold() -> u8 {
    120
}
fn default_weak_link_fraction() -> f64 {
    0.2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanConfig {
    /// Helper and container domains that never count as orphans
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            excluded_domains: default_excluded_domains(),
        }
    }
}

fn default_excluded_domains() -> Vec<String> {
    [
        "automation",
        "script",
        "input_boolean",
        "input_number",
        "input_select",
        "input_text",
        "input_datetime",
        "input_button",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Actions further apart than this are not contradictory
    #[serde(default = "default_conflict_window")]
    pub window_seconds: u64,

    /// Upper bound on reported trigger cycles
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_conflict_window(),
            max_cycles: default_max_cycles(),
        }
    }
}

fn default_conflict_window() -> u64 {
    5
}
fn default_max_cycles() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_energy_window")]
    pub window_hours: u32,

    /// Flat tariff, currency units per kWh
    #[serde(default = "default_cost_per_kwh")]
    pub cost_per_kwh: f64,

    /// Total consumption above which top consumers are reported
    #[serde(default = "default_report_threshold")]
    pub report_threshold_kwh: f64,

    #[serde(default = "default_top_consumers")]
    pub top_consumers: usize,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            window_hours: default_energy_window(),
            cost_per_kwh: default_cost_per_kwh(),
            report_threshold_kwh: default_report_threshold(),
            top_consumers: default_top_consumers(),
        }
    }
}

fn default_energy_window() -> u32 {
    24
}
fn default_cost_per_kwh() -> f64 {
    0.15
}
fn default_report_threshold() -> f64 {
    10.0
}
fn default_top_consumers() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Hours without an update before a sensor counts as stale
    #[serde(default = "default_stale_hours")]
    pub stale_hours: u32,

    #[serde(default = "default_stale_domains")]
    pub stale_domains: Vec<String>,

    /// Unavailable count at which the finding escalates to high
    #[serde(default = "default_unavailable_high")]
    pub unavailable_high_count: usize,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            stale_hours: default_stale_hours(),
            stale_domains: default_stale_domains(),
            unavailable_high_count: default_unavailable_high(),
        }
    }
}

fn default_stale_hours() -> u32 {
    2
}
fn default_stale_domains() -> Vec<String> {
    vec!["sensor".to_string()]
}
fn default_unavailable_high() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default = "default_low_percent")]
    pub low_percent: f64,

    #[serde(default = "default_critical_percent")]
    pub critical_percent: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            low_percent: default_low_percent(),
            critical_percent: default_critical_percent(),
        }
    }
}

fn default_low_percent() -> f64 {
    20.0
}
fn default_critical_percent() -> f64 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Error count at which the log finding escalates to high
    #[serde(default = "default_error_high")]
    pub error_high_threshold: usize,

    /// Warnings above this count produce a finding
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            error_high_threshold: default_error_high(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

fn default_error_high() -> usize {
    50
}
fn default_warning_threshold() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of past runs kept for trend display
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    10
}

/// Default CLI flags that can be set in the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliDefaults {
    /// Default output format (text, json, markdown)
    #[serde(default)]
    pub format: Option<String>,

    /// Default number of analyzer workers
    #[serde(default)]
    pub workers: Option<usize>,
}

impl DiagnosticsConfig {
    /// Reject values that would make analyzers meaningless
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.mesh.weak_link_fraction) {
            return Err(format!(
                "mesh.weak_link_fraction must be within 0..=1, got {}",
                self.mesh.weak_link_fraction
            ));
        }
        if self.batteries.critical_percent > self.batteries.low_percent {
            return Err(format!(
                "batteries.critical_percent ({}) exceeds batteries.low_percent ({})",
                self.batteries.critical_percent, self.batteries.low_percent
            ));
        }
        if self.energy.cost_per_kwh < 0.0 {
            return Err("energy.cost_per_kwh must not be negative".to_string());
        }
        if self.history.capacity == 0 {
            return Err("history.capacity must be at least 1".to_string());
        }
        Ok(())
    }

    /// Names of enabled capabilities, in canonical order
    pub fn enabled_capabilities(&self) -> Vec<&'static str> {
        let c = &self.capabilities;
        [
            ("entities", c.entities),
            ("batteries", c.batteries),
            ("logs", c.logs),
            ("repairs", c.repairs),
            ("updates", c.updates),
            ("mesh", c.mesh),
            ("orphans", c.orphans),
            ("conflicts", c.conflicts),
            ("energy", c.energy),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// Load diagnostics configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `homediag.toml`
/// 2. `.homediagrc.json`
///
/// A file that fails to parse is skipped with a warning. Returns default
/// configuration if no usable file is found.
pub fn load_project_config(dir: &Path) -> DiagnosticsConfig {
    for name in [TOML_CONFIG_NAME, JSON_CONFIG_NAME] {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded diagnostics config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No diagnostics config found, using defaults");
    DiagnosticsConfig::default()
}

/// Load an explicitly named config file; any problem is an error.
///
/// Files ending in `.json` are read as JSON, everything else as TOML.
pub fn load_config_file(path: &Path) -> Result<DiagnosticsConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let config: DiagnosticsConfig = if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    };

    config.validate().map_err(|message| ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(config)
}

/// Commented example written by `homediag init`
pub const EXAMPLE_CONFIG: &str = r#"# homediag configuration
# Every key is optional; omitted keys keep their defaults.

[capabilities]
entities = true
batteries = true
logs = true
repairs = true
updates = true
mesh = true
orphans = true
conflicts = true
energy = true

[mesh]
# Links below this LQI count as weak
weak_lqi_threshold = 120
# Flag the mesh when more than this share of links is weak
weak_link_fraction = 0.2

[orphans]
excluded_domains = [
    "automation",
    "script",
    "input_boolean",
    "input_number",
    "input_select",
    "input_text",
    "input_datetime",
    "input_button",
]

[conflicts]
# Opposing actions closer than this many seconds conflict
window_seconds = 5
max_cycles = 100

[energy]
window_hours = 24
cost_per_kwh = 0.15
report_threshold_kwh = 10.0
top_consumers = 5

[entities]
stale_hours = 2
stale_domains = ["sensor"]
unavailable_high_count = 10

[batteries]
low_percent = 20
critical_percent = 10

[logs]
error_high_threshold = 50
warning_threshold = 20

[history]
capacity = 10

[defaults]
# format = "text"    # text, json, markdown
# workers = 4
"#;
