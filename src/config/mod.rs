//! Configuration module for homediag
//!
//! This module handles:
//! - Installation-level configuration (homediag.toml)
//! - Analyzer thresholds and capability switches
//! - CLI defaults

mod diagnostics_config;

pub use diagnostics_config::{
    BatteryConfig,
    Capabilities,
    CliDefaults,
    ConfigError,
    ConflictConfig,
    DiagnosticsConfig,
    EnergyConfig,
    EntityConfig,
    HistoryConfig,
    LogConfig,
    MeshConfig,
    OrphanConfig,
    EXAMPLE_CONFIG,
    JSON_CONFIG_NAME,
    TOML_CONFIG_NAME,
    load_config_file,
    load_project_config,
};
