//! Init command - write an example config file

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::config::{EXAMPLE_CONFIG, TOML_CONFIG_NAME};

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let dir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let config_path = dir.join(TOML_CONFIG_NAME);
    if config_path.exists() {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!(
        "\n{}",
        style("Edit thresholds and capabilities, then run: homediag analyze <snapshot.json>").dim()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_project_config;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        run(dir.path()).unwrap();
        let written = std::fs::read_to_string(dir.path().join(TOML_CONFIG_NAME)).unwrap();
        assert_eq!(written, EXAMPLE_CONFIG);
        let config = load_project_config(dir.path());
        assert_eq!(config.mesh.weak_lqi_threshold, 120);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TOML_CONFIG_NAME);
        std::fs::write(&path, "[history]\ncapacity = 3\n").unwrap();
        run(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[history]\ncapacity = 3\n");
    }

    #[test]
    fn test_init_rejects_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(run(&dir.path().join("nope")).is_err());
    }
}
