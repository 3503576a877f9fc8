// premerge-core/src/infrastructure/config/project.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::project::configuration::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

const CONFIG_CANDIDATES: [&str; 2] = ["premerge.yaml", "premerge_project.yaml"];

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    // 1. Project file, or the built-in road-safety layout
    let mut config = match find_main_config(project_dir) {
        Some(config_path) => {
            info!(path = ?config_path, "Loading project config");
            let content = fs::read_to_string(&config_path)?;
            serde_yaml::from_str::<ProjectConfig>(&content)?
        }
        None => {
            info!(dir = ?project_dir, "No premerge.yaml found, using road-safety defaults");
            ProjectConfig::road_safety_defaults()
        }
    };

    // 2. Environment layering
    // PREMERGE_OUTPUT_PATH=/tmp/reports premerge profile
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    // 3. Structural checks before any file is touched
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;
    config
        .validate_references()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.exists())
}

fn apply_env_overrides<F>(config: &mut ProjectConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("PREMERGE_OUTPUT_PATH") {
        info!(old = ?config.output_path, new = ?val, "Overriding output path via ENV");
        config.output_path = val;
    }
    if let Some(val) = lookup("PREMERGE_PROCESSED_PATH") {
        info!(old = ?config.processed_path, new = ?val, "Overriding processed path via ENV");
        config.processed_path = val;
    }
}
