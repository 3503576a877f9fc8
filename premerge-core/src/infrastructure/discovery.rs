// premerge-core/src/infrastructure/discovery.rs
//
// Locates the raw CSV files. Public datasets get unzipped into a versioned
// folder (data/raw/dft_road_safety_last_5_years/...) and file names drift
// between releases (Vehicles.csv, dft-road-casualty-statistics-vehicle-2024.csv),
// so matching is tolerant.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::domain::project::{ProjectConfig, TableConfig};
use crate::infrastructure::error::InfrastructureError;

pub const DATA_DIR_ENV: &str = "PREMERGE_DATA_DIR";

/// Where a configured table was found on disk.
#[derive(Debug, Clone)]
pub struct LocatedSource {
    pub table: TableConfig,
    pub path: PathBuf,
}

/// First child directory (in name order) of `raw_base` holding at least one
/// expected file.
pub fn find_dataset_root(raw_base: &Path, tables: &[TableConfig]) -> Option<PathBuf> {
    let mut children: Vec<PathBuf> = fs::read_dir(raw_base)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    children
        .into_iter()
        .find(|dir| contains_expected_file(dir, tables))
}

fn contains_expected_file(dir: &Path, tables: &[TableConfig]) -> bool {
    tables
        .iter()
        .flat_map(|t| t.files.iter())
        .any(|name| dir.join(name).is_file())
}

/// Exact (case-insensitive) file-name match first, then stem substring
/// (`Vehicles.csv` finds `Vehicles_2024.csv`). Searches recursively.
pub fn find_file(root: &Path, names: &[String]) -> Option<PathBuf> {
    let mut candidates: Vec<(PathBuf, String)> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .map(|e| {
            let lower = e.file_name().to_string_lossy().to_lowercase();
            (e.into_path(), lower)
        })
        .collect();
    candidates.sort();

    for name in names {
        let wanted = name.to_lowercase();
        if let Some((path, _)) = candidates.iter().find(|(_, file)| *file == wanted) {
            return Some(path.clone());
        }
    }

    for name in names {
        let lower = name.to_lowercase();
        let stem = lower.strip_suffix(".csv").unwrap_or(&lower);
        if let Some((path, _)) = candidates.iter().find(|(_, file)| file.contains(stem)) {
            debug!(wanted = %name, found = ?path, "Matched by stem");
            return Some(path.clone());
        }
    }
    None
}

/// Dataset root: the `PREMERGE_DATA_DIR` override, else the configured
/// `data-dir` when it holds the files directly, else discovery under it.
pub fn resolve_data_root(
    project_dir: &Path,
    config: &ProjectConfig,
) -> Result<PathBuf, InfrastructureError> {
    let override_dir = std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from);
    resolve_data_root_with(project_dir, config, override_dir)
}

#[instrument(skip(project_dir, config))]
pub fn resolve_data_root_with(
    project_dir: &Path,
    config: &ProjectConfig,
    override_dir: Option<PathBuf>,
) -> Result<PathBuf, InfrastructureError> {
    if let Some(dir) = override_dir {
        let dir = if dir.is_absolute() {
            dir
        } else {
            project_dir.join(dir)
        };
        info!(dir = ?dir, "Data root overridden via ENV");
        return if dir.is_dir() {
            Ok(dir)
        } else {
            Err(InfrastructureError::DatasetRootNotFound(dir))
        };
    }

    let raw_base = project_dir.join(&config.data_dir);
    if !raw_base.is_dir() {
        return Err(InfrastructureError::DatasetRootNotFound(raw_base));
    }
    if contains_expected_file(&raw_base, &config.tables) {
        return Ok(raw_base);
    }

    match find_dataset_root(&raw_base, &config.tables) {
        Some(root) => {
            info!(root = ?root, "Discovered dataset root");
            Ok(root)
        }
        None => {
            warn!(base = ?raw_base, "No child folder holds an expected file");
            Err(InfrastructureError::DatasetRootNotFound(raw_base))
        }
    }
}

/// Finds every configured table under `root`. The first table with no match
/// fails the whole lookup.
pub fn locate_sources(
    root: &Path,
    tables: &[TableConfig],
) -> Result<Vec<LocatedSource>, InfrastructureError> {
    tables
        .iter()
        .map(|table| match find_file(root, &table.files) {
            Some(path) => Ok(LocatedSource {
                table: table.clone(),
                path,
            }),
            None => Err(InfrastructureError::SourceNotFound {
                table: table.name.clone(),
                path: root.join(table.files.first().map(String::as_str).unwrap_or_default()),
            }),
        })
        .collect()
}
