//! Layered configuration: built-in defaults, overridden by an optional TOML file,
//! overridden in turn by CLI flags. Mirrors the package-derived-paths pattern this
//! codebase has always used for its on-disk locations.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Paths derived once from `CARGO_PKG_NAME`; the snapshot lives under the platform
/// user-config directory in a subdirectory named after the crate rather than any
/// upstream product name.
pub struct PackagePaths {
    pkg_name: &'static str,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| PackagePaths {
            pkg_name: env!("CARGO_PKG_NAME"),
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default snapshot location: `<user config dir>/<pkg>/.index.ndjson.lz4`.
    pub fn default_snapshot_path(&self) -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        base.join(self.pkg_name).join(".index.ndjson.lz4")
    }
}

pub const HASH_SIZE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_SCANNER_WORKERS: usize = 5;
pub const DEFAULT_MAX_SEARCH_WORKERS: usize = 30;
pub const DEFAULT_MAX_RESULTS: usize = 500;
pub const DEFAULT_GC_WORKERS: usize = 4;
pub const DEFAULT_WINDOWS_RESCAN_CAP: usize = 2;

/// Runtime configuration for the index core.
#[derive(Clone, Debug)]
pub struct Config {
    pub max_scanner_workers: usize,
    pub max_search_workers: usize,
    pub max_results: usize,
    pub hash_size_limit_bytes: u64,
    pub snapshot_path: PathBuf,
    pub blacklist: Vec<String>,
    /// Non-Windows startup policy: scan `/` when no volumes are configured explicitly.
    pub scan_root_on_unsupported_os: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_scanner_workers: DEFAULT_MAX_SCANNER_WORKERS,
            max_search_workers: DEFAULT_MAX_SEARCH_WORKERS,
            max_results: DEFAULT_MAX_RESULTS,
            hash_size_limit_bytes: HASH_SIZE_LIMIT_BYTES,
            snapshot_path: PackagePaths::get().default_snapshot_path(),
            blacklist: default_blacklist_patterns(),
            scan_root_on_unsupported_os: true,
        }
    }
}

/// Defaults covering Windows system dirs, temp/tmp, and swap/paging files, per the
/// host interface's configuration contract.
pub fn default_blacklist_patterns() -> Vec<String> {
    vec![
        r"(?i)[/\\]windows[/\\]system32".to_string(),
        r"(?i)[/\\]\$recycle\.bin".to_string(),
        r"(?i)[/\\](temp|tmp)[/\\]".to_string(),
        r"(?i)pagefile\.sys$".to_string(),
        r"(?i)hiberfil\.sys$".to_string(),
        r"(?i)swapfile\.sys$".to_string(),
    ]
}

/// Optional on-disk overrides, loaded from `.<pkg>.toml` in the current directory.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    core: ConfigFileSection,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFileSection {
    max_scanner_workers: Option<usize>,
    max_search_workers: Option<usize>,
    max_results: Option<usize>,
    hash_size_limit_bytes: Option<u64>,
    snapshot_path: Option<PathBuf>,
    blacklist: Option<Vec<String>>,
}

/// Load `.{pkg}.toml` from `dir`, returning `None` if absent or unparseable (logged once).
fn load_config_file(dir: &Path) -> Option<ConfigFile> {
    let path = dir.join(format!(".{}.toml", PackagePaths::get().pkg_name()));
    let text = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&text)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

impl Config {
    /// Build configuration: defaults, then `.{pkg}.toml` in `dir` if present.
    pub fn load(dir: &Path) -> Config {
        let mut config = Config::default();
        if let Some(file) = load_config_file(dir) {
            let section = file.core;
            if let Some(v) = section.max_scanner_workers {
                config.max_scanner_workers = v;
            }
            if let Some(v) = section.max_search_workers {
                config.max_search_workers = v;
            }
            if let Some(v) = section.max_results {
                config.max_results = v;
            }
            if let Some(v) = section.hash_size_limit_bytes {
                config.hash_size_limit_bytes = v;
            }
            if let Some(v) = section.snapshot_path {
                config.snapshot_path = v;
            }
            if let Some(v) = section.blacklist {
                config.blacklist = v;
            }
        }
        config
    }
}
