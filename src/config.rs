use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::ConfigError;

// =============================================================================
// Names and locations
// =============================================================================

/// File name shared by the bundled default and the user config
pub const CONFIG_FILENAME: &str = "config.json";

/// Log file written next to the user config
pub const LOG_FILENAME: &str = "pis.log";

/// Published config, merged in on `--update-config`
pub const LATEST_CONFIG_URL: &str =
    "https://raw.githubusercontent.com/xliiv/pis/master/pis/config.json";

/// Placeholder replaced in the `pypi_url` template
pub const PKG_NAME_PLACEHOLDER: &str = "{pkg_name}";

/// Used when the configuration carries no `pypi_url`
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/project/{pkg_name}/";

/// Environment variable overriding the user config directory
pub const CONFIG_DIR_ENV: &str = "PIS_CONFIG_DIR";

const REPO_HOSTS2VCSES: &str = "repo_hosts2vcses";
const PKG_NAME2REPO_URL: &str = "pkg_name2repo_url";
const PYPI_URL: &str = "pypi_url";

const DEFAULT_CONFIG: &str = include_str!("config.json");

/// Layered tool configuration.
///
/// Kept as a raw JSON object so keys this crate does not know about survive a
/// load/save cycle untouched. The three recognized keys are read through the
/// accessors below:
/// - `repo_hosts2vcses`: hostname -> ordered VCS kind names
/// - `pkg_name2repo_url`: package name -> known repository URL
/// - `pypi_url`: index homepage template containing `{pkg_name}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Map<String, Value>);

impl Configuration {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Ordered VCS kind names configured for an exact `host[:port]` key.
    /// Entries that are not strings are ignored.
    pub fn vcs_names_for_host(&self, netloc: &str) -> Vec<String> {
        self.0
            .get(REPO_HOSTS2VCSES)
            .and_then(|hosts| hosts.get(netloc))
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hostnames present in `repo_hosts2vcses`, in file order
    pub fn known_hosts(&self) -> Vec<&str> {
        self.0
            .get(REPO_HOSTS2VCSES)
            .and_then(Value::as_object)
            .map(|hosts| hosts.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn repo_url_for(&self, pkg_name: &str) -> Option<&str> {
        self.0
            .get(PKG_NAME2REPO_URL)
            .and_then(|urls| urls.get(pkg_name))
            .and_then(Value::as_str)
    }

    /// Package index homepage for `pkg_name`
    pub fn pypi_url_for(&self, pkg_name: &str) -> String {
        self.0
            .get(PYPI_URL)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PYPI_URL)
            .replace(PKG_NAME_PLACEHOLDER, pkg_name)
    }

    /// Remember the repository a package was installed from
    pub fn record_repo_url(&mut self, pkg_name: &str, repo_url: &str) {
        let entry = self
            .0
            .entry(PKG_NAME2REPO_URL)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(urls) = entry {
            urls.insert(pkg_name.to_string(), Value::String(repo_url.to_string()));
        }
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Parses the default configuration shipped inside the binary
pub fn default_config() -> Result<Configuration, ConfigError> {
    serde_json::from_str(DEFAULT_CONFIG).map_err(ConfigError::InvalidDefault)
}

pub fn load(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` to `path` through a sibling temp file and a rename, so a
/// failed write leaves the previous file intact.
pub fn save(path: &Path, config: &Configuration) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    serde_json::to_writer_pretty(&mut file, config).map_err(ConfigError::Serialize)?;
    file.write_all(b"\n").map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;

    debug!("Saved config to {}", path.display());
    Ok(())
}

/// Makes sure a user config exists under `user_dir`.
///
/// A missing file is created from `default` (creating `user_dir` if needed).
/// An existing file that is not a valid JSON object is reported as
/// [`ConfigError::InvalidUserConfig`]; the caller is expected to stop.
pub fn ensure_initialized(
    user_dir: &Path,
    user_filename: &str,
    default: &Configuration,
) -> Result<PathBuf, ConfigError> {
    let path = user_dir.join(user_filename);

    match load(&path) {
        Ok(_) => Ok(path),
        Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(user_dir).map_err(|source| ConfigError::Io {
                path: user_dir.to_path_buf(),
                source,
            })?;
            save(&path, default)?;
            info!("Created user config {}", path.display());
            Ok(path)
        }
        Err(ConfigError::Parse { path, source }) => {
            Err(ConfigError::InvalidUserConfig { path, source })
        }
        Err(e) => Err(e),
    }
}

/// Bundled default overlaid with the user config, creating the latter on
/// first run. Returns the merged configuration and the user config path.
pub fn load_layered(user_dir: &Path) -> Result<(Configuration, PathBuf), ConfigError> {
    let default = default_config()?;
    let user_path = ensure_initialized(user_dir, CONFIG_FILENAME, &default)?;
    let user = load(&user_path).map_err(|e| match e {
        ConfigError::Parse { path, source } => ConfigError::InvalidUserConfig { path, source },
        other => other,
    })?;
    Ok((deep_merge(default, user), user_path))
}

/// Recursively merges `overlay` into `base`.
///
/// Nested objects are merged key by key; any other overlay value replaces the
/// base value outright, even when the base holds an object.
pub fn deep_merge(base: Configuration, overlay: Configuration) -> Configuration {
    let mut merged = base.0;
    merge_maps(&mut merged, overlay.0);
    Configuration(merged)
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        if let Value::Object(nested) = value {
            if let Some(Value::Object(existing)) = base.get_mut(&key) {
                merge_maps(existing, nested);
                continue;
            }
            base.insert(key, Value::Object(nested));
        } else {
            base.insert(key, value);
        }
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Returns the user config directory.
/// Uses $PIS_CONFIG_DIR if set, otherwise ~/.pis,
/// or ./.pis if the home directory is unknown.
pub fn user_config_dir() -> PathBuf {
    user_config_dir_with_env(std::env::var(CONFIG_DIR_ENV).ok(), dirs::home_dir())
}

fn user_config_dir_with_env(config_dir: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = config_dir.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }

    home_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join(concat!(".", env!("CARGO_PKG_NAME")))
}
