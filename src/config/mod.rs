mod settings;

pub use settings::{Config, DatabaseSettings, PharmacySettings, ReportSettings, SecuritySettings};

use crate::error::{PharmacyError, Result};
use crate::ids::{IdCodec, DEFAULT_IV_SECRET, DEFAULT_KEY_SECRET};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.pharmacy/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "pharmacy") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        PharmacyError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".pharmacy"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a configured path: `~` expands to home, relative paths are
/// taken from the config directory.
pub fn resolve_path(path: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(PharmacyError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    let path = cfg_dir.join("config.toml");
    if !path.exists() {
        return Err(PharmacyError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PharmacyError::ConfigParse { path, source: e })
}

impl Config {
    pub fn database_path(&self, cfg_dir: &Path) -> PathBuf {
        resolve_path(&self.database.path, cfg_dir)
    }

    pub fn output_dir(&self, cfg_dir: &Path) -> PathBuf {
        resolve_path(&self.reports.output_dir, cfg_dir)
    }

    pub fn logo_path(&self, cfg_dir: &Path) -> Option<PathBuf> {
        self.reports
            .logo_path
            .as_deref()
            .map(|p| resolve_path(p, cfg_dir))
    }

    /// Build the ID codec from `[security]`, falling back to built-in secrets.
    pub fn id_codec(&self) -> Result<IdCodec> {
        let key = self.security.id_key.as_deref().unwrap_or(DEFAULT_KEY_SECRET);
        let iv = self.security.id_iv.as_deref().unwrap_or(DEFAULT_IV_SECRET);
        IdCodec::from_secrets(key, iv)
    }
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[pharmacy]
name = "Your Pharmacy"
currency_symbol = "Bs."

[database]
path = "pharmacy.db"        # relative to this directory

[reports]
output_dir = "output"       # relative to this directory, or ~/...
# logo_path = "logo.png"    # optional; PNG or JPEG under 5 MB
# generated_by = "admin"    # optional; shown as "Generated by" on reports
default_limit = 100         # row cap when no --top is given
max_span_days = 366         # longest allowed fidelity report period
low_stock_threshold = 10

# [security]
# Secrets for encrypted record IDs. Changing them invalidates every
# previously issued ID.
# id_key = "at least 32 bytes of secret text ......"
# id_iv = "16+ bytes of text"
"#;
