use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub pharmacy: PharmacySettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub reports: ReportSettings,
    #[serde(default)]
    pub security: SecuritySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PharmacySettings {
    pub name: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseSettings {
    /// SQLite file; relative paths resolve against the config directory
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "pharmacy.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    pub output_dir: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_span_days")]
    pub max_span_days: i64,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SecuritySettings {
    #[serde(default)]
    pub id_key: Option<String>,
    #[serde(default)]
    pub id_iv: Option<String>,
}

fn default_currency_symbol() -> String {
    "Bs.".to_string()
}

fn default_limit() -> u32 {
    100
}

fn default_max_span_days() -> i64 {
    366
}

fn default_low_stock_threshold() -> i64 {
    10
}
