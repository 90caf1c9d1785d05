use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub profile_csv_path: PathBuf,
    pub transactions_csv_path: PathBuf,
    pub chain_top_n: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub pipeline_cache_ttl_secs: u64,
    pub pipeline_cache_capacity: u64,
    pub reference_date: Option<NaiveDate>, // Frozen "now"; wall clock when unset
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            profile_csv_path: PathBuf::from("Base1.csv"),
            transactions_csv_path: PathBuf::from("Base2.csv"),
            chain_top_n: 10,
            default_page_size: 50,
            max_page_size: 500,
            pipeline_cache_ttl_secs: 3600,
            pipeline_cache_capacity: 16,
            reference_date: None,
        }
    }
}

fn positive_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match std::env::var(name) {
        Ok(raw) => {
            let value: T = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a positive number", name))?;
            if value <= T::default() {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

fn path_var(name: &str, default: PathBuf) -> anyhow::Result<PathBuf> {
    match std::env::var(name) {
        Ok(path) => {
            if path.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(PathBuf::from(path.trim()))
        }
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            profile_csv_path: path_var("PROFILE_CSV_PATH", defaults.profile_csv_path)?,
            transactions_csv_path: path_var(
                "TRANSACTIONS_CSV_PATH",
                defaults.transactions_csv_path,
            )?,
            chain_top_n: positive_var("CHAIN_TOP_N", defaults.chain_top_n)?,
            default_page_size: positive_var("DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: positive_var("MAX_PAGE_SIZE", defaults.max_page_size)?,
            pipeline_cache_ttl_secs: positive_var(
                "PIPELINE_CACHE_TTL_SECS",
                defaults.pipeline_cache_ttl_secs,
            )?,
            pipeline_cache_capacity: positive_var(
                "PIPELINE_CACHE_CAPACITY",
                defaults.pipeline_cache_capacity,
            )?,
            reference_date: std::env::var("REFERENCE_DATE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                        anyhow::anyhow!("REFERENCE_DATE must be formatted as YYYY-MM-DD")
                    })
                })
                .transpose()?,
        };

        if config.default_page_size > config.max_page_size {
            anyhow::bail!("DEFAULT_PAGE_SIZE cannot exceed MAX_PAGE_SIZE");
        }

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Profile table: {}", config.profile_csv_path.display());
        tracing::debug!(
            "Transaction table: {}",
            config.transactions_csv_path.display()
        );
        if let Some(date) = config.reference_date {
            tracing::info!("Reference date frozen at {}", date);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
