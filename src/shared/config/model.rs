use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub wal: WalConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Settings rooted at `dir`, with the WAL in `dir/wal`.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut settings = Settings::default();
        settings.wal.dir = dir.join("wal").to_string_lossy().into_owned();
        settings.storage.data_dir = dir.to_string_lossy().into_owned();
        settings
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Bytes per block in checkpoint files.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Rows per column segment.
    #[serde(default = "default_segment_capacity")]
    pub segment_capacity: usize,
    /// "lz4", "zstd" or "none".
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_zstd_level")]
    pub zstd_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            block_size: default_block_size(),
            segment_capacity: default_segment_capacity(),
            compression: default_compression(),
            zstd_level: default_zstd_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalConfig {
    #[serde(default = "default_wal_dir")]
    pub dir: String,
    #[serde(default = "default_true")]
    pub fsync: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// WAL size in bytes that triggers a checkpoint after commit. 0 disables.
    #[serde(default = "default_checkpoint_threshold")]
    pub checkpoint_threshold: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            dir: default_wal_dir(),
            fsync: true,
            buffer_size: default_buffer_size(),
            checkpoint_threshold: default_checkpoint_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Rows per scan chunk.
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,
    /// Threads for parallel scans; 0 uses the rayon global pool.
    #[serde(default)]
    pub scan_threads: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            vector_size: default_vector_size(),
            scan_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_stdout_level")]
    pub stdout_level: String,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            stdout_level: default_stdout_level(),
            file_level: default_file_level(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_block_size() -> usize {
    256 * 1024
}

fn default_segment_capacity() -> usize {
    16 * 1024
}

fn default_compression() -> String {
    "lz4".to_string()
}

fn default_zstd_level() -> i32 {
    3
}

fn default_wal_dir() -> String {
    "data/wal".to_string()
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    64 * 1024
}

fn default_checkpoint_threshold() -> u64 {
    16 * 1024 * 1024
}

fn default_vector_size() -> usize {
    crate::engine::core::vector::STANDARD_VECTOR_SIZE
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_stdout_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "debug".to_string()
}

/// Loads settings from the optional file named by `STRATA_CONFIG` (default
/// `config`) layered under `STRATA__*` environment variables.
pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("STRATA_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(config::Environment::with_prefix("STRATA").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
