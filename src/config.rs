use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Record store: supabase, postgres or memory
    #[arg(long, env = "PERSISTENCE_PROVIDER")]
    pub persistence: Option<String>,

    /// Embedding cache file
    #[arg(long, env = "EMBEDDINGS_FILE")]
    pub embeddings_file: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub resilience: ResilienceConfig,
    pub persistence: PersistenceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub detection: DetectionConfig,
    pub search: SearchConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_secs: u64,
    pub timeout_disabled: bool,
    pub rate_limit_enabled: bool,
    pub requests_per_second: f32,
    pub burst_size: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    /// `supabase`, `postgres` or `memory`.
    pub provider: String,
    #[serde(default)]
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub table: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `supabase` or `local`.
    pub provider: String,
    pub bucket: String,
    pub local_dir: String,
    /// Base URL of `/files` for the local provider; derived from the server
    /// address when unset.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// `file`, `postgres` or `memory`.
    pub provider: String,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    #[serde(default)]
    pub cache_dir: Option<String>,
    pub show_download_progress: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// `http` or `none`.
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    pub min_confidence: f32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SearchConfig {
    pub tag_bonus: f32,
    pub threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    pub scratch_dir: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest: defaults, legacy env vars, config file,
    /// `RECALL_*` env vars, CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.body_limit_bytes", 20 * 1024 * 1024)?
            .set_default("resilience.timeout_secs", 120)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.rate_limit_enabled", false)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?
            .set_default("persistence.provider", "supabase")?
            .set_default("persistence.max_connections", 5)?
            .set_default("persistence.table", "memories")?
            .set_default("storage.provider", "supabase")?
            .set_default("storage.bucket", "scans")?
            .set_default("storage.local_dir", "data/scans")?
            .set_default("cache.provider", "file")?
            .set_default("cache.path", "embeddings.json")?
            .set_default("embedding.model", "clip-vit-b32")?
            .set_default("embedding.show_download_progress", false)?
            .set_default("detection.provider", "http")?
            .set_default("detection.min_confidence", 0.25)?
            .set_default("search.tag_bonus", 0.5)?
            .set_default("search.threshold", 0.26)?
            .set_default("ingest.scratch_dir", env::temp_dir().to_string_lossy().to_string())?;

        // Unprefixed variables used by earlier deployments.
        if let Ok(val) = env::var("SUPABASE_URL") {
            builder = builder.set_default("supabase.url", val)?;
        }
        if let Ok(val) = env::var("SUPABASE_KEY") {
            builder = builder.set_default("supabase.key", val)?;
        }
        if let Ok(val) = env::var("DATABASE_URL") {
            builder = builder.set_default("persistence.database_url", val)?;
        }
        if let Ok(val) = env::var("DETECTION_URL") {
            builder = builder.set_default("detection.url", val)?;
        }

        match &cli.config {
            Some(path) => {
                builder = builder.add_source(File::from(Path::new(path)).required(true));
            }
            None => {
                builder = builder
                    .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));
            }
        }

        // E.g. RECALL_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("RECALL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(provider) = cli.persistence {
            builder = builder.set_override("persistence.provider", provider)?;
        }
        if let Some(path) = cli.embeddings_file {
            builder = builder.set_override("cache.path", path)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Base URL under which the local blob store is served.
    pub fn local_files_base_url(&self) -> String {
        self.storage.public_base_url.clone().unwrap_or_else(|| {
            let host = match self.server.host.as_str() {
                "0.0.0.0" | "::" => "localhost",
                other => other,
            };
            format!("http://{host}:{}/files", self.server.port)
        })
    }
}
