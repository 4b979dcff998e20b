use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub incidents: IncidentConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Max number of session events buffered for /ws/stream (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the saved analysis slot.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Rolling window kept while streaming; oldest samples are dropped first.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_window_capacity() -> usize {
    100
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            window_capacity: default_window_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentConfig {
    /// Percent of user + sys CPU; must be 1..=100.
    #[serde(default = "default_threshold")]
    pub default_threshold: u8,
    #[serde(default = "default_min_run_length")]
    pub min_run_length: usize,
}

fn default_threshold() -> u8 {
    80
}

fn default_min_run_length() -> usize {
    3
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            min_run_length: default_min_run_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key (never the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on points sent to the model after downsampling.
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_points() -> usize {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_points: default_max_points(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    /// Optional JSON-lines file loaded into the session at startup.
    pub preload_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.server.broadcast_capacity > 0,
            "server.broadcast_capacity must be > 0, got {}",
            self.server.broadcast_capacity
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.stream.tick_interval_ms > 0,
            "stream.tick_interval_ms must be > 0, got {}",
            self.stream.tick_interval_ms
        );
        anyhow::ensure!(
            self.stream.window_capacity > 0,
            "stream.window_capacity must be > 0, got {}",
            self.stream.window_capacity
        );
        anyhow::ensure!(
            (1..=100).contains(&self.incidents.default_threshold),
            "incidents.default_threshold must be between 1 and 100, got {}",
            self.incidents.default_threshold
        );
        anyhow::ensure!(
            self.incidents.min_run_length > 0,
            "incidents.min_run_length must be > 0, got {}",
            self.incidents.min_run_length
        );
        anyhow::ensure!(
            !self.analysis.model.is_empty(),
            "analysis.model must be non-empty"
        );
        anyhow::ensure!(
            !self.analysis.api_key_env.is_empty(),
            "analysis.api_key_env must be non-empty"
        );
        anyhow::ensure!(
            self.analysis.timeout_secs > 0,
            "analysis.timeout_secs must be > 0, got {}",
            self.analysis.timeout_secs
        );
        anyhow::ensure!(
            self.analysis.max_points > 0,
            "analysis.max_points must be > 0, got {}",
            self.analysis.max_points
        );
        Ok(())
    }
}
