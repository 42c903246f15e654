use serde::Deserialize;

fn default_api_base() -> String {
    "https://api.openai.com".into()
}

fn default_model_name() -> String {
    "gpt-4o".into()
}

fn default_gate_threshold() -> f64 {
    80.0
}

fn default_max_parallel() -> usize {
    4
}

fn default_oracle_concurrency() -> usize {
    2
}

fn default_oracle_retries() -> usize {
    2
}

fn default_oracle_timeout_ms() -> u64 {
    120_000
}

fn default_cache_path() -> String {
    "cache_index.json".into()
}

fn default_http_bind() -> String {
    "0.0.0.0".into()
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_api_base")]
    pub openai_api_base: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Stage-1 cut line; documents scoring below it never reach Stage 2.
    #[serde(default = "default_gate_threshold")]
    pub gate_threshold: f64,
    /// How many documents are orchestrated at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Global ceiling on in-flight model calls, shared across all documents.
    #[serde(default = "default_oracle_concurrency")]
    pub oracle_concurrency: usize,
    #[serde(default = "default_oracle_retries")]
    pub oracle_retries: usize,
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}
