//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token signing configuration.
    pub auth: AuthConfig,
    /// Cross-origin configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Appraisal workflow policy.
    #[serde(default)]
    pub appraisal: AppraisalConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Access/refresh token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// `aud` claim.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty or `*` allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Appraisal workflow policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AppraisalConfig {
    /// Days after completion during which an appeal may be filed.
    #[serde(default = "default_appeal_window_days")]
    pub appeal_window_days: i64,
    /// Upper bound of every rating field.
    #[serde(default = "default_rating_scale_max")]
    pub rating_scale_max: f64,
    /// Default page size for list endpoints.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Upper bound for the page size of list endpoints.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Weights of the five competency sections.
    #[serde(default)]
    pub section_weights: SectionWeights,
}

/// Weights of the competency sections used by the weighted score.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SectionWeights {
    pub performance: f64,
    pub technical_skills: f64,
    pub communication: f64,
    pub teamwork: f64,
    pub leadership: f64,
}

impl Default for SectionWeights {
    fn default() -> Self {
        Self {
            performance: 30.0,
            technical_skills: 25.0,
            communication: 15.0,
            teamwork: 15.0,
            leadership: 15.0,
        }
    }
}

impl Default for AppraisalConfig {
    fn default() -> Self {
        Self {
            appeal_window_days: default_appeal_window_days(),
            rating_scale_max: default_rating_scale_max(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            section_weights: SectionWeights::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_issuer() -> String {
    "appraisal".to_string()
}

fn default_audience() -> String {
    "appraisal-api".to_string()
}

const fn default_access_token_minutes() -> i64 {
    60
}

const fn default_refresh_token_days() -> i64 {
    7
}

const fn default_appeal_window_days() -> i64 {
    14
}

const fn default_rating_scale_max() -> f64 {
    5.0
}

const fn default_page_size() -> u64 {
    10
}

const fn default_max_page_size() -> u64 {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `APPRAISAL_ENV`)
    /// 4. Environment variables with `APPRAISAL__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APPRAISAL_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPRAISAL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("APPRAISAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let raw = r#"
            [server]
            url = "https://hr.example.com"

            [database]
            url = "postgres://localhost/appraisal"

            [auth]
            jwt_secret = "secret"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.refresh_token_days, 7);
        assert_eq!(config.appraisal.appeal_window_days, 14);
        assert_eq!(config.appraisal.max_page_size, 100);
        assert!(config.cors.allowed_origins.is_empty());
        assert!((config.appraisal.section_weights.performance - 30.0).abs() < f64::EPSILON);
    }
}
