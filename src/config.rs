// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Maximum number of messages kept in a student's tutoring conversation.
pub const CHAT_HISTORY_LIMIT: usize = 20;

/// Points used by writing evaluation and rubric generation when the caller gives none.
pub const DEFAULT_MAX_POINTS: i32 = 10;

/// CEFR level assumed when a request does not name one.
pub const DEFAULT_STUDENT_LEVEL: &str = "B1";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub completion_timeout_secs: u64,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| database_url_from_parts());

        let openai_api_key = env::var("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY must be set");

        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let openai_model = env::var("OPENAI_MODEL")
            .unwrap_or_else(|_| "gpt-4-turbo".to_string());

        let completion_timeout_secs = env::var("COMPLETION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let cors_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:3001".to_string(),
                    "http://localhost:3002".to_string(),
                ]
            });

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            openai_api_key,
            openai_base_url,
            openai_model,
            completion_timeout_secs,
            port,
            cors_origins,
            rust_log,
        }
    }
}

/// Builds a Postgres URL from the individual DB_* variables.
fn database_url_from_parts() -> String {
    let var = |key: &str, default: &str| env::var(key).unwrap_or_else(|_| default.to_string());

    format!(
        "postgres://{}:{}@{}:{}/{}",
        var("DB_USER", "postgres"),
        var("DB_PASSWORD", "postgres"),
        var("DB_HOST", "localhost"),
        var("DB_PORT", "5432"),
        var("DB_NAME", "uedu"),
    )
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
