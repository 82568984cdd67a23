use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub api_token: Option<String>,
    pub http_timeout_ms: u64,
}

impl StoreConfig {
    const BASE_URL_VARS: [&'static str; 2] = ["ALUMNI_STORE_BASE_URL", "FIRESTORE_BASE_URL"];
    const PROJECT_VARS: [&'static str; 2] = ["ALUMNI_STORE_PROJECT_ID", "FIRESTORE_PROJECT_ID"];
    const DATABASE_VARS: [&'static str; 2] = ["ALUMNI_STORE_DATABASE", "FIRESTORE_DATABASE"];
    const API_TOKEN_VARS: [&'static str; 2] = ["ALUMNI_STORE_API_TOKEN", "FIRESTORE_API_TOKEN"];
    const TIMEOUT_VARS: [&'static str; 1] = ["ALUMNI_STORE_HTTP_TIMEOUT_MS"];

    pub fn from_env() -> anyhow::Result<Self> {
        let project_id = Self::read_env(&Self::PROJECT_VARS).context(
            "Set ALUMNI_STORE_PROJECT_ID (or FIRESTORE_PROJECT_ID) to reach the document store",
        )?;
        let base_url = Self::read_env(&Self::BASE_URL_VARS)
            .unwrap_or_else(|| "https://firestore.googleapis.com/v1".to_string());
        let database =
            Self::read_env(&Self::DATABASE_VARS).unwrap_or_else(|| "(default)".to_string());
        let http_timeout_ms = Self::read_env(&Self::TIMEOUT_VARS)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10_000);

        Ok(Self {
            base_url,
            project_id,
            database,
            api_token: Self::read_env(&Self::API_TOKEN_VARS),
            http_timeout_ms,
        })
    }

    fn read_env(candidates: &[&'static str]) -> Option<String> {
        candidates.iter().find_map(|key| env::var(key).ok())
    }
}
