//! Client for the upstream NASA APOD API.

use std::time::Duration;

use astrovista_core::{Apod, ApodDate};

use crate::config::NasaConfig;

#[derive(Debug, thiserror::Error)]
pub enum NasaError {
    #[error("NASA API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("NASA API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("NASA API returned an unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct NasaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NasaClient {
    pub fn new(config: &NasaConfig) -> Result<Self, NasaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("astrovista/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetches the APOD for `date`, or today's when `None`.
    pub async fn fetch_apod(&self, date: Option<&ApodDate>) -> Result<Apod, NasaError> {
        let mut query = vec![("api_key", self.api_key.clone())];
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/planetary/apod", self.base_url))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NasaError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let mut apod: Apod = serde_json::from_str(&body)?;
        // Never trust an upstream id.
        apod.id = None;
        tracing::debug!(date = %apod.date, title = %apod.title, "Fetched APOD from NASA");
        Ok(apod)
    }
}
