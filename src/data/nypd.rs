//! NYC Open Data download of the NYPD Shooting Incident Data (Historic).
//!
//! The export is a plain CSV (one row per victim). We fetch it once per run
//! and hand the body to `io::ingest`.

use reqwest::blocking::Client;
use tracing::info;

use crate::error::AppError;

/// CSV export of dataset `833y-pbd6`.
pub const DEFAULT_DATA_URL: &str =
    "https://data.cityofnewyork.us/api/views/833y-pbd6/rows.csv?accessType=DOWNLOAD";

const ENV_DATA_URL: &str = "SEAS_DATA_URL";
const ENV_APP_TOKEN: &str = "SOCRATA_APP_TOKEN";

pub struct IncidentClient {
    client: Client,
    url: String,
    app_token: Option<String>,
}

impl IncidentClient {
    /// Build a client from `.env` / environment, with an optional URL override.
    ///
    /// Precedence for the URL: explicit override, `SEAS_DATA_URL`, default.
    pub fn from_env(url_override: Option<&str>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = match url_override {
            Some(u) => u.to_string(),
            None => std::env::var(ENV_DATA_URL).unwrap_or_else(|_| DEFAULT_DATA_URL.to_string()),
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::new(2, format!("Invalid data URL '{url}' (expected http/https).")));
        }
        let app_token = std::env::var(ENV_APP_TOKEN).ok().filter(|t| !t.trim().is_empty());

        let client = Client::builder()
            .user_agent(concat!("seas/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            app_token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the CSV body.
    pub fn fetch_csv(&self) -> Result<String, AppError> {
        info!(url = %self.url, "downloading incident CSV");

        let mut req = self.client.get(&self.url);
        if let Some(token) = &self.app_token {
            req = req.header("X-App-Token", token);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::new(4, format!("Incident download failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Incident download failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read incident CSV body: {e}")))?;
        info!(bytes = body.len(), "downloaded incident CSV");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_override_wins() {
        let client = IncidentClient::from_env(Some("https://example.org/data.csv")).unwrap();
        assert_eq!(client.url(), "https://example.org/data.csv");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = IncidentClient::from_env(Some("ftp://example.org/data.csv")).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
