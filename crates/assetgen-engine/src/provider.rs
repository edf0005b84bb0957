use std::time::Duration;

use assetgen_contracts::{AssetGenError, ProviderPayload, Result};
use reqwest::blocking::Client as HttpClient;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

pub trait ImageProvider {
    fn name(&self) -> &str;
    fn run(&self, payload: &ProviderPayload) -> Result<Vec<String>>;
}

pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpImageFetcher {
    http: HttpClient,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AssetGenError::MissingDependency {
                what: "HTTP client".to_string(),
                hint: format!("TLS backend failed to initialize: {err}"),
            })?;
        Ok(Self { http })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let failure = |reason: String| AssetGenError::FetchFailure {
            url: url.to_string(),
            reason,
        };
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| failure(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(failure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_text(&body, 256)
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|err| failure(format!("failed reading body: {err}")))?;
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
