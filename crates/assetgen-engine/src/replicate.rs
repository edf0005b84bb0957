use std::env;
use std::thread;
use std::time::Duration;

use assetgen_contracts::{AssetGenError, ModelRoute, ProviderPayload, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::provider::{truncate_text, ImageProvider};

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
const TOKEN_VARS: [&str; 2] = ["REPLICATE_API_TOKEN", "REPLICATE_API_KEY"];
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub fn load_api_token() -> Result<String> {
    TOKEN_VARS
        .iter()
        .find_map(|key| non_empty_env(key))
        .ok_or_else(|| AssetGenError::MissingCredential {
            var: TOKEN_VARS[0].to_string(),
        })
}

pub struct ReplicateProvider {
    api_base: String,
    api_key: String,
    http: HttpClient,
    poll_interval: Duration,
}

impl ReplicateProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| AssetGenError::MissingDependency {
                what: "HTTP client".to_string(),
                hint: format!("TLS backend failed to initialize: {err}"),
            })?;
        Ok(Self {
            api_base: non_empty_env("REPLICATE_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: api_key.into(),
            http,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = load_api_token()?;
        Self::new(api_key)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self, route: &ModelRoute) -> String {
        match route {
            ModelRoute::Official { owner, name } => {
                format!("{}/models/{owner}/{name}/predictions", self.api_base)
            }
            ModelRoute::Version { .. } => format!("{}/predictions", self.api_base),
        }
    }

    pub fn request_body(payload: &ProviderPayload) -> Value {
        match payload.route {
            ModelRoute::Official { .. } => json!({ "input": payload.input }),
            ModelRoute::Version { version, .. } => json!({
                "version": version,
                "input": payload.input,
            }),
        }
    }

    fn poll_prediction(&self, poll_url: &str) -> Result<Value> {
        loop {
            thread::sleep(self.poll_interval);
            let response = self
                .http
                .get(poll_url)
                .bearer_auth(&self.api_key)
                .send()
                .map_err(|err| {
                    AssetGenError::ProviderError(format!("poll request failed ({poll_url}): {err}"))
                })?;
            let prediction = response_json_or_error("Replicate poll", response)?;
            match prediction_status(&prediction).as_str() {
                "starting" | "processing" => {
                    log::debug!("prediction still running, polling {poll_url}");
                }
                _ => return Ok(prediction),
            }
        }
    }
}

impl ImageProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn run(&self, payload: &ProviderPayload) -> Result<Vec<String>> {
        let endpoint = self.endpoint(&payload.route);
        log::info!("creating prediction for {} engine at {endpoint}", payload.engine);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("Prefer", "wait")
            .json(&Self::request_body(payload))
            .send()
            .map_err(|err| {
                AssetGenError::ProviderError(format!("request failed ({endpoint}): {err}"))
            })?;
        let mut prediction = response_json_or_error("Replicate", response)?;

        if matches!(
            prediction_status(&prediction).as_str(),
            "starting" | "processing"
        ) {
            let poll_url = prediction
                .get("urls")
                .and_then(|urls| urls.get("get"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    AssetGenError::ProviderError("prediction missing poll URL".to_string())
                })?
                .to_string();
            prediction = self.poll_prediction(&poll_url)?;
        }

        match prediction_status(&prediction).as_str() {
            "succeeded" => {}
            "failed" | "canceled" => {
                let detail = prediction
                    .get("error")
                    .filter(|error| !error.is_null())
                    .map(Value::to_string)
                    .unwrap_or_else(|| "no error detail".to_string());
                return Err(AssetGenError::ProviderError(format!(
                    "prediction {}: {detail}",
                    prediction_status(&prediction)
                )));
            }
            other => {
                return Err(AssetGenError::ProviderError(format!(
                    "unexpected prediction status '{other}'"
                )));
            }
        }

        let urls = extract_output_urls(prediction.get("output").unwrap_or(&Value::Null))?;
        if urls.len() as u32 != payload.requested_outputs() {
            log::info!(
                "provider returned {} image(s) for {} requested",
                urls.len(),
                payload.requested_outputs()
            );
        }
        Ok(urls)
    }
}

pub fn extract_output_urls(output: &Value) -> Result<Vec<String>> {
    let urls = match output {
        Value::String(url) => vec![url.trim().to_string()],
        Value::Array(rows) => rows
            .iter()
            .map(|row| {
                row.as_str().map(|url| url.trim().to_string()).ok_or_else(|| {
                    AssetGenError::ProviderError(format!("unexpected output entry: {row}"))
                })
            })
            .collect::<Result<Vec<String>>>()?,
        other => {
            return Err(AssetGenError::ProviderError(format!(
                "unexpected output shape: {}",
                truncate_text(&other.to_string(), 256)
            )));
        }
    };
    if urls.is_empty() || urls.iter().any(String::is_empty) {
        return Err(AssetGenError::ProviderError(
            "response returned no image URLs".to_string(),
        ));
    }
    Ok(urls)
}

fn prediction_status(prediction: &Value) -> String {
    prediction
        .get("status")
        .and_then(Value::as_str)
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default()
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        AssetGenError::ProviderError(format!("{provider} response body read failed: {err}"))
    })?;
    if !status.is_success() {
        return Err(AssetGenError::ProviderError(format!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    serde_json::from_str(&body).map_err(|err| {
        AssetGenError::ProviderError(format!("{provider} returned invalid JSON payload: {err}"))
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::time::Duration;

    use assetgen_contracts::{
        build_provider_payload, AssetGenError, Engine, GenerationRequest, ProviderPayload,
    };
    use reqwest::blocking::Client as HttpClient;
    use serde_json::json;

    use super::{extract_output_urls, ReplicateProvider, TOKEN_VARS};
    use crate::engine::AssetEngine;
    use crate::provider::local_http::LocalServer;
    use crate::provider::ImageProvider;

    fn provider() -> ReplicateProvider {
        ReplicateProvider::new("test-token")
            .unwrap()
            .with_api_base("https://replicate.test/v1/")
    }

    fn local_provider(base_url: &str) -> ReplicateProvider {
        let mut provider = ReplicateProvider::new("test-token")
            .unwrap()
            .with_api_base(base_url)
            .with_poll_interval(Duration::ZERO);
        provider.http = HttpClient::builder().no_proxy().build().unwrap();
        provider
    }

    fn fast_payload() -> ProviderPayload {
        let request = GenerationRequest::new("coin", Engine::Fast, 512, 512, 1).unwrap();
        build_provider_payload(&request)
    }

    #[test]
    fn fast_engine_posts_to_official_model_endpoint() {
        let request = GenerationRequest::new("coin", Engine::Fast, 512, 512, 1).unwrap();
        let payload = build_provider_payload(&request);
        assert_eq!(
            provider().endpoint(&payload.route),
            "https://replicate.test/v1/models/black-forest-labs/flux-schnell/predictions"
        );
        let body = ReplicateProvider::request_body(&payload);
        assert!(body.get("version").is_none());
        assert_eq!(body["input"]["aspect_ratio"], json!("1:1"));
    }

    #[test]
    fn quality_engine_posts_pinned_version() {
        let request = GenerationRequest::new("coin", Engine::Quality, 768, 512, 3).unwrap();
        let payload = build_provider_payload(&request);
        assert_eq!(
            provider().endpoint(&payload.route),
            "https://replicate.test/v1/predictions"
        );
        let body = ReplicateProvider::request_body(&payload);
        assert_eq!(
            body["version"],
            json!("39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b")
        );
        assert_eq!(body["input"]["width"], json!(768));
        assert_eq!(body["input"]["num_outputs"], json!(3));
    }

    #[test]
    fn output_urls_accept_string_or_list() {
        assert_eq!(
            extract_output_urls(&json!("https://replicate.delivery/a.png")).unwrap(),
            vec!["https://replicate.delivery/a.png"]
        );
        assert_eq!(
            extract_output_urls(&json!([
                "https://replicate.delivery/b.png",
                "https://replicate.delivery/a.png"
            ]))
            .unwrap(),
            vec![
                "https://replicate.delivery/b.png",
                "https://replicate.delivery/a.png"
            ]
        );
    }

    #[test]
    fn unexpected_output_shapes_are_provider_errors() {
        for output in [json!(null), json!([]), json!({"url": "x"}), json!([1, 2]), json!("")] {
            let err = extract_output_urls(&output).unwrap_err();
            assert!(
                matches!(err, AssetGenError::ProviderError(_)),
                "unexpected error for {output}: {err}"
            );
        }
    }

    #[test]
    fn blank_tokens_fail_before_any_request() {
        for key in TOKEN_VARS {
            env::set_var(key, "   ");
        }

        let err = ReplicateProvider::from_env().err().expect("blank token rejected");
        assert!(
            matches!(&err, AssetGenError::MissingCredential { var } if var == "REPLICATE_API_TOKEN"),
            "unexpected error: {err}"
        );
        let err = AssetEngine::replicate_from_env()
            .err()
            .expect("blank token rejected");
        assert_eq!(err.kind(), "missing_credential");
    }

    #[test]
    fn settled_prediction_returns_urls_and_sends_wait_header() -> anyhow::Result<()> {
        let server = LocalServer::bind();
        let base = server.base_url();
        let body = json!({
            "status": "succeeded",
            "output": [format!("{base}/out-0.png")],
        });
        let handle = server.serve(vec![(201, body.to_string())]);

        let urls = local_provider(&base).run(&fast_payload())?;

        assert_eq!(urls, vec![format!("{base}/out-0.png")]);
        let requests = handle.join().unwrap();
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("post /models/black-forest-labs/flux-schnell/predictions "));
        assert!(request.contains("prefer: wait"));
        assert!(request.contains("authorization: bearer test-token"));
        assert!(request.contains("\"aspect_ratio\":\"1:1\""));
        Ok(())
    }

    #[test]
    fn failed_and_canceled_predictions_are_provider_errors() {
        let server = LocalServer::bind();
        let base = server.base_url();
        let handle = server.serve(vec![
            (201, json!({"status": "failed", "error": "NSFW"}).to_string()),
            (201, json!({"status": "canceled", "error": null}).to_string()),
        ]);
        let provider = local_provider(&base);

        let failed = provider.run(&fast_payload()).unwrap_err();
        let canceled = provider.run(&fast_payload()).unwrap_err();
        handle.join().unwrap();

        assert_eq!(failed.to_string(), "provider error: prediction failed: \"NSFW\"");
        assert_eq!(
            canceled.to_string(),
            "provider error: prediction canceled: no error detail"
        );
    }

    #[test]
    fn non_success_reply_is_provider_error() {
        let server = LocalServer::bind();
        let base = server.base_url();
        let handle = server.serve(vec![(422, json!({"detail": "invalid version"}).to_string())]);

        let err = local_provider(&base).run(&fast_payload()).unwrap_err();
        handle.join().unwrap();

        assert_eq!(err.kind(), "provider_error");
        let message = err.to_string();
        assert!(message.contains("(422)"), "{message}");
        assert!(message.contains("invalid version"), "{message}");
    }

    #[test]
    fn starting_prediction_is_polled_until_it_succeeds() -> anyhow::Result<()> {
        let server = LocalServer::bind();
        let base = server.base_url();
        let poll_url = format!("{base}/predictions/abc123");
        let handle = server.serve(vec![
            (
                201,
                json!({"status": "starting", "urls": {"get": poll_url}}).to_string(),
            ),
            (
                200,
                json!({"status": "processing", "urls": {"get": poll_url}}).to_string(),
            ),
            (
                200,
                json!({
                    "status": "succeeded",
                    "output": [format!("{base}/out-1.png"), format!("{base}/out-0.png")],
                })
                .to_string(),
            ),
        ]);

        let urls = local_provider(&base).run(&fast_payload())?;

        assert_eq!(
            urls,
            vec![format!("{base}/out-1.png"), format!("{base}/out-0.png")]
        );
        let requests = handle.join().unwrap();
        assert_eq!(requests.len(), 3);
        for poll in &requests[1..] {
            assert!(poll.starts_with("GET /predictions/abc123 "), "{poll}");
            assert!(poll.to_ascii_lowercase().contains("authorization: bearer test-token"));
        }
        Ok(())
    }

    #[test]
    fn starting_prediction_without_poll_url_is_provider_error() {
        let server = LocalServer::bind();
        let base = server.base_url();
        let handle = server.serve(vec![(201, json!({"status": "processing"}).to_string())]);

        let err = local_provider(&base).run(&fast_payload()).unwrap_err();
        handle.join().unwrap();

        assert_eq!(err.to_string(), "provider error: prediction missing poll URL");
    }
}
