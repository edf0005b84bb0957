use std::path::Path;

use assetgen_contracts::{
    build_provider_payload, AssetGenError, EventPayload, EventWriter, GenerationRequest,
    OutputArtifact, Result,
};
use serde_json::{json, Map, Value};

use crate::generation::{generate_with_payload, GeneratedImage, Generation};
use crate::persistence;
use crate::provider::{HttpImageFetcher, ImageFetcher, ImageProvider};
use crate::replicate::ReplicateProvider;

pub struct AssetEngine {
    provider: Box<dyn ImageProvider>,
    fetcher: Box<dyn ImageFetcher>,
    events: Option<EventWriter>,
}

impl AssetEngine {
    pub fn new(provider: Box<dyn ImageProvider>, fetcher: Box<dyn ImageFetcher>) -> Self {
        Self {
            provider,
            fetcher,
            events: None,
        }
    }

    pub fn replicate_from_env() -> Result<Self> {
        let provider = ReplicateProvider::from_env()?;
        let fetcher = HttpImageFetcher::new()?;
        Ok(Self::new(Box::new(provider), Box::new(fetcher)))
    }

    pub fn with_event_log(mut self, path: impl AsRef<Path>) -> Self {
        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        self.events = Some(EventWriter::new(path.as_ref(), run_id));
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.events.as_ref().map(EventWriter::run_id)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.emit(
            "run_started",
            json!({
                "provider": self.provider_name(),
                "engine": request.engine().as_str(),
                "prompt": request.prompt(),
                "requested": request.count(),
            }),
        )?;
        let payload = build_provider_payload(request);
        self.emit(
            "payload_built",
            json!({
                "engine": payload.engine.as_str(),
                "route": payload.route,
                "warnings": payload.warnings,
            }),
        )?;

        let generation =
            generate_with_payload(self.provider.as_ref(), self.fetcher.as_ref(), payload)
                .map_err(|err| self.fail(err))?;

        for (offset, image) in generation.images.iter().enumerate() {
            self.emit(
                "image_fetched",
                json!({
                    "index": offset + 1,
                    "url": image.source_url,
                    "width": image.width(),
                    "height": image.height(),
                }),
            )?;
        }
        Ok(generation)
    }

    pub fn save(
        &self,
        images: &[GeneratedImage],
        base_name: &str,
        output_dir: &Path,
    ) -> Result<Vec<OutputArtifact>> {
        let artifacts =
            persistence::save(images, base_name, output_dir).map_err(|err| self.fail(err))?;
        for artifact in &artifacts {
            self.emit(
                "artifact_written",
                json!({
                    "index": artifact.source_index,
                    "path": artifact.path.to_string_lossy(),
                }),
            )?;
        }
        self.emit("run_finished", json!({ "artifacts": artifacts.len() }))?;
        Ok(artifacts)
    }

    fn emit(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(events) = &self.events {
            events.emit(event_type, map_object(payload))?;
        }
        Ok(())
    }

    /// Records a `run_failed` event and hands the original error back.
    fn fail(&self, err: AssetGenError) -> AssetGenError {
        let recorded = self.emit(
            "run_failed",
            json!({
                "kind": err.kind(),
                "error": err.to_string(),
            }),
        );
        if let Err(log_err) = recorded {
            log::debug!("could not record run_failed event: {log_err}");
        }
        err
    }
}

fn map_object(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
