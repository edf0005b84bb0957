use serde::Serialize;

use super::{AspectRatio, Engine};
use crate::request::{GenerationRequest, DEFAULT_NEGATIVE_PROMPT};

const FAST_OUTPUT_FORMAT: &str = "png";
const FAST_OUTPUT_QUALITY: u8 = 100;
const QUALITY_SCHEDULER: &str = "DPMSolverMultistep";
const QUALITY_INFERENCE_STEPS: u32 = 25;
const QUALITY_GUIDANCE_SCALE: f64 = 7.5;

/// How the provider addresses the model behind an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelRoute {
    /// Official model, addressed by owner/name; always runs the latest version.
    Official {
        owner: &'static str,
        name: &'static str,
    },
    /// Community model pinned to a version hash.
    Version {
        model: &'static str,
        version: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FastInput {
    pub prompt: String,
    pub num_outputs: u32,
    pub aspect_ratio: AspectRatio,
    pub output_format: &'static str,
    pub output_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityInput {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_outputs: u32,
    pub scheduler: &'static str,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
}

/// Model input, serialized as the provider's flat `input` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineInput {
    Fast(FastInput),
    Quality(QualityInput),
}

/// Provider-specific request derived from a [`GenerationRequest`].
///
/// `warnings` are advisory: they describe request fields the engine could not
/// honor and never block the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderPayload {
    pub engine: Engine,
    pub route: ModelRoute,
    pub input: EngineInput,
    pub warnings: Vec<String>,
}

impl ProviderPayload {
    pub fn requested_outputs(&self) -> u32 {
        match &self.input {
            EngineInput::Fast(input) => input.num_outputs,
            EngineInput::Quality(input) => input.num_outputs,
        }
    }
}

/// Maps a request onto the payload its engine expects. Pure; no I/O.
pub fn build_provider_payload(request: &GenerationRequest) -> ProviderPayload {
    request.engine().build_payload(request)
}

pub(super) fn fast_payload(request: &GenerationRequest) -> ProviderPayload {
    let mut warnings = Vec::new();
    if request.negative_prompt().is_some() {
        log::warn!("negative prompt ignored: the fast engine does not support it");
        warnings.push("Negative prompt ignored: the fast engine does not support it.".to_string());
    }
    let aspect_ratio = AspectRatio::closest(request.width(), request.height());
    log::debug!(
        "mapped {}x{} to aspect ratio {aspect_ratio}",
        request.width(),
        request.height()
    );
    ProviderPayload {
        engine: Engine::Fast,
        route: Engine::Fast.model_route(),
        input: EngineInput::Fast(FastInput {
            prompt: request.prompt().to_string(),
            num_outputs: request.count(),
            aspect_ratio,
            output_format: FAST_OUTPUT_FORMAT,
            output_quality: FAST_OUTPUT_QUALITY,
        }),
        warnings,
    }
}

pub(super) fn quality_payload(request: &GenerationRequest) -> ProviderPayload {
    ProviderPayload {
        engine: Engine::Quality,
        route: Engine::Quality.model_route(),
        input: EngineInput::Quality(QualityInput {
            prompt: request.prompt().to_string(),
            negative_prompt: request
                .negative_prompt()
                .unwrap_or(DEFAULT_NEGATIVE_PROMPT)
                .to_string(),
            width: request.width(),
            height: request.height(),
            num_outputs: request.count(),
            scheduler: QUALITY_SCHEDULER,
            num_inference_steps: QUALITY_INFERENCE_STEPS,
            guidance_scale: QUALITY_GUIDANCE_SCALE,
        }),
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{build_provider_payload, EngineInput};
    use crate::engines::{AspectRatio, Engine};
    use crate::request::GenerationRequest;

    fn request(engine: Engine, width: u32, height: u32) -> GenerationRequest {
        GenerationRequest::new("a treasure chest, game icon", engine, width, height, 2).unwrap()
    }

    #[test]
    fn fast_payload_uses_aspect_label_png_and_max_quality() -> anyhow::Result<()> {
        let payload = build_provider_payload(&request(Engine::Fast, 1920, 1080));
        assert!(payload.warnings.is_empty());
        assert_eq!(payload.requested_outputs(), 2);

        let input = serde_json::to_value(&payload.input)?;
        assert_eq!(
            input,
            json!({
                "prompt": "a treasure chest, game icon",
                "num_outputs": 2,
                "aspect_ratio": "16:9",
                "output_format": "png",
                "output_quality": 100,
            })
        );
        Ok(())
    }

    #[test]
    fn fast_payload_drops_negative_prompt_with_warning() -> anyhow::Result<()> {
        let payload = build_provider_payload(
            &request(Engine::Fast, 1024, 1024).with_negative_prompt("blurry"),
        );
        assert_eq!(payload.warnings.len(), 1);
        assert!(payload.warnings[0].contains("Negative prompt ignored"));

        let input = serde_json::to_value(&payload.input)?;
        assert!(input.get("negative_prompt").is_none());
        match payload.input {
            EngineInput::Fast(fast) => assert_eq!(fast.aspect_ratio, AspectRatio::Square),
            EngineInput::Quality(_) => panic!("expected fast input"),
        }
        Ok(())
    }

    #[test]
    fn quality_payload_passes_dimensions_and_sampler_through() -> anyhow::Result<()> {
        let payload = build_provider_payload(
            &request(Engine::Quality, 1152, 896).with_negative_prompt("text, watermark"),
        );
        assert!(payload.warnings.is_empty());

        let input = serde_json::to_value(&payload.input)?;
        assert_eq!(
            input,
            json!({
                "prompt": "a treasure chest, game icon",
                "negative_prompt": "text, watermark",
                "width": 1152,
                "height": 896,
                "num_outputs": 2,
                "scheduler": "DPMSolverMultistep",
                "num_inference_steps": 25,
                "guidance_scale": 7.5,
            })
        );
        Ok(())
    }

    #[test]
    fn quality_payload_keeps_empty_negative_prompt() -> anyhow::Result<()> {
        let payload =
            build_provider_payload(&request(Engine::Quality, 512, 512).with_negative_prompt(""));
        let input = serde_json::to_value(&payload.input)?;
        assert_eq!(input.get("negative_prompt"), Some(&Value::String(String::new())));
        Ok(())
    }

    #[test]
    fn quality_payload_falls_back_to_default_negative_prompt() -> anyhow::Result<()> {
        let payload = build_provider_payload(&request(Engine::Quality, 512, 512));
        let input = serde_json::to_value(&payload.input)?;
        assert_eq!(
            input["negative_prompt"],
            json!("low quality, blurry, ugly, deformed")
        );
        Ok(())
    }

    #[test]
    fn payload_records_route() -> anyhow::Result<()> {
        let payload = build_provider_payload(&request(Engine::Quality, 512, 512));
        let route = serde_json::to_value(payload.route)?;
        assert_eq!(route["kind"], json!("version"));
        assert_eq!(route["model"], json!("stability-ai/sdxl"));
        Ok(())
    }
}
