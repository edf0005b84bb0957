mod aspect;
mod payload;

use std::str::FromStr;

use serde::Serialize;

use crate::request::GenerationRequest;

pub use aspect::AspectRatio;
pub use payload::{
    build_provider_payload, EngineInput, FastInput, ModelRoute, ProviderPayload, QualityInput,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// FLUX.1 [schnell]: aspect-ratio labels, no negative prompt.
    #[default]
    Fast,
    /// Stable Diffusion XL: raw dimensions plus sampler settings.
    Quality,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Fast, Engine::Quality];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Quality => "quality",
        }
    }

    pub fn model_route(&self) -> ModelRoute {
        match self {
            Self::Fast => ModelRoute::Official {
                owner: "black-forest-labs",
                name: "flux-schnell",
            },
            Self::Quality => ModelRoute::Version {
                model: "stability-ai/sdxl",
                version: "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b",
            },
        }
    }

    pub fn build_payload(&self, request: &GenerationRequest) -> ProviderPayload {
        match self {
            Self::Fast => payload::fast_payload(request),
            Self::Quality => payload::quality_payload(request),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|engine| engine.as_str() == normalized)
            .ok_or_else(|| format!("unknown engine '{raw}' (expected one of: fast, quality)"))
    }
}
