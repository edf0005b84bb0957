pub mod engines;
pub mod error;
pub mod events;
pub mod request;

pub use engines::{
    build_provider_payload, AspectRatio, Engine, EngineInput, FastInput, ModelRoute,
    ProviderPayload, QualityInput,
};
pub use error::{AssetGenError, Result};
pub use events::{EventPayload, EventWriter};
pub use request::{GenerationRequest, OutputArtifact, ResizeSpec, DEFAULT_NEGATIVE_PROMPT};
