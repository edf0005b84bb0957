use std::path::PathBuf;

use serde::Serialize;

use crate::engines::Engine;
use crate::error::{AssetGenError, Result};

/// Negative prompt sent to the quality engine when the caller supplies none.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "low quality, blurry, ugly, deformed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    negative_prompt: Option<String>,
    width: u32,
    height: u32,
    count: u32,
    engine: Engine,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        engine: Engine,
        width: u32,
        height: u32,
        count: u32,
    ) -> Result<Self> {
        ensure_positive("width", width)?;
        ensure_positive("height", height)?;
        ensure_positive("count", count)?;
        Ok(Self {
            prompt: prompt.into(),
            negative_prompt: None,
            width,
            height,
            count,
            engine,
        })
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResizeSpec {
    target_width: u32,
    target_height: u32,
    preserve_aspect: bool,
}

impl ResizeSpec {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure_positive("target width", width)?;
        ensure_positive("target height", height)?;
        Ok(Self {
            target_width: width,
            target_height: height,
            preserve_aspect: true,
        })
    }

    pub fn with_preserve_aspect(mut self, preserve_aspect: bool) -> Self {
        self.preserve_aspect = preserve_aspect;
        self
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn preserve_aspect(&self) -> bool {
        self.preserve_aspect
    }
}

/// A PNG written by persistence. `source_index` is the 1-based position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub source_index: usize,
}

fn ensure_positive(field: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(AssetGenError::InvalidRequest(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}
