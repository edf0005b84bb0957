use assetgen_contracts::{
    build_provider_payload, AssetGenError, GenerationRequest, ProviderPayload, Result,
};
use image::error::{ImageError, ImageFormatHint, UnsupportedErrorKind};
use image::RgbaImage;

use crate::provider::{ImageFetcher, ImageProvider};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub source_url: String,
    pub pixels: RgbaImage,
}

impl GeneratedImage {
    pub fn new(source_url: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            source_url: source_url.into(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub payload: ProviderPayload,
    pub images: Vec<GeneratedImage>,
    pub warnings: Vec<String>,
}

pub fn generate(
    provider: &dyn ImageProvider,
    fetcher: &dyn ImageFetcher,
    request: &GenerationRequest,
) -> Result<Generation> {
    let payload = build_provider_payload(request);
    generate_with_payload(provider, fetcher, payload)
}

pub(crate) fn generate_with_payload(
    provider: &dyn ImageProvider,
    fetcher: &dyn ImageFetcher,
    payload: ProviderPayload,
) -> Result<Generation> {
    let urls = provider.run(&payload)?;
    log::info!("{} returned {} image URL(s)", provider.name(), urls.len());

    let mut images = Vec::with_capacity(urls.len());
    for url in urls {
        let bytes = fetcher.fetch(&url)?;
        let pixels = decode_image(&bytes)?;
        log::debug!("decoded {}x{} image from {url}", pixels.width(), pixels.height());
        images.push(GeneratedImage::new(url, pixels));
    }

    let warnings = payload.warnings.clone();
    Ok(Generation {
        payload,
        images,
        warnings,
    })
}

/// Decodes any supported format and normalizes to RGBA, adding opaque alpha when absent.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Ok(decoded.to_rgba8()),
        Err(ImageError::Unsupported(err)) => match err.kind() {
            UnsupportedErrorKind::Format(ImageFormatHint::Exact(format)) => {
                Err(AssetGenError::MissingDependency {
                    what: format!("{format:?} image codec"),
                    hint: format!(
                        "enable the `{}` feature of the `image` crate and rebuild",
                        format!("{format:?}").to_ascii_lowercase()
                    ),
                })
            }
            _ => Err(AssetGenError::Decode(err.to_string())),
        },
        Err(err) => Err(AssetGenError::Decode(err.to_string())),
    }
}
