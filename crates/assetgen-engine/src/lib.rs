mod engine;
pub mod generation;
pub mod persistence;
pub mod provider;
pub mod replicate;
pub mod resize;

pub use engine::AssetEngine;
pub use generation::{decode_image, generate, GeneratedImage, Generation};
pub use persistence::save;
pub use provider::{HttpImageFetcher, ImageFetcher, ImageProvider, FETCH_TIMEOUT};
pub use replicate::{load_api_token, ReplicateProvider};
pub use resize::resize;
