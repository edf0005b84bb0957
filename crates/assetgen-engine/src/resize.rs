use assetgen_contracts::ResizeSpec;
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::generation::GeneratedImage;

const FILTER: FilterType = FilterType::Lanczos3;

/// Letterboxes (never enlarging, odd padding bottom/right) or stretches into the
/// target box.
pub fn resize(image: &GeneratedImage, spec: &ResizeSpec) -> GeneratedImage {
    let (target_width, target_height) = (spec.target_width(), spec.target_height());
    let pixels = if spec.preserve_aspect() {
        letterbox(&image.pixels, target_width, target_height)
    } else {
        scale(&image.pixels, target_width, target_height)
    };
    GeneratedImage::new(image.source_url.clone(), pixels)
}

pub fn fitted_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (source_width, source_height) = source;
    let (target_width, target_height) = target;
    if source_width <= target_width && source_height <= target_height {
        return source;
    }
    let scale = (f64::from(target_width) / f64::from(source_width))
        .min(f64::from(target_height) / f64::from(source_height));
    let width = (f64::from(source_width) * scale).round() as u32;
    let height = (f64::from(source_height) * scale).round() as u32;
    (width.clamp(1, target_width), height.clamp(1, target_height))
}

fn letterbox(source: &RgbaImage, target_width: u32, target_height: u32) -> RgbaImage {
    let (width, height) = fitted_size(source.dimensions(), (target_width, target_height));
    let mut canvas = RgbaImage::new(target_width, target_height);
    let x = (target_width - width) / 2;
    let y = (target_height - height) / 2;
    if (width, height) == source.dimensions() {
        imageops::overlay(&mut canvas, source, i64::from(x), i64::from(y));
    } else {
        let scaled = scale(source, width, height);
        imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
    }
    log::debug!(
        "letterboxed {}x{} -> {width}x{height} at ({x}, {y}) on {target_width}x{target_height}",
        source.width(),
        source.height()
    );
    canvas
}

// Filtering runs on premultiplied alpha so fully transparent pixels contribute
// no colour to their neighbours.
fn scale(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if source.pixels().all(|pixel| pixel[3] == u8::MAX) {
        return imageops::resize(source, width, height, FILTER);
    }
    let premultiplied = Rgba32FImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0.map(|channel| f32::from(channel) / 255.0);
        Rgba([r * a, g * a, b * a, a])
    });
    let scaled = imageops::resize(&premultiplied, width, height, FILTER);
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = scaled.get_pixel(x, y).0.map(|channel| channel.clamp(0.0, 1.0));
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([r / a, g / a, b / a, a].map(to_channel))
    })
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
