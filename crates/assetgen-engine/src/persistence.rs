use std::fs;
use std::path::Path;

use assetgen_contracts::{AssetGenError, OutputArtifact, Result};
use image::ImageFormat;

use crate::generation::GeneratedImage;

pub fn save(
    images: &[GeneratedImage],
    base_name: &str,
    output_dir: &Path,
) -> Result<Vec<OutputArtifact>> {
    fs::create_dir_all(output_dir).map_err(|source| AssetGenError::DirectoryCreationFailure {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut artifacts = Vec::with_capacity(images.len());
    for (offset, image) in images.iter().enumerate() {
        let source_index = offset + 1;
        let path = output_dir.join(artifact_file_name(base_name, source_index));
        image
            .pixels
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|err| AssetGenError::WriteFailure {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        log::debug!("wrote {}", path.display());
        artifacts.push(OutputArtifact { path, source_index });
    }
    Ok(artifacts)
}

pub fn artifact_file_name(base_name: &str, index: usize) -> String {
    format!("{base_name}_{index}.png")
}
