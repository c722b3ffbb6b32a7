use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use ahash::AHashMap;
use source::prelude::*;
use thiserror::Error;

use crate::config::TextureExt;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to decode {}: {source}", path.display())]
    Vtf { path: PathBuf, source: VTFError },
    #[error("failed to decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Decoded textures by file path.
#[derive(Debug, Default)]
pub struct TextureCache {
    images: AHashMap<PathBuf, Arc<DecodedImage>>,
}

impl TextureCache {
    pub fn get(&self, path: &Path) -> Option<&Arc<DecodedImage>> {
        self.images.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, image: DecodedImage) -> Arc<DecodedImage> {
        let image = Arc::new(image);
        self.images.insert(path, image.clone());
        image
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// Loads the textures a material references, decoding each file once.
#[derive(Debug)]
pub struct TextureLoader {
    ext: TextureExt,
    cache: TextureCache,
}

impl TextureLoader {
    pub fn new(ext: TextureExt) -> Self {
        Self {
            ext,
            cache: TextureCache::default(),
        }
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    /// `root/materials/<file>.<ext>`. The extension is appended, never substituted.
    pub fn texture_path(&self, root: &Path, file: &str) -> PathBuf {
        root.join("materials")
            .join(format!("{file}.{}", self.ext))
    }

    pub fn load(&mut self, root: &Path, file: &str) -> Result<Arc<DecodedImage>, LoadError> {
        let path = self.texture_path(root, file);
        if let Some(image) = self.cache.get(&path) {
            return Ok(image.clone());
        }

        log::info!("Loading texture {}", path.display());
        let image = match self.ext {
            TextureExt::Vtf => load_vtf(&path)?,
            _ => load_image(&path)?,
        };
        Ok(self.cache.insert(path, image))
    }
}

pub fn load_vtf(path: &Path) -> Result<DecodedImage, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    source::vtf::decode(&bytes, 0, 0).map_err(|source| LoadError::Vtf {
        path: path.to_owned(),
        source,
    })
}

fn load_image(path: &Path) -> Result<DecodedImage, LoadError> {
    let image = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(source) => LoadError::Io {
            path: path.to_owned(),
            source,
        },
        source => LoadError::Image {
            path: path.to_owned(),
            source,
        },
    })?;

    let has_alpha = image.color().has_alpha();
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage::new(
        width,
        height,
        has_alpha,
        Pixels::Rgba8(rgba.into_raw()),
    ))
}
