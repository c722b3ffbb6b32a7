//! Maps a resolved material onto principled BSDF inputs and writes it out.

use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use serde::{Serialize, Serializer};
use source::prelude::*;

use crate::loader::TextureLoader;

/// BSDF inputs in the order they are filled, with their socket names.
pub const INPUTS: [(Slot, &str); 7] = [
    (Slot::Base, "Base Color"),
    (Slot::Specular, "Specular"),
    (Slot::SpecularTint, "Specular Tint"),
    (Slot::Roughness, "Roughness"),
    (Slot::Emission, "Emission"),
    (Slot::Alpha, "Alpha"),
    (Slot::Normal, "Normal"),
];

const BASELINE_SPECULAR: f32 = 0.1;
const BASELINE_ROUGHNESS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Srgb,
    NonColor,
}

/// Operation between the texture sample and the BSDF socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjust {
    None,
    /// Tangent space normal map.
    NormalMap,
    /// `(1 - x) * 0.5`, Source exponents run the other way.
    InvertHalf,
}

impl Adjust {
    fn for_slot(slot: Slot) -> Self {
        match slot {
            Slot::Normal => Adjust::NormalMap,
            Slot::Roughness => Adjust::InvertHalf,
            _ => Adjust::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Input {
    Value(f32),
    Texture {
        /// Exported file name, relative to the output directory.
        image: String,
        #[serde(serialize_with = "channel_name")]
        channel: Channel,
        color_space: ColorSpace,
        adjust: Adjust,
    },
}

fn channel_name<S: Serializer>(channel: &Channel, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(channel.name())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BsdfInput {
    #[serde(serialize_with = "slot_name")]
    pub slot: Slot,
    pub socket: &'static str,
    pub input: Input,
}

fn slot_name<S: Serializer>(slot: &Slot, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(slot.name())
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslatedMaterial {
    pub name: String,
    pub shader: String,
    pub inputs: Vec<BsdfInput>,
    /// Images referenced by texture inputs, each once.
    #[serde(skip)]
    pub images: Vec<(String, Arc<DecodedImage>)>,
}

impl TranslatedMaterial {
    pub fn input(&self, slot: Slot) -> Option<&Input> {
        self.inputs
            .iter()
            .find(|i| i.slot == slot)
            .map(|i| &i.input)
    }
}

/// Build the BSDF description of `material`, loading its textures below `root`.
///
/// Textures that fail to load or resolve are logged and skipped.
pub fn translate(
    name: &str,
    material: &MaterialDescription,
    root: &Path,
    loader: &mut TextureLoader,
) -> TranslatedMaterial {
    let mut translated = TranslatedMaterial {
        name: name.to_owned(),
        shader: material.shader_name.clone(),
        inputs: Vec::new(),
        images: Vec::new(),
    };

    for (slot, socket) in INPUTS {
        let input = if let Some(&value) = material.constants.get(&slot) {
            log::debug!("{name}: overriding {slot} with constant value {value}");
            Some(Input::Value(value))
        } else {
            texture_input(&mut translated, slot, material, root, loader)
                .or_else(|| material.defaults.get(&slot).map(|&v| Input::Value(v)))
                .or(match slot {
                    Slot::Specular => Some(Input::Value(BASELINE_SPECULAR)),
                    Slot::Roughness => Some(Input::Value(BASELINE_ROUGHNESS)),
                    _ => None,
                })
        };

        if let Some(input) = input {
            translated.inputs.push(BsdfInput {
                slot,
                socket,
                input,
            });
        }
    }

    if translated.input(Slot::Base).is_none() {
        log::warn!("{name}: no base color");
    }
    translated
}

fn texture_input(
    translated: &mut TranslatedMaterial,
    slot: Slot,
    material: &MaterialDescription,
    root: &Path,
    loader: &mut TextureLoader,
) -> Option<Input> {
    let slot_ref = material.slots.get(&slot)?;

    let (file, channel) = match material.resolve_source(slot) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!("{}: skipping {slot}: {e}", translated.name);
            return None;
        }
    };

    let image = match loader.load(root, file) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("{}: skipping {slot}: {e}", translated.name);
            return None;
        }
    };

    let image_name = format!("{file}.png");
    if !translated.images.iter().any(|(n, _)| *n == image_name) {
        translated.images.push((image_name.clone(), image));
    }

    // The base image node is the only colour data, slots sampling it share it.
    let node = match slot_ref.source {
        TextureSource::Alias(target) => target,
        TextureSource::File(_) => slot,
    };
    let color_space = if node == Slot::Base {
        ColorSpace::Srgb
    } else {
        ColorSpace::NonColor
    };

    Some(Input::Texture {
        image: image_name,
        channel,
        color_space,
        adjust: Adjust::for_slot(slot),
    })
}

/// Path of the material description `export` writes.
pub fn material_path(output: &Path, name: &str) -> Result<PathBuf> {
    output_path(output, &format!("{name}.json"))
}

/// `output/relative`, refusing names that would land outside `output`.
fn output_path(output: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        bail!(
            "{} would be written outside {}",
            relative.display(),
            output.display()
        );
    }
    Ok(output.join(relative))
}

/// Write the material description and its images below `output`.
///
/// Returns `false` without writing when the material exists and `overwrite` is not set.
pub fn export(material: &TranslatedMaterial, output: &Path, overwrite: bool) -> Result<bool> {
    let json_path = material_path(output, &material.name)?;
    if json_path.exists() && !overwrite {
        return Ok(false);
    }

    for (name, image) in &material.images {
        let path = output_path(output, name)?;
        if path.exists() && !overwrite {
            log::debug!("{} already exported", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let buffer = image::RgbaImage::from_raw(image.width(), image.height(), image.to_rgba8())
            .context("Image buffer has the wrong size")?;
        buffer
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if let Some(parent) = json_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(material)?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    Ok(true)
}
