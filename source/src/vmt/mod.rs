// Valve Material Type

mod material;

use thiserror::Error;

use crate::kv::{self, KVError, KeyValue};

pub use self::material::{Channel, MaterialDescription, Slot, TextureSlotRef, TextureSource};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VMTError {
    #[error(transparent)]
    Syntax(#[from] KVError),
    #[error("material has no shader block")]
    NotAMaterial,
    #[error("{param} expects a number, got {value:?}")]
    ValueParse { param: String, value: String },
    #[error("{param} has no texture path")]
    MissingFileReference { param: String },
    #[error("slot {slot} cannot be resolved through {target}: {}", alias_problem(.cyclic))]
    UnresolvedAlias {
        slot: Slot,
        target: Slot,
        cyclic: bool,
    },
}

fn alias_problem(cyclic: &bool) -> &'static str {
    if *cyclic {
        "aliases form a cycle"
    } else {
        "target slot is not set"
    }
}

/// A parsed material file.
#[derive(Debug, Clone)]
pub struct VMT {
    shader: String,
    root: KeyValue,
}

impl VMT {
    pub fn from_bytes(data: &[u8], escaped: bool) -> Result<Self, VMTError> {
        let root = kv::parse(data, escaped)?;
        let shader = shader_block(&root)?.key().to_lowercase();
        Ok(Self { shader, root })
    }

    pub fn from_string(data: &str) -> Result<Self, VMTError> {
        Self::from_bytes(data.as_bytes(), false)
    }

    /// Lowercased shader name, e.g. `vertexlitgeneric`.
    pub fn shader(&self) -> &str {
        &self.shader
    }

    /// Shader parameters in document order.
    pub fn params(&self) -> &[KeyValue] {
        self.root
            .children()
            .first()
            .map(KeyValue::children)
            .unwrap_or_default()
    }

    /// Last scalar value of a parameter.
    pub fn get(&self, param: &str) -> Option<&str> {
        self.params()
            .iter()
            .rev()
            .find(|kv| kv.is_key(param))
            .and_then(KeyValue::as_str)
    }

    pub fn root(&self) -> &KeyValue {
        &self.root
    }

    pub fn material(&self) -> Result<MaterialDescription, VMTError> {
        resolve(&self.root)
    }
}

fn shader_block(root: &KeyValue) -> Result<&KeyValue, VMTError> {
    match root.children().first() {
        Some(shader) if shader.as_str().is_none() => Ok(shader),
        _ => Err(VMTError::NotAMaterial),
    }
}

/// Interpret the shader parameters of a parsed material.
///
/// Parameters are applied in document order and a later one replaces the texture an earlier
/// one set for the same slot. Unknown parameters are skipped.
pub fn resolve(root: &KeyValue) -> Result<MaterialDescription, VMTError> {
    let shader = shader_block(root)?;
    let mut desc = MaterialDescription::new(shader.key().to_lowercase());

    for param in shader.children() {
        let name = param.key().to_lowercase();
        let Some(value) = param.as_str() else {
            log::trace!("Skipping block parameter {name}");
            continue;
        };

        match name.as_str() {
            "$basetexture" => {
                let path = texture_path(&name, value)?;
                desc.slots
                    .insert(Slot::Base, TextureSlotRef::file(path, Channel::Rgb));
            }
            "$translucent" | "$alphatest" => {
                if flag(&name, value)? {
                    desc.slots
                        .insert(Slot::Alpha, TextureSlotRef::alias(Slot::Base, Channel::Alpha));
                }
            }
            "$basemapalphaphongmask" | "$basemapalphaenvmapmask" => {
                if flag(&name, value)? {
                    desc.slots.insert(
                        Slot::Specular,
                        TextureSlotRef::alias(Slot::Base, Channel::Alpha),
                    );
                }
            }
            "$bumpmap" => {
                let path = texture_path(&name, value)?;
                desc.slots
                    .insert(Slot::Normal, TextureSlotRef::file(path, Channel::Rgb));
                desc.slots
                    .entry(Slot::Specular)
                    .or_insert_with(|| TextureSlotRef::alias(Slot::Normal, Channel::Alpha));
            }
            "$phong" => {
                if flag(&name, value)? {
                    // Rough guess at how phong looks in Source
                    desc.defaults.insert(Slot::Roughness, 0.3);
                    desc.defaults.insert(Slot::Specular, 0.5);
                }
            }
            "$phongexponent" => {
                // Source exponent 0..255 maps roughly onto roughness 0.5..0
                let exponent = integer(&name, value)?;
                desc.constants
                    .insert(Slot::Roughness, (255 - i64::from(exponent)) as f32 / 510.0);
            }
            "$phongexponenttexture" => {
                let path = texture_path(&name, value)?;
                desc.slots
                    .insert(Slot::Roughness, TextureSlotRef::file(path, Channel::R));
            }
            "$phongalbedotint" => {
                if flag(&name, value)? {
                    desc.slots.insert(
                        Slot::SpecularTint,
                        TextureSlotRef::alias(Slot::Roughness, Channel::G),
                    );
                }
            }
            "$envmap" => {
                desc.defaults.insert(Slot::Roughness, 0.1);
                desc.defaults.insert(Slot::Specular, 0.7);
            }
            "$envmapmask" => {
                let path = texture_path(&name, value)?;
                desc.slots
                    .insert(Slot::Specular, TextureSlotRef::file(path, Channel::Rgb));
            }
            "$selfillum" => {
                if flag(&name, value)? {
                    desc.slots
                        .entry(Slot::Emission)
                        .or_insert_with(|| TextureSlotRef::alias(Slot::Base, Channel::Alpha));
                }
            }
            "$selfillummask" => {
                let path = texture_path(&name, value)?;
                desc.slots
                    .insert(Slot::Emission, TextureSlotRef::file(path, Channel::Rgb));
            }
            _ => log::trace!("Ignoring parameter {name}"),
        }
    }

    desc.normalize();
    Ok(desc)
}

fn integer(param: &str, value: &str) -> Result<i32, VMTError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| VMTError::ValueParse {
            param: param.to_owned(),
            value: value.to_owned(),
        })
}

fn flag(param: &str, value: &str) -> Result<bool, VMTError> {
    Ok(integer(param, value)? == 1)
}

fn texture_path(param: &str, value: &str) -> Result<String, VMTError> {
    let path = value.trim().replace('\\', "/");
    let mut path = path.as_str();

    let ext_start = path.len().saturating_sub(4);
    if path
        .get(ext_start..)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(".vtf"))
    {
        path = &path[..ext_start];
    }

    // Only plain names are kept so the texture stays below `materials/`.
    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| !matches!(*part, "" | "." | "..") && !part.contains(':'))
        .collect();

    if parts.is_empty() {
        return Err(VMTError::MissingFileReference {
            param: param.to_owned(),
        });
    }
    Ok(parts.join("/"))
}
