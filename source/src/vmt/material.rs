use std::{collections::BTreeMap, fmt, str::FromStr};

use super::VMTError;

/// A normalised material input, independent of the Source shader parameter it came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Base,
    Alpha,
    Specular,
    SpecularTint,
    Roughness,
    Normal,
    Emission,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::Base,
        Slot::Alpha,
        Slot::Specular,
        Slot::SpecularTint,
        Slot::Roughness,
        Slot::Normal,
        Slot::Emission,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Base => "base",
            Slot::Alpha => "alpha",
            Slot::Specular => "specular",
            Slot::SpecularTint => "specular_tint",
            Slot::Roughness => "roughness",
            Slot::Normal => "normal",
            Slot::Emission => "emission",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Slot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Which channels of a decoded texture feed a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Rgb,
    Alpha,
    R,
    G,
    B,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::Rgb => "rgb",
            Channel::Alpha => "a",
            Channel::R => "r",
            Channel::G => "g",
            Channel::B => "b",
        }
    }

    /// Index into an RGBA texel, `None` for the colour triple.
    pub fn index(self) -> Option<usize> {
        match self {
            Channel::Rgb => None,
            Channel::R => Some(0),
            Channel::G => Some(1),
            Channel::B => Some(2),
            Channel::Alpha => Some(3),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureSource {
    /// Extension-less, `/` separated path below the `materials` directory.
    File(String),
    /// Reuse the image of another slot.
    Alias(Slot),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlotRef {
    pub source: TextureSource,
    pub channel: Channel,
}

impl TextureSlotRef {
    pub fn file(path: impl Into<String>, channel: Channel) -> Self {
        Self {
            source: TextureSource::File(path.into()),
            channel,
        }
    }

    pub fn alias(slot: Slot, channel: Channel) -> Self {
        Self {
            source: TextureSource::Alias(slot),
            channel,
        }
    }
}

/// What a material needs, with the shader's parameter names already interpreted.
///
/// A slot is in at most one of `slots`, `constants` and `defaults`: constants beat
/// textures, which beat defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialDescription {
    pub shader_name: String,
    pub slots: BTreeMap<Slot, TextureSlotRef>,
    pub constants: BTreeMap<Slot, f32>,
    pub defaults: BTreeMap<Slot, f32>,
}

impl MaterialDescription {
    pub fn new(shader_name: impl Into<String>) -> Self {
        Self {
            shader_name: shader_name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.constants.is_empty() && self.defaults.is_empty()
    }

    /// Follow aliases from `slot` to the file that backs it.
    ///
    /// Returns the file path together with the channel `slot` itself asks for.
    pub fn resolve_source(&self, slot: Slot) -> Result<(&str, Channel), VMTError> {
        let start = self.slots.get(&slot).ok_or(VMTError::UnresolvedAlias {
            slot,
            target: slot,
            cyclic: false,
        })?;

        let mut visited = vec![slot];
        let mut current = start;
        loop {
            match &current.source {
                TextureSource::File(path) => return Ok((path, start.channel)),
                TextureSource::Alias(target) => {
                    if visited.contains(target) {
                        return Err(VMTError::UnresolvedAlias {
                            slot,
                            target: *target,
                            cyclic: true,
                        });
                    }
                    visited.push(*target);
                    current = self.slots.get(target).ok_or(VMTError::UnresolvedAlias {
                        slot,
                        target: *target,
                        cyclic: false,
                    })?;
                }
            }
        }
    }

    /// Apply the constants > slots > defaults precedence.
    pub(super) fn normalize(&mut self) {
        let inlined: Vec<(Slot, String)> = self
            .slots
            .iter()
            .filter_map(|(slot, slot_ref)| match &slot_ref.source {
                TextureSource::Alias(target) if self.constants.contains_key(target) => self
                    .resolve_source(*slot)
                    .ok()
                    .map(|(path, _)| (*slot, path.to_owned())),
                _ => None,
            })
            .collect();

        for (slot, path) in inlined {
            if let Some(slot_ref) = self.slots.get_mut(&slot) {
                slot_ref.source = TextureSource::File(path);
            }
        }

        let constants = &self.constants;
        self.slots.retain(|slot, _| !constants.contains_key(slot));
        let slots = &self.slots;
        self.defaults
            .retain(|slot, _| !constants.contains_key(slot) && !slots.contains_key(slot));
    }
}

#[cfg(test)]
mod material_tests {
    use super::*;

    #[test]
    fn test_slot_names() {
        for slot in Slot::ALL {
            assert_eq!(slot.name().parse::<Slot>(), Ok(slot));
        }
        assert_eq!("SPECULAR_TINT".parse::<Slot>(), Ok(Slot::SpecularTint));
        assert!("diffuse".parse::<Slot>().is_err());
    }

    #[test]
    fn test_resolve_chain() {
        let mut desc = MaterialDescription::new("test");
        desc.slots
            .insert(Slot::Base, TextureSlotRef::file("a/b", Channel::Rgb));
        desc.slots
            .insert(Slot::Alpha, TextureSlotRef::alias(Slot::Base, Channel::Alpha));
        desc.slots
            .insert(Slot::Emission, TextureSlotRef::alias(Slot::Alpha, Channel::R));

        assert_eq!(desc.resolve_source(Slot::Base).unwrap(), ("a/b", Channel::Rgb));
        assert_eq!(
            desc.resolve_source(Slot::Alpha).unwrap(),
            ("a/b", Channel::Alpha)
        );
        assert_eq!(desc.resolve_source(Slot::Emission).unwrap(), ("a/b", Channel::R));
    }

    #[test]
    fn test_alias_cycle() {
        let mut desc = MaterialDescription::new("test");
        desc.slots.insert(
            Slot::Specular,
            TextureSlotRef::alias(Slot::Roughness, Channel::R),
        );
        desc.slots.insert(
            Slot::Roughness,
            TextureSlotRef::alias(Slot::Specular, Channel::G),
        );

        assert!(matches!(
            desc.resolve_source(Slot::Specular),
            Err(VMTError::UnresolvedAlias { cyclic: true, .. })
        ));
        assert!(matches!(
            desc.resolve_source(Slot::Roughness),
            Err(VMTError::UnresolvedAlias { cyclic: true, .. })
        ));
    }

    #[test]
    fn test_self_alias() {
        let mut desc = MaterialDescription::new("test");
        desc.slots
            .insert(Slot::Normal, TextureSlotRef::alias(Slot::Normal, Channel::Rgb));
        assert!(matches!(
            desc.resolve_source(Slot::Normal),
            Err(VMTError::UnresolvedAlias {
                slot: Slot::Normal,
                target: Slot::Normal,
                cyclic: true
            })
        ));
    }

    #[test]
    fn test_dangling_alias() {
        let mut desc = MaterialDescription::new("test");
        desc.slots
            .insert(Slot::Alpha, TextureSlotRef::alias(Slot::Base, Channel::Alpha));
        assert!(matches!(
            desc.resolve_source(Slot::Alpha),
            Err(VMTError::UnresolvedAlias {
                slot: Slot::Alpha,
                target: Slot::Base,
                cyclic: false
            })
        ));
        assert!(desc.resolve_source(Slot::Normal).is_err());
    }

    #[test]
    fn test_normalize_precedence() {
        let mut desc = MaterialDescription::new("test");
        desc.slots
            .insert(Slot::Roughness, TextureSlotRef::file("rough", Channel::R));
        desc.slots.insert(
            Slot::SpecularTint,
            TextureSlotRef::alias(Slot::Roughness, Channel::G),
        );
        desc.slots
            .insert(Slot::Specular, TextureSlotRef::file("spec", Channel::Rgb));
        desc.constants.insert(Slot::Roughness, 0.25);
        desc.defaults.insert(Slot::Roughness, 0.3);
        desc.defaults.insert(Slot::Specular, 0.5);
        desc.defaults.insert(Slot::Emission, 1.0);

        desc.normalize();

        assert!(!desc.slots.contains_key(&Slot::Roughness));
        assert_eq!(
            desc.slots[&Slot::SpecularTint],
            TextureSlotRef::file("rough", Channel::G)
        );
        assert_eq!(desc.constants[&Slot::Roughness], 0.25);
        assert_eq!(desc.defaults.len(), 1);
        assert_eq!(desc.defaults[&Slot::Emission], 1.0);

        for slot in Slot::ALL {
            let count = [
                desc.slots.contains_key(&slot),
                desc.constants.contains_key(&slot),
                desc.defaults.contains_key(&slot),
            ]
            .into_iter()
            .filter(|b| *b)
            .count();
            assert!(count <= 1, "{slot} appears {count} times");
        }
    }
}
