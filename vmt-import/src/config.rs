use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use ini::{Ini, Properties};
use thiserror::Error;

pub const DEFAULT_CONFIG: &str = "vmt-import.ini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Ini(#[from] ini::Error),
    #[error("[{section}] {key} expects true or false, got {value:?}")]
    Bool {
        section: &'static str,
        key: &'static str,
        value: String,
    },
    #[error("unknown texture extension {0:?}")]
    Extension(String),
    #[error("{} is not inside a materials directory", .0.display())]
    NoMaterialRoot(PathBuf),
}

/// Which files texture references are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureExt {
    #[default]
    Vtf,
    Png,
    Jpeg,
    Tga,
    Bmp,
}

impl TextureExt {
    pub fn extension(self) -> &'static str {
        match self {
            TextureExt::Vtf => "vtf",
            TextureExt::Png => "png",
            TextureExt::Jpeg => "jpg",
            TextureExt::Tga => "tga",
            TextureExt::Bmp => "bmp",
        }
    }
}

impl FromStr for TextureExt {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = s.trim().trim_start_matches('.');
        Ok(match ext.to_ascii_lowercase().as_str() {
            "vtf" => TextureExt::Vtf,
            "png" => TextureExt::Png,
            "jpg" | "jpeg" => TextureExt::Jpeg,
            "tga" => TextureExt::Tga,
            "bmp" => TextureExt::Bmp,
            _ => return Err(ConfigError::Extension(s.to_owned())),
        })
    }
}

impl fmt::Display for TextureExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Directory holding `materials/`. Derived from each material path when unset.
    pub root: Option<PathBuf>,
    pub texture_ext: TextureExt,
    pub escaped: bool,
    pub output: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            root: None,
            texture_ext: TextureExt::Vtf,
            escaped: false,
            output: PathBuf::from("out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceConfig {
    pub prefer_v_models: bool,
    pub skip_crafty: bool,
    pub suffix: String,
    pub rename: bool,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            prefer_v_models: true,
            skip_crafty: true,
            suffix: String::new(),
            rename: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub import: ImportConfig,
    pub replace: ReplaceConfig,
}

impl Config {
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(import) = ini.section(Some("import")) {
            if let Some(root) = import.get("root") {
                config.import.root = Some(PathBuf::from(root));
            }
            if let Some(ext) = import.get("texture_ext") {
                config.import.texture_ext = ext.parse()?;
            }
            if let Some(escaped) = boolean(import, "import", "escaped")? {
                config.import.escaped = escaped;
            }
            if let Some(output) = import.get("output") {
                config.import.output = PathBuf::from(output);
            }
        }

        if let Some(replace) = ini.section(Some("replace")) {
            if let Some(prefer) = boolean(replace, "replace", "prefer_v_models")? {
                config.replace.prefer_v_models = prefer;
            }
            if let Some(skip) = boolean(replace, "replace", "skip_crafty")? {
                config.replace.skip_crafty = skip;
            }
            if let Some(suffix) = replace.get("suffix") {
                config.replace.suffix = suffix.to_owned();
            }
            if let Some(rename) = boolean(replace, "replace", "rename")? {
                config.replace.rename = rename;
            }
        }

        Ok(config)
    }

    /// Load `path`, falling back to defaults when an optional file is missing.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !required && !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let ini = Ini::load_from_file(path)?;
        log::info!("Loaded config from {}", path.display());
        Self::from_ini(&ini)
    }

    /// The configured root, or the one `material` lives under.
    pub fn material_root(&self, material: &Path) -> Result<PathBuf, ConfigError> {
        match &self.import.root {
            Some(root) => Ok(root.clone()),
            None => find_material_root(material)
                .ok_or_else(|| ConfigError::NoMaterialRoot(material.to_owned())),
        }
    }
}

/// Parent of the nearest ancestor directory named `materials`.
pub fn find_material_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|p| p.file_name().is_some_and(|name| name == "materials"))
        .and_then(Path::parent)
        .map(Path::to_path_buf)
}

fn boolean(
    props: &Properties,
    section: &'static str,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(value) = props.get(key) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Bool {
            section,
            key,
            value: value.to_owned(),
        }),
    }
}
