use std::{
    collections::BTreeMap,
    ffi::OsStr,
    path::{Component, Path, PathBuf},
};

use ahash::AHashMap;
use walkdir::WalkDir;

use crate::config::ReplaceConfig;

/// Directories that hold UI and customisation variants, never model skins.
const SKIPPED_DIRS: [&str; 2] = ["customization", "gui"];

/// Locate the material file for each required model material name.
///
/// Names are matched case-insensitively against `.vmt` stems below `root/materials/models`.
/// The result is keyed by the name as it was requested.
pub fn find_materials(
    root: &Path,
    names: &[String],
    options: &ReplaceConfig,
) -> BTreeMap<String, PathBuf> {
    let required: AHashMap<String, &String> = names
        .iter()
        .filter(|name| !(options.skip_crafty && name.starts_with("material_")))
        .map(|name| (name.to_lowercase(), name))
        .collect();

    let models = root.join("materials").join("models");
    log::info!("{} materials to replace", required.len());
    log::info!("Looking for materials in {}", models.display());

    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

    let walker = WalkDir::new(&models)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // Only directory names are matched.
            !(entry.file_type().is_dir() && is_skipped(&models, entry.path()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_vmt(path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let Some(&name) = required.get(&stem.to_lowercase()) else {
            continue;
        };

        log::info!("Found material {}", path.display());
        match found.get_mut(name) {
            Some(existing) => {
                if options.prefer_v_models
                    && has_component(path, "v_models")
                    && has_component(existing, "w_models")
                {
                    *existing = path.to_owned();
                } else {
                    log::info!("Ignoring multiple possible materials found for {name}");
                }
            }
            None => {
                found.insert(name.clone(), path.to_owned());
            }
        }
    }

    found
}

fn is_skipped(models: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(models).unwrap_or(path);
    let relative = relative.to_string_lossy();
    SKIPPED_DIRS.iter().any(|dir| relative.contains(dir))
}

fn is_vmt(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vmt"))
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == name))
}
