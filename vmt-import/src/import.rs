use std::{fs, path::Path};

use anyhow::{Context, Result};
use source::prelude::*;

use crate::{
    config::Config,
    loader::TextureLoader,
    translator::{self, TranslatedMaterial},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exported,
    AlreadyExists,
}

/// Converts material files, sharing decoded textures between them.
pub struct Importer {
    config: Config,
    loader: TextureLoader,
    overwrite: bool,
}

impl Importer {
    pub fn new(config: Config, overwrite: bool) -> Self {
        Self {
            loader: TextureLoader::new(config.import.texture_ext),
            config,
            overwrite,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate `vmt` without writing anything.
    pub fn translate(&mut self, vmt: &Path, name: Option<&str>) -> Result<TranslatedMaterial> {
        log::info!("Parsing VMT file {}", vmt.display());
        let data = fs::read(vmt).with_context(|| format!("Failed to read {}", vmt.display()))?;
        let material = VMT::from_bytes(&data, self.config.import.escaped)
            .and_then(|vmt| vmt.material())
            .with_context(|| format!("Failed to parse {}", vmt.display()))?;

        let root = self.config.material_root(vmt)?;
        let name = match name {
            Some(name) => name.to_owned(),
            None => vmt
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .with_context(|| format!("{} has no file name", vmt.display()))?,
        };

        Ok(translator::translate(
            &name,
            &material,
            &root,
            &mut self.loader,
        ))
    }

    /// Translate `vmt` and export it under `name`, defaulting to the file stem.
    pub fn convert(&mut self, vmt: &Path, name: Option<&str>) -> Result<Outcome> {
        let translated = self.translate(vmt, name)?;
        if translator::export(&translated, &self.config.import.output, self.overwrite)? {
            log::info!("Exported {}", translated.name);
            Ok(Outcome::Exported)
        } else {
            log::info!("{} already exists", translated.name);
            Ok(Outcome::AlreadyExists)
        }
    }

    /// Convert every `(path, name)` pair, reporting failures without stopping.
    pub fn convert_all<'a>(
        &mut self,
        jobs: impl IntoIterator<Item = (&'a Path, &'a str)>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (vmt, name) in jobs {
            match self.convert(vmt, Some(name)) {
                Ok(Outcome::Exported) => summary.exported += 1,
                Ok(Outcome::AlreadyExists) => summary.skipped += 1,
                Err(e) => {
                    log::error!("{name}: {e:#}");
                    summary.failed += 1;
                }
            }
        }
        log::info!(
            "Exported {}, skipped {}, failed {}",
            summary.exported,
            summary.skipped,
            summary.failed
        );
        log::debug!("{} textures decoded", self.loader.cache().len());
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,
}
