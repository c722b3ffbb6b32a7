use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::ReplaceConfig;

/// Material names of an exported `.mtl` mapped to the Source material each came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CraftyMtl {
    materials: Vec<(String, String)>,
}

/// One material to convert: the `.vmt` and the name to give the result.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftyJob {
    pub vmt: PathBuf,
    pub name: String,
}

impl CraftyMtl {
    /// Records are separated by blank lines, each starting `# <path>` then `newmtl <name>`.
    pub fn parse(text: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(r"(?i)^# (?P<path>.+)\nnewmtl (?P<mat>.+)")?;

        let text = text.replace("\r\n", "\n");
        let mut mtl = CraftyMtl::default();
        for record in text.split("\n\n") {
            let Some(caps) = re.captures(record) else {
                continue;
            };
            let name = caps["mat"].trim().to_owned();
            let path = caps["path"].trim().to_lowercase();
            match mtl.materials.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = path,
                None => mtl.materials.push((name, path)),
            }
        }
        Ok(mtl)
    }

    pub fn materials(&self) -> &[(String, String)] {
        &self.materials
    }

    /// Materials whose `.vmt` exists below `root`, named per `options`.
    pub fn jobs(&self, root: &Path, options: &ReplaceConfig) -> Vec<CraftyJob> {
        let mut jobs = Vec::new();
        for (name, path) in &self.materials {
            let vmt = root.join("materials").join(format!("{path}.vmt"));
            if !vmt.exists() {
                log::warn!("Did not find mtl file: {}", vmt.display());
                continue;
            }

            let name = if options.rename {
                Path::new(path)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{name}{}", options.suffix))
            } else {
                format!("{name}{}", options.suffix)
            };
            jobs.push(CraftyJob { vmt, name });
        }
        jobs
    }
}
