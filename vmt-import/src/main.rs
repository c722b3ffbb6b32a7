//! Command line front end: converts Source materials into PNG textures and a JSON BSDF
//! description.

mod config;
mod crafty;
mod import;
mod loader;
mod models;
mod translator;

#[cfg(test)]
mod testing;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use source::prelude::*;

use config::{Config, TextureExt, DEFAULT_CONFIG};
use crafty::CraftyMtl;
use import::Importer;

#[derive(Parser)]
#[command(name = "vmt-import")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, `vmt-import.ini` in the working directory if present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that converts materials.
#[derive(Args)]
struct ImportArgs {
    /// Directory containing `materials/`, derived from each material path by default
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Extension of the texture files to load (vtf, png, jpg, tga, bmp)
    #[arg(short = 't', long)]
    texture_ext: Option<TextureExt>,

    /// Decode escape sequences in quoted strings
    #[arg(long)]
    escaped: bool,

    /// Export directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Replace materials that were already exported
    #[arg(long = "override")]
    overwrite: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert material files
    Convert {
        #[arg(required = true)]
        vmt: Vec<PathBuf>,

        /// Material name, only valid with a single input
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Decode a texture to PNG
    Decode {
        vtf: PathBuf,

        output: PathBuf,

        #[arg(short, long, default_value_t = 0)]
        frame: usize,

        #[arg(short, long, default_value_t = 0)]
        mip: usize,

        /// Decode the low resolution thumbnail instead
        #[arg(long)]
        thumbnail: bool,
    },

    /// Print the parsed key values and resolved slots of a material
    Dump {
        vmt: PathBuf,

        /// Decode escape sequences in quoted strings
        #[arg(long)]
        escaped: bool,
    },

    /// Find and convert model materials by name
    Models {
        #[arg(required = true)]
        names: Vec<String>,

        /// Keep the first match rather than preferring view models
        #[arg(long)]
        no_prefer_v_models: bool,

        /// Also convert `material_*` names
        #[arg(long)]
        include_crafty: bool,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Convert the materials listed in a Crafty `.mtl` export
    Crafty {
        mtl: PathBuf,

        /// Appended to every material name
        #[arg(short, long)]
        suffix: Option<String>,

        /// Name materials after their `.vmt` instead
        #[arg(long)]
        rename: bool,

        #[command(flatten)]
        import: ImportArgs,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(DEFAULT_CONFIG), false)?,
    };

    match cli.command {
        Commands::Convert { vmt, name, import } => {
            if name.is_some() && vmt.len() > 1 {
                bail!("--name needs a single material");
            }
            let mut importer = importer(config, &import);
            if let [single] = vmt.as_slice() {
                importer.convert(single, name.as_deref())?;
            } else {
                let names: Vec<String> = vmt.iter().map(|p| material_name(p)).collect();
                let summary = importer.convert_all(
                    vmt.iter()
                        .map(PathBuf::as_path)
                        .zip(names.iter().map(String::as_str)),
                );
                if summary.failed > 0 {
                    bail!("{} materials failed to convert", summary.failed);
                }
            }
        }
        Commands::Decode {
            vtf,
            output,
            frame,
            mip,
            thumbnail,
        } => cmd_decode(&vtf, &output, frame, mip, thumbnail)?,
        Commands::Dump { vmt, escaped } => cmd_dump(&vmt, escaped || config.import.escaped)?,
        Commands::Models {
            names,
            no_prefer_v_models,
            include_crafty,
            import,
        } => {
            let mut importer = importer(config, &import);
            let mut options = importer.config().replace.clone();
            options.prefer_v_models &= !no_prefer_v_models;
            options.skip_crafty &= !include_crafty;

            let root = importer
                .config()
                .import
                .root
                .clone()
                .context("models needs --root or a configured root")?;

            let found = models::find_materials(&root, &names, &options);
            let missing = names.iter().filter(|n| !found.contains_key(*n)).count();
            if missing > 0 {
                log::warn!("{missing} materials were not found");
            }
            importer.convert_all(found.iter().map(|(name, path)| (path.as_path(), name.as_str())));
        }
        Commands::Crafty {
            mtl,
            suffix,
            rename,
            import,
        } => {
            let mut importer = importer(config, &import);
            let mut options = importer.config().replace.clone();
            if let Some(suffix) = suffix {
                options.suffix = suffix;
            }
            options.rename |= rename;

            let root = importer
                .config()
                .import
                .root
                .clone()
                .context("crafty needs --root or a configured root")?;

            let text = fs::read_to_string(&mtl)
                .with_context(|| format!("Failed to read {}", mtl.display()))?;
            let listed = CraftyMtl::parse(&text)?;
            log::info!("{} materials listed in {}", listed.materials().len(), mtl.display());
            let jobs = listed.jobs(&root, &options);
            importer.convert_all(jobs.iter().map(|job| (job.vmt.as_path(), job.name.as_str())));
        }
    }

    Ok(())
}

fn importer(mut config: Config, args: &ImportArgs) -> Importer {
    if let Some(root) = &args.root {
        config.import.root = Some(root.clone());
    }
    if let Some(ext) = args.texture_ext {
        config.import.texture_ext = ext;
    }
    config.import.escaped |= args.escaped;
    if let Some(output) = &args.output {
        config.import.output = output.clone();
    }
    Importer::new(config, args.overwrite)
}

fn material_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn cmd_decode(vtf: &Path, output: &Path, frame: usize, mip: usize, thumbnail: bool) -> Result<()> {
    let data = fs::read(vtf).with_context(|| format!("Failed to read {}", vtf.display()))?;
    let texture = VTF::parse(&data)?;
    let (major, minor) = texture.version();
    log::info!(
        "{} {major}.{minor}: {}x{} {:?}, {} mips, {} frames, {} faces, flags {:?}",
        vtf.display(),
        texture.width(),
        texture.height(),
        texture.high_res_format(),
        texture.mip_count(),
        texture.frames(),
        texture.faces(),
        texture.flags(),
    );

    let image = if thumbnail {
        texture
            .decode_low_res()?
            .context("Texture has no thumbnail")?
    } else {
        texture.decode(frame, mip)?
    };

    image::RgbaImage::from_raw(image.width(), image.height(), image.to_rgba8())
        .context("Image buffer has the wrong size")?
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Saved {}", output.display());
    Ok(())
}

fn cmd_dump(vmt: &Path, escaped: bool) -> Result<()> {
    let data = fs::read(vmt).with_context(|| format!("Failed to read {}", vmt.display()))?;
    let material = VMT::from_bytes(&data, escaped)?;

    println!("shader: {}", material.shader());
    for kv in material.root().descendants() {
        if let Some(value) = kv.as_str() {
            match kv.condition() {
                Some(condition) => println!("  {} = {value:?} {condition}", kv.key()),
                None => println!("  {} = {value:?}", kv.key()),
            }
        }
    }

    let desc = material.material()?;
    for (slot, slot_ref) in &desc.slots {
        match desc.resolve_source(*slot) {
            Ok((file, channel)) => println!(
                "{slot}: {file} ({}) via {:?}",
                channel.name(),
                slot_ref.source
            ),
            Err(e) => println!("{slot}: {e}"),
        }
    }
    for (slot, value) in &desc.constants {
        println!("{slot}: constant {value}");
    }
    for (slot, value) in &desc.defaults {
        println!("{slot}: default {value}");
    }
    Ok(())
}
