//! mdl-export - MDL model export tool
//!
//! Converts scene meshes (glTF, GLB, OBJ) to big-endian .mdl geometry records.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mdl_export::{ExportOptions, LoadOptions, MDL_EXT, export, manifest, read_records};

#[derive(Parser)]
#[command(name = "mdl-export")]
#[command(about = "MDL model export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export scene objects to an .mdl file
    Export {
        /// Input scene file (glTF/GLB/OBJ)
        input: PathBuf,

        /// Output .mdl file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record layout: world (baked positions) or indexed (transform + indices)
        #[arg(short, long, default_value = "world")]
        layout: String,

        /// Object to export, repeatable; records follow this order (default: all)
        #[arg(short, long = "select")]
        select: Vec<String>,

        /// Fan-triangulate polygons before export (OBJ)
        #[arg(long)]
        triangulate: bool,
    },

    /// List exportable objects in scene order
    List {
        /// Input scene file (glTF/GLB/OBJ)
        input: PathBuf,
    },

    /// Decode an .mdl file and print its records
    Inspect {
        /// Input .mdl file
        input: PathBuf,

        /// Record layout the file was written with
        #[arg(short, long, default_value = "world")]
        layout: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build models from a manifest file
    Build {
        /// Path to mdl.toml manifest
        #[arg(default_value = "mdl.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to mdl.toml manifest
        #[arg(default_value = "mdl.toml")]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging; stdout carries command output only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            layout,
            select,
            triangulate,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(MDL_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let options = ExportOptions {
                layout: export::parse_layout(&layout)?,
                load: LoadOptions { triangulate },
                selection: select,
            };
            export::export_scene_file(&input, &output, &options)?;
            tracing::info!("Done!");
        }

        Commands::List { input } => {
            let names = export::list_scene_objects(&input, &LoadOptions::default())?;
            tracing::info!("{} objects in {:?}", names.len(), input);
            for name in names {
                println!("{}", name);
            }
        }

        Commands::Inspect {
            input,
            layout,
            json,
        } => {
            let layout = export::parse_layout(&layout)?;
            let bytes =
                std::fs::read(&input).with_context(|| format!("Failed to read {:?}", input))?;
            let records = read_records(&bytes, layout)
                .with_context(|| format!("Failed to decode {:?}", input))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for (i, record) in records.iter().enumerate() {
                    println!(
                        "record {}: {} vertices, {} triangles{}",
                        i,
                        record.vertex_count(),
                        record.triangle_count(),
                        if record.transform.is_some() {
                            ", transform"
                        } else {
                            ""
                        }
                    );
                }
                println!("{} records, {} bytes", records.len(), bytes.len());
            }
        }

        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building models from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let summary = manifest::build_all(&config, output.as_deref())?;
            tracing::info!(
                "Build complete! {} objects, {} bytes",
                summary.objects,
                summary.bytes
            );
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }
    }

    Ok(())
}
