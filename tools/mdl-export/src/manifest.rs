//! Manifest parsing and batch export
//!
//! Parses mdl.toml and exports every listed model to `<output>/<name>.mdl`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::export::{ExportOptions, ExportSummary, export_scene_file, parse_layout};
use crate::formats::MDL_EXT;
use crate::scene::LoadOptions;

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    /// Keyed by output name; iterated in name order
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets/")
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModelEntry {
    Simple(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        layout: Option<String>,
        #[serde(default)]
        select: Vec<String>,
        #[serde(default)]
        triangulate: bool,
    },
}

impl ModelEntry {
    pub fn path(&self) -> &Path {
        match self {
            ModelEntry::Simple(p) => p,
            ModelEntry::Detailed { path, .. } => path,
        }
    }

    pub fn layout(&self) -> Option<&str> {
        match self {
            ModelEntry::Simple(_) => None,
            ModelEntry::Detailed { layout, .. } => layout.as_deref(),
        }
    }

    /// Export options for this entry
    pub fn options(&self) -> Result<ExportOptions> {
        let layout = match self.layout() {
            Some(name) => parse_layout(name)?,
            None => Default::default(),
        };

        Ok(match self {
            ModelEntry::Simple(_) => ExportOptions {
                layout,
                ..Default::default()
            },
            ModelEntry::Detailed {
                select,
                triangulate,
                ..
            } => ExportOptions {
                layout,
                load: LoadOptions {
                    triangulate: *triangulate,
                },
                selection: select.clone(),
            },
        })
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    parse_manifest(&content).with_context(|| format!("Failed to parse manifest: {:?}", path))
}

/// Parse manifest text
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let manifest: Manifest = toml::from_str(content)?;
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    for (name, entry) in &manifest.models {
        if !entry.path().exists() {
            anyhow::bail!("Model '{}' source not found: {:?}", name, entry.path());
        }
        entry
            .options()
            .with_context(|| format!("Model '{}' has invalid options", name))?;
    }
    Ok(())
}

/// Export all models from a manifest
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<ExportSummary> {
    let output_dir = output_override.unwrap_or(&manifest.output.dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut total = ExportSummary::default();
    for (name, entry) in &manifest.models {
        let output = output_dir.join(format!("{}.{}", name, MDL_EXT));
        tracing::info!("Exporting model: {} -> {:?}", name, output);

        let options = entry
            .options()
            .with_context(|| format!("Model '{}' has invalid options", name))?;
        let summary = export_scene_file(entry.path(), &output, &options)
            .with_context(|| format!("Failed to export model '{}'", name))?;

        total.objects += summary.objects;
        total.vertices += summary.vertices;
        total.bytes += summary.bytes;
    }

    Ok(total)
}
