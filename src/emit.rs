use crate::config::{MINIFIED_OUTPUT, PRETTY_OUTPUT};
use crate::models::MapArea;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct EmitPaths {
    pub minified: PathBuf,
    pub pretty: PathBuf,
}

/// Writes `areas` as a JSON array twice: compact to `data.min.js`, indented to `data.js`.
pub fn emit(areas: &[MapArea], output_dir: &Path) -> Result<EmitPaths> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let minified = output_dir.join(MINIFIED_OUTPUT);
    let pretty = output_dir.join(PRETTY_OUTPUT);

    write_atomic(&minified, |w| serde_json::to_writer(w, areas))?;
    write_atomic(&pretty, |w| serde_json::to_writer_pretty(w, areas))?;

    info!(
        areas = areas.len(),
        minified = ?minified,
        pretty = ?pretty,
        "Map data written"
    );
    Ok(EmitPaths { minified, pretty })
}

fn write_atomic<F>(path: &Path, serialize: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> serde_json::Result<()>,
{
    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp output file: {:?}", tmp_path))?;
    let mut writer = BufWriter::new(file);

    serialize(&mut writer).with_context(|| format!("Failed to serialize map data: {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {:?}", tmp_path))?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename temp output file to: {:?}", path))?;
    Ok(())
}
