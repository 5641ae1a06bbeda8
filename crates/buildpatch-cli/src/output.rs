//! Text and JSON rendering for the `bpm` commands

use anyhow::Result;
use buildpatch_manifest::{ChunkInfo, FileManifest, Manifest, ManifestMeta, ManifestStats};
use comfy_table::{ContentArrangement, Table, presets};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct InfoReport<'a> {
    meta: &'a ManifestMeta,
    stats: ManifestStats,
    install_tags: Vec<&'a str>,
}

#[derive(Serialize)]
struct ChunkRow<'a> {
    #[serde(flatten)]
    chunk: &'a ChunkInfo,
    path: String,
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140)
        .set_header(header.to_vec());
    table
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

/// Build metadata and totals
pub fn write_info<W: Write>(out: &mut W, manifest: &Manifest, json: bool) -> Result<()> {
    let meta = &manifest.meta;
    let stats = manifest.stats();

    if json {
        let report = InfoReport {
            meta,
            stats,
            install_tags: manifest.install_tags().into_iter().collect(),
        };
        return write_json(out, &report);
    }

    writeln!(out, "App name:       {}", or_dash(&meta.app_name))?;
    writeln!(out, "App id:         {}", meta.app_id)?;
    writeln!(out, "Build version:  {}", or_dash(&meta.build_version))?;
    writeln!(out, "Build id:       {}", or_dash(&meta.build_id))?;
    writeln!(out, "Feature level:  {}", meta.feature_level)?;
    writeln!(out, "File data:      {}", meta.is_file_data)?;
    writeln!(
        out,
        "Launch:         {} {}",
        or_dash(&meta.launch_exe),
        meta.launch_command
    )?;
    if !meta.prereq_name.is_empty() || !meta.prereq_ids.is_empty() {
        writeln!(
            out,
            "Prerequisites:  {} [{}] {} {}",
            or_dash(&meta.prereq_name),
            meta.prereq_ids.join(", "),
            meta.prereq_path,
            meta.prereq_args
        )?;
    }
    writeln!(out, "Files:          {}", stats.file_count)?;
    writeln!(out, "Chunks:         {}", stats.chunk_count)?;
    writeln!(out, "Chunk parts:    {}", stats.chunk_part_count)?;
    writeln!(out, "Build size:     {} bytes", stats.build_size)?;
    writeln!(out, "Download size:  {} bytes", stats.download_size)?;

    let tags: Vec<&str> = manifest.install_tags().into_iter().collect();
    if !tags.is_empty() {
        writeln!(out, "Install tags:   {}", tags.join(", "))?;
    }
    Ok(())
}

/// Files selected by install tags; all files when `tags` is empty
pub fn write_files<W: Write>(
    out: &mut W,
    manifest: &Manifest,
    tags: &[String],
    json: bool,
) -> Result<()> {
    let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
    let files: Vec<&FileManifest> = if tags.is_empty() {
        manifest.files.iter().collect()
    } else {
        manifest.files_for_tags(&tag_refs).collect()
    };

    if json {
        return write_json(out, &files);
    }

    let mut table = create_table(&["Filename", "Size", "Flags", "Tags", "SHA1"]);
    for file in &files {
        let name = if file.is_symlink() {
            format!("{} -> {}", file.filename, file.symlink_target)
        } else {
            file.filename.clone()
        };
        table.add_row(vec![
            name,
            file.file_size.to_string(),
            file.meta_flags.to_string(),
            file.install_tags.join(","),
            file.file_hash.to_hex(),
        ]);
    }
    writeln!(out, "{table}")?;
    writeln!(out, "{} files", files.len())?;
    Ok(())
}

/// Chunk catalog with the path of each chunk file
pub fn write_chunks<W: Write>(out: &mut W, manifest: &Manifest, json: bool) -> Result<()> {
    let level = manifest.meta.feature_level;

    if json {
        let rows: Vec<ChunkRow<'_>> = manifest
            .chunks
            .iter()
            .map(|chunk| ChunkRow {
                chunk,
                path: chunk.relative_path(level),
            })
            .collect();
        return write_json(out, &rows);
    }

    let mut table = create_table(&["GUID", "Group", "Window", "File size", "Path"]);
    for chunk in &manifest.chunks {
        table.add_row(vec![
            chunk.guid.to_string(),
            chunk.group_number.to_string(),
            chunk.window_size.to_string(),
            chunk.file_size.to_string(),
            chunk.relative_path(level),
        ]);
    }
    writeln!(out, "{table}")?;
    writeln!(out, "{} chunks", manifest.chunks.len())?;
    Ok(())
}

/// Custom fields, one per line
pub fn write_fields<W: Write>(out: &mut W, manifest: &Manifest, json: bool) -> Result<()> {
    if json {
        return write_json(out, &manifest.custom_fields);
    }

    for (key, value) in &manifest.custom_fields {
        writeln!(out, "{key} = {value}")?;
    }
    Ok(())
}
