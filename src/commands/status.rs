use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::artifacts::manifest::{ArtifactRef, Manifest};
use crate::state::AppState;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn describe(artifact: Option<&ArtifactRef>, count: usize) -> String {
    match artifact {
        Some(a) => {
            let stamp = a
                .stamp
                .map(|s: NaiveDateTime| s.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "no stamp".to_string());
            format!("{} ({}, {} total)", file_name(&a.path), stamp, count)
        }
        None => "-".to_string(),
    }
}

pub fn render(manifest: &Manifest) -> String {
    if manifest.sources.is_empty() {
        return "No artifacts found.\n".to_string();
    }

    let mut out = String::new();
    for (core, lineage) in &manifest.sources {
        out.push_str(&format!("{}\n", core));
        out.push_str(&format!(
            "  raw:        {}\n",
            describe(lineage.raw.as_ref(), lineage.raw_count)
        ));
        out.push_str(&format!(
            "  normalized: {}\n",
            describe(lineage.normalized.as_ref(), lineage.normalized_count)
        ));
        out.push_str(&format!(
            "  enriched:   {}\n",
            lineage
                .enriched
                .as_deref()
                .map(file_name)
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    out
}

pub fn status(state: &AppState, json: bool) -> Result<()> {
    let manifest = Manifest::scan(&state.store)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print!("{}", render(&manifest));
    }
    Ok(())
}
