use std::fs;

use anyhow::{Context, Result, anyhow};
use camino::Utf8Path;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

/// Raw bytes of a file under `templates/`, embedded at build time.
pub fn template_bytes(name: &str) -> Result<Vec<u8>> {
    let file = Templates::get(name).ok_or_else(|| anyhow!("embedded template `{}` missing", name))?;
    Ok(file.data.into_owned())
}

pub fn write_template(destination: &Utf8Path, name: &str) -> Result<()> {
    let bytes = template_bytes(name)?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }
    fs::write(destination, bytes).with_context(|| format!("writing {}", destination))
}
