pub mod apply;
pub mod plugins;
pub mod profile;
pub mod recommend;
pub mod status;
pub mod test;

use crate::Context;
use crate::config::{ConfigDocument, RunSettings};
use crate::paths;
use anyhow::Result;
use std::path::PathBuf;

/// Resolve and load a configuration document, picking up its log file
fn load_document(ctx: &mut Context, arg: &str) -> Result<(PathBuf, ConfigDocument)> {
    let path = paths::resolve_config(arg)?;
    let doc = ConfigDocument::load(&path)?;
    log::info!("Loaded {} ({} item(s))", path.display(), doc.items.len());

    let settings = doc.run_settings();
    attach_log_file(ctx, &settings);
    Ok((path, doc))
}

/// A document's `logFile` applies unless one was given on the command line
fn attach_log_file(ctx: &mut Context, settings: &RunSettings) {
    if let Some(file) = &settings.log_file
        && ctx.progress.sink().file().is_none()
    {
        log::debug!("logging to {}", file.display());
        ctx.progress.sink_mut().set_file(file);
    }
}
