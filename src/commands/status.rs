use anyhow::Result;
use declarative::compute_diffs;
use termkit::NewProgress;

use crate::Context;
use crate::cli::StatusArgs;
use crate::engine::{build_plan, display};
use crate::ui;

pub fn run(ctx: &mut Context, args: StatusArgs) -> Result<()> {
    let (_, doc) = super::load_document(ctx, &args.config)?;
    let plan = build_plan(&doc, args.target.as_deref());

    ui::header(&doc.name);
    if let Some(version) = &doc.version {
        ui::kv("version", version);
    }
    ui::kv("items", &plan.len().to_string());
    ui::kv("elevated", &ui::yes_no(Some(ctx.elevated)));

    let (diffs, errors) = ctx.progress.scoped(
        NewProgress::new("Reading current state").metric("items", plan.len() as u64),
        |_, _| Ok::<_, anyhow::Error>(compute_diffs(&plan.items)),
    )?;

    for (name, error) in &errors {
        ctx.progress.error(&format!("{name}: {error}"));
    }
    display::display_diff(&diffs, ctx.elevated);
    Ok(())
}
