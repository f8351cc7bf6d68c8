use anyhow::{Result, bail};
use declarative::{ExecuteOptions, TestSummary, test_items};
use termkit::{Completion, NewProgress};

use crate::Context;
use crate::cli::TestArgs;
use crate::engine::{StackProgress, build_plan, display};
use crate::recommend::export;

pub fn run(ctx: &mut Context, args: TestArgs) -> Result<()> {
    let (_, doc) = super::load_document(ctx, &args.config)?;
    let settings = doc.run_settings();
    let plan = build_plan(&doc, args.target.as_deref());

    if plan.is_empty() {
        ctx.progress.warn("No items match");
        return Ok(());
    }

    let opts = ExecuteOptions {
        parallel: args.parallel || settings.parallel_tests,
        jobs: args.jobs.or(settings.jobs).unwrap_or(4),
        verbose: ctx.verbose > 0,
        elevated: ctx.elevated,
        ..Default::default()
    };

    let root = ctx
        .progress
        .start(NewProgress::new(format!("Test {}", doc.name)).total(1));
    let outcomes = {
        let mut progress = StackProgress::new(&mut ctx.progress, Some(root));
        test_items(&plan.items, &opts, &mut progress)
    };
    let summary = outcomes
        .as_ref()
        .map(|o| TestSummary::from_outcomes(o))
        .unwrap_or_default();
    ctx.progress.complete(
        root,
        Completion::new()
            .status(format!("{}/{} compliant", summary.compliant, summary.total()))
            .metric("compliant", summary.compliant as u64),
    );
    let outcomes = outcomes?;

    display::display_test_results(&outcomes);
    display::print_test_summary(&summary);

    if let Some(path) = &args.export {
        export::export_test_results(&outcomes, path)?;
        ctx.progress
            .success(&format!("Exported results to {}", path.display()));
    }

    if !summary.is_compliant() {
        bail!(
            "{} of {} item(s) not compliant",
            summary.non_compliant + summary.failed,
            summary.total()
        );
    }
    Ok(())
}
