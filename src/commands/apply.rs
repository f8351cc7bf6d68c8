use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{ErrorPolicy, ExecuteOptions, invoke_items};
use termkit::{Completion, NewProgress};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{PromptConfirm, StackProgress, build_plan, display};
use crate::ui;

pub fn run(ctx: &mut Context, args: ApplyArgs) -> Result<()> {
    let (path, doc) = super::load_document(ctx, &args.config)?;
    let settings = doc.run_settings();
    let plan = build_plan(&doc, args.target.as_deref());

    if !ctx.quiet {
        ui::header(&format!("Applying {}", doc.name));
        ui::dim(&path.display().to_string());
        if !doc.description.is_empty() {
            ui::dim(&doc.description);
        }
    }

    if plan.is_empty() {
        ctx.progress.warn("No items match");
        return Ok(());
    }

    let needs_admin = plan.elevated_count();
    if needs_admin > 0 && !ctx.elevated {
        ctx.progress.warn(&format!(
            "{} item(s) need administrator rights and will fail; run from an elevated terminal",
            needs_admin
        ));
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: settings.jobs.unwrap_or(4),
        parallel: settings.parallel_tests,
        verbose: ctx.verbose > 0,
        elevated: ctx.elevated,
        error_policy: if args.fail_fast {
            ErrorPolicy::FailFast
        } else {
            settings.error_policy()
        },
    };

    let mut confirm = PromptConfirm::new(args.yes, ctx.progress.draw_target());
    let root = ctx.progress.start(
        NewProgress::new(format!("Apply {}", doc.name))
            .total(2)
            .metric("items", plan.len() as u64)
            .metric("dryRun", args.dry_run),
    );
    let report = {
        let mut progress = StackProgress::new(&mut ctx.progress, Some(root));
        invoke_items(&plan.items, &opts, &mut progress, &mut confirm)
    };
    let completion = match &report {
        Ok(report) => Completion::new()
            .status(format!("{} change(s)", report.summary.total_changes()))
            .metric("failed", report.summary.failed as u64),
        Err(e) => Completion::new().status(format!("Failed: {e}")),
    };
    ctx.progress.complete(root, completion);
    let report = report?;

    display::print_summary(&report.summary, args.dry_run);
    if report.stopped_early {
        println!(
            "    {} stopped after the first failure",
            "•".dimmed()
        );
    }

    if !report.summary.is_success() {
        bail!("{} item(s) failed", report.summary.failed);
    }
    Ok(())
}
