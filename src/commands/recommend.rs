use anyhow::{Result, bail};
use colored::{ColoredString, Colorize};
use declarative::{ConfirmCallback, ExecuteOptions};
use termkit::{Completion, NewProgress};

use crate::Context;
use crate::cli::RecommendArgs;
use crate::config::ConfigDocument;
use crate::engine::{PromptConfirm, StackProgress};
use crate::paths;
use crate::plugins::PluginManager;
use crate::recommend::engine::apply_recommendation;
use crate::recommend::{
    ApplyOutcome, Priority, Recommendation, RecommendationEngine, RecommendationFilter,
    SystemProfile, export,
};
use crate::ui;

pub fn run(ctx: &mut Context, args: RecommendArgs) -> Result<()> {
    let profile = match &args.profile {
        Some(path) => SystemProfile::load(&paths::expand(&path.to_string_lossy()))?,
        None => super::profile::collect(ctx)?,
    };

    let mut plugins = PluginManager::with_builtins();
    let mut names = args.plugins.clone();
    if let Some(config) = &args.config {
        let doc = ConfigDocument::load(&paths::resolve_config(config)?)?;
        names.extend(doc.run_settings().plugins);
    }
    names.sort();
    names.dedup();
    for error in plugins.load_all(&names) {
        ctx.progress.warn(&error.to_string());
    }

    let mut engine = RecommendationEngine::builtin();
    engine.add_rules(plugins.rules());
    log::debug!("evaluating {} rule(s)", engine.rule_count());

    let filter = RecommendationFilter {
        category: args.category.clone(),
        min_priority: args.priority,
        max: args.max,
    };
    let recs = filter.apply(engine.generate_recommendations(&profile));
    display(&recs);

    // Results are already on screen; a failed export only fails the export
    if let Some(path) = &args.export {
        export::export_recommendations(&recs, path)?;
        ctx.progress
            .success(&format!("Exported {} recommendation(s) to {}", recs.len(), path.display()));
    }

    if args.apply {
        apply_all(ctx, &recs, &args)?;
    }
    Ok(())
}

fn priority_label(priority: Priority) -> ColoredString {
    let label = format!("{:<8}", priority.as_str());
    match priority {
        Priority::Critical => label.red().bold(),
        Priority::High => label.yellow(),
        Priority::Medium => label.blue(),
        Priority::Low => label.dimmed(),
    }
}

pub fn display(recs: &[Recommendation]) {
    if recs.is_empty() {
        println!();
        println!("  {} Nothing to recommend", "✓".green());
        return;
    }

    ui::header(&format!("{} recommendation(s)", recs.len()));
    for rec in recs {
        println!(
            "  {} {} {}",
            priority_label(rec.priority),
            rec.title.bold(),
            format!("[{} · {:.0}%]", rec.category, rec.confidence_score * 100.0).dimmed()
        );
        if !rec.description.is_empty() {
            println!("           {}", rec.description);
        }
        if !rec.prerequisites.is_empty() {
            println!(
                "           {}",
                format!("requires: {}", rec.prerequisites.join(", ")).dimmed()
            );
        }
    }
}

fn apply_all(ctx: &mut Context, recs: &[Recommendation], args: &RecommendArgs) -> Result<()> {
    if recs.is_empty() {
        return Ok(());
    }
    if !args.dry_run {
        let mut confirm = PromptConfirm::new(args.yes, ctx.progress.draw_target());
        if !confirm.confirm(&format!("Apply {} recommendation(s)?", recs.len()))? {
            ctx.progress.info("Nothing applied");
            return Ok(());
        }
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        verbose: ctx.verbose > 0,
        elevated: ctx.elevated,
        ..Default::default()
    };

    let root = ctx
        .progress
        .start(NewProgress::new("Apply recommendations").total(recs.len() as u64));
    let mut outcomes = Vec::with_capacity(recs.len());
    for rec in recs {
        let node = ctx
            .progress
            .start(NewProgress::new(&rec.title).parent(root).total(2));
        let outcome = {
            let mut progress = StackProgress::new(&mut ctx.progress, Some(node));
            apply_recommendation(rec, &opts, &mut progress)
        }
        .unwrap_or_else(|e| ApplyOutcome {
            id: rec.id.clone(),
            success: false,
            message: format!("{e:#}"),
        });
        ctx.progress
            .complete(node, Completion::new().status(&outcome.message));
        outcomes.push(outcome);
    }
    let failed = outcomes.iter().filter(|o| !o.success).count();
    ctx.progress.complete(
        root,
        Completion::new().status(format!("{} applied, {} failed", outcomes.len() - failed, failed)),
    );

    println!();
    for (rec, outcome) in recs.iter().zip(&outcomes) {
        let symbol = if outcome.success {
            "✓".green()
        } else {
            "✗".red()
        };
        println!("  {} {:<40} {}", symbol, rec.title, outcome.message.dimmed());
    }

    if failed > 0 {
        bail!("{failed} recommendation(s) could not be applied");
    }
    Ok(())
}
