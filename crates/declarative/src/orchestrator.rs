//! Test/invoke orchestration - per-item error isolation, dry run, parallel tests

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::item::ConfigurationItem;
use crate::types::{
    ApplyResult, ErrorPolicy, ExecuteOptions, InvokeReport, ItemOutcome, TestOutcome, TestStatus,
};
use anyhow::Result;
use rayon::prelude::*;
use std::time::Instant;

/// Test every item for compliance
///
/// A failing test is recorded as [`TestStatus::Failed`] and never aborts
/// the run. With `opts.parallel` the tests run on a worker pool; workers
/// only produce outcomes and the progress callback sees them after the
/// join, in item order.
pub fn test_items<P: ProgressCallback>(
    items: &[Box<dyn ConfigurationItem>],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<Vec<TestOutcome>> {
    progress.on_batch_start("Testing", items.len());

    let outcomes = if opts.parallel && opts.jobs > 1 && items.len() > 1 {
        test_parallel(items, opts.jobs, progress)?
    } else {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            progress.on_item_start(&item.name(), &item.description());
            let outcome = test_item(item.as_ref());
            progress.on_item_tested(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    };

    progress.on_batch_complete();
    Ok(outcomes)
}

fn test_parallel<P: ProgressCallback>(
    items: &[Box<dyn ConfigurationItem>],
    jobs: usize,
    progress: &mut P,
) -> Result<Vec<TestOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create test worker pool: {}", e))?;

    let outcomes: Vec<TestOutcome> =
        pool.install(|| items.par_iter().map(|item| test_item(item.as_ref())).collect());

    for outcome in &outcomes {
        progress.on_item_tested(outcome);
    }
    Ok(outcomes)
}

/// Test a single item, catching its error
pub fn test_item(item: &dyn ConfigurationItem) -> TestOutcome {
    let started = Instant::now();
    let status = match item.test() {
        Ok(true) => TestStatus::Compliant,
        Ok(false) => TestStatus::NonCompliant,
        Err(e) => TestStatus::Failed {
            error: format!("{e:#}"),
        },
    };

    TestOutcome {
        name: item.name(),
        kind: item.kind().to_string(),
        description: item.description(),
        status,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// Converge every item to its desired state
///
/// Items are tested first. Non-compliant items are then applied in order
/// after a single confirmation (skipped on dry run). Failures are recorded
/// per item; under [`ErrorPolicy::FailFast`] every item after the first
/// failure is marked skipped.
pub fn invoke_items<P, C>(
    items: &[Box<dyn ConfigurationItem>],
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<InvokeReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let tested = test_items(items, opts, progress)?;
    let pending = tested
        .iter()
        .filter(|t| t.status == TestStatus::NonCompliant)
        .count();

    let declined = pending > 0
        && !opts.dry_run
        && !confirm.confirm(&format!("Apply {} change(s)?", pending))?;

    let mut report = InvokeReport::default();
    let mut ctx = ApplyContext::new(opts.dry_run, opts.verbose, opts.elevated);

    progress.on_batch_start("Applying", items.len());
    for (item, test) in items.iter().zip(&tested) {
        if report.stopped_early {
            let outcome = skipped(item.as_ref(), "Stopped after an earlier failure");
            progress.on_item_applied(&outcome);
            report.push(outcome);
            continue;
        }

        let outcome = if declined && test.status == TestStatus::NonCompliant {
            skipped(item.as_ref(), "Declined")
        } else {
            progress.on_item_start(&item.name(), &item.description());
            converge_item(item.as_ref(), &test.status, &mut ctx)
        };

        let failed = !outcome.result.is_success();
        progress.on_item_applied(&outcome);
        report.push(outcome);

        if failed && opts.error_policy == ErrorPolicy::FailFast {
            log::debug!("fail-fast: stopping after {}", item.name());
            report.stopped_early = true;
        }
    }
    progress.on_batch_complete();

    Ok(report)
}

/// Apply one item given its test verdict, catching its error
fn converge_item(
    item: &dyn ConfigurationItem,
    status: &TestStatus,
    ctx: &mut ApplyContext,
) -> ItemOutcome {
    let started = Instant::now();

    let result = match status {
        TestStatus::Compliant => ApplyResult::NoChange,
        TestStatus::Failed { error } => ApplyResult::Failed {
            error: format!("Test failed: {}", error),
        },
        TestStatus::NonCompliant if ctx.dry_run => ApplyResult::Skipped {
            reason: "Dry run".to_string(),
        },
        TestStatus::NonCompliant => {
            let elevation = if item.requires_elevation() {
                ctx.require_elevation(&item.description())
            } else {
                Ok(())
            };
            match elevation {
                Err(e) => ApplyResult::Failed {
                    error: e.to_string(),
                },
                Ok(()) => match item.apply(ctx) {
                    Ok(result) => result,
                    Err(e) => ApplyResult::Failed {
                        error: format!("{e:#}"),
                    },
                },
            }
        }
    };

    ItemOutcome {
        name: item.name(),
        kind: item.kind().to_string(),
        result,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn skipped(item: &dyn ConfigurationItem, reason: &str) -> ItemOutcome {
    ItemOutcome {
        name: item.name(),
        kind: item.kind().to_string(),
        result: ApplyResult::Skipped {
            reason: reason.to_string(),
        },
        duration_ms: 0,
    }
}
