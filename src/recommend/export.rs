//! JSON export of recommendations and test results

use super::Recommendation;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use declarative::{TestOutcome, TestStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export<'a, S, T> {
    pub generated_at: DateTime<Local>,
    pub summary: S,
    pub items: &'a [T],
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub total: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl RecommendationSummary {
    pub fn from_recommendations(recs: &[Recommendation]) -> Self {
        let mut summary = Self {
            total: recs.len(),
            ..Default::default()
        };
        for rec in recs {
            *summary
                .by_priority
                .entry(rec.priority.to_string())
                .or_default() += 1;
            *summary.by_category.entry(rec.category.clone()).or_default() += 1;
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl TestResultSummary {
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            let status = match outcome.status {
                TestStatus::Compliant => "compliant",
                TestStatus::NonCompliant => "nonCompliant",
                TestStatus::Failed { .. } => "failed",
            };
            *summary.by_status.entry(status.to_string()).or_default() += 1;
            *summary.by_type.entry(outcome.kind.clone()).or_default() += 1;
        }
        summary
    }
}

pub fn export_recommendations(recs: &[Recommendation], path: &Path) -> Result<()> {
    write_json(
        path,
        &Export {
            generated_at: Local::now(),
            summary: RecommendationSummary::from_recommendations(recs),
            items: recs,
        },
    )
}

pub fn export_test_results(outcomes: &[TestOutcome], path: &Path) -> Result<()> {
    write_json(
        path,
        &Export {
            generated_at: Local::now(),
            summary: TestResultSummary::from_outcomes(outcomes),
            items: outcomes,
        },
    )
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}
