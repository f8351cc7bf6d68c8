//! Rule evaluation, conflict resolution, ordering and application

use super::profile::SystemProfile;
use super::rules::{self, Rule};
use super::{Priority, Recommendation};
use crate::items;
use anyhow::Result;
use declarative::{ApplyResult, AutoConfirm, ExecuteOptions, ProgressCallback, invoke_items};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Evaluates rules over a profile into a ranked, conflict-free list
pub struct RecommendationEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RecommendationEngine {
    /// An engine with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// An engine with the built-in rules
    pub fn builtin() -> Self {
        Self {
            rules: rules::builtin(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Box<dyn Rule>>) {
        self.rules.extend(rules);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every rule, then resolve conflicts and order the result
    pub fn generate_recommendations(&self, profile: &SystemProfile) -> Vec<Recommendation> {
        let mut found = Vec::new();
        for rule in &self.rules {
            let recs = rule.evaluate(profile);
            log::debug!("rule {}: {} recommendation(s)", rule.id(), recs.len());
            found.extend(recs);
        }
        prioritize_recommendations(resolve_conflicts(found))
    }
}

/// Most urgent first; confidence breaks ties. Equal keys keep input order.
fn rank(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.confidence_score.total_cmp(&a.confidence_score))
}

/// Drop duplicate ids and recommendations whose effects contradict a
/// higher-ranked one.
///
/// Candidates are considered in rank order, so of two conflicting entries
/// the more urgent (then more confident, then earlier) one is kept. The
/// survivors come back in their input order.
pub fn resolve_conflicts(list: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut order: Vec<usize> = (0..list.len()).collect();
    order.sort_by(|&a, &b| rank(&list[a], &list[b]));

    let mut seen = HashSet::new();
    let mut kept: Vec<usize> = Vec::new();
    for index in order {
        let candidate = &list[index];
        if !seen.insert(candidate.id.as_str()) {
            log::debug!("dropping duplicate recommendation {}", candidate.id);
            continue;
        }
        if let Some(&winner) = kept.iter().find(|&&k| list[k].conflicts_with(candidate)) {
            log::debug!(
                "dropping {}: conflicts with {}",
                candidate.id,
                list[winner].id
            );
            continue;
        }
        kept.push(index);
    }
    kept.sort_unstable();

    let mut keep = kept.into_iter().peekable();
    list.into_iter()
        .enumerate()
        .filter_map(|(index, rec)| {
            if keep.peek() == Some(&index) {
                keep.next();
                Some(rec)
            } else {
                None
            }
        })
        .collect()
}

/// Stable sort: priority descending, then confidence descending
pub fn prioritize_recommendations(mut list: Vec<Recommendation>) -> Vec<Recommendation> {
    list.sort_by(rank);
    list
}

/// Narrowing applied after generation
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    /// Case-insensitive category name
    pub category: Option<String>,
    pub min_priority: Option<Priority>,
    pub max: Option<usize>,
}

impl RecommendationFilter {
    pub fn apply(&self, list: Vec<Recommendation>) -> Vec<Recommendation> {
        let matches = |rec: &Recommendation| {
            self.category
                .as_deref()
                .is_none_or(|c| rec.category.eq_ignore_ascii_case(c))
                && self.min_priority.is_none_or(|p| rec.priority >= p)
        };
        list.into_iter()
            .filter(|rec| matches(rec))
            .take(self.max.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Result of applying one recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub id: String,
    pub success: bool,
    pub message: String,
}

/// Build the recommendation's item and converge it.
///
/// Confirmation is the caller's job; the item itself is applied without
/// asking. Dry run and elevation are taken from `opts`.
pub fn apply_recommendation<P: ProgressCallback>(
    rec: &Recommendation,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ApplyOutcome> {
    let item = items::build_item(&rec.implementation);
    let report = invoke_items(&[item], opts, progress, &mut AutoConfirm)?;

    let (success, message) = match report.outcomes.first().map(|o| &o.result) {
        Some(ApplyResult::NoChange) => (true, "Already applied".to_string()),
        Some(ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed) => {
            (true, "Applied".to_string())
        }
        Some(ApplyResult::Skipped { reason }) => (true, reason.clone()),
        Some(ApplyResult::Failed { error }) => (false, error.clone()),
        None => (false, "Nothing was applied".to_string()),
    };

    Ok(ApplyOutcome {
        id: rec.id.clone(),
        success,
        message,
    })
}
