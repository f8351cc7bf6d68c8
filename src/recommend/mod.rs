//! Recommendations
//!
//! A [`SystemProfile`] is evaluated by a set of [`Rule`]s into
//! [`Recommendation`]s. The [`RecommendationEngine`] deduplicates them,
//! drops those whose effects contradict a higher-priority one, and orders
//! the rest by priority then confidence.

pub mod engine;
pub mod export;
pub mod profile;
pub mod rules;

pub use engine::{ApplyOutcome, RecommendationEngine, RecommendationFilter};
pub use profile::SystemProfile;
pub use rules::Rule;

use crate::config::ItemSpec;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How urgent a recommendation is. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!(
                "unknown priority '{other}' (expected critical, high, medium or low)"
            )),
        }
    }
}

/// A suggested change with the item that would implement it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    /// Always within 0.0..=1.0
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence_score: f64,
    pub implementation: ItemSpec,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Setting key → value this recommendation establishes
    #[serde(default)]
    pub effects: BTreeMap<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Recommendation {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        priority: Priority,
        implementation: ItemSpec,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            priority,
            confidence_score: 0.5,
            implementation,
            prerequisites: Vec::new(),
            effects: BTreeMap::new(),
            metadata: Map::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the confidence, clamped into 0..=1 (NaN becomes 0)
    pub fn confidence(mut self, score: f64) -> Self {
        self.confidence_score = clamp_confidence(score);
        self
    }

    pub fn prerequisite(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }

    pub fn effect(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.effects.insert(key.into(), value.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether `other` sets one of this recommendation's effect keys to a
    /// different value
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.effects
            .iter()
            .any(|(key, value)| other.effects.get(key).is_some_and(|v| v != value))
    }
}

pub fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str) -> Recommendation {
        Recommendation::new(id, id, "test", Priority::Medium, ItemSpec::new(id, "registry"))
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(rec("a").confidence(1.7).confidence_score, 1.0);
        assert_eq!(rec("a").confidence(-0.2).confidence_score, 0.0);
        assert_eq!(rec("a").confidence(f64::NAN).confidence_score, 0.0);
        assert_eq!(rec("a").confidence(0.42).confidence_score, 0.42);
    }

    #[test]
    fn test_deserialized_confidence_is_clamped() {
        let json = serde_json::json!({
            "id": "a",
            "title": "A",
            "description": "",
            "category": "test",
            "priority": "High",
            "confidenceScore": 4.5,
            "implementation": { "name": "a", "type": "registry" }
        });
        let rec: Recommendation = serde_json::from_value(json).unwrap();
        assert_eq!(rec.confidence_score, 1.0);
        assert!(rec.effects.is_empty());
    }

    #[test]
    fn test_conflicts_with() {
        let a = rec("a").effect("telemetry.level", 1);
        let b = rec("b").effect("telemetry.level", 0);
        let c = rec("c").effect("telemetry.level", 1).effect("other", true);
        let d = rec("d").effect("unrelated", 3);
        assert!(a.conflicts_with(&b));
        assert!(!a.conflicts_with(&c));
        assert!(!a.conflicts_with(&d));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(rec("a").confidence(0.5)).unwrap();
        assert_eq!(json["confidenceScore"], 0.5);
        assert_eq!(json["priority"], "Medium");
        assert_eq!(json["implementation"]["type"], "registry");
    }
}
