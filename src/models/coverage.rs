// Coverage report and traceability matrix

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Coverage metrics for one requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub requirement_id: String,
    pub total_rules: usize,
    pub rules_covered: usize,
    /// Percentage of rules with at least one test case, one decimal place
    pub coverage_percentage: f64,
    pub total_test_count: usize,
    pub valid_test_count: usize,
    pub invalid_test_count: usize,
    /// Distinct test techniques; a sorted set so output order is stable
    #[serde(default)]
    pub techniques_used: BTreeSet<String>,
}

impl CoverageReport {
    /// Techniques joined for display in exports
    pub fn techniques_joined(&self, separator: &str) -> String {
        self.techniques_used
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Rule id -> covering test case ids, kept in rule order.
///
/// Serializes as a JSON object whose keys follow insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCoverage {
    entries: Vec<(String, Vec<String>)>,
    /// rule id -> position in `entries`
    index: HashMap<String, usize>,
}

impl RuleCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a rule, keeping its original position
    pub fn insert(&mut self, rule_id: String, tc_ids: Vec<String>) {
        match self.index.get(&rule_id) {
            Some(&position) => self.entries[position].1 = tc_ids,
            None => {
                self.index.insert(rule_id.clone(), self.entries.len());
                self.entries.push((rule_id, tc_ids));
            }
        }
    }

    pub fn get(&self, rule_id: &str) -> Option<&[String]> {
        let position = *self.index.get(rule_id)?;
        Some(self.entries[position].1.as_slice())
    }

    pub fn get_mut(&mut self, rule_id: &str) -> Option<&mut Vec<String>> {
        let position = *self.index.get(rule_id)?;
        Some(&mut self.entries[position].1)
    }

    pub fn contains_rule(&self, rule_id: &str) -> bool {
        self.get(rule_id).is_some()
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(id, tcs)| (id.as_str(), tcs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, T> FromIterator<(S, Vec<T>)> for RuleCoverage
where
    S: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, Vec<T>)>>(iter: I) -> Self {
        let mut coverage = RuleCoverage::new();
        for (rule_id, tcs) in iter {
            coverage.insert(rule_id.into(), tcs.into_iter().map(Into::into).collect());
        }
        coverage
    }
}

impl Serialize for RuleCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (rule_id, tcs) in &self.entries {
            map.serialize_entry(rule_id, tcs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleCoverage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleCoverageVisitor;

        impl<'de> Visitor<'de> for RuleCoverageVisitor {
            type Value = RuleCoverage;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of rule ids to test case id lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleCoverage, A::Error> {
                let mut coverage = RuleCoverage::new();
                while let Some((rule_id, tcs)) = access.next_entry::<String, Vec<String>>()? {
                    coverage.insert(rule_id, tcs);
                }
                Ok(coverage)
            }
        }

        deserializer.deserialize_map(RuleCoverageVisitor)
    }
}

/// Explicit mapping from every rule to the test cases that exercise it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityMatrix {
    #[serde(default)]
    pub requirement_id: String,
    pub rule_coverage: RuleCoverage,
}

impl TraceabilityMatrix {
    /// Rules with no covering test case
    pub fn uncovered_rules(&self) -> Vec<&str> {
        self.rule_coverage
            .iter()
            .filter(|(_, tcs)| tcs.is_empty())
            .map(|(id, _)| id)
            .collect()
    }
}
