//! Sanity rules for threat records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::EntityRecord;
use crate::tier;

/// Numeric limits for low and mid tier threats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Highest tier magnitude still considered low or mid tier.
    pub low_mid_max_tier: f64,
    /// Attribute values above this are flagged.
    pub attribute_ceiling: i64,
    /// Skill values above this are flagged.
    pub skill_ceiling: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_mid_max_tier: 10.0,
            attribute_ceiling: 40,
            skill_ceiling: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Attribute,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCategory {
    Sanity,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Sanity => f.write_str("SANITY"),
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub file: String,
    pub raw_tier: String,
    pub tier: String,
    pub category: IssueCategory,
    pub field: FieldKind,
    pub name: String,
    pub value: i64,
    pub description: String,
}

impl Issue {
    fn sanity(record: &EntityRecord, field: FieldKind, name: &str, value: i64) -> Self {
        let description = match field {
            FieldKind::Attribute => format!(
                "Atributo '{name}' anormalmente alto (+{value}) para ND {}",
                record.tier
            ),
            FieldKind::Skill => format!(
                "Perícia '{name}' anormalmente alta (+{value}) para ND {}",
                record.tier
            ),
        };
        Self {
            file: record.file.clone(),
            raw_tier: record.raw_tier.clone(),
            tier: record.tier.clone(),
            category: IssueCategory::Sanity,
            field,
            name: name.to_string(),
            value,
            description,
        }
    }
}

/// A check run against every record.
///
/// A cross-check of record stats against the loaded reference table would
/// plug in here.
pub trait ValidationRule {
    fn check(&self, record: &EntityRecord) -> Vec<Issue>;
}

/// Flags implausibly high attributes and skills on low and mid tier threats.
#[derive(Debug, Clone, Default)]
pub struct ThresholdRule {
    pub thresholds: Thresholds,
}

impl ValidationRule for ThresholdRule {
    fn check(&self, record: &EntityRecord) -> Vec<Issue> {
        let magnitude = tier::magnitude(&record.tier);
        if magnitude > self.thresholds.low_mid_max_tier {
            return Vec::new();
        }

        let attributes = record
            .attributes
            .iter()
            .filter(|&(_, &v)| v > self.thresholds.attribute_ceiling)
            .map(|(name, &v)| Issue::sanity(record, FieldKind::Attribute, name, v));
        let skills = record
            .skills
            .iter()
            .filter(|&(_, &v)| v > self.thresholds.skill_ceiling)
            .map(|(name, &v)| Issue::sanity(record, FieldKind::Skill, name, v));

        attributes.chain(skills).collect()
    }
}

/// Runs a list of rules in order.
pub struct SanityValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for SanityValidator {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl SanityValidator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            rules: vec![Box::new(ThresholdRule { thresholds })],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, record: &EntityRecord) -> Vec<Issue> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(raw_tier: &str, attributes: &[(&str, i64)], skills: &[(&str, i64)]) -> EntityRecord {
        let to_map = |pairs: &[(&str, i64)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>()
        };
        EntityRecord {
            file: "ameacas.ts".to_string(),
            raw_tier: raw_tier.to_string(),
            tier: tier::normalize(raw_tier),
            attributes: to_map(attributes),
            skills: to_map(skills),
            offset: 0,
        }
    }

    #[test]
    fn mid_tier_attribute_over_ceiling_is_flagged() {
        let issues = SanityValidator::default().validate(&record("5", &[("forca", 45), ("destreza", 3)], &[]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].name, "forca");
        assert_eq!(issues[0].value, 45);
        assert_eq!(issues[0].field, FieldKind::Attribute);
        assert!(issues[0].description.contains("forca"));
        assert!(issues[0].description.contains("+45"));
    }

    #[test]
    fn high_tier_is_never_flagged() {
        let issues =
            SanityValidator::default().validate(&record("12", &[("forca", 999)], &[("luta", 999)]));
        assert!(issues.is_empty());
    }

    #[test]
    fn unrecognized_tier_is_exempt() {
        let issues = SanityValidator::default().validate(&record("", &[("forca", 999)], &[("luta", 999)]));
        assert!(issues.is_empty());
        let issues = SanityValidator::default()
            .validate(&record("ChallengeLevel.BOGUS", &[("forca", 999)], &[]));
        assert!(issues.is_empty());
    }

    #[test]
    fn boundaries_are_exclusive() {
        let v = SanityValidator::default();
        assert!(v.validate(&record("ChallengeLevel.TEN", &[("forca", 40)], &[("luta", 60)])).is_empty());
        let issues = v.validate(&record("ChallengeLevel.TEN", &[("forca", 41)], &[("luta", 61)]));
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, FieldKind::Attribute);
        assert_eq!(issues[1].field, FieldKind::Skill);
        assert_eq!(issues[1].raw_tier, "ChallengeLevel.TEN");
        assert_eq!(issues[1].tier, "10");
    }

    #[test]
    fn custom_thresholds_and_extra_rules() {
        struct AlwaysOne;
        impl ValidationRule for AlwaysOne {
            fn check(&self, record: &EntityRecord) -> Vec<Issue> {
                vec![Issue::sanity(record, FieldKind::Skill, "extra", 0)]
            }
        }

        let strict = Thresholds {
            attribute_ceiling: 5,
            ..Thresholds::default()
        };
        let issues = SanityValidator::new(strict)
            .with_rule(Box::new(AlwaysOne))
            .validate(&record("1/4", &[("forca", 6)], &[]));
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].name, "extra");
    }
}
