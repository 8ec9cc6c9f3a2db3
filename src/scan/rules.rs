use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const PROVIDER_PREFIX: &str = "ytd-";
pub const RULE_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Early,
    Late,
    Target,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [Self::Early, Self::Late, Self::Target];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Late => "late",
            Self::Target => "target",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRule {
    pub id: String,
    pub category: RuleCategory,
    pub local_name: String,
    pub class_name: String,
    pub introduced: NaiveDate,
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub retired_on: Option<NaiveDate>,
}

impl SignatureRule {
    /// Superseded rules stay active; only an explicit retirement date ends a rule.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.introduced <= date && self.retired_on.is_none_or(|retired| date < retired)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    pub manifest_version: u32,
    pub provider_prefix: String,
    pub rules: Vec<SignatureRule>,
}

impl RuleTable {
    pub fn builtin() -> Self {
        Self {
            manifest_version: RULE_TABLE_VERSION,
            provider_prefix: PROVIDER_PREFIX.to_string(),
            rules: vec![
                rule(
                    "list-shelf",
                    RuleCategory::Early,
                    "ytd-shelf-renderer",
                    "ytd-item-section-renderer",
                    date(2024, 10, 1),
                ),
                rule(
                    "grid-media",
                    RuleCategory::Early,
                    "ytd-rich-grid-media",
                    "ytd-rich-item-renderer",
                    date(2024, 10, 1),
                ),
                SignatureRule {
                    superseded_by: Some("now-playing".to_string()),
                    retired_on: Some(date(2025, 10, 1)),
                    ..rule(
                        "time-status",
                        RuleCategory::Late,
                        "ytd-thumbnail-overlay-time-status-renderer",
                        "ytd-thumbnail",
                        date(2023, 12, 9),
                    )
                },
                rule(
                    "now-playing",
                    RuleCategory::Late,
                    "ytd-thumbnail-overlay-now-playing-renderer",
                    "ytd-thumbnail",
                    date(2025, 10, 1),
                ),
                rule(
                    "resume-playback",
                    RuleCategory::Target,
                    "ytd-thumbnail-overlay-resume-playback-renderer",
                    "ytd-thumbnail",
                    date(2023, 12, 9),
                ),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let table: RuleTable = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        table
            .validate()
            .with_context(|| format!("invalid rule table: {}", path.display()))?;
        Ok(table)
    }

    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest_version != RULE_TABLE_VERSION {
            bail!(
                "unsupported rule table version {} (expected {RULE_TABLE_VERSION})",
                self.manifest_version
            );
        }
        if self.rules.is_empty() {
            bail!("rule table has no rules");
        }

        let element_name = Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)+$")
            .context("failed to compile element name regex")?;
        let class_name = Regex::new(r"^[A-Za-z_-][A-Za-z0-9_-]*$")
            .context("failed to compile class name regex")?;

        let mut ids = HashSet::new();
        for rule in &self.rules {
            if !ids.insert(rule.id.as_str()) {
                bail!("duplicate rule id: {}", rule.id);
            }
            if !element_name.is_match(&rule.local_name) {
                bail!("rule {} has invalid element name: {}", rule.id, rule.local_name);
            }
            if !rule.local_name.starts_with(&self.provider_prefix) {
                bail!(
                    "rule {} element {} lacks provider prefix {}",
                    rule.id,
                    rule.local_name,
                    self.provider_prefix
                );
            }
            if !class_name.is_match(&rule.class_name) {
                bail!("rule {} has invalid class name: {}", rule.id, rule.class_name);
            }
            if let Some(retired) = rule.retired_on {
                if retired <= rule.introduced {
                    bail!(
                        "rule {} retired on {retired} before its introduction on {}",
                        rule.id,
                        rule.introduced
                    );
                }
            }
        }

        for rule in &self.rules {
            if let Some(successor) = &rule.superseded_by {
                if successor == &rule.id || !ids.contains(successor.as_str()) {
                    bail!("rule {} superseded by unknown rule {successor}", rule.id);
                }
            }
        }

        Ok(())
    }

    /// Rules in effect on `date`, ordered by category precedence then table order.
    pub fn active_on(&self, date: NaiveDate) -> Vec<SignatureRule> {
        let mut active = self
            .rules
            .iter()
            .filter(|rule| rule.is_active_on(date))
            .cloned()
            .collect::<Vec<_>>();
        active.sort_by_key(|rule| rule.category);
        active
    }

    pub fn ensure_coverage(&self, date: NaiveDate) -> Result<()> {
        let active = self.active_on(date);
        for category in RuleCategory::ALL {
            if !active.iter().any(|rule| rule.category == category) {
                bail!("no active {} rule on {date}", category.as_str());
            }
        }
        Ok(())
    }
}

fn rule(
    id: &str,
    category: RuleCategory,
    local_name: &str,
    class_name: &str,
    introduced: NaiveDate,
) -> SignatureRule {
    SignatureRule {
        id: id.to_string(),
        category,
        local_name: local_name.to_string(),
        class_name: class_name.to_string(),
        introduced,
        superseded_by: None,
        retired_on: None,
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
