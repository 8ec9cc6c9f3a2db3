use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::RulesArgs;
use crate::scan::{RuleCategory, RuleTable, SignatureRule};

#[derive(Debug, Serialize)]
struct RuleListing<'a> {
    as_of: NaiveDate,
    provider_prefix: &'a str,
    rules: Vec<RuleStatus<'a>>,
}

#[derive(Debug, Serialize)]
struct RuleStatus<'a> {
    #[serde(flatten)]
    rule: &'a SignatureRule,
    active: bool,
}

pub fn run(args: RulesArgs) -> Result<()> {
    let table = RuleTable::load_or_builtin(args.rules_path.as_deref())?;
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let listing = RuleListing {
        as_of,
        provider_prefix: &table.provider_prefix,
        rules: table
            .rules
            .iter()
            .map(|rule| RuleStatus {
                rule,
                active: rule.is_active_on(as_of),
            })
            .collect(),
    };

    if args.json {
        let data = serde_json::to_string_pretty(&listing).context("failed to serialize rules")?;
        println!("{data}");
    } else {
        for status in &listing.rules {
            info!(
                id = %status.rule.id,
                category = status.rule.category.as_str(),
                element = %status.rule.local_name,
                class = %status.rule.class_name,
                introduced = %status.rule.introduced,
                superseded_by = %status.rule.superseded_by.as_deref().unwrap_or_default(),
                active = status.active,
                "signature rule"
            );
        }
    }

    let active = table.active_on(as_of);
    for category in RuleCategory::ALL {
        let generations = active.iter().filter(|rule| rule.category == category).count();
        if generations > 1 {
            info!(
                category = category.as_str(),
                generations,
                "multiple generations active"
            );
        }
    }

    if let Err(err) = table.ensure_coverage(as_of) {
        warn!(error = %err, "rule table has gaps");
        return Err(err);
    }

    info!(as_of = %as_of, active = active.len(), total = table.rules.len(), "rule table ok");
    Ok(())
}
