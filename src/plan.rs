//! Typing-plan resolution: one typed decision per raw column.
//!
//! Declared descriptor types are authoritative, except where a blanket
//! per-table policy protects numeric-looking identifiers (document ids,
//! version numbers, row numbers) from being mangled into numbers or
//! scientific notation on export. Heuristic date sniffing is deliberately
//! restricted to the two known system tables to avoid false positives
//! elsewhere.

use log::debug;

use crate::{
    descriptor::DescriptorMeta,
    parsers::parse_date_flexible,
    table::{ColumnKind, RawTable},
};

/// Tables whose columns default to text unless explicitly dated.
pub const SYSTEM_TABLES: [&str; 2] = ["doc", "routecontext"];

/// Auxiliary table name prefixes carrying fixed always-text identifier columns.
pub const AUX_TABLE_PREFIXES: [&str; 2] = ["dc_", "fs_"];

/// Identifier columns that must stay text in auxiliary tables even when
/// every sampled value is a numeric string.
pub const ALWAYS_TEXT_IDS: [&str; 4] = ["docid", "version", "tablerownum", "fieldsetid"];

/// Non-null values sampled per column by the date sniff.
const DATE_SNIFF_SAMPLE: usize = 50;

/// Declared type resolved from the descriptor, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Text,
    Decimal,
    Date,
}

impl DeclaredType {
    /// Maps a raw descriptor `type` attribute; unknown tokens resolve to `None`
    /// and fall through to the runtime rules.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "STRING" => Some(DeclaredType::Text),
            "DECIMAL" => Some(DeclaredType::Decimal),
            "DATE" => Some(DeclaredType::Date),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Text => "STRING",
            DeclaredType::Decimal => "DECIMAL",
            DeclaredType::Date => "DATE",
        }
    }
}

/// Which resolution rule decided a column; kept for audit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanRule {
    DeclaredString,
    SystemTableText,
    AuxiliaryIdText,
    DateLike,
    DeclaredDecimal,
    DefaultText,
}

impl PlanRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanRule::DeclaredString => "declared STRING",
            PlanRule::SystemTableText => "system-table text",
            PlanRule::AuxiliaryIdText => "auxiliary id text",
            PlanRule::DateLike => "date-like",
            PlanRule::DeclaredDecimal => "declared DECIMAL",
            PlanRule::DefaultText => "default text",
        }
    }
}

/// Typed decision for a single column.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub index: usize,
    pub column_name: String,
    pub system_name: String,
    pub declared: Option<DeclaredType>,
    pub forced_text: bool,
    pub heuristic_date: bool,
    pub resolved: ColumnKind,
    pub rule: PlanRule,
}

/// One [`ColumnPlan`] per raw column, in column order. Built once per export
/// operation and discarded after materialization.
#[derive(Debug, Clone)]
pub struct TypingPlan {
    pub table_name: String,
    pub columns: Vec<ColumnPlan>,
}

impl TypingPlan {
    /// Audit rows: the inputs that produced each column's decision.
    pub fn decision_rows(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .map(|plan| {
                vec![
                    self.table_name.clone(),
                    plan.column_name.clone(),
                    plan.system_name.clone(),
                    plan.declared.map(|d| d.as_str()).unwrap_or("").to_string(),
                    plan.resolved.as_str().to_string(),
                    plan.rule.as_str().to_string(),
                    if plan.forced_text { "Y" } else { "" }.to_string(),
                    if plan.heuristic_date { "Y" } else { "" }.to_string(),
                ]
            })
            .collect()
    }

    pub fn decision_headers() -> Vec<String> {
        ["table", "column", "sys", "declared", "resolved", "rule", "forced_text", "heur_date"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Builds the typing plan for `raw`, reconciling runtime value shapes against
/// the optional descriptor. Pure apart from sampling values already present
/// in `raw`.
pub fn build(raw: &RawTable, meta: Option<&DescriptorMeta>) -> TypingPlan {
    let table_lower = raw.name.to_lowercase();
    let is_system = SYSTEM_TABLES.contains(&table_lower.as_str());
    let is_auxiliary = AUX_TABLE_PREFIXES
        .iter()
        .any(|prefix| table_lower.starts_with(prefix));

    let columns = raw
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let system_name = column.effective_system_name().to_string();
            let declared = meta
                .and_then(|m| m.declared_type(&system_name))
                .and_then(DeclaredType::parse);
            let runtime_temporal = column_is_temporal(raw, index);
            let heuristic_date = is_system && looks_like_date(raw, index);

            let declared_date = declared == Some(DeclaredType::Date);
            let (resolved, forced_text, rule) = if declared == Some(DeclaredType::Text) {
                (ColumnKind::Text, true, PlanRule::DeclaredString)
            } else if is_system && !declared_date && !runtime_temporal {
                // In system tables only explicitly dated columns escape text.
                (ColumnKind::Text, true, PlanRule::SystemTableText)
            } else if is_auxiliary && ALWAYS_TEXT_IDS.contains(&system_name.to_lowercase().as_str())
            {
                (ColumnKind::Text, true, PlanRule::AuxiliaryIdText)
            } else if declared_date || runtime_temporal || heuristic_date {
                (ColumnKind::DateTime, false, PlanRule::DateLike)
            } else if declared == Some(DeclaredType::Decimal) {
                (ColumnKind::Decimal, false, PlanRule::DeclaredDecimal)
            } else {
                (ColumnKind::Text, false, PlanRule::DefaultText)
            };

            debug!(
                "Typing {}.{}: sys={} declared={:?} rule={} -> {}",
                raw.name,
                column.name,
                system_name,
                declared,
                rule.as_str(),
                resolved.as_str()
            );

            ColumnPlan {
                index,
                column_name: column.name.clone(),
                system_name,
                declared,
                forced_text,
                heuristic_date,
                resolved,
                rule,
            }
        })
        .collect();

    TypingPlan {
        table_name: raw.name.clone(),
        columns,
    }
}

/// A column counts as runtime-temporal when it holds at least one value and
/// every non-null value is a native date/time, i.e. the source of record
/// already typed the whole column.
fn column_is_temporal(raw: &RawTable, index: usize) -> bool {
    let mut seen = false;
    for value in raw.column_values(index) {
        if !value.is_temporal() {
            return false;
        }
        seen = true;
    }
    seen
}

/// Bounded sniff: true when any of the first sampled non-null values is a
/// native temporal or parses under the flexible date formats.
fn looks_like_date(raw: &RawTable, index: usize) -> bool {
    raw.column_values(index)
        .take(DATE_SNIFF_SAMPLE)
        .any(|value| value.is_temporal() || parse_date_flexible(&value.as_invariant()).is_some())
}
