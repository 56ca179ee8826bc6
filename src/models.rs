//! Domain models for screening cases and dossier reports.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used wherever the remote response leaves a field empty.
pub const MISSING: &str = "—";

/// Identifier type of the OFAC SDN list entry.
pub const OFAC_IDENTIFIER_TYPE: &str = "US-OSDN";

/// Score at or above which a candidate counts as strong regardless of label.
pub const STRONG_SCORE_THRESHOLD: f64 = 90.0;

pub const DEFAULT_COUNTRY: &str = "USA";
pub const WATCHLIST_PROVIDER: &str = "WATCHLIST";

// ── Cases ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Organisation,
    Individual,
    Vessel,
    Unspecified,
}

/// Validated input for `POST /cases`.
#[derive(Debug, Clone)]
pub struct CaseRequest {
    pub entity_name: String,
    pub entity_type: EntityType,
    /// ISO 3166 alpha-3, e.g. `USA`
    pub country_code: String,
    pub group_id: String,
    pub provider_types: BTreeSet<String>,
}

impl CaseRequest {
    /// Organisation screened against the watchlist provider. Country defaults
    /// to `USA` when absent or blank.
    pub fn organisation(entity_name: &str, country_code: Option<&str>, group_id: &str) -> Self {
        let country_code = country_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY);
        Self {
            entity_name: entity_name.trim().to_string(),
            entity_type: EntityType::Organisation,
            country_code: country_code.to_string(),
            group_id: group_id.to_string(),
            provider_types: BTreeSet::from([WATCHLIST_PROVIDER.to_string()]),
        }
    }

    pub fn to_payload(&self) -> CasePayload<'_> {
        CasePayload {
            case_id: "",
            group_id: &self.group_id,
            entity_type: self.entity_type,
            provider_types: self.provider_types.iter().map(String::as_str).collect(),
            case_screening_state: self
                .provider_types
                .iter()
                .map(|p| (p.as_str(), "INITIAL"))
                .collect(),
            name: &self.entity_name,
            secondary_fields: vec![SecondaryField {
                type_id: "SFCT_6",
                value: &self.country_code,
            }],
        }
    }
}

/// Wire body for `POST /cases`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePayload<'a> {
    pub case_id: &'a str,
    pub group_id: &'a str,
    pub entity_type: EntityType,
    pub provider_types: Vec<&'a str>,
    pub case_screening_state: BTreeMap<&'a str, &'static str>,
    pub name: &'a str,
    pub secondary_fields: Vec<SecondaryField<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryField<'a> {
    pub type_id: &'static str,
    pub value: &'a str,
}

/// Categorical match label. Unrecognised labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrength {
    Exact,
    Strong,
    Medium,
    Possible,
    Weak,
    Other(String),
}

impl MatchStrength {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "EXACT" => MatchStrength::Exact,
            "STRONG" => MatchStrength::Strong,
            "MEDIUM" => MatchStrength::Medium,
            "POSSIBLE" => MatchStrength::Possible,
            "WEAK" => MatchStrength::Weak,
            other => MatchStrength::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MatchStrength::Exact => "EXACT",
            MatchStrength::Strong => "STRONG",
            MatchStrength::Medium => "MEDIUM",
            MatchStrength::Possible => "POSSIBLE",
            MatchStrength::Weak => "WEAK",
            MatchStrength::Other(raw) => raw,
        }
    }
}

impl Serialize for MatchStrength {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for MatchStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One watchlist hit returned for a case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub name: Option<String>,
    /// 0–100
    pub score: Option<f64>,
    pub strength: Option<MatchStrength>,
    pub countries: Vec<String>,
    pub categories: Vec<String>,
    /// Identifier type → value, first occurrence wins
    pub identifiers: BTreeMap<String, String>,
}

impl MatchCandidate {
    /// `EXACT`/`STRONG` label, or a score of at least 90.
    pub fn is_strong(&self) -> bool {
        let strong_label = matches!(
            self.strength,
            Some(MatchStrength::Exact) | Some(MatchStrength::Strong)
        );
        let strong_score = self.score.is_some_and(|s| s >= STRONG_SCORE_THRESHOLD);
        strong_label || strong_score
    }

    pub fn identifier(&self, kind: &str) -> Option<&str> {
        self.identifiers.get(kind).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Clear,
    Alert,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertLevel::Clear => "CLEAR",
            AlertLevel::Alert => "ALERT",
        })
    }
}

/// Normalized outcome of a case submission.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningResult {
    pub case_id: String,
    pub entity_name: String,
    pub generated_at: DateTime<Utc>,
    /// In response order
    pub matches: Vec<MatchCandidate>,
    pub alert_level: AlertLevel,
}

impl ScreeningResult {
    pub fn strong_matches(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.matches.iter().filter(|m| m.is_strong())
    }

    /// First strong match in response order. Never re-sorted.
    pub fn top_hit(&self) -> Option<&MatchCandidate> {
        self.strong_matches().next()
    }

    /// OFAC SDN number of the top hit, or [`MISSING`].
    pub fn ofac_number(&self) -> &str {
        self.top_hit()
            .and_then(|hit| hit.identifier(OFAC_IDENTIFIER_TYPE))
            .unwrap_or(MISSING)
    }

    /// Flattened record for downstream automation.
    pub fn summary(&self) -> CaseSummary {
        let strong: Vec<&MatchCandidate> = self.strong_matches().collect();
        let top = strong.first().copied();

        let strong_matches_summary = if strong.is_empty() {
            MISSING.to_string()
        } else {
            strong
                .iter()
                .take(5)
                .enumerate()
                .map(|(i, m)| {
                    let categories = if m.categories.is_empty() {
                        "N/A".to_string()
                    } else {
                        m.categories.join(", ")
                    };
                    format!(
                        "{}. {} ({}%) - {}",
                        i + 1,
                        m.name.as_deref().unwrap_or("Unknown"),
                        m.score.unwrap_or(0.0),
                        categories
                    )
                })
                .collect::<Vec<_>>()
                .join(" | ")
        };

        CaseSummary {
            entity_name: self.entity_name.clone(),
            case_id: self.case_id.clone(),
            screened_at: self.generated_at,
            status: self.alert_level,
            total_matches: self.matches.len(),
            strong_match_count: strong.len(),
            top_hit_name: top
                .and_then(|m| m.name.clone())
                .unwrap_or_else(|| MISSING.into()),
            top_hit_score: top.and_then(|m| m.score).unwrap_or(0.0),
            top_hit_strength: top
                .and_then(|m| m.strength.as_ref())
                .map(|s| s.to_string())
                .unwrap_or_else(|| MISSING.into()),
            top_hit_country: top
                .and_then(|m| m.countries.first().cloned())
                .unwrap_or_else(|| MISSING.into()),
            top_hit_categories: top
                .filter(|m| !m.categories.is_empty())
                .map(|m| m.categories.join(", "))
                .unwrap_or_else(|| MISSING.into()),
            ofac_number: self.ofac_number().to_string(),
            strong_matches_summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub entity_name: String,
    pub case_id: String,
    pub screened_at: DateTime<Utc>,
    pub status: AlertLevel,
    pub total_matches: usize,
    pub strong_match_count: usize,
    pub top_hit_name: String,
    pub top_hit_score: f64,
    pub top_hit_strength: String,
    pub top_hit_country: String,
    pub top_hit_categories: String,
    pub ofac_number: String,
    pub strong_matches_summary: String,
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// What to include in a case dossier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub report_type: String,
    /// Defaults to `Dossier_<case id>`
    pub report_name: Option<String>,
    pub provider_type: String,
    pub include_unresolved_matches: bool,
    pub include_positive_matches: bool,
    pub include_false_matches: bool,
    pub include_possible_matches: bool,
    pub include_audit: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report_type: "CASE_DOSSIER".into(),
            report_name: None,
            provider_type: WATCHLIST_PROVIDER.into(),
            include_unresolved_matches: true,
            include_positive_matches: true,
            include_false_matches: true,
            include_possible_matches: true,
            include_audit: true,
        }
    }
}

impl ReportOptions {
    /// `(match filters;providerType==X),(includeAudit==B)`
    pub fn report_filter(&self) -> String {
        format!(
            "(includeUnresolvedMatches=={};includePositiveMatches=={};includeFalseMatches=={};includePossibleMatches=={};providerType=={}),(includeAudit=={})",
            self.include_unresolved_matches,
            self.include_positive_matches,
            self.include_false_matches,
            self.include_possible_matches,
            self.provider_type,
            self.include_audit,
        )
    }
}

/// Selects one case's dossier.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub case_id: String,
    pub group_id: String,
    pub creation_date: NaiveDate,
    pub options: ReportOptions,
}

impl ReportRequest {
    pub fn to_payload(&self) -> ReportPayload {
        ReportPayload {
            query: format!("caseId=={}", self.case_id),
            filter: format!(
                "groupId=={};creationDate=={}",
                self.group_id,
                self.creation_date.format("%Y-%m-%d")
            ),
            report_type: self.options.report_type.clone(),
            report_name: self
                .options
                .report_name
                .clone()
                .unwrap_or_else(|| format!("Dossier_{}", self.case_id)),
            report_filter: self.options.report_filter(),
        }
    }
}

/// Wire body for `POST /reports`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub query: String,
    pub filter: String,
    pub report_type: String,
    pub report_name: String,
    pub report_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportState {
    Requested,
    InProgress,
    Completed,
    Failed,
    TimedOut,
}

impl ReportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReportState::Completed | ReportState::Failed | ReportState::TimedOut
        )
    }
}

/// Successful end of the report workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub report_id: String,
    pub state: ReportState,
    /// Status checks used, including the one that saw `COMPLETED`
    pub attempts: u32,
}
