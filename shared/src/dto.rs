//! Data model of the evaluation pipeline: documents, typed stage outputs,
//! the gate outcome and the durable evaluation record.
//!
//! Model output is validated once at the boundary (`from_value`) with
//! default substitution for missing or malformed fields; everything after
//! that point works on typed values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::error::{truncate_message, EvalError};

/// Immutable input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            modified: None,
        }
    }
}

/// The eight fixed rubric items every deck is scored on. Iteration order is
/// the canonical item order used for weights, reports and export rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ItemKey {
    ProblemDefinition,
    SolutionProduct,
    MarketAnalysis,
    BusinessModel,
    Competition,
    GrowthStrategy,
    Team,
    Financials,
}

impl ItemKey {
    pub fn title(&self) -> &'static str {
        match self {
            ItemKey::ProblemDefinition => "Problem Definition",
            ItemKey::SolutionProduct => "Solution & Product",
            ItemKey::MarketAnalysis => "Market Size & Analysis",
            ItemKey::BusinessModel => "Business Model",
            ItemKey::Competition => "Competitive Analysis",
            ItemKey::GrowthStrategy => "Growth Strategy",
            ItemKey::Team => "Key People & Team",
            ItemKey::Financials => "Financial Plan",
        }
    }
}

/// Per-item evaluation from Stage 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemEvaluation {
    pub score: f64,
    pub comment: String,
    pub feedback: String,
}

/// Structured Stage-1 output (absolute logic/completeness evaluation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage1Result {
    pub company_name: String,
    pub one_line_summary: String,
    pub overall_summary: String,
    pub logic_score: f64,
    pub pass_gate: bool,
    pub item_evaluations: BTreeMap<String, ItemEvaluation>,
    pub strengths: BTreeMap<String, Vec<String>>,
    pub weaknesses: BTreeMap<String, Vec<String>>,
    pub red_flags: Vec<String>,
    pub verdict: Option<String>,
    pub exception_tag: Option<String>,
}

impl Stage1Result {
    /// Lenient extraction from a raw model object; missing or mistyped
    /// fields become defaults of the right type.
    pub fn from_value(v: &Value) -> Self {
        let mut item_evaluations = BTreeMap::new();
        if let Some(map) = v.get("item_evaluations").and_then(Value::as_object) {
            for (key, item) in map {
                item_evaluations.insert(
                    key.clone(),
                    ItemEvaluation {
                        score: num(item.get("score")),
                        comment: text(item.get("comment")),
                        feedback: text(item.get("feedback")),
                    },
                );
            }
        }
        Self {
            company_name: text(v.get("company_name")),
            one_line_summary: text(v.get("one_line_summary")),
            overall_summary: text(v.get("overall_summary")),
            logic_score: num(v.get("logic_score")),
            pass_gate: false,
            item_evaluations,
            strengths: grouped_lists(v.get("strengths")),
            weaknesses: grouped_lists(v.get("weaknesses")),
            red_flags: string_list(v.get("red_flags")),
            verdict: opt_text(v.get("verdict")),
            exception_tag: opt_text(v.get("exception_tag")),
        }
    }
}

/// Structured Stage-2 output (relative fit along three axes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage2Result {
    pub stage_label: String,
    pub industry_label: String,
    pub stage_score: f64,
    pub industry_score: f64,
    pub bm_score: f64,
    pub axis_comments: BTreeMap<String, String>,
    pub validation_questions: BTreeMap<String, Vec<String>>,
}

impl Stage2Result {
    pub fn from_value(v: &Value) -> Self {
        Self {
            stage_label: text(v.get("stage_label")),
            industry_label: text(v.get("industry_label")),
            stage_score: num(v.get("stage_score")),
            industry_score: num(v.get("industry_score")),
            bm_score: num(v.get("bm_score")),
            axis_comments: string_map(v.get("axis_comments")),
            validation_questions: grouped_lists(v.get("validation_questions")),
        }
    }
}

/// Whether a document cleared the Stage-1 gate, and if so what Stage 2 said.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "gate", content = "stage2", rename_all = "snake_case")]
pub enum GateOutcome {
    Passed(Stage2Result),
    Rejected,
}

impl GateOutcome {
    pub fn stage2(&self) -> Option<&Stage2Result> {
        match self {
            GateOutcome::Passed(s2) => Some(s2),
            GateOutcome::Rejected => None,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, GateOutcome::Passed(_))
    }
}

/// Recommendation labels. Variant order is severity order so promotion
/// checks can compare labels directly.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Recommendation {
    #[strum(to_string = "Hold", serialize = "hold")]
    Hold,
    #[strum(to_string = "Conditional Meet", serialize = "conditional")]
    Conditional,
    #[strum(to_string = "Recommend", serialize = "recommend")]
    Recommend,
}

/// Three views over the same evaluation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerspectiveScores {
    pub critical: u32,
    pub neutral: u32,
    pub positive: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Recommendations {
    pub critical: Recommendation,
    pub neutral: Recommendation,
    pub positive: Recommendation,
}

/// Durable unit of work, keyed by fingerprint. Replaced wholesale on a
/// forced re-run, never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub fingerprint: String,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub stage1: Stage1Result,
    pub gate: GateOutcome,
    pub scores: PerspectiveScores,
    pub recommendations: Recommendations,
    pub final_verdict: Recommendation,
    pub report_md: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Skipped,
    Done,
    Failed,
}

/// Structured failure handed to the presentation layer instead of a raw
/// error chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
    pub file_name: String,
}

impl FailureInfo {
    pub fn from_error(err: &EvalError, file_name: &str) -> Self {
        Self {
            kind: err.kind().into(),
            message: truncate_message(&err.to_string()),
            file_name: file_name.into(),
        }
    }
}

/// Terminal per-document outcome of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub file_name: String,
    pub status: DocumentStatus,
    pub fingerprint: Option<String>,
    pub failure: Option<FailureInfo>,
}

impl BatchOutcome {
    pub fn skipped(file_name: &str, fingerprint: &str) -> Self {
        Self {
            file_name: file_name.into(),
            status: DocumentStatus::Skipped,
            fingerprint: Some(fingerprint.into()),
            failure: None,
        }
    }

    pub fn done(file_name: &str, fingerprint: &str) -> Self {
        Self {
            file_name: file_name.into(),
            status: DocumentStatus::Done,
            fingerprint: Some(fingerprint.into()),
            failure: None,
        }
    }

    pub fn failed(failure: FailureInfo) -> Self {
        Self {
            file_name: failure.file_name.clone(),
            status: DocumentStatus::Failed,
            fingerprint: None,
            failure: Some(failure),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<BatchOutcome>,
    pub failures: Vec<FailureInfo>,
}

impl BatchReport {
    pub fn count(&self, status: DocumentStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

fn num(v: Option<&Value>) -> f64 {
    let n = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn opt_text(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| items.iter().map(|i| text(Some(i))).collect())
        .unwrap_or_default()
}

fn string_map(v: Option<&Value>) -> BTreeMap<String, String> {
    v.and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, val)| (k.clone(), text(Some(val))))
                .collect()
        })
        .unwrap_or_default()
}

fn grouped_lists(v: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    v.and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, val)| (k.clone(), string_list(Some(val))))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage1_defaults_for_missing_fields() {
        let s1 = Stage1Result::from_value(&json!({}));
        assert_eq!(s1.logic_score, 0.0);
        assert!(s1.company_name.is_empty());
        assert!(s1.item_evaluations.is_empty());
        assert!(s1.red_flags.is_empty());
        assert!(s1.verdict.is_none());
    }

    #[test]
    fn stage1_coerces_mistyped_fields() {
        let s1 = Stage1Result::from_value(&json!({
            "logic_score": "85",
            "red_flags": "not a list",
            "item_evaluations": {
                "team": {"score": "7.5", "comment": 3}
            }
        }));
        assert_eq!(s1.logic_score, 85.0);
        assert!(s1.red_flags.is_empty());
        let team = &s1.item_evaluations["team"];
        assert_eq!(team.score, 7.5);
        assert_eq!(team.comment, "3");
    }

    #[test]
    fn non_finite_numbers_become_zero() {
        let s1 = Stage1Result::from_value(&json!({"logic_score": "NaN"}));
        assert_eq!(s1.logic_score, 0.0);
    }

    #[test]
    fn stage2_extracts_labels_and_axes() {
        let s2 = Stage2Result::from_value(&json!({
            "stage_label": "Series A",
            "industry_label": "SaaS",
            "stage_score": 7,
            "industry_score": 6,
            "bm_score": 5,
            "axis_comments": {"stage": "fine"},
            "validation_questions": {"stage": ["q1", "q2"]}
        }));
        assert_eq!(s2.stage_label, "Series A");
        assert_eq!(s2.stage_score, 7.0);
        assert_eq!(s2.axis_comments["stage"], "fine");
        assert_eq!(s2.validation_questions["stage"].len(), 2);
    }

    #[test]
    fn recommendation_order_and_parsing() {
        assert!(Recommendation::Hold < Recommendation::Conditional);
        assert!(Recommendation::Conditional < Recommendation::Recommend);
        assert_eq!(
            "recommend".parse::<Recommendation>().unwrap(),
            Recommendation::Recommend
        );
        assert_eq!(
            "Conditional".parse::<Recommendation>().unwrap(),
            Recommendation::Conditional
        );
        assert!("maybe".parse::<Recommendation>().is_err());
    }

    #[test]
    fn gate_outcome_round_trips_through_json() {
        let passed = GateOutcome::Passed(Stage2Result::default());
        let s = serde_json::to_string(&passed).unwrap();
        let back: GateOutcome = serde_json::from_str(&s).unwrap();
        assert!(back.passed());

        let s = serde_json::to_string(&GateOutcome::Rejected).unwrap();
        let back: GateOutcome = serde_json::from_str(&s).unwrap();
        assert!(back.stage2().is_none());
    }
}
