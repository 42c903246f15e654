//! Report rendering and tabular export: pure, stateless projections of an
//! `EvaluationRecord`. Rendering the same record twice yields byte-identical
//! output; the timestamp comes from the record, never from the clock.

use serde_json::json;
use strum::IntoEnumIterator;

use crate::dto::{EvaluationRecord, ItemKey};

/// Fixed export column set; order is part of the contract.
pub const SHEET_COLUMNS: [&str; 19] = [
    "timestamp_utc",
    "file_name",
    "company_name",
    "company_description",
    "score_critical",
    "score_neutral",
    "score_positive",
    "recommendation_critical",
    "recommendation_neutral",
    "recommendation_positive",
    "overall_summary",
    "item_evaluations_json",
    "strengths_json",
    "weaknesses_json",
    "red_flags_json",
    "axis_scores_json",
    "axis_comments_json",
    "validation_questions_json",
    "final_verdict",
];

fn json_cell<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// One Markdown report per evaluated document.
pub fn render_report(record: &EvaluationRecord) -> String {
    let s1 = &record.stage1;
    let mut lines: Vec<String> = vec![
        format!("# IR Evaluation Report - {}", record.file_name),
        String::new(),
        format!("Generated: {}", record.timestamp.to_rfc3339()),
        String::new(),
        "## Summary".into(),
        format!("- Company: {}", s1.company_name),
        format!("- One-line: {}", s1.one_line_summary),
        format!(
            "- Stage 1 logic score: {} / gate passed: {}",
            s1.logic_score,
            record.gate.passed()
        ),
        String::new(),
        "| Perspective | Score | Recommendation |".into(),
        "|---|---|---|".into(),
        format!(
            "| critical | {} | {} |",
            record.scores.critical, record.recommendations.critical
        ),
        format!(
            "| neutral | {} | {} |",
            record.scores.neutral, record.recommendations.neutral
        ),
        format!(
            "| positive | {} | {} |",
            record.scores.positive, record.recommendations.positive
        ),
        String::new(),
        "## Overall Assessment".into(),
        s1.overall_summary.clone(),
        String::new(),
        "## Item Evaluations".into(),
        "| Item | Score | Comment | Feedback |".into(),
        "|---|---|---|---|".into(),
    ];

    for key in ItemKey::iter() {
        let item = s1.item_evaluations.get(key.as_ref()).cloned().unwrap_or_default();
        lines.push(format!(
            "| {} | {} | {} | {} |",
            key.title(),
            item.score,
            item.comment.replace('\n', " "),
            item.feedback.replace('\n', " "),
        ));
    }

    lines.push(String::new());
    lines.push("## Strengths (Investor View)".into());
    push_grouped(&mut lines, &s1.strengths);
    lines.push(String::new());
    lines.push("## Weaknesses (Investor View)".into());
    push_grouped(&mut lines, &s1.weaknesses);

    lines.push(String::new());
    lines.push("## Red Flags".into());
    if s1.red_flags.is_empty() {
        lines.push("- none".into());
    } else {
        for flag in &s1.red_flags {
            lines.push(format!("- {flag}"));
        }
    }

    match record.gate.stage2() {
        Some(s2) => {
            lines.push(String::new());
            lines.push("## Stage 2 Axis Scores".into());
            lines.push(format!(
                "- stage/industry/BM: {} / {} / {} ({} x {})",
                s2.stage_score, s2.industry_score, s2.bm_score, s2.stage_label, s2.industry_label
            ));
            lines.push(String::new());
            lines.push("## Axis Comments".into());
            for (axis, comment) in &s2.axis_comments {
                lines.push(format!("- {axis}: {comment}"));
            }
            lines.push(String::new());
            lines.push("## Validation Questions".into());
            push_grouped(&mut lines, &s2.validation_questions);
        }
        None => {
            lines.push(String::new());
            lines.push("## Stage 2".into());
            lines.push("Skipped: the document did not clear the Stage-1 gate.".into());
        }
    }

    lines.push(String::new());
    lines.push(format!("**Final verdict: {}**", record.final_verdict));
    lines.push(String::new());

    lines.join("\n")
}

fn push_grouped(
    lines: &mut Vec<String>,
    groups: &std::collections::BTreeMap<String, Vec<String>>,
) {
    if groups.is_empty() {
        lines.push("- none".into());
        return;
    }
    for (group, entries) in groups {
        lines.push(format!("### {group}"));
        for entry in entries {
            lines.push(format!("- {entry}"));
        }
    }
}

/// One export row per record, aligned with [`SHEET_COLUMNS`].
pub fn sheet_row(record: &EvaluationRecord) -> Vec<String> {
    let s1 = &record.stage1;
    let axis_scores = match record.gate.stage2() {
        Some(s2) => json!({
            "stage": s2.stage_score,
            "industry": s2.industry_score,
            "bm": s2.bm_score,
        }),
        None => json!({"stage": "", "industry": "", "bm": ""}),
    };
    let (axis_comments, validation_questions) = match record.gate.stage2() {
        Some(s2) => (
            json_cell(&s2.axis_comments),
            json_cell(&s2.validation_questions),
        ),
        None => ("{}".to_string(), "{}".to_string()),
    };

    vec![
        record.timestamp.to_rfc3339(),
        record.file_name.clone(),
        s1.company_name.clone(),
        s1.one_line_summary.clone(),
        record.scores.critical.to_string(),
        record.scores.neutral.to_string(),
        record.scores.positive.to_string(),
        record.recommendations.critical.to_string(),
        record.recommendations.neutral.to_string(),
        record.recommendations.positive.to_string(),
        s1.overall_summary.clone(),
        json_cell(&s1.item_evaluations),
        json_cell(&s1.strengths),
        json_cell(&s1.weaknesses),
        json_cell(&s1.red_flags),
        json_cell(&axis_scores),
        axis_comments,
        validation_questions,
        record.final_verdict.to_string(),
    ]
}
