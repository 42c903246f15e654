//! Deterministic scoring: weight blending, perspective scores,
//! recommendation ladder and final-verdict derivation.
//!
//! Everything here is a pure function of the stage outputs. The mixing
//! coefficients, offsets, caps and cut lines are named constants; product
//! revisions tune them here and nowhere else.

use strum::IntoEnumIterator;

use crate::dto::{
    GateOutcome, ItemKey, PerspectiveScores, Recommendation, Recommendations, Stage1Result,
};

pub const ITEM_COUNT: usize = 8;

/// Mixing coefficients for the base score.
pub const LOGIC_MIX: f64 = 0.5;
pub const ITEM_MIX: f64 = 0.3;
pub const AXIS_MIX: f64 = 0.2;

/// Perspective spread around the base score.
pub const PERSPECTIVE_OFFSET: f64 = 6.0;
/// No perspective score ever reaches 100.
pub const PERSPECTIVE_CAP: u32 = 92;

/// Recommendation ladder cut lines.
pub const RECOMMEND_CUTOFF: u32 = 80;
pub const CONDITIONAL_CUTOFF: u32 = 70;

/// Each Stage-2 axis is scored 0-10; three axes normalize against 30.
pub const AXIS_MAX: f64 = 10.0;
pub const AXIS_TOTAL: f64 = 30.0;

const DEFAULT_WEIGHTS: [f64; ITEM_COUNT] = [0.125; ITEM_COUNT];

// Per-stage emphasis, row order = ItemKey declaration order. Rows sum to 1.
const SEED_WEIGHTS: [f64; ITEM_COUNT] = [0.18, 0.18, 0.12, 0.10, 0.08, 0.10, 0.16, 0.08];
const PRE_SEED_WEIGHTS: [f64; ITEM_COUNT] = [0.19, 0.18, 0.12, 0.08, 0.08, 0.10, 0.17, 0.08];
const SERIES_A_WEIGHTS: [f64; ITEM_COUNT] = [0.10, 0.12, 0.18, 0.16, 0.10, 0.16, 0.10, 0.08];
const SERIES_B_WEIGHTS: [f64; ITEM_COUNT] = [0.08, 0.10, 0.14, 0.20, 0.14, 0.16, 0.08, 0.10];

const SAAS_WEIGHTS: [f64; ITEM_COUNT] = [0.10, 0.12, 0.18, 0.18, 0.14, 0.14, 0.08, 0.06];
const COMMERCE_WEIGHTS: [f64; ITEM_COUNT] = [0.10, 0.10, 0.18, 0.20, 0.12, 0.16, 0.08, 0.06];
const BIO_WEIGHTS: [f64; ITEM_COUNT] = [0.16, 0.18, 0.12, 0.10, 0.10, 0.10, 0.14, 0.10];
const DEEPTECH_WEIGHTS: [f64; ITEM_COUNT] = [0.14, 0.20, 0.12, 0.10, 0.12, 0.10, 0.14, 0.08];

/// Unrecognized labels fall back to the uniform default row.
fn stage_weights(label: &str) -> &'static [f64; ITEM_COUNT] {
    match label {
        "Seed" => &SEED_WEIGHTS,
        "Pre-Seed" => &PRE_SEED_WEIGHTS,
        "Series A" => &SERIES_A_WEIGHTS,
        "Series B+" => &SERIES_B_WEIGHTS,
        _ => &DEFAULT_WEIGHTS,
    }
}

fn industry_weights(label: &str) -> &'static [f64; ITEM_COUNT] {
    match label {
        "SaaS" => &SAAS_WEIGHTS,
        "Commerce" => &COMMERCE_WEIGHTS,
        "Bio-Healthcare" => &BIO_WEIGHTS,
        "DeepTech" => &DEEPTECH_WEIGHTS,
        _ => &DEFAULT_WEIGHTS,
    }
}

/// Effective per-item weights: the mean of {default, stage row, industry
/// row}, re-normalized to sum to 1. The default row always participates so
/// no emphasis shift ever fully discards it.
pub fn combined_weights(stage_label: &str, industry_label: &str) -> [f64; ITEM_COUNT] {
    let stage = stage_weights(stage_label);
    let industry = industry_weights(industry_label);
    let mut combined = [0.0; ITEM_COUNT];
    for i in 0..ITEM_COUNT {
        combined[i] = (DEFAULT_WEIGHTS[i] + stage[i] + industry[i]) / 3.0;
    }
    let total: f64 = combined.iter().sum();
    let total = if total > 0.0 { total } else { 1.0 };
    for w in &mut combined {
        *w /= total;
    }
    combined
}

fn clamp_score(raw: f64, max: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Weighted sum of the eight item scores, scaled to 0-100.
pub fn weighted_item_score(stage1: &Stage1Result, gate: &GateOutcome) -> f64 {
    let (stage_label, industry_label) = match gate.stage2() {
        Some(s2) => (s2.stage_label.as_str(), s2.industry_label.as_str()),
        None => ("", ""),
    };
    let weights = combined_weights(stage_label, industry_label);
    let mut total = 0.0;
    for (i, key) in ItemKey::iter().enumerate() {
        let raw = stage1
            .item_evaluations
            .get(key.as_ref())
            .map(|e| e.score)
            .unwrap_or(0.0);
        total += clamp_score(raw, 10.0) * weights[i];
    }
    clamp_score(total, 10.0) * 10.0
}

/// Stage-2 axis total normalized to 0-100; zero when the gate rejected.
pub fn normalized_axis_score(gate: &GateOutcome) -> f64 {
    match gate.stage2() {
        Some(s2) => {
            let sum = clamp_score(s2.stage_score, AXIS_MAX)
                + clamp_score(s2.industry_score, AXIS_MAX)
                + clamp_score(s2.bm_score, AXIS_MAX);
            sum / AXIS_TOTAL * 100.0
        }
        None => 0.0,
    }
}

fn cap(raw: f64) -> u32 {
    let bounded = clamp_score(raw, f64::from(PERSPECTIVE_CAP));
    bounded.round() as u32
}

/// Critical/neutral/positive views: fixed offsets around one base number,
/// clamped to [0, PERSPECTIVE_CAP].
pub fn perspective_scores(stage1: &Stage1Result, gate: &GateOutcome) -> PerspectiveScores {
    let logic = clamp_score(stage1.logic_score, 100.0);
    let items = weighted_item_score(stage1, gate);
    let axis = normalized_axis_score(gate);
    let base = LOGIC_MIX * logic + ITEM_MIX * items + AXIS_MIX * axis;
    PerspectiveScores {
        critical: cap(base - PERSPECTIVE_OFFSET),
        neutral: cap(base),
        positive: cap(base + PERSPECTIVE_OFFSET),
    }
}

pub fn recommendation_for(score: u32) -> Recommendation {
    if score >= RECOMMEND_CUTOFF {
        Recommendation::Recommend
    } else if score >= CONDITIONAL_CUTOFF {
        Recommendation::Conditional
    } else {
        Recommendation::Hold
    }
}

pub fn recommendations(scores: &PerspectiveScores) -> Recommendations {
    Recommendations {
        critical: recommendation_for(scores.critical),
        neutral: recommendation_for(scores.neutral),
        positive: recommendation_for(scores.positive),
    }
}

/// Final verdict: the upstream-declared label when recognized, except that
/// a promotion above the numeric ladder is only honored together with an
/// explicit exception tag. Otherwise the ladder on the critical view wins.
pub fn final_verdict(stage1: &Stage1Result, scores: &PerspectiveScores) -> Recommendation {
    let numeric = recommendation_for(scores.critical);
    match stage1
        .verdict
        .as_deref()
        .and_then(|v| v.parse::<Recommendation>().ok())
    {
        Some(declared) if declared <= numeric => declared,
        Some(declared) if stage1.exception_tag.is_some() => declared,
        _ => numeric,
    }
}
