//! Versioned prompt text and machine schema hints for the two evaluation
//! stages. Prompts are identified by content hash; editing the text below
//! changes the hash and transparently invalidates cached evaluations.

use once_cell::sync::Lazy;
use serde_json::json;

use crate::fingerprint::hash_text;

pub const BASE_RUBRIC: &str = r#"# ROLE (FIXED)

You are a notoriously demanding senior investment associate. Do not be swayed
by emotional appeals or polished phrasing in the IR deck. Judge every claim
through exactly three questions before assigning a conservative score:

1) Is it true?  -> Is there evidence-backed data
2) So what?     -> Does it matter to an investor
3) Why you?     -> Why can only this team do it

Treat unproven claims as hypotheses and deduct for them. Deduct hard for
unmanaged logical leaps. You are a pessimistic reviewer who trusts only
evidence-backed data and strict causality.

# CONSTITUTION (ABSOLUTE)

Follow the evaluation criteria below as a constitution. Do not loosen the
criteria or expand their interpretation on your own.

# HARD RULES (NON-NEGOTIABLE)

1. Output must match the supplied JSON schema hints exactly.
2. Strengths and weaknesses must be written from an investor's perspective.
3. Score coldly; deduct at every doubtful point.

# OVERALL GOAL

"Is this company logically convincing, and is it above average for its
industry x investment stage x business model?"

## [STAGE 1] IR logic and completeness (GATE / ABSOLUTE)

- Total: 0-100
- Cut line: 80. Below 80 the meeting decision is NO and Stage 2 is skipped.

Evaluate logical roles, not slide polish:
- Is the problem concrete about who, why, and how much it matters
- Is problem -> solution a mechanism, not a feature list
- Do claim -> evidence -> conclusion line up one to one
- Are logical leaps recognized and managed
- Is the story consistent (Problem -> Solution -> Market -> BM -> Growth)
- Are investor questions (Why now / Why you / Why this way) answered upfront
- Can the core message be compressed into one sentence

Deduct for abstract adjectives ("innovative", "world first"), for TAM
inflation without a credible SOM, and for claims not matched 1:1 by data.

## [STAGE 2] Industry x stage x business-model fit (RELATIVE / BONUS)

Only for companies that passed Stage 1.

- Stage fit: 0-10, industry fit: 0-10, business-model fit: 0-10.
- 8-10: clearly above benchmark with hard data. 5-7: average, plausible
  hypotheses but thin time series. 0-4: missing the evidence that must
  exist under these conditions.

Stage expectations: Seed/Pre-Seed need an earned secret, founder-market
fit and early fanatic users. Series A needs LTV/CAC >= 3, cohort retention
and improving GTM efficiency. Series B+ needs NRR >= 110%, operating
leverage and a structural moat.

Industry yardsticks: SaaS wants churn < 3%, CAC payback < 8-12 months and
proprietary data or engines. Commerce wants CM2 profitability and repeat
rates 1.5x the category average. Bio/healthcare/deep tech want a clear
regulatory and reimbursement roadmap and comparative data.

Business models: subscription -> retention, NRR, unit economics;
transactional -> GMV x frequency x margin; advertising -> engagement, ARPU,
network effects; licensing -> contract structure and milestones;
hardware -> cost, margin and scale structure."#;

pub const APPENDIX: &str = r#"Additional instructions:
1) Stage 1/Stage 2 JSON must follow the schema hints exactly.
2) Item evaluations are fixed to: problem_definition, solution_product,
   market_analysis, business_model, competition, growth_strategy, team,
   financials.
3) item_evaluations must carry score (0-10), comment and feedback per item.
4) strengths/weaknesses are written strictly from an investor's view.
5) overall_summary is mandatory.
6) Comments run 5-8 sentences, feedback 4-5 sentences, written like a
   professional VC memo with numbers and causal reasoning, and concrete,
   actionable improvement advice.
7) Stage 2 must include stage_label (Seed/Pre-Seed/Series A/Series B+/
   Unknown) and industry_label (SaaS/Commerce/Bio-Healthcare/DeepTech/
   Other).
8) Score conservatively in proportion to rigor of evidence, and keep the
   perspectives distinguishable."#;

static STAGE1_SCHEMA_HINT: Lazy<String> = Lazy::new(|| {
    json!({
        "company_name": "string",
        "one_line_summary": "string",
        "overall_summary": "string",
        "logic_score": "number 0-100",
        "pass_gate": "boolean (logic_score >= gate threshold)",
        "item_evaluations": {
            "problem_definition": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "solution_product": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "market_analysis": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "business_model": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "competition": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "growth_strategy": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "team": {"score": "number 0-10", "comment": "string", "feedback": "string"},
            "financials": {"score": "number 0-10", "comment": "string", "feedback": "string"}
        },
        "strengths": {"market": "list[str]", "team": "list[str]", "product": "list[str]"},
        "weaknesses": {"market": "list[str]", "team": "list[str]", "product": "list[str]"},
        "red_flags": "list[str]",
        "verdict": "string (recommend/conditional/hold), optional",
        "exception_tag": "string, only when overriding the numeric verdict"
    })
    .to_string()
});

static STAGE2_SCHEMA_HINT: Lazy<String> = Lazy::new(|| {
    json!({
        "stage_label": "string (Seed/Pre-Seed/Series A/Series B+/Unknown)",
        "industry_label": "string (SaaS/Commerce/Bio-Healthcare/DeepTech/Other)",
        "stage_score": "number 0-10",
        "industry_score": "number 0-10",
        "bm_score": "number 0-10",
        "axis_comments": {"stage": "string", "industry": "string", "bm": "string"},
        "validation_questions": {"stage": "list[str]", "industry": "list[str]", "bm": "list[str]"}
    })
    .to_string()
});

pub fn stage1_schema_hint() -> &'static str {
    &STAGE1_SCHEMA_HINT
}

pub fn stage2_schema_hint() -> &'static str {
    &STAGE2_SCHEMA_HINT
}

/// The two prompt slots. Both default to the built-in rubric; a caller may
/// substitute its own revision, which changes the hashes and thereby the
/// cache fingerprints.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub stage1: String,
    pub stage2: String,
}

impl PromptSet {
    pub fn builtin() -> Self {
        let text = format!("{BASE_RUBRIC}\n\n{APPENDIX}");
        Self {
            stage1: text.clone(),
            stage2: text,
        }
    }

    pub fn stage1_hash(&self) -> String {
        hash_text(&self.stage1)
    }

    pub fn stage2_hash(&self) -> String {
        hash_text(&self.stage2)
    }
}

pub fn build_stage1_prompt(prompt: &str, schema_hint: &str, content: &str) -> String {
    format!(
        "{prompt}\n\nJSON schema hints:\n{schema_hint}\n\nIR full text:\n{content}\n\nReturn JSON only."
    )
}

/// Stage 2 judges relative fit assuming the document already cleared the
/// absolute bar, so the full Stage-1 JSON rides along as context.
pub fn build_stage2_prompt(
    prompt: &str,
    schema_hint: &str,
    content: &str,
    stage1_json: &str,
) -> String {
    format!(
        "{prompt}\n\nJSON schema hints:\n{schema_hint}\n\nSTAGE1 JSON:\n{stage1_json}\n\nIR full text:\n{content}\n\nReturn JSON only."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_hashes_are_stable_and_distinct_per_slot_content() {
        let a = PromptSet::builtin();
        let b = PromptSet::builtin();
        assert_eq!(a.stage1_hash(), b.stage1_hash());

        let mut c = PromptSet::builtin();
        c.stage2.push_str("\nrevised");
        assert_ne!(a.stage2_hash(), c.stage2_hash());
        assert_eq!(a.stage1_hash(), c.stage1_hash());
    }

    #[test]
    fn stage2_prompt_embeds_stage1_context() {
        let p = build_stage2_prompt("rubric", "{}", "deck text", r#"{"logic_score":85}"#);
        assert!(p.contains("STAGE1 JSON"));
        assert!(p.contains(r#"{"logic_score":85}"#));
        assert!(p.contains("deck text"));
    }

    #[test]
    fn schema_hints_are_json() {
        serde_json::from_str::<serde_json::Value>(stage1_schema_hint()).unwrap();
        serde_json::from_str::<serde_json::Value>(stage2_schema_hint()).unwrap();
    }
}
