//! Per-document evaluation state machine: Stage 1 always, Stage 2 only when
//! the gate passes, then a deterministic merge into one evaluation record.
//!
//! Every external call is wrapped in its own retry budget; failures are
//! converted into structured failure records at this boundary so one bad
//! document never aborts a batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::dto::{BatchOutcome, Document, EvaluationRecord, FailureInfo, GateOutcome, Stage1Result, Stage2Result};
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::oracle::Oracle;
use crate::prompt::{
    build_stage1_prompt, build_stage2_prompt, stage1_schema_hint, stage2_schema_hint, PromptSet,
};
use crate::report::render_report;
use crate::retry::with_retry;
use crate::scoring;

#[derive(Debug, Clone)]
pub struct OrchestratorCfg {
    /// Stage-1 cut line for the gate decision.
    pub gate_threshold: f64,
    pub retries: usize,
    pub timeout_ms: u64,
}

impl OrchestratorCfg {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            gate_threshold: settings.gate_threshold,
            retries: settings.oracle_retries,
            timeout_ms: settings.oracle_timeout_ms,
        }
    }
}

pub struct Orchestrator {
    oracle: Arc<dyn Oracle>,
    prompts: PromptSet,
    cfg: OrchestratorCfg,
}

impl Orchestrator {
    pub fn new(oracle: Arc<dyn Oracle>, prompts: PromptSet, cfg: OrchestratorCfg) -> Self {
        Self {
            oracle,
            prompts,
            cfg,
        }
    }

    /// Cache key for a document under the current prompts and model.
    pub fn fingerprint_for(&self, doc: &Document) -> String {
        fingerprint(
            &doc.text,
            &self.prompts.stage1,
            &self.prompts.stage2,
            self.oracle.model_id(),
        )
    }

    /// Evaluate one document to a terminal outcome. An identical fingerprint
    /// without `force_rerun` returns the cached record with zero oracle
    /// calls; with it, the old record is replaced wholesale.
    pub async fn evaluate(
        &self,
        doc: &Document,
        force_rerun: bool,
        cache: &CacheStore,
    ) -> BatchOutcome {
        let fp = self.fingerprint_for(doc);

        if !force_rerun && cache.get(&fp).is_some() {
            debug!(file = %doc.name, "cache hit; skipping evaluation");
            return BatchOutcome::skipped(&doc.name, &fp);
        }

        match self.run_stages(doc, &fp).await {
            Ok(record) => {
                info!(
                    file = %doc.name,
                    gate = record.gate.passed(),
                    critical = record.scores.critical,
                    "evaluation complete"
                );
                cache.set(&fp, record);
                BatchOutcome::done(&doc.name, &fp)
            }
            Err(e) => {
                warn!(file = %doc.name, error = %e, "evaluation failed");
                BatchOutcome::failed(FailureInfo::from_error(&e, &doc.name))
            }
        }
    }

    async fn run_stages(&self, doc: &Document, fp: &str) -> Result<EvaluationRecord> {
        let stage1_prompt =
            build_stage1_prompt(&self.prompts.stage1, stage1_schema_hint(), &doc.text);
        let raw1 = with_retry("stage1", self.cfg.retries, self.cfg.timeout_ms, || {
            self.oracle.invoke(&stage1_prompt)
        })
        .await?;

        let mut stage1 = Stage1Result::from_value(&raw1);
        stage1.logic_score = stage1.logic_score.clamp(0.0, 100.0);
        stage1.pass_gate = stage1.logic_score >= self.cfg.gate_threshold;

        let gate = if stage1.pass_gate {
            let stage1_block = serde_json::to_string(&stage1).unwrap_or_default();
            let stage2_prompt = build_stage2_prompt(
                &self.prompts.stage2,
                stage2_schema_hint(),
                &doc.text,
                &stage1_block,
            );
            let raw2 = with_retry("stage2", self.cfg.retries, self.cfg.timeout_ms, || {
                self.oracle.invoke(&stage2_prompt)
            })
            .await?;
            GateOutcome::Passed(Stage2Result::from_value(&raw2))
        } else {
            debug!(file = %doc.name, score = stage1.logic_score, "gate rejected; stage 2 skipped");
            GateOutcome::Rejected
        };

        let scores = scoring::perspective_scores(&stage1, &gate);
        let recommendations = scoring::recommendations(&scores);
        let final_verdict = scoring::final_verdict(&stage1, &scores);

        let mut record = EvaluationRecord {
            fingerprint: fp.to_string(),
            file_name: doc.name.clone(),
            timestamp: Utc::now(),
            stage1,
            gate,
            scores,
            recommendations,
            final_verdict,
            report_md: String::new(),
        };
        record.report_md = render_report(&record);
        Ok(record)
    }
}
