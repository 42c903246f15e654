//! End-to-end pipeline tests against a scripted oracle: gate behavior,
//! cache idempotence and batch failure isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::batch::BatchRunner;
use shared::cache::CacheStore;
use shared::dto::{Document, DocumentStatus};
use shared::error::{EvalError, Result};
use shared::oracle::Oracle;
use shared::orchestrator::{Orchestrator, OrchestratorCfg};
use shared::prompt::PromptSet;

/// Deterministic stand-in for the LLM service. Stage-1 prompts answer with
/// the logic score embedded in the document text (`LOGIC:nn`); stage-2
/// prompts are recognized by the embedded Stage-1 context block. Documents
/// containing `UPSTREAM_FAIL` always fail.
struct ScriptedOracle {
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn logic_score_from(prompt: &str) -> f64 {
    prompt
        .split("LOGIC:")
        .nth(1)
        .and_then(|rest| {
            rest.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .ok()
        })
        .unwrap_or(50.0)
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn invoke(&self, prompt: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("UPSTREAM_FAIL") {
            return Err(EvalError::Upstream("rate limited".into()));
        }
        if prompt.contains("STAGE1 JSON") {
            return Ok(json!({
                "stage_label": "Series A",
                "industry_label": "SaaS",
                "stage_score": 7,
                "industry_score": 6,
                "bm_score": 5,
                "axis_comments": {"stage": "fits"},
                "validation_questions": {"stage": ["cohort data?"]}
            }));
        }
        Ok(json!({
            "company_name": "Acme",
            "one_line_summary": "Robots for warehouses",
            "overall_summary": "Coherent story.",
            "logic_score": logic_score_from(prompt),
            "item_evaluations": {
                "problem_definition": {"score": 8, "comment": "clear", "feedback": "ok"},
                "team": {"score": 7, "comment": "solid", "feedback": "hire"}
            },
            "red_flags": ["single customer"]
        }))
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }
}

fn setup(oracle: Arc<ScriptedOracle>, dir: &tempfile::TempDir) -> (Arc<Orchestrator>, Arc<CacheStore>) {
    let cfg = OrchestratorCfg {
        gate_threshold: 80.0,
        retries: 0,
        timeout_ms: 5_000,
    };
    let orchestrator = Arc::new(Orchestrator::new(oracle, PromptSet::builtin(), cfg));
    let cache = Arc::new(CacheStore::new(dir.path().join("cache_index.json")));
    (orchestrator, cache)
}

fn doc(name: &str, body: &str) -> Document {
    Document::new(name, body)
}

#[tokio::test]
async fn gate_true_runs_stage_two() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);

    let outcome = orchestrator
        .evaluate(&doc("Acme.md", "pitch LOGIC:85"), false, &cache)
        .await;

    assert_eq!(outcome.status, DocumentStatus::Done);
    assert_eq!(oracle.call_count(), 2);

    let record = cache.get(outcome.fingerprint.as_deref().unwrap()).unwrap();
    assert!(record.gate.passed());
    assert_eq!(record.stage1.logic_score, 85.0);
    let s2 = record.gate.stage2().unwrap();
    assert_eq!(s2.stage_label, "Series A");
    assert!(record.report_md.contains("Stage 2 Axis Scores"));
}

#[tokio::test]
async fn gate_false_skips_stage_two() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);

    let outcome = orchestrator
        .evaluate(&doc("Meh.md", "pitch LOGIC:60"), false, &cache)
        .await;

    assert_eq!(outcome.status, DocumentStatus::Done);
    assert_eq!(oracle.call_count(), 1);

    let record = cache.get(outcome.fingerprint.as_deref().unwrap()).unwrap();
    assert!(!record.gate.passed());
    assert!(record.gate.stage2().is_none());
    assert!(record.report_md.contains("Skipped"));
}

#[tokio::test]
async fn cache_hit_makes_rerun_a_no_op() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);
    let document = doc("Acme.md", "pitch LOGIC:85");

    let first = orchestrator.evaluate(&document, false, &cache).await;
    let calls_after_first = oracle.call_count();
    let before = cache.get(first.fingerprint.as_deref().unwrap()).unwrap();

    let second = orchestrator.evaluate(&document, false, &cache).await;
    assert_eq!(second.status, DocumentStatus::Skipped);
    assert_eq!(oracle.call_count(), calls_after_first);

    let after = cache.get(second.fingerprint.as_deref().unwrap()).unwrap();
    assert_eq!(
        serde_json::to_string(&before).unwrap(),
        serde_json::to_string(&after).unwrap()
    );
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn force_rerun_replaces_the_record() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);
    let document = doc("Acme.md", "pitch LOGIC:85");

    orchestrator.evaluate(&document, false, &cache).await;
    assert_eq!(oracle.call_count(), 2);

    let outcome = orchestrator.evaluate(&document, true, &cache).await;
    assert_eq!(outcome.status, DocumentStatus::Done);
    assert_eq!(oracle.call_count(), 4);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn batch_isolates_failures() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);
    let runner = BatchRunner::new(orchestrator, Arc::clone(&cache), 4);

    let documents = vec![
        doc("a.md", "LOGIC:85"),
        doc("b.md", "LOGIC:60"),
        doc("c.md", "UPSTREAM_FAIL"),
        doc("d.md", "LOGIC:90"),
        doc("e.md", "UPSTREAM_FAIL too"),
    ];
    let report = runner.run(documents, false).await;

    assert_eq!(report.count(DocumentStatus::Done), 3);
    assert_eq!(report.count(DocumentStatus::Failed), 2);
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        assert_eq!(failure.kind, "UpstreamError");
        assert!(failure.message.len() <= shared::error::MAX_ERROR_MESSAGE_LEN);
    }
    let mut failed: Vec<_> = report
        .failures
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["c.md", "e.md"]);

    let (completed, total) = runner.progress().snapshot();
    assert_eq!((completed, total), (5, 5));

    // the batch checkpoint flushed the three good records
    let reloaded = CacheStore::new(dir.path().join("cache_index.json"));
    reloaded.load().await;
    assert_eq!(reloaded.len(), 3);
}

#[tokio::test]
async fn second_batch_skips_cached_documents() {
    let oracle = Arc::new(ScriptedOracle::new());
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, cache) = setup(Arc::clone(&oracle), &dir);
    let runner = BatchRunner::new(orchestrator, cache, 4);

    let docs = || vec![doc("a.md", "LOGIC:85"), doc("b.md", "LOGIC:60")];
    runner.run(docs(), false).await;
    let calls = oracle.call_count();

    let report = runner.run(docs(), false).await;
    assert_eq!(report.count(DocumentStatus::Skipped), 2);
    assert_eq!(oracle.call_count(), calls);
}
