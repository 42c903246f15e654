//! Full-stack batch test: real chat oracle against a mocked completion
//! endpoint, through the orchestrator and batch runner into the cache blob.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::batch::BatchRunner;
use shared::cache::CacheStore;
use shared::dto::{Document, DocumentStatus};
use shared::oracle::ChatOracle;
use shared::orchestrator::{Orchestrator, OrchestratorCfg};
use shared::prompt::PromptSet;

fn completion(content: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "created": 0,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": content.to_string()}
        }]
    })
}

#[tokio::test]
async fn batch_runs_end_to_end_and_persists() {
    let server = MockServer::start().await;
    // every call answers the same ungated stage-1 object; logic 60 keeps the
    // pipeline to one call per document
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "company_name": "Acme",
            "one_line_summary": "Robots",
            "overall_summary": "Thin evidence.",
            "logic_score": 60,
            "item_evaluations": {
                "problem_definition": {"score": 6, "comment": "ok", "feedback": "ok"}
            }
        }))))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache_index.json");

    let oracle = Arc::new(ChatOracle::new(&server.uri(), "key", "gpt-4o", 2));
    let orchestrator = Arc::new(Orchestrator::new(
        oracle,
        PromptSet::builtin(),
        OrchestratorCfg {
            gate_threshold: 80.0,
            retries: 0,
            timeout_ms: 5_000,
        },
    ));
    let cache = Arc::new(CacheStore::new(&cache_path));
    cache.load().await;
    let runner = BatchRunner::new(orchestrator, Arc::clone(&cache), 4);

    let documents = vec![
        Document::new("a.md", "deck a"),
        Document::new("b.md", "deck b"),
    ];
    let report = runner.run(documents, false).await;

    assert_eq!(report.count(DocumentStatus::Done), 2);
    assert!(report.failures.is_empty());

    let reloaded = CacheStore::new(&cache_path);
    reloaded.load().await;
    assert_eq!(reloaded.len(), 2);
    for record in reloaded.records() {
        assert!(!record.gate.passed());
        assert_eq!(record.stage1.company_name, "Acme");
        assert!(record.report_md.contains("Skipped"));
    }
}
