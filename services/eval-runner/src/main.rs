//! Thin HTTP shell around the evaluation pipeline: resolves configuration,
//! wires the oracle, cache and batch runner together, and exposes the
//! pipeline to the presentation layer. All evaluation semantics live in
//! `shared`.

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use shared::batch::BatchRunner;
use shared::cache::CacheStore;
use shared::config::Settings;
use shared::dto::Document;
use shared::oracle::ChatOracle;
use shared::orchestrator::{Orchestrator, OrchestratorCfg};
use shared::prompt::PromptSet;
use shared::report::{sheet_row, SHEET_COLUMNS};

#[derive(Clone)]
struct AppState {
    runner: Arc<BatchRunner>,
    cache: Arc<CacheStore>,
}

/// What the presentation layer sends: the documents to evaluate and whether
/// to bypass the cache.
#[derive(Debug, Deserialize)]
struct BatchRequest {
    documents: Vec<Document>,
    #[serde(default)]
    force_rerun: bool,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

async fn evaluate(state: web::Data<AppState>, req: web::Json<BatchRequest>) -> impl Responder {
    let BatchRequest {
        documents,
        force_rerun,
    } = req.into_inner();
    let report = state.runner.run(documents, force_rerun).await;
    HttpResponse::Ok().json(report)
}

async fn progress(state: web::Data<AppState>) -> impl Responder {
    let (completed, total) = state.runner.progress().snapshot();
    HttpResponse::Ok().json(json!({"completed": completed, "total": total}))
}

async fn list_records(state: web::Data<AppState>) -> impl Responder {
    let summaries: Vec<_> = state
        .cache
        .records()
        .into_iter()
        .map(|r| {
            json!({
                "fingerprint": r.fingerprint,
                "file_name": r.file_name,
                "timestamp": r.timestamp,
                "company_name": r.stage1.company_name,
                "scores": r.scores,
                "final_verdict": r.final_verdict,
            })
        })
        .collect();
    HttpResponse::Ok().json(summaries)
}

async fn get_report(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.cache.get(&path.into_inner()) {
        Some(record) => HttpResponse::Ok()
            .content_type("text/markdown; charset=utf-8")
            .body(record.report_md),
        None => HttpResponse::NotFound().json(json!({"error": "unknown fingerprint"})),
    }
}

async fn export(state: web::Data<AppState>) -> impl Responder {
    let rows: Vec<Vec<String>> = state.cache.records().iter().map(sheet_row).collect();
    HttpResponse::Ok().json(json!({"columns": SHEET_COLUMNS, "rows": rows}))
}

async fn clear_cache(state: web::Data<AppState>) -> impl Responder {
    state.cache.clear();
    match state.cache.save().await {
        Ok(()) => HttpResponse::Ok().json(json!({"cleared": true})),
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": e.to_string()})),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings = Settings::new()?;
    info!(
        model = %settings.model_name,
        max_parallel = settings.max_parallel,
        oracle_concurrency = settings.oracle_concurrency,
        gate_threshold = settings.gate_threshold,
        "starting eval-runner"
    );

    let oracle = Arc::new(ChatOracle::from_settings(&settings));
    let cache = Arc::new(CacheStore::new(&settings.cache_path));
    cache.load().await;
    info!(records = cache.len(), "cache ready");

    let orchestrator = Arc::new(Orchestrator::new(
        oracle,
        PromptSet::builtin(),
        OrchestratorCfg::from_settings(&settings),
    ));
    let runner = Arc::new(BatchRunner::new(
        orchestrator,
        Arc::clone(&cache),
        settings.max_parallel,
    ));

    let state = AppState { runner, cache };
    let bind_addr = format!("{}:{}", settings.http_bind, settings.http_port);
    info!(%bind_addr, "starting server");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/healthz", web::get().to(health))
            .route("/evaluate", web::post().to(evaluate))
            .route("/progress", web::get().to(progress))
            .route("/records", web::get().to(list_records))
            .route("/records/{fingerprint}/report", web::get().to(get_report))
            .route("/export", web::get().to(export))
            .route("/cache", web::delete().to(clear_cache))
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
