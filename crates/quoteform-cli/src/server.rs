//! `quoteform serve`: a small read-mostly HTTP server over the published schema.
//!
//! Routes:
//! - `GET  /healthz`
//! - `GET  /api/ontology`     the full published schema
//! - `GET  /api/diagnostics`  diagnostics of the published compile
//! - `POST /api/validate`     `{ "section": ..., "fields": { ... } }`
//! - `POST /admin/reload`     recompile now
//!
//! Reloads also happen on SIGHUP (Unix) and, with `--watch`, whenever the
//! source document digests change. A failed or timed-out reload keeps the
//! previously published schema.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;

use quoteform_schema::{
    validate_submission, Compiler, PublishedSchema, SchemaPublisher, Submission,
};

use crate::config::{AppConfig, ServeConfig};

#[derive(Debug, Clone)]
pub(crate) struct ServeOptions {
    pub listen: Option<SocketAddr>,
    pub watch: bool,
    pub ready_file: Option<PathBuf>,
}

struct ServerState {
    config: ServeConfig,
    publisher: Arc<SchemaPublisher>,
}

pub(crate) fn cmd_serve(config: AppConfig, options: ServeOptions) -> Result<()> {
    let mut serve = config.serve.clone();
    if let Some(listen) = options.listen {
        serve.listen = listen;
    }
    let compiler = Compiler::from_config(&config.compiler)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    rt.block_on(async move { serve_async(serve, compiler, options).await })
}

async fn serve_async(config: ServeConfig, compiler: Compiler, options: ServeOptions) -> Result<()> {
    let state = Arc::new(ServerState {
        config: config.clone(),
        publisher: Arc::new(SchemaPublisher::new(compiler)),
    });

    // The server does not start without a first good compile.
    let initial = reload_now(&state)
        .await
        .context("serve: initial schema compile failed")?;
    tracing::info!(
        version = initial.version,
        fields = initial.schema.field_count(),
        "initial schema ready"
    );

    #[cfg(unix)]
    {
        let state = state.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "serve: SIGHUP reload unavailable");
                    return;
                }
            };
            while hangup.recv().await.is_some() {
                tracing::info!("serve: SIGHUP received, reloading schema");
                if let Err(e) = reload_now(&state).await {
                    tracing::error!(error = %e, "serve: SIGHUP reload failed");
                }
            }
        });
    }

    if options.watch {
        let state = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(state.config.watch_interval());
            loop {
                ticker.tick().await;
                if let Err(e) = reload_if_sources_changed(&state).await {
                    tracing::warn!(error = %e, "serve: watch reload failed");
                }
            }
        });
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {}: {e}", config.listen))?;
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;

    tracing::info!(addr = %bound, watch = options.watch, "serve: listening");
    if let Some(path) = options.ready_file.as_ref() {
        let payload = serde_json::json!({
            "addr": bound.to_string(),
            "pid": std::process::id(),
        });
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(path, serde_json::to_string_pretty(&payload)?)
            .with_context(|| format!("serve: failed to write ready file {}", path.display()))?;
    }

    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(error = %e, "serve: connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<HttpResponse, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!(%method, %path, "serve: request");

    let resp = match (method, path.as_str()) {
        (Method::GET, "/healthz") => respond(StatusCode::OK, "text/plain; charset=utf-8", "ok\n"),
        (Method::GET, "/api/ontology") => {
            let current = state.publisher.current();
            json(StatusCode::OK, current.as_ref())
        }
        (Method::GET, "/api/diagnostics") => {
            let current = state.publisher.current();
            json(StatusCode::OK, &DiagnosticsPayload::from(current.as_ref()))
        }
        (Method::POST, "/api/validate") => {
            let body = req.into_body().collect().await?.to_bytes();
            match serde_json::from_slice::<Submission>(&body) {
                Ok(submission) => {
                    let current = state.publisher.current();
                    let report = validate_submission(&current.schema, &submission);
                    let status = if report.valid {
                        StatusCode::OK
                    } else {
                        StatusCode::UNPROCESSABLE_ENTITY
                    };
                    json(status, &report)
                }
                Err(e) => error(StatusCode::BAD_REQUEST, &format!("invalid submission: {e}")),
            }
        }
        (Method::POST, "/admin/reload") => match reload_now(&state).await {
            Ok(published) => json(StatusCode::OK, &ReloadPayload::from(published.as_ref())),
            Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, &format!("{e:#}")),
        },
        (_, "/healthz" | "/api/ontology" | "/api/diagnostics" | "/api/validate" | "/admin/reload") => {
            error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        _ => error(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(resp)
}

#[derive(Serialize)]
struct DiagnosticsPayload<'a> {
    version: u64,
    count: usize,
    diagnostics: &'a [quoteform_ontology::Diagnostic],
}

impl<'a> From<&'a PublishedSchema> for DiagnosticsPayload<'a> {
    fn from(published: &'a PublishedSchema) -> Self {
        Self {
            version: published.version,
            count: published.diagnostics.len(),
            diagnostics: &published.diagnostics,
        }
    }
}

#[derive(Serialize)]
struct ReloadPayload<'a> {
    version: u64,
    fingerprint: &'a str,
    fields: usize,
    diagnostics: usize,
}

impl<'a> From<&'a PublishedSchema> for ReloadPayload<'a> {
    fn from(published: &'a PublishedSchema) -> Self {
        Self {
            version: published.version,
            fingerprint: &published.schema.fingerprint,
            fields: published.schema.field_count(),
            diagnostics: published.diagnostics.len(),
        }
    }
}

type HttpResponse = Response<Full<Bytes>>;

const JSON: &str = "application/json";

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> HttpResponse {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

/// Serialize `value` as the response body. A payload that fails to
/// serialize becomes a 500 naming the route's payload type.
fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, JSON, body),
        Err(e) => {
            tracing::error!(error = %e, "serve: failed to serialize response");
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("failed to serialize {}", std::any::type_name::<T>()),
            )
        }
    }
}

fn error(status: StatusCode, msg: &str) -> HttpResponse {
    respond(status, JSON, serde_json::json!({ "error": msg }).to_string())
}

/// Compile on the blocking pool and publish, bounded by the compile timeout.
/// A timed-out compile is cancelled so it cannot publish late.
async fn reload_now(state: &Arc<ServerState>) -> Result<Arc<PublishedSchema>> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let task = tokio::task::spawn_blocking({
        let publisher = state.publisher.clone();
        let cancelled = cancelled.clone();
        move || publisher.reload_unless_cancelled(&cancelled)
    });

    let joined = match state.config.compile_timeout() {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                tracing::error!(
                    timeout_secs = limit.as_secs(),
                    "serve: schema compile timed out; keeping previous schema"
                );
                return Err(anyhow!(
                    "schema compile timed out after {}s",
                    limit.as_secs()
                ));
            }
        },
        None => task.await,
    };

    let published = joined.map_err(|e| anyhow!("reload task join failed: {e}"))??;
    Ok(published)
}

async fn reload_if_sources_changed(state: &Arc<ServerState>) -> Result<()> {
    let changed = tokio::task::spawn_blocking({
        let publisher = state.publisher.clone();
        move || publisher.sources_changed()
    })
    .await
    .map_err(|e| anyhow!("watch task join failed: {e}"))??;

    if changed {
        tracing::info!("serve: source documents changed, reloading schema");
        reload_now(state).await?;
    }
    Ok(())
}
