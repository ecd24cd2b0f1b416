use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ntp_core::config::{ApiProvider, Settings};
use ntp_core::{fingerprint, LatestOnly, Pipeline, RateLimiter, SingleFlight, SuggestionCache};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Parser, Debug)]
#[command(author, version, about = "Inline text-completion proxy")]
struct Args {
    /// Address to bind the HTTP service to
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,
    /// Path to a TOML config file; falls back to built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

struct AppState {
    pipeline: Pipeline,
    settings: Settings,
    latest_only: LatestOnly,
    single_flight: SingleFlight,
    rate_limiter: RateLimiter,
    cache: SuggestionCache,
    provider_name: &'static str,
    model_name: String,
}

#[derive(Deserialize)]
struct PredictRequest {
    prefix: String,
    suffix: String,
}

#[derive(Serialize)]
struct PredictResponse {
    completion: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ConfigResponse {
    api_provider: &'static str,
    model: String,
    url: String,
    streaming: bool,
    stream_min_chars_before_emit: usize,
    stream_emit_on_boundary: bool,
    stream_throttle_ms: u64,
    model_options: ntp_core::ModelOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ntp_service=info,tower_http=info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };

    let (provider_name, model_name) = describe_provider(&settings);

    info!(addr = %args.addr, provider = provider_name, model = %model_name, "starting service");

    let pipeline = settings.build_pipeline()?;

    let state = Arc::new(AppState {
        pipeline,
        settings,
        latest_only: LatestOnly::new(),
        single_flight: SingleFlight::new(),
        rate_limiter: RateLimiter::new(),
        cache: SuggestionCache::default(),
        provider_name,
        model_name,
    });

    let app = Router::new()
        .route("/predict", post(predict))
        .route("/predict/stream", post(predict_stream))
        .route("/health", get(health))
        .route("/config", get(config))
        .route("/ui", get(ui))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = args.addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn describe_provider(settings: &Settings) -> (&'static str, String) {
    match settings.api_provider {
        ApiProvider::OpenAi => ("openai", settings.openai.model.clone()),
        ApiProvider::OpenRouter => ("openrouter", settings.openrouter.model.clone()),
        ApiProvider::Gemini => ("gemini", settings.gemini.model.clone()),
    }
}

fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(id) = headers.get("X-Client-Id").and_then(|v| v.to_str().ok()) {
        if !id.is_empty() {
            return id.to_string();
        }
    }
    peer.map(|a| a.ip().to_string()).unwrap_or_else(|| "anon".to_string())
}

/// Runs one coalesced, deduped, timeout-bounded fetch for `prefix`/`suffix`
/// under `user`, logging and caching exactly like `server.py`'s `/predict`
/// handler. Returns `""` on any failure — the HTTP layer never surfaces a
/// pipeline error to the caller.
async fn run_coalesced(state: &Arc<AppState>, user: &str, prefix: String, suffix: String) -> String {
    let provider = state.provider_name;
    let model = state.model_name.clone();

    let user_owned = user.to_string();
    let ctx = ntp_core::CursorContext::new(prefix, suffix);

    state
        .latest_only
        .run(user, ctx, move |ctx| {
            let state = state.clone();
            let user = user_owned.clone();
            let provider = provider.to_string();
            let model = model.clone();
            async move {
                let key = fingerprint::fingerprint(&provider, &model, &ctx.prefix, &ctx.suffix);
                info!(user = %user, key = %key, "latest-only run");

                let factory_key = key.clone();
                let factory_state = state.clone();
                let result = state
                    .single_flight
                    .run(&factory_key, move || {
                        let prefix = ctx.prefix.clone();
                        let suffix = ctx.suffix.clone();
                        async move {
                            tokio::time::timeout(
                                UPSTREAM_TIMEOUT,
                                factory_state.pipeline.fetch_predictions(&prefix, &suffix),
                            )
                            .await
                            .unwrap_or(Err(ntp_core::PipelineError::Timeout))
                        }
                    })
                    .await;

                let text = match result {
                    Ok(text) => {
                        info!(user = %user, key = %key, len = text.len(), "api ok");
                        text
                    }
                    Err(e) => {
                        error!(user = %user, key = %key, error = %e, "api err");
                        String::new()
                    }
                };

                if !text.is_empty() {
                    state.cache.put(key, text.clone());
                }
                text
            }
        })
        .await
}

async fn predict(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<PredictRequest>,
) -> Json<PredictResponse> {
    let user = client_id(&headers, Some(peer));
    state.rate_limiter.acquire(&user).await;

    let key = fingerprint::fingerprint(
        state.provider_name,
        &state.model_name,
        &req.prefix,
        &req.suffix,
    );
    info!(user = %user, key = %key, "/predict");

    if let Some(cached) = state.cache.get(&key) {
        info!(user = %user, key = %key, "cache hit");
        return Json(PredictResponse { completion: cached });
    }

    let completion = run_coalesced(&state, &user, req.prefix, req.suffix).await;
    info!(user = %user, key = %key, len = completion.len(), "/predict done");
    Json(PredictResponse { completion })
}

async fn predict_stream(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<PredictRequest>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let user = client_id(&headers, Some(peer));
    state.rate_limiter.acquire(&user).await;

    let prefix = req.prefix;
    let suffix = req.suffix;

    let chunks: std::pin::Pin<Box<dyn Stream<Item = String> + Send>> =
        match state.pipeline.stream_predictions(&prefix, &suffix).await {
            Ok(Some((raw, context))) => {
                Box::pin(buffer_and_postprocess(state.clone(), raw, prefix, suffix, context))
            }
            Ok(None) => Box::pin(stream::empty()),
            Err(e) => {
                error!(error = %e, "stream setup failed");
                Box::pin(stream::empty())
            }
        };

    let sse_stream = chunks.map(|text| Ok(Event::default().data(text)));
    Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}

/// Drains the raw upstream chunk stream to completion, runs the fixed
/// postprocessor chain once over the concatenated text (postprocessing is
/// not meaningful per-chunk — overlap removal needs the full answer), and
/// re-emits it through a [`ntp_core::StreamEmitter`] so the client still
/// sees incremental output.
fn buffer_and_postprocess(
    state: Arc<AppState>,
    raw: futures::stream::BoxStream<'static, String>,
    prefix: String,
    suffix: String,
    context: ntp_core::ContextClass,
) -> impl Stream<Item = String> {
    stream::once(async move {
        let full: String = raw.collect::<Vec<_>>().await.join("");
        let processed = state
            .pipeline
            .postprocess(&prefix, &suffix, context, full)
            .unwrap_or_default();

        let mut emitter = ntp_core::StreamEmitter::new(
            state.settings.stream_min_chars_before_emit,
            state.settings.stream_emit_on_boundary,
            state.settings.stream_throttle_ms,
        );
        let mut out = Vec::new();
        if let Some(chunk) = emitter.push(&processed) {
            out.push(chunk);
        }
        if let Some(chunk) = emitter.flush() {
            out.push(chunk);
        }
        stream::iter(out)
    })
    .flatten()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let url = match state.settings.api_provider {
        ApiProvider::OpenAi => state.settings.openai.url.clone(),
        ApiProvider::OpenRouter => state.settings.openrouter.url.clone(),
        ApiProvider::Gemini => "google-genai".to_string(),
    };
    Json(ConfigResponse {
        api_provider: state.provider_name,
        model: state.model_name.clone(),
        url,
        streaming: state.settings.enable_streaming,
        stream_min_chars_before_emit: state.settings.stream_min_chars_before_emit,
        stream_emit_on_boundary: state.settings.stream_emit_on_boundary,
        stream_throttle_ms: state.settings.stream_throttle_ms,
        model_options: state.settings.model_options.clone(),
    })
}

async fn ui() -> impl IntoResponse {
    Html(include_str!("ui.html"))
}
