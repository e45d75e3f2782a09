use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use editdesk_config::Config;
use editdesk_contracts::{ActionCatalog, EditRequestBody, EditResponse, ErrorBody, Language};
use editdesk_kernel::{build, normalize, validate, ActionRegistry, EditRequest, RequestDefaults};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

pub mod error;
pub mod upstream;

pub use error::GatewayError;
pub use upstream::{assistant_text, UpstreamClient, UpstreamConfig, UpstreamResult};

pub const EDIT_PATH: &str = "/api/edit-letter";

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";

pub async fn serve(cfg: Config) -> Result<(), String> {
    let addr: SocketAddr = cfg
        .server
        .listen_addr
        .parse()
        .map_err(|e| format!("invalid listen_addr: {e}"))?;

    let app = build_app(cfg)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!(%addr, "editdesk listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("serve failed: {e}"))
}

pub fn build_app(cfg: Config) -> Result<Router, String> {
    let allow_origin = allow_origin_value(&cfg.server.allowed_origin)?;
    let state = AppState::new(&cfg)?;
    Ok(Router::new()
        .route("/v1/healthz", get(healthz))
        .route("/v1/actions", get(actions))
        .route(
            EDIT_PATH,
            post(edit_letter)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            allow_origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http()))
}

#[derive(Clone)]
struct AppState {
    registry: Arc<ActionRegistry>,
    defaults: Arc<RequestDefaults>,
    upstream: Arc<UpstreamClient>,
}

impl AppState {
    fn new(cfg: &Config) -> Result<Self, String> {
        let defaults = RequestDefaults {
            action: cfg.defaults.action.clone(),
            language: Language::from_code(&cfg.defaults.language).unwrap_or_default(),
            tone: cfg.defaults.tone.clone(),
            min_text_chars: cfg.defaults.min_text_chars,
        };
        Ok(Self {
            registry: Arc::new(ActionRegistry::builtin()),
            defaults: Arc::new(defaults),
            upstream: Arc::new(UpstreamClient::new(UpstreamConfig::from(&cfg.upstream))?),
        })
    }

    async fn process_edit(&self, body: EditRequestBody) -> Result<EditResponse, GatewayError> {
        let request = EditRequest::from_body(body, &self.defaults);
        let template = self.registry.lookup(&request.action);
        if template.id != request.action {
            debug!(
                requested = %request.action,
                resolved = template.id,
                "unknown action, using fallback template"
            );
        }

        validate(&request, template, self.defaults.min_text_chars)
            .map_err(GatewayError::Validation)?;

        let payload = build(template, &request);
        let fingerprint = payload.fingerprint().unwrap_or_default();
        info!(
            action = template.id,
            language = %request.language,
            payload = %fingerprint,
            "calling upstream"
        );

        let result = self.upstream.send(&payload).await?;
        let (envelope, text) = assistant_text(&result)?;
        let normalized = normalize(&text);
        info!(
            action = template.id,
            status = result.http_status,
            parsed = normalized.json.is_some(),
            "upstream reply normalized"
        );

        Ok(EditResponse {
            ok: true,
            action: template.id.to_string(),
            description: template.description.to_string(),
            result: normalized.into(),
            raw_response: envelope,
        })
    }
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn actions(State(state): State<AppState>) -> Json<ActionCatalog> {
    Json(state.registry.catalog())
}

async fn edit_letter(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EditResponse>, GatewayError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("edit_letter", %request_id);
    async move {
        let body = parse_body(&body)?;
        state.process_edit(body).await.map(Json).map_err(|e| {
            warn!(status = e.status().as_u16(), error = %e, "edit request failed");
            e
        })
    }
    .instrument(span)
    .await
}

// An empty body means "all defaults".
fn parse_body(body: &[u8]) -> Result<EditRequestBody, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EditRequestBody::default());
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::MalformedBody(e.to_string()))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::new("Method Not Allowed. Use POST.")),
    )
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    GatewayError::Internal("request handler panicked".to_string()).into_response()
}

// CORS headers go on every response, preflight or not, whatever the
// request's Origin.
fn allow_origin_value(allowed_origin: &str) -> Result<HeaderValue, String> {
    HeaderValue::from_str(allowed_origin.trim())
        .map_err(|e| format!("invalid allowed_origin: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
