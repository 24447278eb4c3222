//! REST API for the allocation service.
//!
//! Provides HTTP endpoints that accept two collections, run the allocator and
//! return the proposal as JSON or as a live event stream. Uses Axum as the web
//! framework and supports CORS.

use std::sync::OnceLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::allocator::{
    AllocationError, AllocationRequest, AllocationResult, AllocatorConfig, Move, SideSummary,
    allocate_with_config, allocate_with_progress,
};
use crate::config::{AllocatorSettings, ApiConfig};
use crate::loader::{CsvOptions, LoadError, LoadedCollection, SkippedRow, parse_slack, read_collection};
use crate::model::{AssignedItem, Origin, PinSet};
use crate::report::render_report;
use crate::types::{MoveDirection, Side};

#[derive(Clone)]
struct ApiState {
    allocator_config: AllocatorConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>split-it-now API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// A number given either as JSON number or as text (`"2.5"`, `"2,5"`).
#[derive(Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// One row of a structured collection.
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct RowPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weight: Option<NumberOrText>,
}

/// A collection, either as list of rows or as `name,weight` CSV text.
#[derive(Deserialize, Clone, Debug, ToSchema)]
#[serde(untagged)]
pub enum CollectionPayload {
    Csv(String),
    Rows(Vec<RowPayload>),
}

impl Default for CollectionPayload {
    fn default() -> Self {
        CollectionPayload::Rows(Vec::new())
    }
}

impl CollectionPayload {
    fn load(self, options: &CsvOptions) -> Result<LoadedCollection, LoadError> {
        match self {
            CollectionPayload::Csv(text) => read_collection(text.as_bytes(), options),
            CollectionPayload::Rows(rows) => {
                let mut loaded = LoadedCollection::default();
                for (idx, row) in rows.into_iter().enumerate() {
                    let line = idx as u64 + 1;
                    match (row.name.as_deref(), row.weight) {
                        (Some(name), Some(NumberOrText::Number(weight))) => {
                            loaded.push_weight(line, name, weight)
                        }
                        (None, Some(NumberOrText::Number(_))) => {
                            loaded.skip(line, "missing item name".to_string())
                        }
                        (name, Some(NumberOrText::Text(raw))) => {
                            loaded.push_row(line, name, Some(&raw))
                        }
                        (name, None) => loaded.push_row(line, name, None),
                    }
                }
                Ok(loaded)
            }
        }
    }
}

/// Request structure for the allocation endpoints.
#[derive(Deserialize, Clone, Debug, ToSchema)]
#[schema(
    example = json!({
        "collection_a": [
            { "name": "p", "weight": 3.0 },
            { "name": "q", "weight": 4.0 }
        ],
        "collection_b": "q,2\nr,1\n",
        "slack_a": 13,
        "slack_b": "17",
        "pinned": [],
        "rebalance": true
    })
)]
pub struct AllocateRequest {
    #[serde(default)]
    pub collection_a: CollectionPayload,
    #[serde(default)]
    pub collection_b: CollectionPayload,
    #[serde(default)]
    #[schema(nullable = true)]
    pub slack_a: Option<NumberOrText>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub slack_b: Option<NumberOrText>,
    #[serde(default)]
    pub pinned: Vec<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub rebalance: Option<bool>,
    /// Field delimiter for CSV collections (single ASCII character, default `,`)
    #[serde(default)]
    #[schema(nullable = true, value_type = Option<String>)]
    pub csv_delimiter: Option<char>,
    /// Whether CSV collections start with a header row
    #[serde(default)]
    #[schema(nullable = true)]
    pub csv_has_headers: Option<bool>,
}

/// Input that was left out or replaced by a default.
#[derive(Serialize, Clone, Debug, Default, PartialEq, ToSchema)]
pub struct SkippedInput {
    pub collection_a: Vec<SkippedRow>,
    pub collection_b: Vec<SkippedRow>,
    /// Slack values that could not be parsed and were treated as 0
    pub slack: Vec<String>,
}

impl SkippedInput {
    fn is_empty(&self) -> bool {
        self.collection_a.is_empty() && self.collection_b.is_empty() && self.slack.is_empty()
    }

    fn count(&self) -> usize {
        self.collection_a.len() + self.collection_b.len() + self.slack.len()
    }
}

#[derive(Debug)]
struct ValidatedAllocateRequest {
    request: AllocationRequest,
    rebalance: Option<bool>,
    skipped: SkippedInput,
}

impl ValidatedAllocateRequest {
    fn config(&self, base: AllocatorConfig) -> AllocatorConfig {
        let mut config = base;
        if let Some(rebalance) = self.rebalance {
            config.rebalance = rebalance;
        }
        config
    }
}

#[derive(Debug)]
enum AllocateRequestValidationError {
    InvalidDelimiter(char),
    Load(LoadError),
}

impl AllocateRequest {
    fn csv_options(&self) -> Result<CsvOptions, AllocateRequestValidationError> {
        let mut options = CsvOptions::default();
        if let Some(delimiter) = self.csv_delimiter {
            if !delimiter.is_ascii() {
                return Err(AllocateRequestValidationError::InvalidDelimiter(delimiter));
            }
            options = options.delimiter(delimiter as u8);
        }
        if let Some(has_headers) = self.csv_has_headers {
            options = options.has_headers(has_headers);
        }
        Ok(options)
    }

    fn into_validated(self) -> Result<ValidatedAllocateRequest, AllocateRequestValidationError> {
        let options = self.csv_options()?;
        let mut skipped = SkippedInput::default();

        let loaded_a = self
            .collection_a
            .load(&options)
            .map_err(AllocateRequestValidationError::Load)?;
        let loaded_b = self
            .collection_b
            .load(&options)
            .map_err(AllocateRequestValidationError::Load)?;
        skipped.collection_a = loaded_a.skipped;
        skipped.collection_b = loaded_b.skipped;

        let slack_a = resolve_slack("slack_a", self.slack_a, &mut skipped.slack);
        let slack_b = resolve_slack("slack_b", self.slack_b, &mut skipped.slack);
        let pinned: PinSet = self.pinned.iter().collect();

        let request = AllocationRequest::new(loaded_a.collection, loaded_b.collection)
            .with_slack(slack_a, slack_b)
            .with_pins(pinned);

        Ok(ValidatedAllocateRequest {
            request,
            rebalance: self.rebalance,
            skipped,
        })
    }
}

fn resolve_slack(field: &str, value: Option<NumberOrText>, skipped: &mut Vec<String>) -> f64 {
    match value {
        None => 0.0,
        Some(NumberOrText::Number(value)) => value,
        Some(NumberOrText::Text(raw)) => parse_slack(Some(&raw)).unwrap_or_else(|| {
            warn!(field, raw = %raw, "could not parse slack; using 0");
            skipped.push(format!("{field}: '{raw}'"));
            0.0
        }),
    }
}

/// Response structure with the allocation proposal.
#[derive(Serialize, Clone, Debug, ToSchema)]
pub struct AllocateResponse {
    pub collection_a: SideSummary,
    pub collection_b: SideSummary,
    /// Every assignment sorted by name, pinned duplicates once per side
    pub assignment: Vec<AssignedItem>,
    pub moves: Vec<Move>,
    pub is_valid: bool,
    pub skipped: SkippedInput,
    /// Plain-text rendering of the proposal
    pub report: String,
}

impl AllocateResponse {
    /// Creates an AllocateResponse from an AllocationResult.
    pub fn from_result(result: AllocationResult, skipped: SkippedInput) -> Self {
        let report = render_report(&result);
        let AllocationResult {
            assignment,
            side_a,
            side_b,
            is_valid,
            moves,
            ..
        } = result;

        Self {
            collection_a: side_a,
            collection_b: side_b,
            assignment,
            moves,
            is_valid,
            skipped,
            report,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn invariant_error(err: &AllocationError) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Allocation invariant violated",
        err.to_string(),
    )
}

fn parse_allocate_request(
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Result<ValidatedAllocateRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated() {
        Ok(validated) => Ok(validated),
        Err(AllocateRequestValidationError::InvalidDelimiter(delimiter)) => Err(validation_error(
            format!("CSV delimiter must be a single ASCII character, got '{delimiter}'"),
        )),
        Err(AllocateRequestValidationError::Load(err)) => Err(validation_error(err.to_string())),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_allocate, handle_allocate_stream),
    components(
        schemas(
            AllocateRequest,
            AllocateResponse,
            CollectionPayload,
            RowPayload,
            NumberOrText,
            SkippedInput,
            SkippedRow,
            SideSummary,
            AssignedItem,
            Move,
            MoveDirection,
            Origin,
            Side,
            ErrorResponse
        )
    ),
    tags((name = "allocation", description = "Endpoints for two-sided allocation"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/allocate", post(handle_allocate))
        .route("/allocate_stream", post(handle_allocate_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests.
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    allocator: AllocatorSettings,
) -> std::io::Result<()> {
    let state = ApiState {
        allocator_config: allocator.allocator_config(),
    };
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        error!(%addr, error = %err, "could not bind API server");
        err
    })?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("API endpoints: POST /allocate, POST /allocate_stream");
    info!("Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /allocate endpoint.
///
/// Assigns every name of both collections to exactly one side.
///
/// # Parameters
/// * `payload` - JSON payload with both collections, slack and pins
///
/// # Returns
/// JSON response with the final collections, moves and text report
#[utoipa::path(
    post,
    path = "/allocate",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Allocation proposal", body = AllocateResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        ),
        (
            status = INTERNAL_SERVER_ERROR,
            description = "Allocation invariant violated",
            body = ErrorResponse
        )
    ),
    tag = "allocation"
)]
async fn handle_allocate(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Response {
    let validated = match parse_allocate_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = validated.config(state.allocator_config);
    let ValidatedAllocateRequest {
        request, skipped, ..
    } = validated;

    info!(
        items_a = request.collection_a.len(),
        items_b = request.collection_b.len(),
        pinned = request.pinned.len(),
        skipped = skipped.count(),
        "new allocation request"
    );

    match allocate_with_config(request, config) {
        Ok(result) => {
            log_outcome(&result, &skipped);
            let response = AllocateResponse::from_result(result, skipped);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => invariant_error(&err),
    }
}

fn log_outcome(result: &AllocationResult, skipped: &SkippedInput) {
    if result.is_valid {
        info!(moves = result.move_count(), "allocation fits both collections");
    } else {
        info!(
            moves = result.move_count(),
            overflow_a = result.overflow(Side::A),
            overflow_b = result.overflow(Side::B),
            "allocation exceeds capacity"
        );
    }
    if !skipped.is_empty() {
        info!(skipped = skipped.count(), "input rows were skipped");
    }
}

/// Handler for POST /allocate_stream endpoint (SSE).
///
/// Streams allocation events in real-time as Server-Sent Events
/// (text/event-stream). The last message carries either the complete
/// response (`"type": "Result"`) or the invariant error (`"type": "Error"`).
#[utoipa::path(
    post,
    path = "/allocate_stream",
    request_body = AllocateRequest,
    responses(
        (
            status = 200,
            description = "Streams allocation events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "allocation"
)]
async fn handle_allocate_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Response {
    let validated = match parse_allocate_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = validated.config(state.allocator_config);
    let ValidatedAllocateRequest {
        request, skipped, ..
    } = validated;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome = allocate_with_progress(request, config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });

        let last = match outcome {
            Ok(result) => {
                log_outcome(&result, &skipped);
                json!({
                    "type": "Result",
                    "response": AllocateResponse::from_result(result, skipped),
                })
            }
            Err(err) => json!({
                "type": "Error",
                "error": "Allocation invariant violated",
                "details": err.to_string(),
            }),
        };
        let _ = tx.blocking_send(last.to_string());
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;

    fn state() -> ApiState {
        ApiState {
            allocator_config: AllocatorConfig::default(),
        }
    }

    fn request(value: serde_json::Value) -> AllocateRequest {
        serde_json::from_value(value).expect("Should parse valid JSON")
    }

    async fn body_bytes(response: Response) -> axum::body::Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
    }

    /// Extracts the `data:` payloads of an SSE body as JSON values.
    async fn sse_messages(response: Response) -> Vec<serde_json::Value> {
        let bytes = body_bytes(response).await;
        let text = String::from_utf8(bytes.to_vec()).expect("UTF-8 event stream");
        text.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim_start()).expect("JSON event"))
            .collect()
    }

    async fn raw_request(body: &'static str) -> Result<Json<AllocateRequest>, JsonRejection> {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/allocate")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .expect("valid request");
        Json::<AllocateRequest>::from_request(request, &()).await
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        assert!(
            paths.contains_key("/allocate"),
            "OpenAPI documentation is missing the /allocate path"
        );
        assert!(
            paths.contains_key("/allocate_stream"),
            "OpenAPI documentation is missing the /allocate_stream path"
        );
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["AllocateRequest", "AllocateResponse", "ErrorResponse", "SkippedRow"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn allocate_request_accepts_rows_and_csv() {
        let parsed = request(json!({
            "collection_a": [{"name": "p", "weight": 3}, {"name": "q", "weight": "4"}],
            "collection_b": "q,2\nr,1\n",
            "slack_a": "13",
            "slack_b": 17
        }));
        let validated = parsed.into_validated().expect("Should validate successfully");
        let request = &validated.request;

        assert_eq!(request.collection_a.get("q"), Some(4.0));
        assert_eq!(request.collection_b.get("r"), Some(1.0));
        assert_eq!(request.capacity(Side::A), 20.0);
        assert_eq!(request.capacity(Side::B), 20.0);
        assert!(validated.skipped.is_empty());
    }

    #[test]
    fn malformed_rows_and_slack_are_reported_as_skipped() {
        let parsed = request(json!({
            "collection_a": [{"name": "ok", "weight": 1}, {"name": "bad", "weight": "x"}, {"weight": 2}],
            "collection_b": "neg,-1\n",
            "slack_a": "lots"
        }));
        let validated = parsed.into_validated().expect("Should validate successfully");

        assert_eq!(validated.request.collection_a.len(), 1);
        assert!(validated.request.collection_b.is_empty());
        let lines: Vec<u64> = validated.skipped.collection_a.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(validated.skipped.collection_b.len(), 1);
        assert_eq!(validated.skipped.slack, vec!["slack_a: 'lots'".to_string()]);
        assert_eq!(validated.request.slack_a, 0.0);
    }

    #[test]
    fn csv_options_are_applied() {
        let parsed = request(json!({
            "collection_a": "name;weight\nx;1,5\n",
            "csv_delimiter": ";",
            "csv_has_headers": true
        }));
        let validated = parsed.into_validated().expect("Should validate successfully");
        assert_eq!(validated.request.collection_a.get("x"), Some(1.5));
        assert!(validated.skipped.is_empty());
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let parsed = request(json!({ "collection_a": "x→1", "csv_delimiter": "→" }));
        assert!(matches!(
            parsed.into_validated(),
            Err(AllocateRequestValidationError::InvalidDelimiter('→'))
        ));
    }

    #[test]
    fn request_level_rebalance_overrides_config() {
        let base = AllocatorConfig::builder().rebalance(true).build();

        let validated = request(json!({ "rebalance": false }))
            .into_validated()
            .expect("Should validate successfully");
        assert!(!validated.config(base).rebalance);

        let validated = request(json!({}))
            .into_validated()
            .expect("Should validate successfully");
        assert!(validated.config(base).rebalance, "absent override keeps config");
    }

    #[tokio::test]
    async fn allocate_endpoint_returns_proposal() {
        let payload = request(json!({
            "collection_a": [{"name": "p", "weight": 3}, {"name": "q", "weight": 4}],
            "collection_b": [{"name": "q", "weight": 2}, {"name": "r", "weight": 1}],
            "slack_a": 13,
            "slack_b": 17
        }));

        let response = handle_allocate(State(state()), Ok(Json(payload))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["is_valid"], json!(true));
        assert_eq!(body["collection_b"]["items"]["q"], json!(6.0));
        assert_eq!(body["moves"][0]["direction"], json!("A→B"));
        let report = body["report"].as_str().expect("report text");
        assert!(report.contains("Result: valid"));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_with_422() {
        let payload = raw_request("{\"collection_a\": [").await;
        assert!(payload.is_err());

        let response = handle_allocate(State(state()), payload).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Invalid JSON data"));
        assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
    }

    #[tokio::test]
    async fn stream_emits_events_then_result() {
        let payload = raw_request(
            r#"{
                "collection_a": [{"name": "p", "weight": 3}, {"name": "q", "weight": 4}],
                "collection_b": "q,2\nr,1\n",
                "slack_a": 13,
                "slack_b": 17
            }"#,
        )
        .await;

        let response = handle_allocate_stream(State(state()), payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"), "{content_type}");

        let messages = sse_messages(response).await;
        let types: Vec<&str> = messages
            .iter()
            .map(|msg| msg["type"].as_str().expect("typed message"))
            .collect();
        assert_eq!(types.first(), Some(&"Classified"));
        assert_eq!(&types[types.len() - 2..], &["Finished", "Result"]);
        assert_eq!(types.iter().filter(|t| **t == "ItemPlaced").count(), 1);

        let finished = &messages[messages.len() - 2];
        assert_eq!(finished["is_valid"], json!(true));
        let result = &messages[messages.len() - 1];
        assert_eq!(result["response"]["is_valid"], json!(true));
        assert_eq!(result["response"]["collection_b"]["items"]["q"], json!(6.0));
    }

    #[tokio::test]
    async fn stream_rejects_invalid_request_before_streaming() {
        let payload = request(json!({ "collection_a": "x;1", "csv_delimiter": "→" }));

        let response = handle_allocate_stream(State(state()), Ok(Json(payload))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Invalid input data"));
    }

    #[tokio::test]
    async fn infeasible_allocation_is_not_an_error() {
        let payload = request(json!({
            "collection_a": [{"name": "m", "weight": 5}],
            "collection_b": [{"name": "m", "weight": 5}],
            "slack_a": -4,
            "slack_b": -4,
            "pinned": ["m"]
        }));

        let response = handle_allocate(State(state()), Ok(Json(payload))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["is_valid"], json!(false));
        assert_eq!(body["collection_a"]["items"]["m"], json!(5.0));
        assert_eq!(body["collection_b"]["items"]["m"], json!(5.0));
    }
}
