use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    AssetClass, Dataset, HORIZON_DAYS, InitialValues, MarketSimulation, PricePath, Session,
    SessionView, market_datasets, simulate_market,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_DAYS: usize = 365;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        help = "Address to bind"
    )]
    pub bind: IpAddr,
    #[arg(
        long,
        help = "Seed for every random draw of the session; entropy when omitted"
    )]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 0.0, help = "Starting stocks value")]
    pub stocks: f64,
    #[arg(long, default_value_t = 0.0, help = "Starting bonds value")]
    pub bonds: f64,
    #[arg(long, default_value_t = 0.0, help = "Starting real estate value")]
    pub real_estate: f64,
    #[arg(long, default_value_t = 0.0, help = "Starting commodities value")]
    pub commodities: f64,
    #[arg(long, default_value_t = HORIZON_DAYS, help = "Number of simulated days")]
    pub days: usize,
    #[arg(long)]
    pub seed: Option<u64>,
}

/// A session and the generator that feeds it.
struct Game {
    session: Session,
    rng: StdRng,
}

pub struct AppState {
    game: Mutex<Game>,
}

impl AppState {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = seeded_rng(seed);
        let mut session = Session::new();
        session.start(&mut rng);
        Self {
            game: Mutex::new(Game { session, rng }),
        }
    }

    fn game(&self) -> MutexGuard<'_, Game> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Form fields arrive either as raw input text or as JSON numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawInput {
    Number(f64),
    Text(String),
}

impl RawInput {
    fn as_text(&self) -> String {
        match self {
            RawInput::Number(v) => v.to_string(),
            RawInput::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldingPayload {
    asset_class: AssetClass,
    amount: RawInput,
}

#[derive(Debug, Deserialize)]
struct CashPayload {
    amount: RawInput,
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    stocks: Option<f64>,
    bonds: Option<f64>,
    real_estate: Option<f64>,
    commodities: Option<f64>,
    days: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
struct SimulateRequest {
    initial: InitialValues,
    days: usize,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    labels: Vec<String>,
    paths: Vec<PricePath>,
    datasets: Vec<Dataset>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct RejectedResponse {
    error: String,
    session: SessionView,
}

fn build_simulate_request(args: SimulateArgs) -> Result<SimulateRequest, String> {
    if args.days == 0 || args.days > MAX_DAYS {
        return Err(format!(
            "days must be between 1 and {MAX_DAYS}, got {}",
            args.days
        ));
    }

    for (name, value) in [
        ("stocks", args.stocks),
        ("bonds", args.bonds),
        ("real estate", args.real_estate),
        ("commodities", args.commodities),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} starting value must be a finite number"));
        }
    }

    Ok(SimulateRequest {
        initial: InitialValues {
            stocks: args.stocks,
            bonds: args.bonds,
            real_estate: args.real_estate,
            commodities: args.commodities,
        },
        days: args.days,
        seed: args.seed,
    })
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        stocks: 0.0,
        bonds: 0.0,
        real_estate: 0.0,
        commodities: 0.0,
        days: HORIZON_DAYS,
        seed: None,
    }
}

fn simulate_request_from_payload(payload: SimulatePayload) -> Result<SimulateRequest, String> {
    let mut args = default_simulate_args();

    if let Some(v) = payload.stocks {
        args.stocks = v;
    }
    if let Some(v) = payload.bonds {
        args.bonds = v;
    }
    if let Some(v) = payload.real_estate {
        args.real_estate = v;
    }
    if let Some(v) = payload.commodities {
        args.commodities = v;
    }
    if let Some(v) = payload.days {
        args.days = v;
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }

    build_simulate_request(args)
}

fn build_simulate_response(simulation: MarketSimulation) -> SimulateResponse {
    let datasets = market_datasets(&simulation);
    SimulateResponse {
        labels: simulation.labels,
        paths: simulation.paths,
        datasets,
    }
}

fn run_simulation(request: &SimulateRequest, start: NaiveDate) -> MarketSimulation {
    let mut rng = seeded_rng(request.seed);
    simulate_market(&request.initial, request.days, start, &mut rng)
}

/// Runs one market simulation for the command line and renders it as JSON.
pub fn simulate_to_json(args: SimulateArgs) -> Result<String, String> {
    let request = build_simulate_request(args)?;
    let simulation = run_simulation(&request, Utc::now().date_naive());
    serde_json::to_string_pretty(&build_simulate_response(simulation))
        .map_err(|e| format!("Failed to encode simulation: {e}"))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/session", get(session_handler))
        .route("/api/session/holding", post(holding_handler))
        .route("/api/session/cash", post(cash_handler))
        .route("/api/session/name", post(name_handler))
        .route("/api/session/submit", post(submit_handler))
        .route("/api/session/clear", post(clear_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(args: ServeArgs) -> std::io::Result<()> {
    let addr = SocketAddr::new(args.bind, args.port);
    let state = Arc::new(AppState::new(args.seed));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, seeded = args.seed.is_some(), "diversification game listening");
    info!("local access: http://127.0.0.1:{}/", args.port);

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn session_handler(State(state): State<Arc<AppState>>) -> Response {
    let view = state.game().session.view();
    json_response(StatusCode::OK, view)
}

async fn holding_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HoldingPayload>, JsonRejection>,
) -> Response {
    let payload = match json_payload(payload) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let view = {
        let mut game = state.game();
        game.session
            .update_holding(payload.asset_class, &payload.amount.as_text());
        game.session.view()
    };
    json_response(StatusCode::OK, view)
}

async fn cash_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CashPayload>, JsonRejection>,
) -> Response {
    let payload = match json_payload(payload) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let view = {
        let mut game = state.game();
        game.session.update_cash(&payload.amount.as_text());
        game.session.view()
    };
    json_response(StatusCode::OK, view)
}

async fn name_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> Response {
    let payload = match json_payload(payload) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let view = {
        let mut game = state.game();
        game.session.set_name(payload.name);
        game.session.view()
    };
    json_response(StatusCode::OK, view)
}

async fn submit_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut game = state.game();
    let Game { session, rng } = &mut *game;
    match session.submit(rng) {
        Ok(_) => json_response(StatusCode::OK, session.view()),
        Err(err) => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            RejectedResponse {
                error: err.to_string(),
                session: session.view(),
            },
        ),
    }
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> Response {
    let view = {
        let mut game = state.game();
        game.session.clear();
        game.session.view()
    };
    json_response(StatusCode::OK, view)
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match json_payload(payload) {
        Ok(payload) => simulate_handler_impl(payload),
        Err(response) => response,
    }
}

/// Unwraps a JSON body, turning extractor rejections into the API's `{error}`
/// shape instead of axum's plain-text default.
fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, &rejection.body_text()))
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match simulate_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    debug!(days = request.days, seeded = request.seed.is_some(), "simulating market");
    let simulation = run_simulation(&request, Utc::now().date_naive());
    json_response(StatusCode::OK, build_simulate_response(simulation))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn simulate_request_from_json(json: &str) -> Result<SimulateRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    simulate_request_from_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PATH_FLOOR, Portfolio};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    fn seeded_state(seed: u64) -> Arc<AppState> {
        Arc::new(AppState::new(Some(seed)))
    }

    #[test]
    fn simulate_request_from_json_parses_web_keys() {
        let json = r#"{
          "stocks": 120,
          "bonds": 900.5,
          "realEstate": 45000,
          "commodities": 55,
          "days": 30,
          "seed": 7
        }"#;
        let request = simulate_request_from_json(json).expect("json should parse");

        assert_eq!(request.initial.stocks, 120.0);
        assert_eq!(request.initial.bonds, 900.5);
        assert_eq!(request.initial.real_estate, 45_000.0);
        assert_eq!(request.initial.commodities, 55.0);
        assert_eq!(request.days, 30);
        assert_eq!(request.seed, Some(7));
    }

    #[test]
    fn simulate_request_defaults_to_fifty_days_from_zero() {
        let request = simulate_request_from_json("{}").expect("empty payload is valid");
        assert_eq!(request.initial, InitialValues::default());
        assert_eq!(request.days, HORIZON_DAYS);
        assert_eq!(request.seed, None);
    }

    #[test]
    fn build_simulate_request_rejects_out_of_range_days() {
        let mut args = default_simulate_args();
        args.days = 0;
        let err = build_simulate_request(args).expect_err("must reject zero days");
        assert!(err.contains("days must be between 1 and 365"));

        let mut args = default_simulate_args();
        args.days = MAX_DAYS + 1;
        assert!(build_simulate_request(args).is_err());
    }

    #[test]
    fn build_simulate_request_rejects_non_finite_start() {
        let mut args = default_simulate_args();
        args.real_estate = f64::INFINITY;
        let err = build_simulate_request(args).expect_err("must reject infinity");
        assert!(err.contains("real estate starting value"));
    }

    #[test]
    fn seeded_simulation_is_repeatable() {
        let request = simulate_request_from_json(r#"{"seed": 11, "stocks": 200}"#)
            .expect("json should parse");
        let a = run_simulation(&request, date(2024, 7, 18));
        let b = run_simulation(&request, date(2024, 7, 18));
        assert_eq!(a, b);
        assert_eq!(a.paths[0].values[0], 200.0);
        assert_eq!(a.paths[1].values[0], PATH_FLOOR);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = simulate_request_from_json(r#"{"seed": 3, "days": 5}"#)
            .expect("json should parse");
        let response = build_simulate_response(run_simulation(&request, date(2024, 7, 18)));
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"labels\":[\"2024-07-18\""));
        assert!(json.contains("\"assetClass\":\"realEstate\""));
        assert!(json.contains("\"Real Estate Value\""));
        assert!(json.contains("\"borderColor\""));
    }

    #[test]
    fn raw_input_accepts_text_and_numbers() {
        let text: HoldingPayload =
            serde_json::from_str(r#"{"assetClass": "stocks", "amount": "12abc"}"#)
                .expect("text amount");
        assert_eq!(text.amount.as_text(), "12abc");

        let number: HoldingPayload =
            serde_json::from_str(r#"{"assetClass": "realEstate", "amount": 2}"#)
                .expect("numeric amount");
        assert_eq!(number.asset_class, AssetClass::RealEstate);
        assert_eq!(number.amount.as_text(), "2");
    }

    #[tokio::test]
    async fn holding_update_returns_recomputed_cost() {
        let state = seeded_state(1);
        let rate = state.game().session.portfolio.stocks.rate;

        let response = holding_handler(
            State(state.clone()),
            Ok(Json(HoldingPayload {
                asset_class: AssetClass::Stocks,
                amount: RawInput::Text("10".to_string()),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = body_json(response).await;
        assert_eq!(body["portfolio"]["stocks"]["amount"], 10.0);
        assert_eq!(body["portfolio"]["stocks"]["totalCost"], 10.0 * rate);
    }

    #[tokio::test]
    async fn submit_over_threshold_is_rejected_with_session() {
        let state = seeded_state(2);
        holding_handler(
            State(state.clone()),
            Ok(Json(HoldingPayload {
                asset_class: AssetClass::RealEstate,
                amount: RawInput::Number(1.0),
            })),
        )
        .await;
        let before = state.game().session.portfolio.clone();

        let response = submit_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Total portfolio value exceeds threshold!");
        assert_eq!(
            body["session"]["error"],
            "Total portfolio value exceeds threshold!"
        );
        assert_eq!(state.game().session.portfolio, before);
    }

    #[tokio::test]
    async fn submit_then_clear_round_trip() {
        let state = seeded_state(3);
        name_handler(
            State(state.clone()),
            Ok(Json(NamePayload {
                name: "Starter".to_string(),
            })),
        )
        .await;

        let response = submit_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["submitted"], true);
        assert_eq!(body["profitLoss"], 0.0);
        assert_eq!(body["name"], "Starter");

        let body = body_json(clear_handler(State(state.clone())).await).await;
        assert_eq!(body["submitted"], false);
        assert_eq!(body["name"], "");
        assert_eq!(state.game().session.portfolio, Portfolio::default());
    }

    #[tokio::test]
    async fn cash_update_with_text_is_zero() {
        let state = seeded_state(4);
        let body = body_json(
            cash_handler(
                State(state.clone()),
                Ok(Json(CashPayload {
                    amount: RawInput::Text("lots".to_string()),
                })),
            )
            .await,
        )
        .await;
        assert_eq!(body["portfolio"]["cash"], 0.0);
    }

    #[tokio::test]
    async fn invalid_simulate_payload_is_bad_request() {
        let response = simulate_handler_impl(SimulatePayload {
            days: Some(0),
            ..SimulatePayload::default()
        });
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("days must be between"))
        );
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }

    async fn send(app: Router, method: &str, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build");
        app.oneshot(request).await.expect("router is infallible")
    }

    async fn assert_bad_request(response: Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );
        let body = body_json(response).await;
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn unknown_asset_class_is_json_bad_request() {
        let state = seeded_state(5);
        let before = state.game().session.portfolio.clone();
        let response = send(
            router(state.clone()),
            "POST",
            "/api/session/holding",
            r#"{"assetClass": "crypto", "amount": "3"}"#,
        )
        .await;
        assert_bad_request(response).await;
        assert_eq!(state.game().session.portfolio, before);
    }

    #[tokio::test]
    async fn non_json_cash_body_is_json_bad_request() {
        let response = send(
            router(seeded_state(6)),
            "POST",
            "/api/session/cash",
            "not json",
        )
        .await;
        assert_bad_request(response).await;
    }

    #[tokio::test]
    async fn name_without_field_is_json_bad_request() {
        let response = send(router(seeded_state(7)), "POST", "/api/session/name", "{}").await;
        assert_bad_request(response).await;
    }

    #[tokio::test]
    async fn unparsable_simulate_query_is_json_bad_request() {
        let response = send(router(seeded_state(8)), "GET", "/api/simulate?days=abc", "").await;
        assert_bad_request(response).await;
    }

    #[tokio::test]
    async fn malformed_simulate_body_is_json_bad_request() {
        let response = send(
            router(seeded_state(9)),
            "POST",
            "/api/simulate",
            r#"{"days": "many"}"#,
        )
        .await;
        assert_bad_request(response).await;
    }

    #[tokio::test]
    async fn well_formed_requests_pass_through_router() {
        let app = router(seeded_state(10));
        let response = send(
            app.clone(),
            "POST",
            "/api/session/holding",
            r#"{"assetClass": "bonds", "amount": "2"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["portfolio"]["bonds"]["amount"], 2.0);

        let response = send(app, "GET", "/api/simulate?days=3&seed=1", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["labels"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn simulate_to_json_reports_validation_errors() {
        let mut args = default_simulate_args();
        args.days = 1_000;
        assert!(simulate_to_json(args).is_err());
    }
}
