use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::allocation::{parse_budget, ChannelConstraint, SeededFactors};
use crate::config::Config;
use crate::roi::{boundary_discontinuities, BoundaryJump, RoiQuote};
use crate::scenario::{Kpi, Scenario, ScenarioFilter, ScenarioList, Timeframe};
use crate::wizard::{OptimizationOutcome, OptimizationWizard, SimulationWizard, WizardError};

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    scenarios: Arc<Mutex<ScenarioList>>,
}

impl ApiState {
    fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            scenarios: Arc::new(Mutex::new(ScenarioList::new())),
        }
    }

    fn scenarios(&self) -> Result<MutexGuard<'_, ScenarioList>, ApiError> {
        self.scenarios
            .lock()
            .map_err(|_| ApiError::internal("scenario list lock poisoned"))
    }

    fn factors(&self, seed: Option<u64>) -> SeededFactors {
        SeededFactors::from_optional_seed(seed.or(self.config.allocation.seed))
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<WizardError> for ApiError {
    fn from(error: WizardError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// A budget given either as a JSON number or as free-form text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BudgetInput {
    Amount(f64),
    Text(String),
}

impl BudgetInput {
    fn raw(&self) -> String {
        match self {
            Self::Amount(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    fn resolve(&self) -> std::result::Result<u64, ApiError> {
        parse_budget(&self.raw()).map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct AllocateRequest {
    total_budget: Option<BudgetInput>,
    channels: Option<Vec<ChannelConstraint>>,
    base_rois: Option<BTreeMap<String, f64>>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct OptimizationRequest {
    name: String,
    kpi: Option<Kpi>,
    timeframe: Option<Timeframe>,
    #[serde(flatten)]
    allocation: AllocateRequest,
}

#[derive(Debug, Clone, Deserialize)]
struct RoiRequest {
    base_roi: f64,
    ref_budget: f64,
    new_budget: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct LeverInput {
    name: String,
    new_budget: Option<BudgetInput>,
}

#[derive(Debug, Clone, Deserialize)]
struct SimulationRequest {
    name: String,
    kpi: Option<Kpi>,
    timeframe: Option<Timeframe>,
    #[serde(default)]
    levers: Vec<LeverInput>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ScenariosResponse {
    scenarios: Vec<Scenario>,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let app = router(ApiState::new(config));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route("/v1/allocate", post(allocate_preview))
        .route("/v1/roi", post(roi))
        .route("/v1/roi/boundaries", get(roi_boundaries))
        .route("/v1/scenarios", get(list_scenarios))
        .route(
            "/v1/scenarios/:id",
            get(get_scenario).delete(delete_scenario),
        )
        .route("/v1/scenarios/optimization", post(create_optimization))
        .route("/v1/scenarios/simulation", post(create_simulation))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.as_ref().clone())
}

async fn allocate_preview(
    State(state): State<ApiState>,
    Json(request): Json<AllocateRequest>,
) -> ApiResult<OptimizationOutcome> {
    let wizard = optimization_wizard(&state, &request)?;
    let outcome = wizard.preview(&mut state.factors(request.seed))?;
    Ok(ok(outcome))
}

async fn roi(Json(request): Json<RoiRequest>) -> ApiResult<RoiQuote> {
    if !request.base_roi.is_finite()
        || !request.ref_budget.is_finite()
        || !request.new_budget.is_finite()
    {
        return Err(ApiError::bad_request("roi inputs must be finite numbers"));
    }
    Ok(ok(RoiQuote::new(
        request.base_roi,
        request.ref_budget,
        request.new_budget,
    )))
}

async fn roi_boundaries() -> Json<ApiResponse<Vec<BoundaryJump>>> {
    ok(boundary_discontinuities())
}

async fn list_scenarios(
    State(state): State<ApiState>,
    Query(filter): Query<ScenarioFilter>,
) -> ApiResult<ScenariosResponse> {
    let scenarios = state.scenarios()?.filter(&filter);
    Ok(ok(ScenariosResponse { scenarios }))
}

async fn get_scenario(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Scenario> {
    let scenario = state
        .scenarios()?
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("scenario not found: {id}")))?;
    Ok(ok(scenario))
}

async fn delete_scenario(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Scenario> {
    let scenario = state
        .scenarios()?
        .remove(&id)
        .ok_or_else(|| ApiError::not_found(format!("scenario not found: {id}")))?;
    Ok(ok(scenario))
}

async fn create_optimization(
    State(state): State<ApiState>,
    Json(request): Json<OptimizationRequest>,
) -> ApiResult<Scenario> {
    let mut wizard = optimization_wizard(&state, &request.allocation)?;
    wizard.set_name(request.name);
    if let Some(kpi) = request.kpi {
        wizard.set_kpi(kpi);
    }
    if let Some(timeframe) = request.timeframe {
        wizard.set_timeframe(timeframe);
    }
    wizard.next()?;

    let mut factors = state.factors(request.allocation.seed);
    let mut scenarios = state.scenarios()?;
    let scenario = wizard.submit(&mut factors, &mut *scenarios)?;
    Ok(ok(scenario))
}

async fn create_simulation(
    State(state): State<ApiState>,
    Json(request): Json<SimulationRequest>,
) -> ApiResult<Scenario> {
    let mut wizard = SimulationWizard::from_config(&state.config);
    wizard.set_name(request.name);
    if let Some(kpi) = request.kpi {
        wizard.set_kpi(kpi);
    }
    if let Some(timeframe) = request.timeframe {
        wizard.set_timeframe(timeframe);
    }
    wizard.next()?;

    if request.levers.is_empty() {
        wizard.select_all();
    }
    for lever in &request.levers {
        wizard.select_lever(&lever.name)?;
    }
    wizard.next()?;

    for lever in &request.levers {
        if let Some(budget) = &lever.new_budget {
            wizard.set_new_budget_input(&lever.name, &budget.raw())?;
        }
    }
    wizard.next()?;

    let mut scenarios = state.scenarios()?;
    let scenario = wizard.submit(&mut *scenarios)?;
    Ok(ok(scenario))
}

fn optimization_wizard(
    state: &ApiState,
    request: &AllocateRequest,
) -> std::result::Result<OptimizationWizard, ApiError> {
    let mut wizard = OptimizationWizard::from_config(&state.config);
    if let Some(total_budget) = &request.total_budget {
        wizard.set_total_budget(total_budget.resolve()?);
    }
    if let Some(channels) = &request.channels {
        for channel in channels {
            channel.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;
        }
        let mut draft = wizard.close();
        draft.channels = channels.clone();
        wizard = OptimizationWizard::new(draft);
    }
    if let Some(base_rois) = &request.base_rois {
        for (channel, roi) in base_rois {
            wizard.set_base_roi(channel, *roi)?;
        }
    }
    Ok(wizard)
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::block_on;

    use super::*;
    use crate::scenario::{ScenarioAllocation, ScenarioType};

    fn state() -> ApiState {
        let mut config = Config::default();
        config.allocation.seed = Some(5);
        ApiState::new(config)
    }

    #[test]
    fn allocate_preview_uses_config_channels() {
        let request: AllocateRequest =
            serde_json::from_value(json!({ "total_budget": "400,000" })).expect("valid request");
        let Json(body) =
            block_on(allocate_preview(State(state()), Json(request))).expect("preview failed");
        let total: u64 = body.data.allocations.iter().map(|a| a.size).sum();
        assert_eq!(total, 400_000);
        assert_eq!(body.data.allocations[0].size, 110_000);
    }

    #[test]
    fn allocate_rejects_invalid_budget() {
        let request: AllocateRequest =
            serde_json::from_value(json!({ "total_budget": -20 })).expect("valid request");
        let err = block_on(allocate_preview(State(state()), Json(request))).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn roi_endpoint_quotes_bracket() {
        let request: RoiRequest = serde_json::from_value(json!({
            "base_roi": 4.2,
            "ref_budget": 120000,
            "new_budget": 180000
        }))
        .expect("valid request");
        let Json(body) = block_on(roi(Json(request))).expect("roi failed");
        assert!((body.data.adjusted_roi - 3.99).abs() < 1e-9);
    }

    #[test]
    fn scenarios_are_created_listed_and_fetched() {
        let state = state();
        let optimization: OptimizationRequest = serde_json::from_value(json!({
            "name": "API plan",
            "kpi": "conversions",
            "total_budget": 350000
        }))
        .expect("valid request");
        let Json(created) = block_on(create_optimization(
            State(state.clone()),
            Json(optimization),
        ))
        .expect("optimization failed");
        assert_eq!(created.data.scenario_type, ScenarioType::Optimization);

        let simulation: SimulationRequest = serde_json::from_value(json!({
            "name": "API what-if",
            "levers": [
                { "name": "TV", "new_budget": 180000 },
                { "name": "Digital" }
            ]
        }))
        .expect("valid request");
        let Json(simulated) =
            block_on(create_simulation(State(state.clone()), Json(simulation)))
                .expect("simulation failed");
        let ScenarioAllocation::Levers(levers) = &simulated.data.allocation else {
            panic!("expected levers");
        };
        assert_eq!(levers.len(), 2);
        assert_eq!(simulated.data.total_budget, 270_000);

        let filter = ScenarioFilter {
            scenario_type: Some(ScenarioType::Simulation),
            ..Default::default()
        };
        let Json(listed) = block_on(list_scenarios(State(state.clone()), Query(filter)))
            .expect("list failed");
        assert_eq!(listed.data.scenarios.len(), 1);

        let Json(fetched) = block_on(get_scenario(
            State(state.clone()),
            Path(created.data.id.clone()),
        ))
        .expect("get failed");
        assert_eq!(fetched.data.name, "API plan");

        let missing = block_on(get_scenario(State(state), Path("nope".to_string()))).unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_lever_is_bad_request() {
        let request: SimulationRequest = serde_json::from_value(json!({
            "name": "Bad",
            "levers": [{ "name": "Cinema" }]
        }))
        .expect("valid request");
        let err = block_on(create_simulation(State(state()), Json(request))).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
