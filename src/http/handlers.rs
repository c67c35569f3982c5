//! `/resources` handlers, one per manager operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::error::{outcome, ApiError};
use crate::manager::{
    BindAppArgs, ConfigurationBlock, CreateArgs, File, Manager, ManagerResult, PurgeCacheArgs, Route,
    UpdateInstanceArgs,
};
use crate::observability::metrics;

/// Shared handler state. The manager is swapped whole on config reload.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ArcSwap<Manager>>,
}

impl AppState {
    pub fn new(manager: Manager) -> Self {
        Self {
            manager: Arc::new(ArcSwap::from_pointee(manager)),
        }
    }

    fn manager(&self) -> Arc<Manager> {
        self.manager.load_full()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Runs one manager call, recording its outcome and latency.
async fn observe<T, F>(operation: &'static str, call: F) -> ApiResult<T>
where
    F: Future<Output = ManagerResult<T>>,
{
    let start = Instant::now();
    let result = call.await;
    let label = match &result {
        Ok(_) => "success",
        Err(e) => outcome(e),
    };
    metrics::record_operation(operation, label, start);
    result.map_err(ApiError::from)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub description: String,
    pub default: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlavorEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoItem {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CertificateRequest {
    #[serde(default)]
    pub name: String,
    pub certificate: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub path: String,
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<PlanEntry>>> {
    let plans = observe("get_plans", state.manager().get_plans()).await?;
    Ok(Json(
        plans
            .into_iter()
            .map(|plan| PlanEntry {
                name: plan.metadata.name,
                description: plan.spec.description.unwrap_or_default(),
                default: plan.spec.default,
            })
            .collect(),
    ))
}

pub async fn list_flavors(State(state): State<AppState>) -> Json<Vec<FlavorEntry>> {
    Json(
        state
            .manager()
            .get_flavors()
            .into_iter()
            .map(|flavor| FlavorEntry {
                name: flavor.name,
                description: flavor.description,
            })
            .collect(),
    )
}

pub async fn create_instance(
    State(state): State<AppState>,
    payload: Result<Json<CreateArgs>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(args) = payload?;
    let instance = observe("create_instance", state.manager().create_instance(args)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "name": instance.metadata.name }))))
}

/// Label/value pairs shown by service-info clients.
pub async fn service_info(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<Json<Vec<InfoItem>>> {
    let info = observe("instance_info", state.manager().instance_info(&instance)).await?;
    let item = |label: &str, value: String| InfoItem {
        label: label.to_string(),
        value,
    };
    Ok(Json(vec![
        item("Address", info.address),
        item("Instances", info.replicas.to_string()),
        item("Routes", info.routes.join("\n")),
    ]))
}

pub async fn update_instance(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<UpdateInstanceArgs>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(args) = payload?;
    observe("update_instance", state.manager().update_instance(&instance, args)).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_instance(State(state): State<AppState>, Path(instance): Path<String>) -> ApiResult<StatusCode> {
    observe("delete_instance", state.manager().delete_instance(&instance)).await?;
    Ok(StatusCode::OK)
}

pub async fn instance_info(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let info = observe("instance_info", state.manager().instance_info(&instance)).await?;
    Ok(Json(info))
}

pub async fn instance_status(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = observe("get_instance_status", state.manager().get_instance_status(&instance)).await?;
    Ok(Json(status))
}

pub async fn bind_app(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<BindAppArgs>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(args) = payload?;
    observe("bind_app", state.manager().bind_app(&instance, args)).await?;
    Ok(StatusCode::CREATED)
}

pub async fn unbind_app(State(state): State<AppState>, Path(instance): Path<String>) -> ApiResult<StatusCode> {
    observe("unbind_app", state.manager().unbind_app(&instance)).await?;
    Ok(StatusCode::OK)
}

pub async fn scale(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    observe("scale", state.manager().scale(&instance, request.quantity)).await?;
    Ok(StatusCode::OK)
}

pub async fn list_blocks(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<Json<Vec<ConfigurationBlock>>> {
    Ok(Json(observe("list_blocks", state.manager().list_blocks(&instance)).await?))
}

pub async fn update_block(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<ConfigurationBlock>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(block) = payload?;
    observe("update_block", state.manager().update_block(&instance, block)).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_block(
    State(state): State<AppState>,
    Path((instance, block)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    observe("delete_block", state.manager().delete_block(&instance, &block)).await?;
    Ok(StatusCode::OK)
}

pub async fn list_routes(State(state): State<AppState>, Path(instance): Path<String>) -> ApiResult<Json<Vec<Route>>> {
    Ok(Json(observe("get_routes", state.manager().get_routes(&instance)).await?))
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<Route>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(route) = payload?;
    observe("update_route", state.manager().update_route(&instance, route)).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> ApiResult<StatusCode> {
    let Query(query) = query?;
    observe("delete_route", state.manager().delete_route(&instance, &query.path)).await?;
    Ok(StatusCode::OK)
}

pub async fn list_certificates(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let certificates = observe("list_certificates", state.manager().list_certificates(&instance)).await?;
    Ok(Json(certificates))
}

pub async fn update_certificate(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<CertificateRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    observe(
        "update_certificate",
        state.manager().update_certificate(
            &instance,
            &request.name,
            request.certificate.as_bytes(),
            request.key.as_bytes(),
        ),
    )
    .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_certificate(
    State(state): State<AppState>,
    Path((instance, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    observe("delete_certificate", state.manager().delete_certificate(&instance, &name)).await?;
    Ok(StatusCode::OK)
}

pub async fn list_files(State(state): State<AppState>, Path(instance): Path<String>) -> ApiResult<Json<Vec<File>>> {
    Ok(Json(observe("get_extra_files", state.manager().get_extra_files(&instance)).await?))
}

pub async fn create_files(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<Vec<File>>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(files) = payload?;
    observe("create_extra_files", state.manager().create_extra_files(&instance, &files)).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update_files(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<Vec<File>>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(files) = payload?;
    observe("update_extra_files", state.manager().update_extra_files(&instance, &files)).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_files(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(names) = payload?;
    observe("delete_extra_files", state.manager().delete_extra_files(&instance, &names)).await?;
    Ok(StatusCode::OK)
}

pub async fn purge_cache(
    State(state): State<AppState>,
    Path(instance): Path<String>,
    payload: Result<Json<PurgeCacheArgs>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(args) = payload?;
    let path = args.path.clone();
    let purged = observe("purge_cache", state.manager().purge_cache(&instance, args)).await?;
    Ok(Json(json!({ "path": path, "instances_purged": purged })))
}
