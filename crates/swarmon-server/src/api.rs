use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use swarmon_alert::config::AlertConfig;
use swarmon_common::types::Reading;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "no_data" => 1105,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn bad_request(trace_id: &str, msg: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", msg)
}

// ---- Health ----

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// 服务版本号
    version: String,
    /// 运行时长（秒）
    uptime_secs: i64,
    /// 当前设备存储中的设备数量（含尚未被清理的离线设备）
    device_count: usize,
    /// 历史记录中的读数总数
    reading_count: usize,
}

/// 获取服务健康状态。
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "服务健康状态", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            device_count: state.store.device_count(),
            reading_count: state.store.reading_count(),
        },
    )
}

// ---- Sensor data ----

/// 设备标识：固件上报数字芯片 ID，其他客户端可以上报字符串
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
enum ChipId {
    Number(u64),
    Text(String),
}

impl ChipId {
    fn into_device_id(self) -> Option<String> {
        match self {
            ChipId::Number(n) => Some(n.to_string()),
            ChipId::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

/// 传感器上报请求
#[derive(Debug, Deserialize, ToSchema)]
struct IngestRequest {
    /// 设备芯片 ID（字符串或无符号整数）
    #[serde(rename = "chipID")]
    chip_id: ChipId,
    /// 温度（°C）
    temperature: f64,
    /// 湿度（%）
    humidity: f64,
}

/// 上报结果
#[derive(Serialize, ToSchema)]
struct IngestResponse {
    /// 设备 ID
    device_id: String,
    /// 服务端记录的时间戳
    timestamp: DateTime<Utc>,
}

/// 接收一条传感器读数。
/// 读数时间戳以服务端时钟为准；字段缺失或类型错误时返回 400，且不修改任何状态。
#[utoipa::path(
    post,
    path = "/v1/sensor-data",
    tag = "Sensors",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "读数已记录", body = IngestResponse),
        (status = 400, description = "请求体无效", body = ApiError)
    )
)]
async fn ingest_sensor_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected sensor report");
            return bad_request(&trace_id, "Invalid or missing fields: chipID, temperature, humidity");
        }
    };

    let Some(device_id) = req.chip_id.into_device_id() else {
        return bad_request(&trace_id, "chipID must not be empty");
    };

    let now = Utc::now();
    let recorded = state
        .store
        .ingest(Reading::new(device_id, req.temperature, req.humidity, now), now);

    tracing::debug!(
        device_id = %recorded.device_id,
        temperature = recorded.temperature,
        humidity = recorded.humidity,
        "Reading recorded"
    );

    success_response(
        StatusCode::OK,
        &trace_id,
        IngestResponse {
            device_id: recorded.device_id,
            timestamp: recorded.timestamp,
        },
    )
}

/// 设备最新读数
#[derive(Serialize, ToSchema)]
struct SensorSnapshot {
    /// 温度（°C）
    temperature: f64,
    /// 湿度（%）
    humidity: f64,
    /// 最后上报时间
    last_log_time: DateTime<Utc>,
}

/// 获取所有在线设备的最新读数。
/// 超过 `inactivity_timeout_secs` 未上报的设备会在本次查询时被移除。
#[utoipa::path(
    get,
    path = "/v1/sensor-data",
    tag = "Sensors",
    responses(
        (status = 200, description = "设备 ID 到最新读数的映射", body = BTreeMap<String, SensorSnapshot>)
    )
)]
async fn list_sensor_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let snapshot: BTreeMap<String, SensorSnapshot> = state
        .store
        .snapshot(Utc::now(), state.config.inactivity_timeout())
        .into_iter()
        .map(|(device_id, reading)| {
            (
                device_id,
                SensorSnapshot {
                    temperature: reading.temperature,
                    humidity: reading.humidity,
                    last_log_time: reading.timestamp,
                },
            )
        })
        .collect();
    success_response(StatusCode::OK, &trace_id, snapshot)
}

/// 历史查询参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct HistoryParams {
    /// 只返回该设备的读数
    device_id: Option<String>,
    /// 只返回最近 N 秒内的读数
    since_secs: Option<u64>,
}

/// 历史读数
#[derive(Serialize, ToSchema)]
struct HistoryEntry {
    /// 温度（°C）
    temperature: f64,
    /// 湿度（%）
    humidity: f64,
    /// 记录时间
    timestamp: DateTime<Utc>,
}

impl From<Reading> for HistoryEntry {
    fn from(reading: Reading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            timestamp: reading.timestamp,
        }
    }
}

/// 查询设备历史读数。
/// 默认返回全部历史，可按设备和时间窗口过滤；离线设备的历史同样保留。
#[utoipa::path(
    get,
    path = "/v1/sensor-history",
    tag = "Sensors",
    params(HistoryParams),
    responses(
        (status = 200, description = "设备 ID 到历史读数列表的映射", body = BTreeMap<String, Vec<HistoryEntry>>),
        (status = 400, description = "查询参数无效", body = ApiError)
    )
)]
async fn sensor_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> impl IntoResponse {
    let Ok(Query(params)) = params else {
        return bad_request(&trace_id, "Invalid query parameters: device_id, since_secs");
    };
    let since = match params.since_secs {
        Some(secs) => {
            let window = i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds);
            match window.and_then(|w| Utc::now().checked_sub_signed(w)) {
                Some(since) => since,
                None => return bad_request(&trace_id, "since_secs is out of range"),
            }
        }
        None => DateTime::<Utc>::MIN_UTC,
    };

    let device_filter = params.device_id;
    let history: BTreeMap<String, Vec<HistoryEntry>> = state
        .store
        .windowed_readings(
            |id| device_filter.as_deref().map_or(true, |wanted| wanted == id),
            since,
        )
        .into_iter()
        .map(|(device_id, readings)| {
            (device_id, readings.into_iter().map(HistoryEntry::from).collect())
        })
        .collect();
    success_response(StatusCode::OK, &trace_id, history)
}

/// 平均温度
#[derive(Serialize, ToSchema)]
struct AverageTemperatureResponse {
    /// 窗口内所有读数的温度算术平均值（°C）
    average_temperature: f64,
    /// 参与计算的读数数量
    sample_count: usize,
    /// 统计窗口（秒）
    window_secs: u64,
}

/// 获取最近 `average_window_secs` 秒内所有设备读数的平均温度。
/// 窗口内没有数据时返回 404（err_code 1105），不会返回 0。
#[utoipa::path(
    get,
    path = "/v1/average-temperature",
    tag = "Sensors",
    responses(
        (status = 200, description = "窗口平均温度", body = AverageTemperatureResponse),
        (status = 404, description = "窗口内无数据", body = ApiError)
    )
)]
async fn average_temperature(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let window_secs = state.config.average_window_secs;
    match state
        .store
        .global_average(state.config.average_window(), Utc::now())
    {
        Some(average) => success_response(
            StatusCode::OK,
            &trace_id,
            AverageTemperatureResponse {
                average_temperature: average.mean,
                sample_count: average.sample_count,
                window_secs,
            },
        ),
        None => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "no_data",
            &format!("No data in the last {window_secs} seconds"),
        ),
    }
}

// ---- Alert config ----

/// 告警阈值：数字或可解析为数字的字符串
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
enum ThresholdInput {
    Number(f64),
    Text(String),
}

impl ThresholdInput {
    fn parse(&self) -> Option<f64> {
        let value = match self {
            ThresholdInput::Number(n) => *n,
            ThresholdInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// 更新告警配置请求
#[derive(Debug, Deserialize, ToSchema)]
struct SetAlertConfigRequest {
    /// 告警阈值（°C），窗口均值低于该值时触发
    threshold: ThresholdInput,
    /// 是否启用告警
    enabled: bool,
}

/// 告警配置
#[derive(Serialize, ToSchema)]
struct AlertConfigResponse {
    /// 告警阈值（°C）
    threshold: f64,
    /// 是否启用告警
    enabled: bool,
    /// 告警判定窗口（秒）
    window_secs: u64,
    /// 冷却时间（秒）
    cooldown_secs: u64,
    /// 最近一次发送告警的时间
    last_sent: Option<DateTime<Utc>>,
}

fn alert_config_response(state: &AppState, config: AlertConfig) -> AlertConfigResponse {
    AlertConfigResponse {
        threshold: config.threshold,
        enabled: config.enabled,
        window_secs: state.config.alert.window_secs,
        cooldown_secs: state.config.alert.cooldown_secs,
        last_sent: state.cooldown.last_sent(),
    }
}

/// 更新告警阈值与开关。
/// 阈值与开关作为一个整体替换，下一次评估周期生效。
#[utoipa::path(
    post,
    path = "/v1/alert-config",
    tag = "Alerts",
    request_body = SetAlertConfigRequest,
    responses(
        (status = 200, description = "告警配置已更新", body = AlertConfigResponse),
        (status = 400, description = "阈值或开关无效", body = ApiError)
    )
)]
async fn set_alert_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    payload: Result<Json<SetAlertConfigRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected alert config update");
            return bad_request(&trace_id, "Invalid request format: threshold and enabled are required");
        }
    };

    let Some(threshold) = req.threshold.parse() else {
        return bad_request(&trace_id, "Invalid threshold value");
    };

    let config = AlertConfig {
        threshold,
        enabled: req.enabled,
    };
    let previous = state.alert_config.set(config);
    tracing::info!(
        threshold = config.threshold,
        enabled = config.enabled,
        previous_threshold = previous.threshold,
        previous_enabled = previous.enabled,
        "Alert config updated"
    );

    success_response(StatusCode::OK, &trace_id, alert_config_response(&state, config))
}

/// 获取当前告警配置及最近一次告警发送时间。
#[utoipa::path(
    get,
    path = "/v1/alert-config",
    tag = "Alerts",
    responses(
        (status = 200, description = "当前告警配置", body = AlertConfigResponse)
    )
)]
async fn get_alert_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let config = state.alert_config.get();
    success_response(StatusCode::OK, &trace_id, alert_config_response(&state, config))
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(ingest_sensor_data, list_sensor_data))
        .routes(routes!(sensor_history))
        .routes(routes!(average_temperature))
        .routes(routes!(set_alert_config, get_alert_config))
}
