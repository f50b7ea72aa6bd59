//! REST API and WebSocket for browser joysticks
//!
//! A web joystick posts drag events (or streams them over the WebSocket) and
//! receives every published message back. Default port: 8126

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ControlConfig};
use crate::control::{DragEvent, Point, SchedulerHandle, SchedulerStatus};
use crate::publish::{BroadcastSink, PublishedMessage};
use crate::targets::{PublishTarget, TargetRegistry, TopicRegistry};

/// Default API port
pub const DEFAULT_API_PORT: u16 = 8126;

/// Shared state for API handlers
pub struct ApiState {
    pub scheduler: SchedulerHandle,
    pub registry: Arc<TopicRegistry>,
    /// Source of published messages for WebSocket clients
    pub broadcast: Arc<BroadcastSink>,
    /// Current configuration (control section is editable)
    pub config: Arc<RwLock<AppConfig>>,
    /// File to persist config edits to, if any
    pub config_path: Option<String>,
}

/// Request body for selecting a publish target
#[derive(Debug, Deserialize)]
pub struct SetTargetRequest {
    pub topic: String,
}

/// Response for the active target
#[derive(Debug, Serialize)]
pub struct TargetResponse {
    pub target: Option<PublishTarget>,
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/joystick/start", post(drag_start))
        .route("/api/joystick/move", post(drag_move))
        .route("/api/joystick/end", post(drag_end))
        .route("/api/joystick/status", get(joystick_status))
        .route("/api/ws/joystick", get(joystick_ws))
        .route("/api/topics", get(list_topics).put(set_topics))
        .route("/api/target", get(get_target).put(set_target))
        .route("/api/config", get(get_config).put(set_config))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn finite(point: Point) -> Result<Point, ApiError> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(ApiError::new("Coordinates must be finite numbers"))
    }
}

/// POST /api/joystick/start - Begin a drag at {x, y}
async fn drag_start(
    State(state): State<Arc<ApiState>>,
    Json(point): Json<Point>,
) -> Result<StatusCode, ApiError> {
    state.scheduler.drag_start(finite(point)?);
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/joystick/move - Move the pointer to {x, y}
async fn drag_move(
    State(state): State<Arc<ApiState>>,
    Json(point): Json<Point>,
) -> Result<StatusCode, ApiError> {
    state.scheduler.drag_move(finite(point)?);
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/joystick/end - Release the joystick
async fn drag_end(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.scheduler.drag_end();
    StatusCode::ACCEPTED
}

/// GET /api/joystick/status - Scheduler snapshot
async fn joystick_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<SchedulerStatus>, ApiError> {
    state
        .scheduler
        .status()
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e.to_string()))
}

/// GET /api/topics - Usable topics (recognized schemas only)
async fn list_topics(State(state): State<Arc<ApiState>>) -> Json<Vec<PublishTarget>> {
    Json(state.registry.topics())
}

/// PUT /api/topics - Replace the known topic list
async fn set_topics(
    State(state): State<Arc<ApiState>>,
    Json(topics): Json<Vec<PublishTarget>>,
) -> Json<Vec<PublishTarget>> {
    state.registry.set_topics(topics);
    Json(state.registry.topics())
}

/// GET /api/target - Active publish target
async fn get_target(State(state): State<Arc<ApiState>>) -> Json<TargetResponse> {
    Json(TargetResponse {
        target: state.registry.active_target(),
    })
}

/// PUT /api/target - Select a known topic as the publish target
async fn set_target(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SetTargetRequest>,
) -> Result<Json<TargetResponse>, ApiError> {
    let target = state.registry.select(&req.topic).map_err(|e| {
        ApiError::new(format!(
            "{}. Use GET /api/topics to see available topics.",
            e
        ))
    })?;

    Ok(Json(TargetResponse {
        target: Some(target),
    }))
}

/// GET /api/config - Control settings
async fn get_config(State(state): State<Arc<ApiState>>) -> Json<ControlConfig> {
    Json(state.config.read().control)
}

/// PUT /api/config - Update control settings (clamped), persisting them if possible
async fn set_config(
    State(state): State<Arc<ApiState>>,
    Json(control): Json<ControlConfig>,
) -> Result<Json<ControlConfig>, ApiError> {
    let control = control.clamped();

    let snapshot = {
        let mut config = state.config.write();
        let mut candidate = config.clone();
        candidate.control = control;
        candidate
            .validate()
            .map_err(|e| ApiError::new(e.to_string()))?;
        *config = candidate.clone();
        candidate
    };

    state.scheduler.reconfigure(control);
    info!(
        "Control settings updated: {} Hz, max linear {}, max angular {}",
        control.publish_rate_hz, control.max_linear_speed, control.max_angular_speed
    );

    if let Some(path) = &state.config_path {
        if let Err(e) = snapshot.save(path).await {
            warn!("Failed to persist control settings: {:#}", e);
        }
    }

    Ok(Json(control))
}

/// GET /api/ws/joystick - Drag events in, published messages out
async fn joystick_ws(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let rx = state.broadcast.subscribe();
        handle_websocket(socket, state, rx)
    })
}

/// Handle a joystick WebSocket connection
async fn handle_websocket(
    mut socket: WebSocket,
    state: Arc<ApiState>,
    mut rx: broadcast::Receiver<PublishedMessage>,
) {
    debug!("WebSocket joystick client connected");

    loop {
        tokio::select! {
            // Forward published messages to the client
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        let text = match serde_json::to_string(&message) {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to serialize published message: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text)).await.is_err() {
                            debug!("WebSocket client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged by {} messages", n);
                    }
                }
            }
            // Drag events from the client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<DragEvent>(&text) {
                            Ok(event) if event.position().map_or(true, |p| p.is_finite()) => {
                                state.scheduler.dispatch(event);
                            }
                            Ok(event) => warn!("Ignoring non-finite drag event {:?}", event),
                            Err(e) => warn!("Invalid drag event from WebSocket: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client closed connection");
                        // A vanished pointer must not keep the robot driving
                        state.scheduler.drag_end();
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Ignore binary/pong frames
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        state.scheduler.drag_end();
                        break;
                    }
                }
            }
        }
    }
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, port: u16) -> Result<()> {
    let router = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting joystick API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CommandScheduler, Phase};
    use crate::publish::{ChannelMode, PublisherAdapter, VEL_CMD_SCHEMA_ROS_2};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> Arc<ApiState> {
        let broadcast = Arc::new(BroadcastSink::new(16));
        let registry = Arc::new(TopicRegistry::new(Some(broadcast.clone())));
        registry.set_topics(vec![
            PublishTarget::new("/cmd_vel", VEL_CMD_SCHEMA_ROS_2),
            PublishTarget::new("/twist", "geometry_msgs/Twist"),
        ]);

        let adapter = PublisherAdapter::new(
            registry.clone(),
            Some(broadcast.clone()),
            ChannelMode::Linear,
        );
        let config = AppConfig::default();
        let scheduler = CommandScheduler::spawn(config.control, adapter);

        Arc::new(ApiState {
            scheduler,
            registry,
            broadcast,
            config: Arc::new(RwLock::new(config)),
            config_path: None,
        })
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_topics_are_filtered() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/api/topics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "/cmd_vel");
    }

    #[tokio::test]
    async fn test_select_unknown_target_is_rejected() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/target", r#"{"topic":"/twist"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.registry.active_target().is_none());

        let response = app
            .oneshot(json_request("PUT", "/api/target", r#"{"topic":"/cmd_vel"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.registry.active_target().unwrap().name, "/cmd_vel");
    }

    #[tokio::test]
    async fn test_config_update_is_clamped() {
        let state = test_state();
        let app = build_router(state.clone());

        let body = r#"{"publish_rate_hz":0,"max_linear_speed":-1,"max_angular_speed":2}"#;
        let response = app
            .oneshot(json_request("PUT", "/api/config", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["publish_rate_hz"], 1.0);
        assert_eq!(json["max_linear_speed"], 0.0);
        assert_eq!(json["max_angular_speed"], 2.0);

        let status = state.scheduler.status().await.unwrap();
        assert_eq!(status.config.publish_rate_hz, 1.0);
        assert_eq!(state.config.read().control.max_angular_speed, 2.0);
    }

    #[tokio::test]
    async fn test_config_update_caps_rate_and_rejects_stuck_decay() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/config", r#"{"publish_rate_hz":1e10}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["publish_rate_hz"], 1000.0);

        let body = r#"{"publish_rate_hz":5,"decay":{"blend":0}}"#;
        let response = app
            .oneshot(json_request("PUT", "/api/config", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.config.read().control.decay.blend, 0.1);

        let status = state.scheduler.status().await.unwrap();
        assert_eq!(status.config.publish_rate_hz, 1000.0);
    }

    #[tokio::test]
    async fn test_drag_endpoints_drive_scheduler() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/joystick/start", r#"{"x":100,"y":100}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let status = state.scheduler.status().await.unwrap();
        assert_eq!(status.phase, Phase::Driving);

        app.oneshot(Request::post("/api/joystick/end").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = state.scheduler.status().await.unwrap();
        assert_eq!(status.phase, Phase::Decaying);
    }
}
