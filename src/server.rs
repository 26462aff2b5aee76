use crate::config::{AppConfig, WindowConfig};
use crate::controller::{Pointer, Session};
use crate::svg::{chart_svg, label_html, map_svg};
use crate::types::Attribute;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use geo::algorithm::contains::Contains;
use geo::{BoundingRect, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
pub struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub session: Mutex<Session>,
    pub tree: RTree<AreaIndex>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let items: Vec<AreaIndex> = session
            .features()
            .iter()
            .enumerate()
            .filter_map(|(i, feature)| {
                let rect = feature.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            session: Mutex::new(session),
            tree: RTree::bulk_load(items),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Everything the page shell needs to redraw after an event.
#[derive(Debug, Serialize)]
pub struct ScenePayload {
    pub attribute: Attribute,
    pub attributes: Vec<&'static str>,
    pub map_svg: String,
    pub chart_svg: String,
    pub label_html: Option<String>,
    pub chart_top: f64,
}

fn scene(session: &Session) -> ScenePayload {
    ScenePayload {
        attribute: session.selected(),
        attributes: Attribute::ALL.iter().map(|a| a.as_str()).collect(),
        map_svg: map_svg(session.map()),
        chart_svg: chart_svg(session.chart()),
        label_html: session.label().map(label_html),
        chart_top: session.chart().layout.top,
    }
}

#[derive(Deserialize)]
pub struct SceneQuery {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Deserialize)]
pub struct AttributeRequest {
    attribute: Attribute,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HoverPhase {
    Enter,
    Move,
    Leave,
}

#[derive(Deserialize)]
pub struct HoverRequest {
    code: String,
    phase: HoverPhase,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    label_width: f64,
}

#[derive(Deserialize)]
pub struct ZoomRequest {
    delta_y: f64,
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
pub struct PanRequest {
    dx: f64,
    dy: f64,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    code: String,
    name: String,
    values: BTreeMap<&'static str, Option<f64>>,
}

pub fn build_app(state: Arc<AppState>, assets_dir: &Path) -> Router {
    Router::new()
        .route("/api/scene", get(scene_handler))
        .route("/api/attribute", post(attribute_handler))
        .route("/api/hover", post(hover_handler))
        .route("/api/zoom", post(zoom_handler))
        .route("/api/pan", post(pan_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(ServeDir::new(assets_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, session: Session) -> Result<()> {
    info!("Building spatial index for point queries");
    let state = Arc::new(AppState::new(session));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Serving {:?} on http://{}", config.server.assets_dir, addr);
    println!("Starting server on http://{}", addr);

    let app = build_app(state, &config.server.assets_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn scene_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SceneQuery>,
) -> Json<ScenePayload> {
    let mut session = state.session();
    if let (Some(width), Some(height)) = (params.width, params.height) {
        if width > 0.0 && height > 0.0 {
            session.resize(WindowConfig { width, height });
        }
    }
    Json(scene(&session))
}

async fn attribute_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AttributeRequest>,
) -> Json<ScenePayload> {
    let mut session = state.session();
    session.select_attribute(request.attribute);
    Json(scene(&session))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HoverRequest>,
) -> Json<ScenePayload> {
    let mut session = state.session();
    let pointer = Pointer { x: request.x, y: request.y };
    match request.phase {
        HoverPhase::Enter => {
            if session.hover_enter(&request.code) {
                session.hover_move(pointer, request.label_width);
            }
        }
        HoverPhase::Move => {
            session.hover_move(pointer, request.label_width);
        }
        HoverPhase::Leave => session.hover_leave(&request.code),
    }
    Json(scene(&session))
}

async fn zoom_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ZoomRequest>,
) -> Json<ScenePayload> {
    let mut session = state.session();
    session.zoom(request.delta_y, Pointer { x: request.x, y: request.y });
    Json(scene(&session))
}

async fn pan_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PanRequest>,
) -> Json<ScenePayload> {
    let mut session = state.session();
    session.pan(request.dx, request.dy);
    Json(scene(&session))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);
    let session = state.session();

    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        if let Some(feature) = session.features().get(candidate.index) {
            if feature.geometry.contains(&point) {
                let values = Attribute::ALL
                    .iter()
                    .map(|attr| {
                        let value = feature.properties.values.get(*attr).filter(|v| !v.is_nan());
                        (attr.as_str(), value)
                    })
                    .collect();
                return Json(Some(QueryResponse {
                    code: feature.properties.code.clone(),
                    name: feature.properties.name.clone(),
                    values,
                }));
            }
        }
    }

    Json(None)
}
