use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use continuum::{ClientConfig, GridSpec, create_grid};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// What the mock API has received so far.
#[derive(Debug, Default)]
pub struct MockApi {
    pub projects: BTreeMap<String, Value>,
    /// `(project, filename, file_type, size)` per accepted upload.
    pub uploads: Vec<(String, String, String, usize)>,
    pub requested_paths: Vec<String>,
    pub healthy: bool,
    /// Answer uploads and listings with the file extension in `format`,
    /// as the Python backend does, instead of echoing `file_type`.
    pub extension_listing: bool,
}

fn extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

pub type SharedMock = Arc<Mutex<MockApi>>;

#[derive(Deserialize)]
struct CreateBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    author: String,
}

#[derive(Deserialize)]
struct ListQuery {
    project: String,
}

fn log(mock: &SharedMock, path: impl Into<String>) {
    mock.lock().unwrap().requested_paths.push(path.into());
}

async fn create_project(State(mock): State<SharedMock>, Json(body): Json<CreateBody>) -> Json<Value> {
    log(&mock, "/projects/create");
    let mut api = mock.lock().unwrap();
    if api.projects.contains_key(&body.name) {
        return Json(json!({"success": false, "error": "Project already exists"}));
    }
    let project = json!({
        "name": body.name,
        "description": body.description,
        "author": body.author,
        "created_at": "2024-05-01T10:00:00.123456",
        "updated_at": "2024-05-01T10:00:00.123456",
    });
    api.projects.insert(body.name, project.clone());
    Json(json!({"success": true, "project": project}))
}

async fn list_projects(State(mock): State<SharedMock>) -> Json<Value> {
    log(&mock, "/projects/list");
    let api = mock.lock().unwrap();
    let projects: Vec<Value> = api.projects.values().cloned().collect();
    Json(json!({"projects": projects}))
}

async fn get_project(State(mock): State<SharedMock>, Path(name): Path<String>) -> Json<Value> {
    log(&mock, format!("/projects/{name}"));
    let api = mock.lock().unwrap();
    match api.projects.get(&name) {
        Some(project) => {
            let mut project = project.clone();
            project["met_sites_count"] = json!(1);
            project["turbines_count"] = json!(0);
            project["has_topography"] = json!(false);
            project["has_land_cover"] = json!(false);
            Json(json!({"success": true, "project": project}))
        }
        None => Json(json!({"success": false, "error": "Project not found"})),
    }
}

async fn upload(State(mock): State<SharedMock>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    log(&mock, "/files/upload");
    let mut project = String::new();
    let mut file_type = String::new();
    let mut filename = String::new();
    let mut size = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or_default() {
            "file" => {
                filename = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            }
            "project" => project = field.text().await.unwrap_or_default(),
            "file_type" => file_type = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }
    if filename.ends_with(".exe") {
        return (
            StatusCode::OK,
            Json(json!({"success": false, "error": "Unsupported file format: .exe"})),
        );
    }
    let mut api = mock.lock().unwrap();
    api.uploads.push((project, filename.clone(), file_type, size));
    let body = if api.extension_listing {
        json!({"success": true, "filename": filename, "format": extension(&filename), "metadata": {}})
    } else {
        json!({"success": true, "message": format!("{filename} uploaded")})
    };
    (StatusCode::OK, Json(body))
}

async fn list_files(State(mock): State<SharedMock>, Query(query): Query<ListQuery>) -> Json<Value> {
    log(&mock, "/files/list");
    let api = mock.lock().unwrap();
    let files: Vec<Value> = api
        .uploads
        .iter()
        .filter(|(project, ..)| *project == query.project)
        .map(|(project, filename, file_type, size)| {
            if api.extension_listing {
                json!({
                    "name": filename,
                    "format": extension(filename),
                    "size": size,
                    "path": format!("{project}/data/{filename}"),
                    "metadata": null,
                })
            } else {
                json!({"filename": filename, "type": file_type})
            }
        })
        .collect();
    Json(json!({ "files": files }))
}

async fn layout_grid(
    State(mock): State<SharedMock>,
    Json(spec): Json<GridSpec>,
) -> (StatusCode, Json<Value>) {
    log(&mock, "/layout/grid");
    let turbines: Vec<Value> = match create_grid(&spec) {
        Ok(grid) => grid
            .into_iter()
            .map(|t| json!({"x": t.x, "y": t.y}))
            .collect(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": e.to_string()})),
            );
        }
    };
    (StatusCode::OK, Json(json!({
        "name": "Grid Layout",
        "n_turbines": turbines.len(),
        "turbines": turbines,
        "metrics": {},
        "fitness": 0.0,
    })))
}

async fn wake(State(mock): State<SharedMock>) -> (StatusCode, Json<Value>) {
    log(&mock, "/wake/calculate");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "wake model diverged"})),
    )
}

async fn met_filter(State(mock): State<SharedMock>, Json(payload): Json<Value>) -> Json<Value> {
    log(&mock, "/met-filter/filter");
    if payload["data"].as_array().is_some_and(Vec::is_empty) {
        return Json(json!({"success": false, "error": "No data provided"}));
    }
    Json(json!({"success": true, "filtered_data": payload["data"], "statistics": {}}))
}

async fn health(State(mock): State<SharedMock>) -> Json<Value> {
    let healthy = mock.lock().unwrap().healthy;
    Json(json!({"status": if healthy { "healthy" } else { "degraded" }}))
}

/// Serves a miniature analysis API on an ephemeral port.
pub async fn spawn_mock_api() -> (ClientConfig, SharedMock) {
    let mock = Arc::new(Mutex::new(MockApi {
        healthy: true,
        ..Default::default()
    }));
    let app = Router::new()
        .route("/projects/create", post(create_project))
        .route("/projects/list", get(list_projects))
        .route("/projects/:name", get(get_project))
        .route("/files/upload", post(upload))
        .route("/files/list", get(list_files))
        .route("/layout/grid", post(layout_grid))
        .route("/wake/calculate", post(wake))
        .route("/met-filter/filter", post(met_filter))
        .route("/health", get(health))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock API");
    let addr = listener.local_addr().expect("Failed to read mock address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let config = ClientConfig::new(&format!("http://{addr}"))
        .expect("Failed to build client config")
        .with_system_proxy(false);
    (config, mock)
}
