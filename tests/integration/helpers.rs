//! Shared test helpers for integration tests.
//!
//! Every external tool is a shell script run as `sh <script>`, and the
//! record store is the in-memory one.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use partview_api::{AppState, build_router};
use partview_converter::{ConversionMetrics, StrategyRegistry};
use partview_core::config::AppConfig;
use partview_core::config::converter::ToolConfig;
use partview_core::types::FileId;
use partview_database::{RecordStore, Stores};
use partview_entity::file::FileRecord;
use partview_service::{IngestionDispatcher, IngestionPipeline, UploadService};

/// Mesh converter writing a container and reporting one unnamed-key part.
pub const MESH_OK: &str = "printf 'glTF' > \"$2\"\necho '{\"parts\":[{\"name\":\"Body\"}]}'\n";

/// Pulls the `--json-out` path out of the inline driver argument.
const KERNEL_JSON_OUT: &str =
    "json=$(printf '%s' \"$1\" | sed -n \"s/.*'--json-out', '\\([^']*\\)'.*/\\1/p\")\n";

/// Fake CAD kernel writing `parts` (a JSON document) to the requested path.
pub fn kernel_script(parts: &str) -> String {
    format!("{KERNEL_JSON_OUT}printf '%s' '{parts}' > \"$json\"\n")
}

/// Fake assembler: writes the container, optionally a node map, then exits.
pub fn assembler_script(node_map: Option<&str>, exit_code: i32) -> String {
    let map = node_map
        .map(|m| format!("printf '%s' '{m}' > \"$map\"\n"))
        .unwrap_or_default();
    format!(
        "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    --out-glb) glb=\"$2\"; shift 2;;\n    --out-map) map=\"$2\"; shift 2;;\n    *) shift;;\n  esac\ndone\nprintf 'glTF' > \"$glb\"\n{map}exit {exit_code}\n"
    )
}

/// Scripts standing in for the converter executables.
#[derive(Debug, Clone)]
pub struct FakeTools {
    pub mesh: String,
    pub kernel: String,
    pub assembler: String,
    pub timeout_seconds: u64,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            mesh: MESH_OK.to_string(),
            kernel: kernel_script(r#"{"parts":[{"partKey":"P1","name":"Housing"}]}"#),
            assembler: assembler_script(None, 0),
            timeout_seconds: 20,
        }
    }
}

/// A fully wired PartView instance over scratch directories.
pub struct Harness {
    pub dir: TempDir,
    pub config: AppConfig,
    pub stores: Stores,
    pub dispatcher: Arc<IngestionDispatcher>,
    pub uploads: UploadService,
}

fn sh_tool(dir: &Path, name: &str, body: &str) -> ToolConfig {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write tool script");
    ToolConfig::new("sh", vec![path.to_string_lossy().into_owned()])
}

impl Harness {
    /// Wire stores, pipeline, dispatcher, and upload service.
    pub fn new(tools: FakeTools) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool_dir = dir.path().join("tools");
        std::fs::create_dir_all(&tool_dir).expect("tool dir");

        let mut config = AppConfig::default();
        config.storage.data_root = dir.path().join("data").to_string_lossy().into_owned();
        config.converter.mesh_converter = sh_tool(&tool_dir, "mesh.sh", &tools.mesh);
        config.converter.cad_kernel = sh_tool(&tool_dir, "kernel.sh", &tools.kernel);
        config.converter.assembler = sh_tool(&tool_dir, "assemble.sh", &tools.assembler);
        config.converter.decompose_script = tool_dir.join("step_to_parts.py");
        config.converter.process_timeout_seconds = tools.timeout_seconds;
        config.worker.max_concurrent_conversions = 2;

        let stores = Stores::memory();
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&stores.records),
            StrategyRegistry::from_config(&config.converter),
            Arc::new(ConversionMetrics::new()),
            config.converter.keep_intermediates,
        ));
        let dispatcher = Arc::new(IngestionDispatcher::new(
            pipeline,
            config.worker.max_concurrent_conversions,
        ));
        let uploads = UploadService::new(
            Arc::clone(&stores.records),
            Arc::clone(&dispatcher),
            config.storage.clone(),
        );

        Self {
            dir,
            config,
            stores,
            dispatcher,
            uploads,
        }
    }

    /// The HTTP router over this instance.
    pub fn router(&self) -> Router {
        build_router(AppState::new(
            self.config.clone(),
            self.stores.clone(),
            Arc::clone(&self.dispatcher),
        ))
    }

    /// Poll until the record reaches `completed` or `failed`.
    pub async fn wait_terminal(&self, id: FileId) -> FileRecord {
        for _ in 0..400 {
            let record = self
                .stores
                .records
                .find_file(id)
                .await
                .expect("find file")
                .expect("record exists");
            if record.status.is_terminal() && !self.dispatcher.is_in_flight(id) {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("file {id} never reached a terminal status");
    }
}

/// Response captured by [`send`].
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Vec<u8>,
    /// Parsed JSON body (`Null` when not JSON)
    pub body: Value,
}

/// Send one request through the router.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .expect("Failed to read body")
        .to_vec();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        bytes,
        body,
    }
}

/// JSON request (or empty body when `body` is `None`).
pub async fn request(router: &Router, method: &str, path: &str, body: Option<Value>) -> TestResponse {
    let body_str = body
        .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
        .unwrap_or_default();
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body_str))
        .expect("Failed to build request");
    send(router, request).await
}

/// Multipart upload with a single `file` field.
pub async fn upload(router: &Router, filename: &str, data: &[u8]) -> TestResponse {
    const BOUNDARY: &str = "partview-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/cad/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("Failed to build request");
    send(router, request).await
}
