use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use storage_engine::gateway::{router, AppState};
use storage_engine::Config;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    base: String,
    client: reqwest::Client,
    dir: TempDir,
}

async fn spawn_server(max_upload_bytes: usize) -> TestServer {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.root = dir.path().to_str().unwrap().to_string();
    config.storage.max_upload_bytes = max_upload_bytes;

    let state = AppState::from_config(&config).unwrap();
    let app = router(state, max_upload_bytes);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        dir,
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn upload(&self, filename: &str, bytes: &[u8]) -> reqwest::Response {
        let part = Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        self.client
            .post(self.url("/example/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }

    async fn upload_ok(&self, filename: &str, bytes: &[u8]) -> Value {
        let response = self.upload(filename, bytes).await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn download(&self, filename: &str) -> reqwest::Response {
        self.client
            .get(self.url("/example/download"))
            .query(&[("fileName", filename)])
            .send()
            .await
            .unwrap()
    }

    async fn track(&self, filename: &str, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/example/track"))
            .query(&[("filename", filename)])
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn root_reports_running() {
    let server = spawn_server(1024 * 1024).await;
    let body: Value = server.client.get(server.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["message"], "Storage Engine is running");
}

#[tokio::test]
async fn upload_then_download_round_trips() {
    let server = spawn_server(1024 * 1024).await;
    let bytes: Vec<u8> = (0..=255u8).cycle().take(5000).collect();

    let receipt = server.upload_ok("plan.docx", &bytes).await;
    assert_eq!(receipt["filename"], "plan.docx");
    assert_eq!(receipt["message"], "File uploaded successfully");
    assert_eq!(receipt["file_info"]["pureContentLength"], 5000);
    assert_eq!(receipt["file_info"]["version"], 2);
    assert!(receipt.get("original_filename").is_none());

    let response = server.download("plan.docx").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert!(response.headers()[reqwest::header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    assert_eq!(response.bytes().await.unwrap().as_ref(), bytes.as_slice());
}

#[tokio::test]
async fn duplicate_and_dirty_names_are_adjusted() {
    let server = spawn_server(1024 * 1024).await;

    server.upload_ok("ai.docx", b"first").await;
    let second = server.upload_ok("ai.docx", b"second").await;
    assert_eq!(second["filename"], "ai_01.docx");
    assert_eq!(second["original_filename"], "ai.docx");
    assert_eq!(
        second["message"],
        "File uploaded successfully (filename automatically adjusted: added number suffix to avoid duplication)"
    );

    let dirty = server.upload_ok("my report (v2).docx", b"third").await;
    assert_eq!(dirty["filename"], "my_report_v2.docx");
    assert_eq!(
        dirty["message"],
        "File uploaded successfully (filename automatically adjusted: cleaned special characters)"
    );

    let download = server.download("ai_01.docx").await;
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"second");
}

#[tokio::test]
async fn concurrent_uploads_with_the_same_name_both_persist() {
    let server = spawn_server(1024 * 1024).await;

    let (a, b) = tokio::join!(
        server.upload_ok("same name.txt", b"left"),
        server.upload_ok("same name.txt", b"right")
    );
    let (a, b) = (a["filename"].as_str().unwrap(), b["filename"].as_str().unwrap());
    assert_ne!(a, b);

    let mut names = vec![a.to_string(), b.to_string()];
    names.sort();
    assert_eq!(names, vec!["same_name.txt", "same_name_01.txt"]);
}

#[tokio::test]
async fn listing_is_newest_first() {
    let server = spawn_server(1024 * 1024).await;
    server.upload_ok("older.txt", b"1").await;
    let past = std::time::SystemTime::now() - std::time::Duration::from_secs(600);
    std::fs::File::options()
        .write(true)
        .open(server.dir.path().join("older.txt"))
        .unwrap()
        .set_modified(past)
        .unwrap();
    server.upload_ok("newer.txt", b"22").await;

    let files: Vec<Value> = server
        .client
        .get(server.url("/example/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let titles: Vec<&str> = files.iter().map(|f| f["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["newer.txt", "older.txt"]);
    assert_eq!(files[0]["pureContentLength"], 2);
    assert!(files[0]["updated"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn delete_removes_and_then_reports_missing() {
    let server = spawn_server(1024 * 1024).await;
    server.upload_ok("gone.txt", b"bye").await;

    let delete = |name: &'static str| {
        server
            .client
            .delete(server.url("/example/file"))
            .query(&[("filename", name)])
            .send()
    };

    let response = delete("gone.txt").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "File deleted successfully", "filename": "gone.txt"}));

    let response = delete("gone.txt").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "File does not exist");
}

#[tokio::test]
async fn bad_download_targets_are_client_errors() {
    let server = spawn_server(1024 * 1024).await;
    std::fs::create_dir(server.dir.path().join("folder")).unwrap();

    assert_eq!(server.download("missing.txt").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.download("../Cargo.toml").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.download("folder").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.download("").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_need_a_named_file_part() {
    let server = spawn_server(1024 * 1024).await;

    let unnamed = Form::new().part("file", Part::bytes(b"data".to_vec()));
    let response = server
        .client
        .post(server.url("/example/upload"))
        .multipart(unnamed)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let wrong_field = Form::new().text("note", "hello");
    let response = server
        .client
        .post(server.url("/example/upload"))
        .multipart(wrong_field)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "No file provided");
}

#[tokio::test]
async fn oversized_uploads_are_refused() {
    let server = spawn_server(1024).await;
    let response = server.upload("big.bin", &vec![7u8; 8 * 1024]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let files: Vec<Value> = server
        .client
        .get(server.url("/example/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn uploads_above_the_framework_default_limit_use_the_configured_cap() {
    let server = spawn_server(8 * 1024 * 1024).await;
    let bytes = vec![42u8; 3 * 1024 * 1024];

    let receipt = server.upload_ok("large.bin", &bytes).await;
    assert_eq!(receipt["file_info"]["pureContentLength"], bytes.len());

    let download = server.download("large.bin").await;
    assert_eq!(download.bytes().await.unwrap().len(), bytes.len());
}

#[tokio::test]
async fn save_callback_updates_the_downloaded_document() {
    let server = spawn_server(1024 * 1024).await;
    server.upload_ok("contract.docx", b"draft").await;

    let editor = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cache/contract.docx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"signed".as_slice()))
        .expect(1)
        .mount(&editor)
        .await;

    let ack = server
        .track(
            "contract.docx",
            json!({
                "key": "contract-1",
                "status": 2,
                "url": format!("{}/cache/contract.docx", editor.uri()),
                "users": ["alice"]
            }),
        )
        .await;
    assert_eq!(ack, json!({"error": 0}));

    let download = server.download("contract.docx").await;
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"signed");
}

#[tokio::test]
async fn callback_errors_still_answer_with_an_ack() {
    let server = spawn_server(1024 * 1024).await;

    let ack = server.track("a.docx", json!({"key": "k", "status": 3})).await;
    assert_eq!(ack, json!({"error": 1, "message": "Error during save"}));

    let ack = server.track("a.docx", json!({"key": "k", "status": 6})).await;
    assert_eq!(ack, json!({"error": 1, "message": "No URL provided"}));

    let response = server
        .client
        .post(server.url("/example/track"))
        .json(&json!({"key": "k", "status": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack, json!({"error": 1, "message": "Filename cannot be empty"}));
}
