mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::Fixture;
use pmofiles::{Backgrounds, FileServerExt, Root, placeholder_cover};
use pmoserver::ServerBuilder;
use std::io::{Cursor, Read};
use tower::ServiceExt;

async fn router(fixture: &Fixture) -> Router {
    let mut server = ServerBuilder::new("Test", "127.0.0.1", 0).build();
    let backgrounds: Backgrounds = [("Disco".to_string(), "disco.jpg".to_string())]
        .into_iter()
        .collect();
    server
        .init_file_server(Root::new(&fixture.root).unwrap(), backgrounds, None)
        .await
        .unwrap();
    server.router().await
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn header_str<'a>(response: &'a axum::response::Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    for uri in [
        "/../../etc/passwd",
        "/%2e%2e/%2e%2e/etc/passwd",
        "/download/file/../../outside/secret.txt",
        "/download/file/%2e%2e/outside/secret.txt",
        "/stream/..%2f..%2foutside%2fsecret.txt",
        "/download/zip/%2e%2e",
        "/api/files/list/%2e%2e",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(!body.contains(fixture.root.to_str().unwrap()));
    }
}

#[tokio::test]
async fn test_missing_paths_are_not_found() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    for uri in [
        "/Nope",
        "/download/file/Music/nope.mp3",
        "/download/file/Music",
        "/stream/Music/Disco",
        "/download/zip/Music/a.mp3",
        "/cover/Music/nope.mp3",
        "/api/files/list/Music/a.mp3",
        "/api/files/album/Music",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_listing_page() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let response = get(&router, "/Music").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, header::CONTENT_TYPE).unwrap().starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    let disco = html.find(r#"href="/Music/Disco""#).unwrap();
    let a = html.find(r#"href="/download/file/Music/a.mp3""#).unwrap();
    assert!(disco < a);
    assert!(html.contains("1 élément(s)"));
    assert!(html.contains("2.0KB"));
    assert!(html.contains(r#"data-src="/stream/Music/My%20Song.mp3""#));
    assert!(html.contains(r#"data-album="Hits""#));

    let root_page = get(&router, "/").await;
    assert_eq!(root_page.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(root_page).await).unwrap();
    assert!(html.contains(r#"href="/Music""#));
    assert!(!html.contains("Dossier parent"));
}

#[tokio::test]
async fn test_listing_page_background() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let html = String::from_utf8(body_bytes(get(&router, "/Music/Disco").await).await).unwrap();
    assert!(html.contains("/backgrounds/disco.jpg"));

    let html = String::from_utf8(body_bytes(get(&router, "/Music").await).await).unwrap();
    assert!(!html.contains("/backgrounds/"));
}

#[tokio::test]
async fn test_download_file() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let response = get(&router, "/download/file/Music/a.mp3").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        Some("attachment; filename=\"a.mp3\"")
    );
    assert_eq!(body_bytes(response).await.len(), 2048);

    // A file reached through the browse fallback is downloaded too
    let response = get(&router, "/Music/notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        Some("attachment; filename=\"notes.txt\"")
    );
    assert_eq!(body_bytes(response).await, b"liner notes");
}

#[tokio::test]
async fn test_stream_content_types() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    for (uri, expected) in [
        ("/stream/Music/a.mp3", "audio/mpeg"),
        ("/stream/Music/My%20Song.mp3", "audio/mpeg"),
        ("/stream/Music/broken.flac", "audio/flac"),
        ("/stream/Music/notes.txt", "application/octet-stream"),
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), Some(expected), "{}", uri);
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    }
}

#[tokio::test]
async fn test_stream_byte_range() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let request = Request::get("/stream/Music/a.mp3")
        .header(header::RANGE, "bytes=100-199")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("audio/mpeg"));
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 100-199/2048")
    );
    assert_eq!(body_bytes(response).await.len(), 100);
}

#[tokio::test]
async fn test_cover_route() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let response = get(&router, "/cover/Music/a.mp3").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("image/jpeg"));
    assert_eq!(body_bytes(response).await, placeholder_cover().to_vec());

    let response = get(&router, "/cover/Music/My%20Song.mp3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_ne!(bytes, placeholder_cover().to_vec());
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_zip_route() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let response = get(&router, "/download/zip/Music/Disco").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("application/zip"));
    assert_eq!(
        header_str(&response, header::CONTENT_DISPOSITION),
        Some("attachment; filename=\"Disco.zip\"")
    );

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_name("Disco/track.mp3").unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    assert_eq!(content, std::fs::read(fixture.path("Music/Disco/track.mp3")).unwrap());
}

#[tokio::test]
async fn test_api_list_and_album() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    let response = get(&router, "/api/files/list/Music").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["path"], "Music");
    assert_eq!(json["entries"][0]["name"], "Disco");
    assert_eq!(json["entries"][0]["kind"], "directory");
    assert_eq!(json["entries"][0]["child_count"], 1);
    assert_eq!(json["entries"][1]["name"], "a.mp3");
    assert_eq!(json["entries"][1]["size"], 2048);

    let response = get(&router, "/api/files/list").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["entries"][0]["name"], "Music");
    assert!(json.get("parent").is_none());

    let response = get(&router, "/api/files/album/Music/My%20Song.mp3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["album"], "Hits");
}

#[tokio::test]
async fn test_embedded_assets() {
    let fixture = Fixture::new();
    let router = router(&fixture).await;

    for uri in ["/assets/player.js", "/assets/index.css"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_init_from_config() {
    let fixture = Fixture::new();
    let config_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(fixture.tmp.path().join("bg")).unwrap();
    std::fs::write(fixture.tmp.path().join("bg/disco.jpg"), b"jpeg").unwrap();
    std::fs::write(
        config_dir.path().join("config.yaml"),
        format!(
            "host:\n  root_directory: {:?}\n  backgrounds_dir: {:?}\nbackgrounds:\n  Disco: disco.jpg\n",
            fixture.root.to_str().unwrap(),
            fixture.tmp.path().join("bg").to_str().unwrap(),
        ),
    )
    .unwrap();
    let config = pmoconfig::Config::load_config(config_dir.path().to_str().unwrap()).unwrap();

    let mut server = ServerBuilder::new("Test", "127.0.0.1", 0).build();
    let state = server.init_file_server_configured(&config).await.unwrap();
    assert_eq!(state.root.path(), fixture.root.canonicalize().unwrap());

    let router = server.router().await;
    let response = get(&router, "/backgrounds/disco.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"jpeg");

    let html = String::from_utf8(body_bytes(get(&router, "/Music/Disco").await).await).unwrap();
    assert!(html.contains("/backgrounds/disco.jpg"));
}
