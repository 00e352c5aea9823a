//! Integration tests for builds that pull modules from a CDN.
//!
//! These tests use a mock CDN to avoid network calls.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use sandbundle_core::{engine, BuildConfig, BuildOptions, Bundler, FileTable};
use serial_test::serial;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

/// Global port counter for unique mock server ports.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19900);

fn javascript(body: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        body,
    )
        .into_response()
}

/// Mock CDN: `/react` redirects to a versioned build that imports a sibling
/// file relatively; everything else is a 404.
fn mock_cdn_router() -> Router {
    Router::new()
        .route(
            "/react",
            get(|| async { Redirect::temporary("/react@18.2.0/es2022/react.mjs") }),
        )
        .route(
            "/react@18.2.0/es2022/react.mjs",
            get(|| async {
                javascript("export * from './jsx.mjs';\nexport default { version: '18.2.0' };")
            }),
        )
        .route(
            "/react@18.2.0/es2022/jsx.mjs",
            get(|| async { javascript("export const jsx = () => null;") }),
        )
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
}

/// Start the mock CDN in a background thread. Returns the base URL.
fn start_mock_cdn() -> String {
    let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, mock_cdn_router()).await.unwrap();
        });
    });

    // Give the server time to start
    thread::sleep(Duration::from_millis(100));

    format!("http://127.0.0.1:{port}/")
}

fn bundler(cdn_root: &str) -> Bundler {
    Bundler::new(BuildConfig::default().with_cdn_root(cdn_root).unwrap())
}

fn entry_only(source: &str) -> BuildOptions {
    let files: FileTable = [("index.tsx", source)].into_iter().collect();
    BuildOptions::new(files).entry("index.tsx")
}

#[tokio::test]
#[serial]
async fn test_cdn_module_imports_resolve_against_final_url() {
    let base = start_mock_cdn();
    let result = bundler(&base)
        .build(entry_only("import React from 'react';\nconsole.log(React);"))
        .await;

    assert_eq!(result.error, None);
    assert_eq!(
        result.modules,
        vec![
            format!("cdn:{base}react@18.2.0/es2022/jsx.mjs"),
            format!("cdn:{base}react"),
            "virtual:index.tsx".to_string(),
        ]
    );

    let code = result.code.unwrap();
    assert!(code.contains("const jsx = () => null;"));
    assert!(code.contains("exports.jsx = jsx;"));
    assert!(code.contains("exports.default = { version: '18.2.0' };"));
    assert!(code.trim_end().ends_with("__require(0);\n})();"));
}

#[tokio::test]
#[serial]
async fn test_missing_package_aborts_with_url_and_status() {
    let base = start_mock_cdn();
    let result = bundler(&base)
        .build(entry_only("import _ from 'lodash';\n_.chunk([1, 2], 1);"))
        .await;

    assert_eq!(result.code, None);
    let error = result.error.unwrap();
    assert!(error.starts_with("FETCH_STATUS"), "{error}");
    assert!(error.contains(&format!("{base}lodash")), "{error}");
    assert!(error.contains("404"), "{error}");
    assert!(error.contains("Not found"), "{error}");
}

#[tokio::test]
#[serial]
async fn test_unreachable_cdn_reports_fetch_failure() {
    let result = bundler("http://127.0.0.1:1/")
        .build(entry_only("import 'left-pad';"))
        .await;

    assert_eq!(result.code, None);
    let error = result.error.unwrap();
    assert!(error.starts_with("FETCH_FAILED"), "{error}");
    assert!(error.contains("http://127.0.0.1:1/left-pad"), "{error}");
}

#[tokio::test]
#[serial]
async fn test_build_initializes_engine_idempotently() {
    engine::teardown();
    assert!(!engine::is_initialized());

    let b = bundler("http://127.0.0.1:1/");
    let first = b.build(entry_only("console.log(1);")).await;
    assert!(first.is_ok());
    assert!(engine::is_initialized());

    let second = b.build(entry_only("console.log(2);")).await;
    assert!(second.is_ok());
    assert!(engine::is_initialized());
}

#[tokio::test]
#[serial]
async fn test_local_only_build_makes_no_requests() {
    let files: FileTable = [
        ("src/index.tsx", "import { greet } from './lib/greet';\ngreet();"),
        ("src/lib/greet.ts", "export function greet() {\n  return 'hi';\n}"),
    ]
    .into_iter()
    .collect();

    let result = bundler("http://127.0.0.1:1/")
        .build(BuildOptions::new(files).entry("src/index.tsx"))
        .await;

    assert_eq!(result.error, None);
    let code = result.code.unwrap();
    assert!(code.contains("function greet() {"));
    assert!(code.contains("exports.greet = greet;"));
    assert!(code.contains("const { greet } = require(1);"));
}
