//! `tacker serve` -- HTTP adapter over the dispatch engine.
//!
//! One fallback route: every inbound path is translated to the core's
//! request surface, dispatched against the object graph, and the buffered
//! response is drained back out. Redirects and error statuses were
//! already applied by the engine; this layer only converts
//! representations. Dispatch failures surface as 500s.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use tacker_core::{BufferedResponse, Engine, ObjectRef, PlainRequest, Response};

struct AppState {
    engine: Engine,
    root: ObjectRef,
}

/// Start the server on `port`, blocking until shutdown.
pub fn run(engine: Engine, root: ObjectRef, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(engine, root, port))
}

async fn serve(
    engine: Engine,
    root: ObjectRef,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState { engine, root });

    // permissive CORS for local development
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    let app = Router::new()
        .fallback(handle_any)
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("tacker listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_any(
    State(state): State<Arc<AppState>>,
    req: axum::extract::Request,
) -> AxumResponse {
    let mut request = PlainRequest::new(req.uri().path());
    if let Some(raw) = req.uri().query() {
        for (name, value) in parse_query(raw) {
            request = request.with_query(name, value);
        }
    }
    // demo-grade security realm: granted roles arrive in a header
    if let Some(roles) = req.headers().get("x-roles").and_then(|v| v.to_str().ok()) {
        for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            request = request.with_role(role);
        }
    }

    let mut response = BufferedResponse::new();
    match state
        .engine
        .dispatch(Arc::clone(&state.root), &request, &mut response)
    {
        Ok(report) => {
            tracing::debug!(path = req.uri().path(), outcome = ?report.outcome, "served");
            into_axum(response)
        }
        Err(e) => {
            tracing::error!(path = req.uri().path(), error = %e, "dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("dispatch failed: {e}\n"),
            )
                .into_response()
        }
    }
}

/// Minimal query parsing; values are taken verbatim, no percent decoding.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}

fn into_axum(buffered: BufferedResponse) -> AxumResponse {
    let mut builder = axum::http::Response::builder().status(buffered.status());
    for (name, value) in buffered.headers() {
        builder = builder.header(name, value);
    }
    match builder.body(Body::from(buffered.body().to_owned())) {
        Ok(response) => response,
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("response conversion failed: {e}\n"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_query;

    #[test]
    fn splits_pairs_and_bare_names() {
        let pairs = parse_query("a=1&b=&c");
        assert_eq!(
            pairs,
            vec![
                ("a".to_owned(), "1".to_owned()),
                ("b".to_owned(), String::new()),
                ("c".to_owned(), String::new()),
            ]
        );
    }
}
