// ===============================
// src/http.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : http.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::domain::Direction;
use crate::error::RequestError;
use crate::metrics::{encode_metrics, REQUESTS_REJECTED};

/// Routes:
///   POST /buy | /sell | /increment   body {"kind": "..."}
///   POST /buy_shue | /sell_shue       older clients, same as /buy | /sell
///   GET  /snapshot                   current counters
///   GET  /metrics                    Prometheus text format
pub async fn handle(d: Arc<Dispatcher>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let res = match path.as_str() {
        "/buy" | "/buy_shue" => increment(&d, &method, Some(Direction::Buy), req).await,
        "/sell" | "/sell_shue" => increment(&d, &method, Some(Direction::Sell), req).await,
        "/increment" => increment(&d, &method, None, req).await,
        "/snapshot" if method == Method::GET => Ok(json(&d.snapshot().await)),
        "/metrics" if method == Method::GET => Ok(Response::builder()
            .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(encode_metrics()))
            .unwrap_or_default()),
        "/snapshot" | "/metrics" => Err(RequestError::MethodNotAllowed),
        _ => Err(RequestError::NotFound),
    };

    Ok(res.unwrap_or_else(|e| {
        debug!(%method, %path, error = %e, "request rejected");
        REQUESTS_REJECTED.with_label_values(&[e.reason()]).inc();
        error_response(&e)
    }))
}

async fn increment(
    d: &Dispatcher,
    method: &Method,
    direction: Option<Direction>,
    req: Request<Body>,
) -> Result<Response<Body>, RequestError> {
    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| RequestError::BadRequest(format!("Invalid request body: {e}")))?;
    let snap = d.increment(method, direction, &body).await?;
    Ok(json(&snap))
}

fn json<T: Serialize>(v: &T) -> Response<Body> {
    match serde_json::to_vec(v) {
        Ok(bytes) => Response::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .unwrap_or_default(),
        Err(_) => {
            let mut rsp = Response::new(Body::from("encode error\n"));
            *rsp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            rsp
        }
    }
}

fn error_response(e: &RequestError) -> Response<Body> {
    let mut rsp = Response::new(Body::from(format!("{e}\n")));
    *rsp.status_mut() = e.status();
    rsp.headers_mut()
        .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"));
    rsp
}

/// Serve until the shutdown flag flips.
pub async fn serve(
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), hyper::Error> {
    let make_svc = make_service_fn(move |_conn| {
        let d = dispatcher.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(d.clone(), req))) }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(%addr, "http: listening");
    server
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
            info!("http: shutting down");
        })
        .await
}
