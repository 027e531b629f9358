//! Request orchestration.
//!
//! # Pipeline
//! ```text
//! resolve route ──▶ authenticate ──▶ pre-request hooks ──▶ forward ──▶ post-request hooks
//!      │ 404            │ 401              │ plugin response   │ 502        │ plugin response
//! ```
//!
//! Each stage can end the request early; later stages then never run.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::{IntoResponse, Response},
};

use crate::auth::X_USER_ID;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::RouteNotFound;

/// Catch-all handler: every inbound request goes through here.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Dispatching request"
    );

    let routes = state.routes.load_full();
    let (route, endpoint) = match routes.resolve(&path) {
        Ok(found) => found,
        Err(e) => {
            match &e {
                RouteNotFound::NoRoute(_) => {
                    tracing::warn!(request_id = %request_id, path = %path, "No route matched")
                }
                RouteNotFound::UnknownService { .. } => {
                    tracing::error!(request_id = %request_id, error = %e, "Route has no service")
                }
            }
            let response = state.errors.not_found.clone();
            metrics::record_request(&method, response.status().as_u16(), "none", start);
            return response.into_response();
        }
    };
    let service = endpoint.name.as_str();

    let (mut parts, body) = request.into_parts();

    if let Some(validator) = &state.validator {
        // only the gateway may assert an identity
        parts.headers.remove(X_USER_ID);

        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        match validator.validate(authorization, !route.optional_auth()) {
            Ok(Some(user)) => user.attach_to(&mut parts),
            Ok(None) => {}
            Err(_) => {
                tracing::info!(request_id = %request_id, path = %path, "Authentication failed");
                let response = state.errors.unauthorized.clone();
                metrics::record_request(&method, response.status().as_u16(), service, start);
                return response.into_response();
            }
        }
    }

    if let Err(failure) = state.plugins.run_pre_request(&mut parts, route).await {
        metrics::record_request(&method, failure.response.status().as_u16(), service, start);
        return failure.response;
    }

    let stripped = route.stripped_path(&path);
    let mut response = match state.forwarder.forward(&parts, body, endpoint, stripped).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                service = %service,
                error = %e,
                "Upstream error"
            );
            let response = state.errors.service_unavailable.clone();
            metrics::record_request(&method, response.status().as_u16(), service, start);
            return response.into_response();
        }
    };

    if let Err(failure) = state
        .plugins
        .run_post_request(&parts, &mut response, route)
        .await
    {
        metrics::record_request(&method, failure.response.status().as_u16(), service, start);
        return failure.response;
    }

    tracing::debug!(
        request_id = %request_id,
        service = %service,
        status = %response.status(),
        "Request completed"
    );
    metrics::record_request(&method, response.status().as_u16(), service, start);
    response
}
