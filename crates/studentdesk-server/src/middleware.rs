use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Middleware that ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = match req.headers().get(&header_name) {
        Some(existing) => existing.clone(),
        None => new_request_id(),
    };

    // Add to request extensions for downstream usage (e.g., logging)
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

fn new_request_id() -> HeaderValue {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Target of the HTTPS redirect.
#[derive(Debug, Clone, Copy)]
pub struct HttpsRedirect {
    pub https_port: u16,
}

// Redirects requests a proxy reports as plain HTTP to the HTTPS origin
pub async fn https_redirect(
    State(target): State<HttpsRedirect>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let forwarded_http = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("http"));

    if forwarded_http {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok());
        if let Some(host) = host {
            let path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let location = https_location(host, target.https_port, path);
            tracing::debug!(%location, "Redirecting to HTTPS");
            return Redirect::temporary(&location).into_response();
        }
    }

    next.run(req).await
}

/// `https://host[:port]/path`, dropping any port carried by `host`.
fn https_location(host: &str, https_port: u16, path_and_query: &str) -> String {
    let hostname = match host.rsplit_once(':') {
        // Bracketed IPv6 literals contain colons of their own.
        Some((name, port)) if !port.contains(']') => name,
        _ => host,
    };
    if https_port == 443 {
        format!("https://{hostname}{path_and_query}")
    } else {
        format!("https://{hostname}:{https_port}{path_and_query}")
    }
}
