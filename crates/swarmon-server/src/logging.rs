use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

/// Per-request trace id, stored in request extensions for handlers.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// Generate a 16-character hex trace ID (8 random bytes).
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn format_elapsed(elapsed_us: u128) -> String {
    if elapsed_us < 1000 {
        format!("{elapsed_us}µs")
    } else if elapsed_us < 1_000_000 {
        format!("{}ms", elapsed_us / 1000)
    } else {
        format!("{:.1}s", elapsed_us as f64 / 1_000_000.0)
    }
}

/// Request/response logging middleware.
///
/// Sensor reports arrive every few seconds per device, so successful
/// ingestion is logged at debug; everything else at info. Client errors
/// are logged as warnings and server errors as errors.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path.starts_with("/docs") {
        return next.run(req).await;
    }

    let is_ingest = method == Method::POST && path == "/v1/sensor-data";
    if is_ingest {
        tracing::debug!(trace_id = %trace_id, method = %method, path = %path, "--> request");
    } else {
        tracing::info!(trace_id = %trace_id, method = %method, path = %path, "--> request");
    }

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = format_elapsed(start.elapsed().as_micros());
    let status = response.status();
    let status_code = status.as_u16();

    if status.is_server_error() {
        tracing::error!(trace_id = %trace_id, status = status_code, elapsed = %elapsed, "<-- response");
    } else if status.is_client_error() {
        tracing::warn!(trace_id = %trace_id, status = status_code, elapsed = %elapsed, "<-- response");
    } else if is_ingest {
        tracing::debug!(trace_id = %trace_id, status = status_code, elapsed = %elapsed, "<-- response");
    } else {
        tracing::info!(trace_id = %trace_id, status = status_code, elapsed = %elapsed, "<-- response");
    }

    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("X-Trace-Id", val);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_is_sixteen_hex_chars() {
        let id = generate_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn elapsed_uses_readable_units() {
        assert_eq!(format_elapsed(250), "250µs");
        assert_eq!(format_elapsed(4_500), "4ms");
        assert_eq!(format_elapsed(2_500_000), "2.5s");
    }
}
