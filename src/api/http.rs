use actix_web::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, EXPIRES, IF_NONE_MATCH, PRAGMA,
};
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder};
use chrono::DateTime;
use log::warn;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Format unix millis as an HTTP-date.
pub fn http_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Strong entity tag of a response body.
pub fn etag(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

fn if_none_match(req: &HttpRequest, tag: &str) -> bool {
    req.headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|t| t.trim() == tag || t.trim() == "*"))
}

fn public_cache(builder: &mut HttpResponseBuilder, tag: &str, expires_at_millis: i64) {
    builder
        .insert_header((PRAGMA, "public"))
        .insert_header((CACHE_CONTROL, "public"))
        .insert_header((EXPIRES, http_date(expires_at_millis)))
        .insert_header((ETAG, tag.to_string()));
}

/// JSON response cacheable by clients for `ttl`, answering a matching
/// `If-None-Match` with 304.
pub fn cached_json<T: Serialize>(
    req: &HttpRequest,
    value: &T,
    ttl: Duration,
    now_millis: i64,
) -> HttpResponse {
    let body = match serde_json::to_vec(value) {
        Ok(b) => b,
        Err(e) => {
            warn!("{} - failed to serialize response: {}", req.path(), e);
            return HttpResponse::InternalServerError().body(e.to_string());
        }
    };
    let tag = etag(&body);
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let expires = now_millis.saturating_add(ttl_millis);

    if if_none_match(req, &tag) {
        let mut builder = HttpResponse::NotModified();
        public_cache(&mut builder, &tag, expires);
        return builder.finish();
    }

    let mut builder = HttpResponse::Ok();
    public_cache(&mut builder, &tag, expires);
    builder
        .insert_header((CONTENT_TYPE, "application/json"))
        .body(body)
}
