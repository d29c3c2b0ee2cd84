//! Conditional serving: validators, status selection, encoding negotiation.
//!
//! Given a request's headers and a cache entry, decides the status code,
//! response headers, and body to emit. `If-None-Match` and `If-Match` are
//! parsed as comma-separated entity-tag lists (or `*`) and matched against
//! the full tag, never by substring. `If-Match` follows standard HTTP
//! semantics: a hit proceeds to `200`, a miss yields
//! `412 Precondition Failed` (deliberately unlike older static caches that
//! answered `304` for an `If-Match` hit).

use crate::entry::MemFile;
use bytes::Bytes;
use hyper::header::{
	ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, ETAG, HeaderValue, IF_MATCH,
	IF_NONE_MATCH, VARY,
};
use hyper::{HeaderMap, StatusCode};

/// The response decided for a cached entry.
#[derive(Debug)]
pub struct ServedResponse {
	/// Status code: `200`, `304`, or `412`.
	pub status: StatusCode,

	/// Headers to emit, validation headers included on every status.
	pub headers: HeaderMap,

	/// Response body; empty on `304`.
	pub body: Bytes,
}

/// Serves `entry` against the given request headers.
///
/// Always sets `ETag`, `Cache-Control`, `Content-Type`, and
/// `Vary: Accept-Encoding`. A compressible entry is sent gzipped when the
/// request's `Accept-Encoding` lists `gzip`, with `Content-Encoding: gzip`;
/// otherwise the raw payload is sent. The entry is read-only throughout.
pub fn serve(request_headers: &HeaderMap, entry: &MemFile, cache_control: &str) -> ServedResponse {
	let mut headers = HeaderMap::new();

	match HeaderValue::from_str(&entry.etag) {
		Ok(value) => {
			headers.insert(ETAG, value);
		}
		Err(_) => tracing::warn!(etag = %entry.etag, "invalid ETag value; header omitted"),
	}
	match HeaderValue::from_str(cache_control) {
		Ok(value) => {
			headers.insert(CACHE_CONTROL, value);
		}
		Err(_) => tracing::warn!(cache_control, "invalid Cache-Control value; header omitted"),
	}
	headers.insert(
		CONTENT_TYPE,
		HeaderValue::from_str(&entry.content_type)
			.unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
	);
	headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));

	if let Some(if_none_match) = header_str(request_headers, &IF_NONE_MATCH)
		&& etag_list_matches(&entry.etag, if_none_match)
	{
		return ServedResponse {
			status: StatusCode::NOT_MODIFIED,
			headers,
			body: Bytes::new(),
		};
	}

	if let Some(if_match) = header_str(request_headers, &IF_MATCH)
		&& !etag_list_matches(&entry.etag, if_match)
	{
		return ServedResponse {
			status: StatusCode::PRECONDITION_FAILED,
			headers,
			body: Bytes::new(),
		};
	}

	let gzip_accepted = header_str(request_headers, &ACCEPT_ENCODING)
		.map(accepts_gzip)
		.unwrap_or(false);

	let body = match (&entry.gzipped, gzip_accepted) {
		(Some(gzipped), true) => {
			headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
			gzipped.clone()
		}
		_ => entry.raw.clone(),
	};

	ServedResponse {
		status: StatusCode::OK,
		headers,
		body,
	}
}

fn header_str<'a>(headers: &'a HeaderMap, name: &hyper::header::HeaderName) -> Option<&'a str> {
	headers.get(name).and_then(|value| value.to_str().ok())
}

/// Tests `etag` for exact membership in a comma-separated entity-tag list.
///
/// `*` matches any entity. Comparison is against whole tags (quoted or
/// unquoted), so a validator embedded inside a longer token never matches.
fn etag_list_matches(etag: &str, header_value: &str) -> bool {
	header_value.split(',').map(str::trim).any(|tag| {
		tag == "*" || tag == etag || tag.trim_matches('"') == etag.trim_matches('"')
	})
}

/// Whether an `Accept-Encoding` value lists gzip with a non-zero quality.
fn accepts_gzip(value: &str) -> bool {
	value.split(',').any(|part| {
		let mut pieces = part.trim().split(';');
		let coding = pieces.next().unwrap_or("").trim();
		if !coding.eq_ignore_ascii_case("gzip") && coding != "*" {
			return false;
		}
		match pieces.next().and_then(|q| q.trim().strip_prefix("q=")) {
			Some(quality) => quality.trim().parse::<f32>().map(|q| q > 0.0).unwrap_or(true),
			None => true,
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entry::content_etag;
	use rstest::rstest;
	use std::time::SystemTime;

	fn entry(raw: &[u8], gzipped: Option<&[u8]>) -> MemFile {
		MemFile::new(
			"/a.html".to_string(),
			"text/html; charset=utf-8".to_string(),
			content_etag(raw),
			Bytes::copy_from_slice(raw),
			gzipped.map(Bytes::copy_from_slice),
			SystemTime::now(),
			Vec::new(),
		)
	}

	fn headers(pairs: &[(hyper::header::HeaderName, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(name.clone(), value.parse().unwrap());
		}
		map
	}

	#[rstest]
	fn test_plain_get_sets_validation_headers() {
		let file = entry(b"<html></html>", None);
		let response = serve(&HeaderMap::new(), &file, "private, must-revalidate");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body, Bytes::from_static(b"<html></html>"));
		assert_eq!(response.headers.get(ETAG).unwrap().to_str().unwrap(), file.etag);
		assert_eq!(
			response.headers.get(CACHE_CONTROL).unwrap(),
			"private, must-revalidate"
		);
		assert_eq!(response.headers.get(VARY).unwrap(), "Accept-Encoding");
		assert!(response.headers.get(CONTENT_ENCODING).is_none());
	}

	#[rstest]
	fn test_if_none_match_hit_returns_304_empty_body() {
		let file = entry(b"content", None);
		let request = headers(&[(IF_NONE_MATCH, file.etag.as_str())]);

		let response = serve(&request, &file, "private");

		assert_eq!(response.status, StatusCode::NOT_MODIFIED);
		assert!(response.body.is_empty());
		assert!(response.headers.contains_key(ETAG));
	}

	#[rstest]
	fn test_if_none_match_miss_returns_full_body() {
		let file = entry(b"content", None);
		let request = headers(&[(IF_NONE_MATCH, "\"zzz\"")]);

		let response = serve(&request, &file, "private");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body, Bytes::from_static(b"content"));
	}

	#[rstest]
	fn test_if_none_match_list_and_star() {
		let file = entry(b"content", None);

		let list = format!("\"zzz\", {}", file.etag);
		let response = serve(&headers(&[(IF_NONE_MATCH, list.as_str())]), &file, "private");
		assert_eq!(response.status, StatusCode::NOT_MODIFIED);

		let response = serve(&headers(&[(IF_NONE_MATCH, "*")]), &file, "private");
		assert_eq!(response.status, StatusCode::NOT_MODIFIED);
	}

	#[rstest]
	fn test_validator_embedded_in_longer_token_is_a_miss() {
		let file = entry(b"content", None);
		let embedded = format!("\"prefix-{}-suffix\"", file.etag.trim_matches('"'));

		let response = serve(&headers(&[(IF_NONE_MATCH, embedded.as_str())]), &file, "private");

		assert_eq!(response.status, StatusCode::OK);
	}

	#[rstest]
	fn test_if_match_miss_returns_412() {
		let file = entry(b"content", None);
		let request = headers(&[(IF_MATCH, "\"stale\"")]);

		let response = serve(&request, &file, "private");

		assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
		assert!(response.body.is_empty());
	}

	#[rstest]
	fn test_if_match_hit_proceeds_to_200() {
		let file = entry(b"content", None);
		let request = headers(&[(IF_MATCH, file.etag.as_str())]);

		let response = serve(&request, &file, "private");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body, Bytes::from_static(b"content"));
	}

	#[rstest]
	fn test_gzip_negotiation() {
		let gz = crate::compress::gzip_bytes(b"raw body").unwrap();
		let file = entry(b"raw body", Some(&gz));

		let request = headers(&[(ACCEPT_ENCODING, "gzip, deflate, br")]);
		let response = serve(&request, &file, "private");
		assert_eq!(response.headers.get(CONTENT_ENCODING).unwrap(), "gzip");
		assert_eq!(response.body, Bytes::from(gz));

		let request = headers(&[(ACCEPT_ENCODING, "identity")]);
		let response = serve(&request, &file, "private");
		assert!(response.headers.get(CONTENT_ENCODING).is_none());
		assert_eq!(response.body, Bytes::from_static(b"raw body"));
	}

	#[rstest]
	fn test_gzip_with_zero_quality_is_refused() {
		let gz = crate::compress::gzip_bytes(b"raw body").unwrap();
		let file = entry(b"raw body", Some(&gz));
		let request = headers(&[(ACCEPT_ENCODING, "gzip;q=0")]);

		let response = serve(&request, &file, "private");

		assert!(response.headers.get(CONTENT_ENCODING).is_none());
		assert_eq!(response.body, Bytes::from_static(b"raw body"));
	}

	#[rstest]
	fn test_unrepresentable_etag_is_omitted_not_fatal() {
		let mut file = entry(b"content", None);
		file.etag = "\"bro\nken\"".to_string();

		let response = serve(&HeaderMap::new(), &file, "private");

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body, Bytes::from_static(b"content"));
		assert!(!response.headers.contains_key(ETAG));
		assert!(response.headers.contains_key(CACHE_CONTROL));
	}

	#[rstest]
	fn test_incompressible_entry_ignores_accept_encoding() {
		let file = entry(b"\x89PNG...", None);
		let request = headers(&[(ACCEPT_ENCODING, "gzip")]);

		let response = serve(&request, &file, "private");

		assert!(response.headers.get(CONTENT_ENCODING).is_none());
	}
}
