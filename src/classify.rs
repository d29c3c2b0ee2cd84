//! Content classification: MIME type and compressibility.
//!
//! The content type is sniffed from a bounded prefix of the file bytes
//! (magic-byte signatures plus an HTML/text heuristic), falling back to an
//! extension lookup via `mime_guess`. Two hard overrides exist because
//! sniffers routinely misclassify them: `.css` is always `text/css` and
//! `.js` is always `application/javascript`.
//!
//! Compressibility is decided purely by extension membership in an
//! allow-list; binary formats are excluded by omission, never detected
//! from content.

/// Bytes of content examined when sniffing a MIME type.
const SNIFF_LEN: usize = 512;

/// Default extensions considered worth gzipping.
///
/// The empty string covers extension-less files. Hosts may extend or
/// replace this list via [`MemFileCache::set_compressible`].
///
/// [`MemFileCache::set_compressible`]: crate::MemFileCache::set_compressible
pub const DEFAULT_COMPRESSIBLE: &[&str] = &[
	"", ".txt", ".htm", ".html", ".css", ".toml", ".php", ".js", ".json", ".md", ".mdown", ".xml",
	".svg", ".go", ".cgi", ".py", ".pl", ".aspx", ".asp",
];

/// Result of classifying a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
	/// MIME type to serve the file under.
	pub content_type: String,

	/// Whether a gzipped payload should be prepared for the file.
	pub compressible: bool,
}

/// Classifies file content for serving.
///
/// # Arguments
///
/// * `data` - The file bytes; only a bounded prefix is examined.
/// * `extension` - Lowercased extension including the leading dot, or `""`.
/// * `compressible` - The active compressible-extension allow-list.
pub fn classify(data: &[u8], extension: &str, compressible: &[String]) -> Classification {
	let content_type = match extension {
		".css" => "text/css".to_string(),
		".js" => "application/javascript".to_string(),
		_ => detect_content_type(data, extension),
	};

	Classification {
		compressible: compressible.iter().any(|ext| ext == extension),
		content_type,
	}
}

/// Extracts the lowercased extension (with leading dot) from a path-like
/// name; `""` when there is none.
pub(crate) fn extension_of(path: &std::path::Path) -> String {
	match path.extension() {
		Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
		None => String::new(),
	}
}

fn detect_content_type(data: &[u8], extension: &str) -> String {
	let prefix = &data[..data.len().min(SNIFF_LEN)];

	if let Some(sniffed) = sniff_signature(prefix) {
		return sniffed.to_string();
	}

	if !extension.is_empty()
		&& let Some(guess) = mime_guess::from_ext(&extension[1..]).first()
	{
		return guess.to_string();
	}

	if std::str::from_utf8(prefix).is_ok() {
		"text/plain; charset=utf-8".to_string()
	} else {
		"application/octet-stream".to_string()
	}
}

/// Magic-byte and markup signatures, checked over the sniff prefix.
fn sniff_signature(prefix: &[u8]) -> Option<&'static str> {
	const SIGNATURES: &[(&[u8], &str)] = &[
		(b"\x89PNG\r\n\x1a\n", "image/png"),
		(b"\xff\xd8\xff", "image/jpeg"),
		(b"GIF87a", "image/gif"),
		(b"GIF89a", "image/gif"),
		(b"%PDF-", "application/pdf"),
		(b"PK\x03\x04", "application/zip"),
		(b"\x1f\x8b", "application/gzip"),
		(b"\0asm", "application/wasm"),
		(b"OggS", "application/ogg"),
		(b"fLaC", "audio/flac"),
	];

	for (magic, mime) in SIGNATURES {
		if prefix.starts_with(magic) {
			return Some(mime);
		}
	}

	// RIFF containers carry the subtype at offset 8.
	if prefix.starts_with(b"RIFF") && prefix.len() >= 12 {
		return match &prefix[8..12] {
			b"WEBP" => Some("image/webp"),
			b"WAVE" => Some("audio/wave"),
			_ => None,
		};
	}

	let text = std::str::from_utf8(prefix).ok()?;
	let trimmed = text.trim_start();
	let lowered = trimmed.to_lowercase();

	if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
		Some("text/html; charset=utf-8")
	} else if lowered.starts_with("<svg") {
		Some("image/svg+xml")
	} else if lowered.starts_with("<?xml") {
		Some("text/xml; charset=utf-8")
	} else {
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn default_list() -> Vec<String> {
		DEFAULT_COMPRESSIBLE.iter().map(|s| s.to_string()).collect()
	}

	#[rstest]
	fn test_css_override_beats_sniffing() {
		let result = classify(b"body { color: red; }", ".css", &default_list());
		assert_eq!(result.content_type, "text/css");
		assert!(result.compressible);
	}

	#[rstest]
	fn test_js_override() {
		let result = classify(b"console.log('hi');", ".js", &default_list());
		assert_eq!(result.content_type, "application/javascript");
		assert!(result.compressible);
	}

	#[rstest]
	fn test_html_sniffed_from_content() {
		let result = classify(b"<!DOCTYPE html><html></html>", ".html", &default_list());
		assert_eq!(result.content_type, "text/html; charset=utf-8");
		assert!(result.compressible);
	}

	#[rstest]
	fn test_png_is_not_compressible() {
		let data = b"\x89PNG\r\n\x1a\nrest-of-image";
		let result = classify(data, ".png", &default_list());
		assert_eq!(result.content_type, "image/png");
		assert!(!result.compressible);
	}

	#[rstest]
	fn test_extensionless_text_is_compressible() {
		let result = classify(b"plain text payload", "", &default_list());
		assert_eq!(result.content_type, "text/plain; charset=utf-8");
		assert!(result.compressible);
	}

	#[rstest]
	fn test_binary_falls_back_to_octet_stream() {
		let data = [0u8, 159, 146, 150, 255, 0, 1, 2];
		let result = classify(&data, "", &default_list());
		assert_eq!(result.content_type, "application/octet-stream");
	}

	#[rstest]
	fn test_json_uses_extension_guess() {
		let result = classify(b"{\"a\": 1}", ".json", &default_list());
		assert_eq!(result.content_type, "application/json");
		assert!(result.compressible);
	}

	#[rstest]
	fn test_custom_allow_list() {
		let list = vec![".dat".to_string()];
		assert!(classify(b"x", ".dat", &list).compressible);
		assert!(!classify(b"x", ".css", &list).compressible);
	}

	#[rstest]
	fn test_webp_riff_container() {
		let mut data = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
		data.extend_from_slice(&[0u8; 16]);
		let result = classify(&data, ".webp", &default_list());
		assert_eq!(result.content_type, "image/webp");
	}

	#[rstest]
	fn test_extension_of() {
		use std::path::Path;
		assert_eq!(extension_of(Path::new("a/b/app.CSS")), ".css");
		assert_eq!(extension_of(Path::new("a/b/README")), "");
	}
}
