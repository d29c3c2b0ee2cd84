//! Serve-path mapping and request-path resolution.
//!
//! A *serve path* is the canonical URL key for a cached file: the location's
//! path relative to the cache root, forward-slash separated, with a leading
//! slash. Mapping is pure string/path work with no filesystem access.

use crate::error::{MemFileError, Result};
use std::path::{Component, Path};

/// Maps an absolute file location under `root` to its canonical serve path.
///
/// Platform separators are normalized to `/` and the result always starts
/// with `/`. A location outside `root` is a caller contract violation and
/// returns [`MemFileError::OutsideRoot`] rather than silently producing an
/// unscoped path.
///
/// # Examples
///
/// ```
/// use memfile::servable_path;
/// use std::path::Path;
///
/// let serve = servable_path(Path::new("/srv/assets"), Path::new("/srv/assets/css/app.css")).unwrap();
/// assert_eq!(serve, "/css/app.css");
/// ```
pub fn servable_path(root: &Path, location: &Path) -> Result<String> {
	let relative = location
		.strip_prefix(root)
		.map_err(|_| MemFileError::OutsideRoot {
			root: root.to_path_buf(),
			location: location.to_path_buf(),
		})?;

	let mut serve_path = String::new();
	for component in relative.components() {
		match component {
			Component::Normal(part) => {
				serve_path.push('/');
				serve_path.push_str(&part.to_string_lossy());
			}
			// strip_prefix output is purely relative; anything else
			// (`..`, a root, a prefix) escapes the root's scope.
			_ => {
				return Err(MemFileError::OutsideRoot {
					root: root.to_path_buf(),
					location: location.to_path_buf(),
				});
			}
		}
	}

	if serve_path.is_empty() {
		return Err(MemFileError::OutsideRoot {
			root: root.to_path_buf(),
			location: location.to_path_buf(),
		});
	}

	Ok(serve_path)
}

/// Resolves a request path to the serve path to look up.
///
/// Directory-index convention: a path whose final segment has no file
/// extension resolves to its `index.html` — `/` becomes `/index.html`,
/// `/blog` becomes `/blog/index.html`, `/blog/` becomes `/blog/index.html`.
/// Paths with an extension pass through unchanged.
pub fn resolve_request_path(path: &str) -> String {
	if path.is_empty() {
		return "/index.html".to_string();
	}

	if path.ends_with('/') {
		return format!("{path}index.html");
	}

	let last_segment = path.rsplit('/').next().unwrap_or(path);
	if last_segment.contains('.') {
		path.to_string()
	} else {
		format!("{path}/index.html")
	}
}
