//! Error types for the memfile cache.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, MemFileError>;

/// Errors raised by cache operations.
///
/// Per-file failures (`Io`, `Encoding`, `Descriptor`) are reported and
/// skipped during a reconciliation walk; only `Config` is fatal, and only
/// at construction time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MemFileError {
	/// The cache root directory is missing or unreadable.
	#[error("invalid cache root {path:?}: {source}")]
	Config {
		/// Configured root directory.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// A location handed to the path mapper is not under the cache root.
	#[error("location {location:?} is not under cache root {root:?}")]
	OutsideRoot {
		/// Cache root directory.
		root: PathBuf,
		/// Offending location.
		location: PathBuf,
	},

	/// Reading or stat-ing a single file failed.
	#[error("failed to read {path:?}: {source}")]
	Io {
		/// File that could not be read.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// Gzip encoding failed for a single file.
	#[error("failed to compress {path:?}: {source}")]
	Encoding {
		/// File that could not be compressed.
		path: PathBuf,
		/// Underlying encoder error.
		#[source]
		source: std::io::Error,
	},

	/// A `.push` sidecar descriptor holds malformed JSON.
	#[error("malformed push descriptor {path:?}: {source}")]
	Descriptor {
		/// Sidecar file path.
		path: PathBuf,
		/// Underlying parse error.
		#[source]
		source: serde_json::Error,
	},
}
