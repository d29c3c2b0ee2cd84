//! The in-memory representation of a cached file.

use bytes::Bytes;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::time::SystemTime;

/// One servable file held fully in memory.
///
/// A `MemFile` is immutable once constructed; a content change on disk is
/// applied by building a fresh `MemFile` off to the side and atomically
/// replacing the stored `Arc`, never by mutating a live entry. Readers
/// therefore always observe a consistent snapshot. The single exception is
/// [`push targets`](Self::push_targets), which are edited independently of
/// content reloads under their own per-entry lock.
#[derive(Debug)]
pub struct MemFile {
	/// Canonical URL key the file is served under.
	pub serve_path: String,

	/// MIME type sent as `Content-Type`.
	pub content_type: String,

	/// Content-derived validator sent as `ETag`. Changes iff `raw` changes.
	pub etag: String,

	/// The file's bytes at last load.
	pub raw: Bytes,

	/// Gzipped payload; present iff the file is compressible.
	pub gzipped: Option<Bytes>,

	/// Filesystem modification time at last load.
	pub modified: SystemTime,

	push_targets: RwLock<Vec<String>>,
}

impl MemFile {
	/// Builds a new entry.
	pub fn new(
		serve_path: String,
		content_type: String,
		etag: String,
		raw: Bytes,
		gzipped: Option<Bytes>,
		modified: SystemTime,
		push_targets: Vec<String>,
	) -> Self {
		Self {
			serve_path,
			content_type,
			etag,
			raw,
			gzipped,
			modified,
			push_targets: RwLock::new(push_targets),
		}
	}

	/// Whether a gzipped payload exists for this entry.
	pub fn is_compressible(&self) -> bool {
		self.gzipped.is_some()
	}

	/// Returns the auxiliary serve paths suggested alongside this entry.
	pub fn push_targets(&self) -> Vec<String> {
		self.push_targets.read().clone()
	}

	/// Replaces the push targets in place.
	pub fn set_push_targets(&self, targets: Vec<String>) {
		*self.push_targets.write() = targets;
	}
}

/// Derives the validator for `data`.
///
/// Content-derived (SHA-256, truncated, hex, quoted) rather than random so
/// that unchanged files keep their validator across reloads and process
/// restarts, preserving client caches.
pub fn content_etag(data: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(data);
	let digest = hasher.finalize();
	format!("\"{}\"", hex::encode(&digest[..16]))
}
