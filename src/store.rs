//! Concurrent mapping from serve path to cache entry.

use crate::entry::MemFile;
use dashmap::DashMap;
use std::sync::Arc;

/// The shared `serve path -> MemFile` map.
///
/// Entries are stored as `Arc<MemFile>` and installed or replaced as whole
/// values, so a concurrent reader sees either the fully-old or fully-new
/// entry, never a partially updated one. Reads are sharded-lock lookups
/// that never wait on a reload in progress.
#[derive(Debug, Default)]
pub struct MemFileStore {
	files: DashMap<String, Arc<MemFile>>,
}

impl MemFileStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self {
			files: DashMap::new(),
		}
	}

	/// Looks up the entry for a serve path.
	pub fn get(&self, serve_path: &str) -> Option<Arc<MemFile>> {
		self.files.get(serve_path).map(|entry| Arc::clone(entry.value()))
	}

	/// Atomically installs or replaces the entry for a serve path.
	pub fn put(&self, serve_path: String, file: Arc<MemFile>) {
		self.files.insert(serve_path, file);
	}

	/// Atomically evicts the entry for a serve path.
	pub fn remove(&self, serve_path: &str) -> Option<Arc<MemFile>> {
		self.files.remove(serve_path).map(|(_, file)| file)
	}

	/// Snapshot of all currently cached serve paths.
	///
	/// Used by reconciliation to diff the store against disk state.
	pub fn paths(&self) -> Vec<String> {
		self.files.iter().map(|entry| entry.key().clone()).collect()
	}

	/// Replaces only the push targets of an existing entry.
	///
	/// Content fields are untouched. Returns whether the entry existed.
	pub fn set_push_targets(&self, serve_path: &str, targets: Vec<String>) -> bool {
		match self.files.get(serve_path) {
			Some(entry) => {
				entry.set_push_targets(targets);
				true
			}
			None => false,
		}
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.files.len()
	}

	/// Whether the store holds no entries.
	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}
