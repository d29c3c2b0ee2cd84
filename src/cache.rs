//! The owning cache instance: root directory, store, and reconciliation.

use crate::classify::{DEFAULT_COMPRESSIBLE, classify, extension_of};
use crate::compress::gzip_bytes;
use crate::entry::{MemFile, content_etag};
use crate::error::{MemFileError, Result};
use crate::path::{resolve_request_path, servable_path};
use crate::serve::{ServedResponse, serve};
use crate::store::MemFileStore;
use bytes::Bytes;
use hyper::HeaderMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// File extension of push-hint sidecar descriptors.
const PUSH_SIDECAR_EXT: &str = "push";

/// An in-memory cache of a static-asset directory tree.
///
/// One instance owns one root directory, the entry store, and the serving
/// configuration. Instances are explicit and independent; a process may run
/// several against different roots.
///
/// All mutation funnels through atomic whole-entry replacement in the
/// store, so request workers reading concurrently with a reload never
/// observe torn state and never wait on disk I/O.
///
/// # Example
///
/// ```rust,ignore
/// use memfile::MemFileCache;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let cache = Arc::new(MemFileCache::new("assets")?);
/// cache.reconcile()?;
/// let _timer = cache.spawn_interval(Duration::from_secs(2));
///
/// if let Some(response) = cache.serve_request("/blog", request.headers()) {
///     // emit response.status / response.headers / response.body
/// }
/// ```
pub struct MemFileCache {
	root: PathBuf,
	store: MemFileStore,
	cache_control: String,
	dev_mode: bool,
	compressible: RwLock<Vec<String>>,
	walk_gate: tokio::sync::Mutex<()>,
}

impl MemFileCache {
	/// Creates a cache over `dir`.
	///
	/// The directory is resolved to an absolute path at construction.
	///
	/// # Errors
	///
	/// Returns [`MemFileError::Config`] if `dir` does not exist or is not
	/// a readable directory. This is fatal at startup by design.
	pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref();
		let root = fs::canonicalize(dir).map_err(|source| MemFileError::Config {
			path: dir.to_path_buf(),
			source,
		})?;
		if !root.is_dir() {
			return Err(MemFileError::Config {
				path: root,
				source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
			});
		}

		Ok(Self {
			root,
			store: MemFileStore::new(),
			cache_control: "private, must-revalidate".to_string(),
			dev_mode: false,
			compressible: RwLock::new(
				DEFAULT_COMPRESSIBLE.iter().map(|ext| ext.to_string()).collect(),
			),
			walk_gate: tokio::sync::Mutex::new(()),
		})
	}

	/// Sets the `Cache-Control` value sent with every response.
	pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
		self.cache_control = value.into();
		self
	}

	/// Enables verbose per-file diagnostics.
	pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
		self.dev_mode = dev_mode;
		self
	}

	/// The absolute root directory this cache mirrors.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// The configured `Cache-Control` value.
	pub fn cache_control(&self) -> &str {
		&self.cache_control
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.store.len()
	}

	/// Whether the cache holds no entries.
	pub fn is_empty(&self) -> bool {
		self.store.is_empty()
	}

	/// Replaces the compressible-extension allow-list.
	///
	/// Extensions are lowercased strings including the leading dot; the
	/// empty string covers extension-less files. Takes effect for
	/// subsequent loads, not retroactively.
	pub fn set_compressible(&self, extensions: Vec<String>) {
		*self.compressible.write() = extensions;
	}

	/// Adds one extension to the compressible allow-list.
	pub fn add_compressible(&self, extension: impl Into<String>) {
		self.compressible.write().push(extension.into());
	}

	/// Looks up the cached entry for a serve path, without index resolution.
	pub fn get(&self, serve_path: &str) -> Option<Arc<MemFile>> {
		self.store.get(serve_path)
	}

	/// Serves a request path from the cache.
	///
	/// Applies the directory-index convention (`/blog` resolves to
	/// `/blog/index.html`) before lookup, then runs conditional-GET and
	/// encoding negotiation against the entry. Returns `None` when nothing
	/// is cached under the resolved path; the caller decides between 404
	/// and a fallback handler.
	pub fn serve_request(&self, request_path: &str, headers: &HeaderMap) -> Option<ServedResponse> {
		let serve_path = resolve_request_path(request_path);
		let file = self.store.get(&serve_path)?;
		Some(serve(headers, &file, &self.cache_control))
	}

	/// Serves an already-resolved serve path from the cache.
	pub fn serve_path(&self, serve_path: &str, headers: &HeaderMap) -> Option<ServedResponse> {
		let file = self.store.get(serve_path)?;
		Some(serve(headers, &file, &self.cache_control))
	}

	/// Replaces the push targets of a cached entry.
	///
	/// Only the push-target field is touched; content fields and the
	/// validator are left as they are. Returns whether the entry existed.
	pub fn set_push_targets(&self, serve_path: &str, targets: Vec<String>) -> bool {
		self.store.set_push_targets(serve_path, targets)
	}

	/// Walks the root directory and brings the cache in line with disk.
	///
	/// New files are loaded, files with a changed modification time are
	/// reloaded, and entries whose file has disappeared are evicted —
	/// including entries installed via [`cache_file`](Self::cache_file)
	/// from outside the root, since the walk is the source of truth for
	/// what is servable.
	///
	/// Per-file failures are logged and skipped; they never abort the walk.
	/// At most one walk runs at a time: a call that finds another walk in
	/// flight does nothing and returns `Ok(false)`.
	///
	/// # Errors
	///
	/// Returns [`MemFileError::Config`] if the root directory itself has
	/// become unreadable. The cache keeps serving its last known-good
	/// state in that case.
	pub fn reconcile(&self) -> Result<bool> {
		let Ok(_gate) = self.walk_gate.try_lock() else {
			tracing::debug!(root = %self.root.display(), "reconcile already in flight, skipping");
			return Ok(false);
		};

		if let Err(source) = fs::read_dir(&self.root) {
			return Err(MemFileError::Config {
				path: self.root.clone(),
				source,
			});
		}

		let mut seen = HashSet::new();

		for walked in WalkDir::new(&self.root) {
			let walked = match walked {
				Ok(entry) => entry,
				Err(err) => {
					tracing::warn!(error = %err, "skipping unreadable directory entry");
					continue;
				}
			};
			if !walked.file_type().is_file() {
				continue;
			}

			let location = walked.path();
			if location.extension().is_some_and(|ext| ext == PUSH_SIDECAR_EXT) {
				continue;
			}

			let serve_path = match servable_path(&self.root, location) {
				Ok(path) => path,
				Err(err) => {
					tracing::warn!(error = %err, "skipping unmappable file");
					continue;
				}
			};
			seen.insert(serve_path.clone());

			let needs_load = match self.store.get(&serve_path) {
				Some(existing) => modified_of(location)
					.map(|mtime| mtime != existing.modified)
					.unwrap_or(true),
				None => {
					self.report(format_args!("new file found: {serve_path}"));
					true
				}
			};

			if needs_load
				&& let Err(err) = self.cache_location(location, &serve_path)
			{
				tracing::warn!(serve_path = %serve_path, error = %err, "failed to cache file");
			}
		}

		for serve_path in self.store.paths() {
			if !seen.contains(&serve_path) {
				self.store.remove(&serve_path);
				self.report(format_args!("no longer serving: {serve_path}"));
			}
		}

		Ok(true)
	}

	/// Loads a single file and installs it under a caller-chosen serve path.
	///
	/// The location does not have to live under the cache root; this is the
	/// hook for serving individual files at custom routes. The load follows
	/// the same procedure and atomic-install discipline as the walk, so
	/// concurrent readers never see partial state. Note that a later
	/// [`reconcile`](Self::reconcile) evicts entries the walk cannot see.
	///
	/// # Errors
	///
	/// Returns [`MemFileError::Io`] if the file cannot be read or stat-ed,
	/// or [`MemFileError::Encoding`] if compression fails. On error a
	/// previously cached entry for the serve path is left untouched.
	pub fn cache_file(&self, location: impl AsRef<Path>, serve_path: &str) -> Result<()> {
		let location = location.as_ref();
		let location = fs::canonicalize(location).map_err(|source| MemFileError::Io {
			path: location.to_path_buf(),
			source,
		})?;
		self.cache_location(&location, serve_path)
	}

	/// Loads a single file under the root, deriving its serve path.
	pub fn cache_file_at(&self, location: impl AsRef<Path>) -> Result<String> {
		let location = location.as_ref();
		let location = fs::canonicalize(location).map_err(|source| MemFileError::Io {
			path: location.to_path_buf(),
			source,
		})?;
		let serve_path = servable_path(&self.root, &location)?;
		self.cache_location(&location, &serve_path)?;
		Ok(serve_path)
	}

	/// Spawns a background task that reconciles every `period`.
	///
	/// Walks run on the blocking thread pool so request-serving tasks are
	/// never stalled behind directory I/O. Failures of a periodic walk are
	/// logged and the cache keeps serving its last known-good state.
	///
	/// Stopping (or dropping) the returned handle guarantees no further
	/// walks are scheduled; a walk already in flight completes.
	pub fn spawn_interval(self: &Arc<Self>, period: Duration) -> ReconcileHandle {
		let cache = Arc::clone(self);
		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			// The first tick fires immediately; the caller has usually
			// just reconciled, so wait one full period.
			ticker.tick().await;
			loop {
				ticker.tick().await;
				let cache = Arc::clone(&cache);
				match tokio::task::spawn_blocking(move || cache.reconcile()).await {
					Ok(Ok(_)) => {}
					Ok(Err(err)) => {
						tracing::warn!(error = %err, "periodic reconcile failed, keeping cached state");
					}
					Err(err) => {
						tracing::error!(error = %err, "reconcile task failed to run");
					}
				}
			}
		});
		ReconcileHandle { task }
	}

	/// Load procedure shared by the walk and ad-hoc caching: read, classify,
	/// compress, hash, read sidecar, then install in one atomic swap.
	fn cache_location(&self, location: &Path, serve_path: &str) -> Result<()> {
		let data = fs::read(location).map_err(|source| MemFileError::Io {
			path: location.to_path_buf(),
			source,
		})?;
		let modified = modified_of(location).map_err(|source| MemFileError::Io {
			path: location.to_path_buf(),
			source,
		})?;
		let push_targets = self.read_push_sidecar(location);

		if let Some(existing) = self.store.get(serve_path)
			&& existing.raw == data
		{
			// Byte-identical reload: keep the validator and compressed
			// payload, only the recorded mtime advances.
			let unchanged = MemFile::new(
				serve_path.to_string(),
				existing.content_type.clone(),
				existing.etag.clone(),
				existing.raw.clone(),
				existing.gzipped.clone(),
				modified,
				push_targets,
			);
			self.store.put(serve_path.to_string(), Arc::new(unchanged));
			return Ok(());
		}

		if self.store.get(serve_path).is_some() {
			self.report(format_args!("file changed: {serve_path}"));
		}

		let extension = extension_of(location);
		let allow_list = self.compressible.read().clone();
		let classification = classify(&data, &extension, &allow_list);

		let gzipped = if classification.compressible {
			let compressed = gzip_bytes(&data).map_err(|source| MemFileError::Encoding {
				path: location.to_path_buf(),
				source,
			})?;
			Some(Bytes::from(compressed))
		} else {
			None
		};

		let file = MemFile::new(
			serve_path.to_string(),
			classification.content_type,
			content_etag(&data),
			Bytes::from(data),
			gzipped,
			modified,
			push_targets,
		);
		self.store.put(serve_path.to_string(), Arc::new(file));
		Ok(())
	}

	/// Reads the `.push` sidecar next to `location`, if any.
	///
	/// A missing sidecar means no push targets. A malformed one is reported
	/// and treated as empty; it never fails the load.
	fn read_push_sidecar(&self, location: &Path) -> Vec<String> {
		let mut sidecar = location.as_os_str().to_owned();
		sidecar.push(".push");
		let sidecar = PathBuf::from(sidecar);

		let Ok(raw) = fs::read(&sidecar) else {
			return Vec::new();
		};

		match serde_json::from_slice::<Vec<String>>(&raw) {
			Ok(targets) => targets,
			Err(source) => {
				let err = MemFileError::Descriptor {
					path: sidecar,
					source,
				};
				tracing::warn!(error = %err, "ignoring malformed push descriptor");
				Vec::new()
			}
		}
	}

	fn report(&self, message: std::fmt::Arguments<'_>) {
		if self.dev_mode {
			tracing::info!("{message}");
		} else {
			tracing::debug!("{message}");
		}
	}
}

impl std::fmt::Debug for MemFileCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemFileCache")
			.field("root", &self.root)
			.field("entries", &self.store.len())
			.field("cache_control", &self.cache_control)
			.field("dev_mode", &self.dev_mode)
			.finish()
	}
}

/// Handle to a periodic reconciliation task.
///
/// Dropping the handle stops the schedule as well.
#[derive(Debug)]
pub struct ReconcileHandle {
	task: JoinHandle<()>,
}

impl ReconcileHandle {
	/// Stops the periodic schedule.
	///
	/// No further walks will start; a walk already running on the blocking
	/// pool completes on its own.
	pub fn stop(&self) {
		self.task.abort();
	}
}

impl Drop for ReconcileHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}

fn modified_of(location: &Path) -> std::io::Result<std::time::SystemTime> {
	fs::metadata(location)?.modified()
}
