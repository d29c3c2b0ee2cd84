//! # memfile
//!
//! In-memory static file cache with live reload and HTTP conditional
//! serving.
//!
//! A [`MemFileCache`] loads a directory tree into memory, keeps the
//! in-memory copy synchronized with disk, and answers requests straight
//! from memory with correct cache validation and content-encoding
//! negotiation:
//!
//! - **Live reload**: one-shot or periodic reconciliation walks pick up
//!   new, changed, and deleted files; entries are replaced by atomic swap
//!   so readers never block on disk I/O or observe torn state
//! - **Conditional GET**: content-derived ETags, exact entity-tag list
//!   matching for `If-None-Match`/`If-Match`, `304`/`412` handling
//! - **Compression**: gzip payloads prepared at load time for an
//!   extension allow-list, negotiated via `Accept-Encoding`
//! - **Push hints**: optional `<file>.push` sidecars carrying a JSON
//!   array of auxiliary serve paths
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use memfile::MemFileCache;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> memfile::Result<()> {
//!     let cache = Arc::new(MemFileCache::new("assets")?.with_dev_mode(true));
//!     cache.reconcile()?;
//!     let _timer = cache.spawn_interval(Duration::from_secs(2));
//!
//!     // In a request handler:
//!     // match cache.serve_request(path, headers) {
//!     //     Some(response) => emit it,
//!     //     None => fall through to the next handler / 404,
//!     // }
//!     Ok(())
//! }
//! ```
//!
//! ## Module structure
//!
//! - [`cache`] - The owning cache instance and reconciliation
//! - [`store`] - Concurrent serve-path to entry map
//! - [`entry`] - The immutable in-memory file entry
//! - [`serve`] - Conditional serving and encoding negotiation
//! - [`classify`] - MIME sniffing and compressibility
//! - [`compress`] - Gzip encoding
//! - [`path`] - Serve-path mapping and index resolution
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod classify;
pub mod compress;
pub mod entry;
pub mod error;
pub mod path;
pub mod serve;
pub mod store;

pub use cache::{MemFileCache, ReconcileHandle};
pub use classify::{Classification, DEFAULT_COMPRESSIBLE, classify};
pub use compress::gzip_bytes;
pub use entry::{MemFile, content_etag};
pub use error::{MemFileError, Result};
pub use path::{resolve_request_path, servable_path};
pub use serve::{ServedResponse, serve};
pub use store::MemFileStore;
