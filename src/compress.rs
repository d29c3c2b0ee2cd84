//! Gzip compression for cached payloads.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

/// Gzips `data` at maximum compression.
///
/// Cached payloads are compressed once at load time and served many times,
/// so encode speed is irrelevant next to the byte savings. Deterministic
/// for a given input and encoder version.
///
/// # Errors
///
/// Returns the underlying I/O error if the encoder fails.
pub fn gzip_bytes(data: &[u8]) -> std::io::Result<Vec<u8>> {
	let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
	encoder.write_all(data)?;
	encoder.finish()
}

#[cfg(test)]
mod tests {
	use super::*;
	use flate2::read::GzDecoder;
	use rstest::rstest;
	use std::io::Read;

	#[rstest]
	fn test_round_trip() {
		let original = b"body { color: red; } ".repeat(50);
		let compressed = gzip_bytes(&original).unwrap();

		let mut decoder = GzDecoder::new(compressed.as_slice());
		let mut restored = Vec::new();
		decoder.read_to_end(&mut restored).unwrap();

		assert_eq!(restored, original);
	}

	#[rstest]
	fn test_compresses_repetitive_input() {
		let original = b"abcdefgh".repeat(500);
		let compressed = gzip_bytes(&original).unwrap();

		assert!(compressed.len() < original.len());
	}

	#[rstest]
	fn test_deterministic() {
		let data = b"deterministic input";
		assert_eq!(gzip_bytes(data).unwrap(), gzip_bytes(data).unwrap());
	}

	#[rstest]
	fn test_empty_input_still_produces_gzip_stream() {
		let compressed = gzip_bytes(b"").unwrap();
		assert!(!compressed.is_empty());
	}
}
