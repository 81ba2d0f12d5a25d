//! Artifact integrity verification.
//!
//! Computes SHA-256 digests over byte streams and files. The same digest
//! backs artifact verification in the cache and manifest fingerprinting.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use hex::ToHex;
use sha2::{Digest, Sha256};

const CHUNK: usize = 64 * 1024;

/// Returns the lowercase hex SHA-256 of `bytes`.
pub fn digest_bytes(bytes: &[u8]) -> String {
    Sha256::digest(bytes).encode_hex::<String>()
}

/// Streams `reader` to the end and returns its lowercase hex SHA-256.
///
/// # Errors
///
/// Returns the first non-interrupt read error.
pub fn digest_reader(mut reader: impl Read) -> Result<String, io::Error> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize().encode_hex::<String>())
}

/// Computes the SHA-256 hash of a file and returns it as a hex string.
///
/// # Errors
///
/// Returns `io::Error` if the file cannot be opened or read.
pub fn compute_file_hash(path: &Path) -> Result<String, io::Error> {
    digest_reader(File::open(path)?)
}

/// Compares two hex digests, ignoring ASCII case.
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    /// Reader that fails with `Interrupted` once before yielding its data.
    struct Flaky {
        data: &'static [u8],
        interrupted: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn hash_known_values() {
        assert_eq!(digest_bytes(b""), EMPTY);
        assert_eq!(digest_bytes(b"hello"), HELLO);
    }

    #[test]
    fn reader_matches_bytes_across_chunks() {
        let data = vec![7u8; CHUNK * 2 + 13];
        let streamed = digest_reader(data.as_slice()).unwrap();
        assert_eq!(streamed, digest_bytes(&data));
    }

    #[test]
    fn reader_retries_interrupted() {
        let flaky = Flaky {
            data: b"hello",
            interrupted: false,
        };
        assert_eq!(digest_reader(flaky).unwrap(), HELLO);
    }

    #[test]
    fn file_hash_deterministic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let h1 = compute_file_hash(f.path()).unwrap();
        let h2 = compute_file_hash(f.path()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1, HELLO);
    }

    #[test]
    fn matches_ignores_case() {
        assert!(digest_matches(HELLO, &HELLO.to_uppercase()));
        assert!(!digest_matches(HELLO, EMPTY));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compute_file_hash(&dir.path().join("absent")).is_err());
    }
}
