//! Bounded, read-only token file loader.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::LoadError;

/// Upper bound on the size of a token file.
pub const MAX_TOKEN_BYTES: usize = 2048;

/// Raw token bytes as read from disk.
///
/// The buffer is zeroed on drop and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RawToken(Vec<u8>);

impl RawToken {
    /// Wrap bytes that did not come from a file. Used by `verify` and fuzzing.
    ///
    /// The size bound is not checked here; the validator rejects anything
    /// longer than [`MAX_TOKEN_BYTES`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Read-only access to the token bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawToken([REDACTED; {} bytes])", self.0.len())
    }
}

/// Read the token file at `path`.
///
/// At most `MAX_TOKEN_BYTES + 1` bytes are read; anything longer is rejected
/// without reading the rest.
///
/// # Errors
/// `NotFound` when the file does not exist, `TooLarge` past the size bound,
/// `AllocationFailure` if the buffer cannot be reserved, `Io` otherwise.
pub fn load(path: &Path) -> Result<RawToken, LoadError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let limit = MAX_TOKEN_BYTES + 1;
    let mut token = RawToken(Vec::new());
    token
        .0
        .try_reserve_exact(limit)
        .map_err(|_| LoadError::AllocationFailure { requested: limit })?;

    file.take(limit as u64)
        .read_to_end(&mut token.0)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if token.len() > MAX_TOKEN_BYTES {
        return Err(LoadError::TooLarge {
            max: MAX_TOKEN_BYTES,
        });
    }

    tracing::debug!(path = %path.display(), bytes = token.len(), "token file loaded");
    Ok(token)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("auth.token")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.token");
        std::fs::write(&path, b"a.b.c\n").unwrap();

        let token = load(&path).unwrap();
        assert_eq!(token.expose(), b"a.b.c\n");
    }

    #[test]
    fn test_exact_bound_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.token");
        std::fs::write(&path, vec![b'x'; MAX_TOKEN_BYTES]).unwrap();

        assert_eq!(load(&path).unwrap().len(), MAX_TOKEN_BYTES);
    }

    #[test]
    fn test_oversize_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.token");
        std::fs::write(&path, vec![b'x'; MAX_TOKEN_BYTES + 1]).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { max: MAX_TOKEN_BYTES }));
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = RawToken::from_bytes(b"secret.payload.sig");
        let dbg = format!("{token:?}");
        assert!(!dbg.contains("secret"));
        assert_eq!(dbg, "RawToken([REDACTED; 18 bytes])");
    }
}
