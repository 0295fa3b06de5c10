//! On-disk secret key files.
//!
//! Both Ed25519 seeds and HMAC secrets are stored as raw bytes in a file
//! readable only by the owner. Creation is atomic on Unix (`O_CREAT | O_EXCL`
//! with mode 0o600) and the read path refuses symlinks.

use std::io::Write;
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

fn key_file_err(path: &Path, reason: impl std::fmt::Display) -> CryptoError {
    CryptoError::KeyFile {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Read the secret at `path`, or write `fresh()` there if the file is absent.
///
/// Returns the bytes that are now on disk.
pub(crate) fn load_or_create(
    path: &Path,
    fresh: impl FnOnce() -> Zeroizing<Vec<u8>>,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let io_err = |e: std::io::Error| key_file_err(path, e);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
        {
            Ok(mut file) => {
                let bytes = fresh();
                file.write_all(&bytes).map_err(io_err)?;
                return Ok(bytes);
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {},
            Err(e) => return Err(io_err(e)),
        }
    }

    #[cfg(not(unix))]
    if !path.exists() {
        let bytes = fresh();
        let mut file = std::fs::File::create(path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        return Ok(bytes);
    }

    let meta = std::fs::symlink_metadata(path).map_err(io_err)?;
    if meta.file_type().is_symlink() {
        return Err(key_file_err(path, "refusing to read a symlink"));
    }

    Ok(Zeroizing::new(std::fs::read(path).map_err(io_err)?))
}
