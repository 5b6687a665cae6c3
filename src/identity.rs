//! Stable project identity derivation.
//!
//! The identity is the first 8 lowercase hex characters of a SHA-256 digest
//! of the canonical project path. Truncating to 8 hex chars (~4 billion
//! values) is an accepted identity space, not a collision-resistant one: two
//! projects hashing to the same token would silently share a record. Paths
//! are hashed case-sensitively, exactly as canonicalized.

use std::io;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::errors::Error;

/// Derive the 8-hex-char identity token for an already-canonical path.
/// Pure and total: same path, same token, on every run and platform.
pub fn derive_identity(canonical_path: &Path) -> String {
    let digest = Sha256::digest(canonical_path.to_string_lossy().as_bytes());
    let mut out = String::with_capacity(8);
    for b in &digest[..4] {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Canonicalize a project path: absolute, symlinks resolved when the path
/// exists, lexically normalized otherwise (start may be asked to create the
/// directory later), no trailing separator.
pub fn canonical_project_path(path: &Path) -> crate::errors::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::InvalidPath {
                path: path.to_path_buf(),
                source: e,
            })?
            .join(path)
    };

    match std::fs::canonicalize(&absolute) {
        Ok(p) => Ok(p),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(normalize_lexically(&absolute)),
        Err(e) => Err(Error::InvalidPath {
            path: absolute,
            source: e,
        }),
    }
}

/// Remove `.` and resolve `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(comp.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
