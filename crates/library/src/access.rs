use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Grants read access to user-chosen paths.
///
/// Sandboxed hosts can only read a file the user picked while holding a
/// grant for it. [`ReaderSession`](crate::ReaderSession) acquires a grant
/// when a book is opened and releases it when the session closes;
/// [`import_book`](crate::import_book) holds one for the duration of the
/// import.
pub trait PathAccess: Send + Sync {
    /// Obtain a path that stays readable until [`revoke`](Self::revoke) is
    /// called with it.
    ///
    /// # Errors
    /// [`Access`](ErrorKind::Access) if the path cannot be made readable.
    fn grant(&self, path: &Path) -> Result<PathBuf>;

    /// Release a path previously returned by [`grant`](Self::grant).
    fn revoke(&self, granted: &Path);
}

/// Direct filesystem access with no sandbox: every existing path is granted
/// as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unrestricted;

impl PathAccess for Unrestricted {
    fn grant(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            exn::bail!(ErrorKind::Access(path.to_path_buf()));
        }
        Ok(path.to_path_buf())
    }

    fn revoke(&self, _granted: &Path) {}
}
