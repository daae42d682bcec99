//! Password retrieval from a local file.
//!
//! The password file is checked for existence and readability before any
//! network activity, then read through a capability handle scoped to its
//! parent directory. Contents are trimmed so a trailing newline in the file
//! does not end up in the credential.

use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// An FTP password held in memory for the duration of one run.
///
/// The value is deliberately excluded from `Debug` output and has no
/// `Display` implementation, so it cannot end up in logs or error messages.
#[derive(Clone, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Wraps an already-retrieved password value.
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns the secret for handing to the transfer client.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Errors raised while retrieving the password.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Raised when the password file does not exist or cannot be probed.
    #[error(
        "password file not found at {path}: create a text file containing the \
         ftp deployment password and make sure it is readable ({message})"
    )]
    Missing {
        /// Path that was probed.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the file exists but reading it fails.
    #[error("failed to read the password file at {path}: {message}")]
    Unreadable {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

/// Reads and trims the password file at `path`.
///
/// The existence probe and the read are both performed through a directory
/// handle scoped to the file's parent, mirroring how configuration files are
/// accessed elsewhere in the crate.
///
/// # Errors
///
/// Returns [`CredentialError::Missing`] when the file is absent and
/// [`CredentialError::Unreadable`] when reading it fails.
pub fn load(path: &Utf8Path) -> Result<Password, CredentialError> {
    let (dir, file_name) = open_parent(path)?;

    let exists = dir
        .try_exists(file_name)
        .map_err(|err| missing(path, &err))?;
    if !exists {
        return Err(CredentialError::Missing {
            path: path.to_path_buf(),
            message: String::from("no such file"),
        });
    }

    let contents = dir
        .read_to_string(file_name)
        .map_err(|err| CredentialError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    Ok(Password::new(contents.trim().to_owned()))
}

fn open_parent(path: &Utf8Path) -> Result<(Dir, &str), CredentialError> {
    let raw_parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let parent = if raw_parent.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        raw_parent
    };
    let file_name = path.file_name().ok_or_else(|| CredentialError::Missing {
        path: path.to_path_buf(),
        message: String::from("password file path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            missing(path, &err)
        } else {
            CredentialError::Unreadable {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    })?;

    Ok((dir, file_name))
}

fn missing(path: &Utf8Path, err: &io::Error) -> CredentialError {
    CredentialError::Missing {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_path(tmp: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().join(name))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()))
    }

    #[test]
    fn load_trims_surrounding_whitespace() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = temp_path(&tmp, ".ftp.password");
        std::fs::write(&path, "secret\n").unwrap_or_else(|err| panic!("write: {err}"));

        let password = load(&path).unwrap_or_else(|err| panic!("load: {err}"));

        assert_eq!(password.expose(), "secret");
    }

    #[test]
    fn load_fails_for_missing_file() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = temp_path(&tmp, ".ftp.password");

        let Err(err) = load(&path) else {
            panic!("missing file should fail");
        };
        assert!(matches!(err, CredentialError::Missing { .. }));
    }

    #[test]
    fn load_fails_for_missing_parent_directory() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = temp_path(&tmp, "no-such-dir/.ftp.password");

        let Err(err) = load(&path) else {
            panic!("missing parent should fail");
        };
        assert!(matches!(err, CredentialError::Missing { .. }));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let password = Password::new(String::from("hunter2"));
        let rendered = format!("{password:?}");
        assert!(!rendered.contains("hunter2"), "rendered: {rendered}");
        assert!(rendered.contains("redacted"));
    }
}
