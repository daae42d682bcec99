//! FTP implementation of the remote store.
//!
//! Wraps `suppaftp`'s blocking client. Directory removal is implemented on
//! top of `LIST` because plain FTP has no recursive-remove command: entries
//! are parsed, files deleted, subdirectories recursed into, and the directory
//! removed last.

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use suppaftp::FtpStream;
use suppaftp::list;
use thiserror::Error;

use super::{Credentials, Endpoint, RemoteConnector, RemoteStore};

/// Errors surfaced by the FTP store.
#[derive(Debug, Error)]
pub enum FtpStoreError {
    /// Raised when the control connection cannot be established.
    #[error("ftp connection to {host}:{port} failed: {source}")]
    Connect {
        /// Hostname that was dialled.
        host: String,
        /// Control-channel port.
        port: u16,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when authentication is rejected.
    #[error("ftp login as '{username}' failed: {source}")]
    Login {
        /// User that attempted to authenticate.
        username: String,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when a directory listing cannot be retrieved.
    #[error("listing remote directory {path} failed: {source}")]
    List {
        /// Directory that was listed.
        path: Utf8PathBuf,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when a listing line cannot be parsed.
    #[error("unparseable listing entry under {path}: {line}")]
    ListParse {
        /// Directory whose listing contained the entry.
        path: Utf8PathBuf,
        /// Raw listing line.
        line: String,
    },
    /// Raised when a directory cannot be created.
    #[error("creating remote directory {path} failed: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when a directory cannot be removed.
    #[error("removing remote directory {path} failed: {source}")]
    RemoveDir {
        /// Directory that could not be removed.
        path: Utf8PathBuf,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when a file cannot be deleted.
    #[error("deleting remote file {path} failed: {source}")]
    RemoveFile {
        /// File that could not be deleted.
        path: Utf8PathBuf,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when storing a file fails.
    #[error("storing remote file {path} failed: {source}")]
    Store {
        /// File that could not be stored.
        path: Utf8PathBuf,
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
    /// Raised when the session cannot be closed cleanly.
    #[error("closing the ftp connection failed: {source}")]
    Close {
        /// Underlying client error.
        #[source]
        source: suppaftp::FtpError,
    },
}

/// Connector that dials a plain FTP server.
#[derive(Clone, Copy, Debug, Default)]
pub struct FtpConnector;

impl RemoteConnector for FtpConnector {
    type Store = FtpRemote;

    fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<FtpRemote, FtpStoreError> {
        let mut stream = FtpStream::connect((endpoint.host.as_str(), endpoint.port)).map_err(
            |source| FtpStoreError::Connect {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source,
            },
        )?;
        stream
            .login(credentials.username.as_str(), credentials.password.expose())
            .map_err(|source| FtpStoreError::Login {
                username: credentials.username.clone(),
                source,
            })?;
        Ok(FtpRemote { stream })
    }
}

/// A logged-in FTP session.
pub struct FtpRemote {
    stream: FtpStream,
}

impl FtpRemote {
    /// Returns `true` when `path` can be entered as a directory. The probe
    /// restores the working directory before returning.
    fn dir_exists(&mut self, path: &Utf8Path) -> Result<bool, suppaftp::FtpError> {
        let saved = self.stream.pwd()?;
        if self.stream.cwd(path.as_str()).is_err() {
            return Ok(false);
        }
        self.stream.cwd(&saved)?;
        Ok(true)
    }

    fn make_dir_tolerant(&mut self, path: &Utf8Path) -> Result<(), FtpStoreError> {
        let Err(mkdir_err) = self.stream.mkdir(path.as_str()) else {
            return Ok(());
        };
        // MKD gives no distinct reply for "already exists"; probe instead of
        // inspecting reply text.
        match self.dir_exists(path) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(FtpStoreError::CreateDir {
                path: path.to_path_buf(),
                source: mkdir_err,
            }),
        }
    }

    fn ensure_dir_all(&mut self, path: &Utf8Path) -> Result<(), FtpStoreError> {
        for prefix in dir_prefixes(path) {
            self.make_dir_tolerant(&prefix)?;
        }
        Ok(())
    }

    fn remove_dir_all(&mut self, path: &Utf8Path) -> Result<(), FtpStoreError> {
        let lines =
            self.stream
                .list(Some(path.as_str()))
                .map_err(|source| FtpStoreError::List {
                    path: path.to_path_buf(),
                    source,
                })?;

        for line in lines {
            let entry =
                list::File::try_from(line.as_str()).map_err(|_| FtpStoreError::ListParse {
                    path: path.to_path_buf(),
                    line: line.clone(),
                })?;
            let name = entry.name();
            if name == "." || name == ".." {
                continue;
            }
            let child = path.join(name);
            if entry.is_directory() {
                self.remove_dir_all(&child)?;
            } else {
                self.stream
                    .rm(child.as_str())
                    .map_err(|source| FtpStoreError::RemoveFile {
                        path: child.clone(),
                        source,
                    })?;
            }
        }

        self.stream
            .rmdir(path.as_str())
            .map_err(|source| FtpStoreError::RemoveDir {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl RemoteStore for FtpRemote {
    type Error = FtpStoreError;

    fn ensure_empty(&mut self, path: &Utf8Path) -> Result<(), FtpStoreError> {
        self.ensure_dir_all(path)?;
        self.remove_dir_all(path)?;
        self.stream
            .mkdir(path.as_str())
            .map_err(|source| FtpStoreError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    fn make_dir(&mut self, path: &Utf8Path) -> Result<(), FtpStoreError> {
        self.make_dir_tolerant(path)
    }

    fn put_file(&mut self, path: &Utf8Path, mut contents: &mut dyn Read) -> Result<(), FtpStoreError> {
        self.stream
            .put_file(path.as_str(), &mut contents)
            .map(|_bytes| ())
            .map_err(|source| FtpStoreError::Store {
                path: path.to_path_buf(),
                source,
            })
    }

    fn close(&mut self) -> Result<(), FtpStoreError> {
        self.stream
            .quit()
            .map_err(|source| FtpStoreError::Close { source })
    }
}

/// Returns every directory prefix of `path` from shallowest to deepest,
/// including `path` itself and excluding a bare root component.
fn dir_prefixes(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut prefixes = Vec::new();
    let mut current = Utf8PathBuf::new();
    for component in path.components() {
        current.push(component.as_str());
        if current.as_str() != "/" {
            prefixes.push(current.clone());
        }
    }
    prefixes
}
