//! Remote file store abstraction used by the deployment pipeline.
//!
//! The pipeline only ever needs three capabilities from the remote side:
//! make the target directory empty, create directories, and store files. The
//! [`RemoteStore`] trait captures those, [`RemoteConnector`] produces
//! connected stores, and [`ftp::FtpConnector`] supplies the production FTP
//! implementation. Tests substitute an in-memory store.

use std::io::Read;

use camino::Utf8Path;

use crate::credentials::Password;

pub mod ftp;

pub use ftp::{FtpConnector, FtpRemote, FtpStoreError};

/// Connection coordinates for the remote server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    /// Hostname of the server.
    pub host: String,
    /// Control-channel port.
    pub port: u16,
}

/// Authentication material presented when connecting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    /// User to authenticate as.
    pub username: String,
    /// Password retrieved from the password file.
    pub password: Password,
}

/// A connected session against the remote file store.
pub trait RemoteStore {
    /// Error type surfaced by store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Guarantees that `path` exists and is empty: the directory is created
    /// if absent (with parents), removed recursively, and recreated.
    ///
    /// # Errors
    ///
    /// Returns the store error when any directory operation fails.
    fn ensure_empty(&mut self, path: &Utf8Path) -> Result<(), Self::Error>;

    /// Creates `path` as a directory, tolerating an already-existing one.
    ///
    /// # Errors
    ///
    /// Returns the store error when creation fails for any other reason.
    fn make_dir(&mut self, path: &Utf8Path) -> Result<(), Self::Error>;

    /// Stores the bytes read from `contents` at `path`.
    ///
    /// # Errors
    ///
    /// Returns the store error when the transfer fails.
    fn put_file(&mut self, path: &Utf8Path, contents: &mut dyn Read) -> Result<(), Self::Error>;

    /// Ends the session. Callers treat failures here as advisory.
    ///
    /// # Errors
    ///
    /// Returns the store error when the session cannot be closed cleanly.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Produces connected [`RemoteStore`] sessions.
pub trait RemoteConnector {
    /// Store type produced on a successful connection.
    type Store: RemoteStore;

    /// Connects and authenticates against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the store error when the connection or authentication fails.
    fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Self::Store, <Self::Store as RemoteStore>::Error>;
}
