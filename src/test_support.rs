//! Test support utilities shared across unit and integration tests.
//!
//! [`MemoryConnector`] stands in for the FTP implementation: it records
//! connections, keeps the remote tree in memory, and can be scripted to fail
//! at any stage. [`RecordingObserver`] captures pipeline events for
//! assertions. Both hand out shared state so a test can inspect the remote
//! after the pipeline has consumed the store.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::observer::{DeployEvent, DeployObserver};
use crate::remote::{Credentials, Endpoint, RemoteConnector, RemoteStore};

/// Errors produced by the scripted in-memory remote.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MemoryRemoteError {
    /// Scripted connection failure.
    #[error("scripted connect failure")]
    Connect,
    /// Scripted failure while emptying a directory.
    #[error("scripted clean failure")]
    Clean,
    /// Scripted failure while storing a file.
    #[error("scripted store failure for {path}")]
    Store {
        /// Remote path whose transfer was scripted to fail.
        path: Utf8PathBuf,
    },
    /// Scripted failure while closing the session.
    #[error("scripted close failure")]
    Close,
}

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<Utf8PathBuf>,
    files: BTreeMap<Utf8PathBuf, Vec<u8>>,
    connects: usize,
    closes: usize,
    credentials_seen: Vec<(String, String)>,
    cleaned: Vec<Utf8PathBuf>,
    fail_connect: bool,
    fail_clean: bool,
    fail_close: bool,
    fail_puts: BTreeSet<Utf8PathBuf>,
    files_before_first_put: Option<usize>,
}

/// In-memory stand-in for the FTP connector.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnector {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryConnector {
    /// Creates a connector with an empty remote tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a pre-existing remote file.
    pub fn seed_file(&self, path: impl Into<Utf8PathBuf>, contents: &[u8]) {
        self.state
            .borrow_mut()
            .files
            .insert(path.into(), contents.to_vec());
    }

    /// Seeds a pre-existing remote directory.
    pub fn seed_dir(&self, path: impl Into<Utf8PathBuf>) {
        self.state.borrow_mut().dirs.insert(path.into());
    }

    /// Scripts the next connection attempt to fail.
    pub fn fail_connect(&self) {
        self.state.borrow_mut().fail_connect = true;
    }

    /// Scripts directory emptying to fail.
    pub fn fail_clean(&self) {
        self.state.borrow_mut().fail_clean = true;
    }

    /// Scripts session close to fail.
    pub fn fail_close(&self) {
        self.state.borrow_mut().fail_close = true;
    }

    /// Scripts the transfer of one remote path to fail.
    pub fn fail_put(&self, path: impl Into<Utf8PathBuf>) {
        self.state.borrow_mut().fail_puts.insert(path.into());
    }

    /// Number of connection attempts made so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects
    }

    /// Number of close calls made so far.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.borrow().closes
    }

    /// Username and exposed password pairs presented on each connection.
    #[must_use]
    pub fn credentials_seen(&self) -> Vec<(String, String)> {
        self.state.borrow().credentials_seen.clone()
    }

    /// Remote paths emptied via `ensure_empty`, in order.
    #[must_use]
    pub fn cleaned(&self) -> Vec<Utf8PathBuf> {
        self.state.borrow().cleaned.clone()
    }

    /// Sorted list of remote file paths currently present.
    #[must_use]
    pub fn files(&self) -> Vec<Utf8PathBuf> {
        self.state.borrow().files.keys().cloned().collect()
    }

    /// Contents of one remote file, when present.
    #[must_use]
    pub fn file_contents(&self, path: &Utf8Path) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).cloned()
    }

    /// Sorted list of remote directories currently present.
    #[must_use]
    pub fn dirs(&self) -> Vec<Utf8PathBuf> {
        self.state.borrow().dirs.iter().cloned().collect()
    }

    /// Number of remote files that existed when the first upload arrived.
    /// `None` when no upload has happened.
    #[must_use]
    pub fn files_before_first_put(&self) -> Option<usize> {
        self.state.borrow().files_before_first_put
    }
}

impl RemoteConnector for MemoryConnector {
    type Store = MemoryRemote;

    fn connect(
        &self,
        _endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<MemoryRemote, MemoryRemoteError> {
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        state.credentials_seen.push((
            credentials.username.clone(),
            credentials.password.expose().to_owned(),
        ));
        if state.fail_connect {
            return Err(MemoryRemoteError::Connect);
        }
        Ok(MemoryRemote {
            state: Rc::clone(&self.state),
        })
    }
}

/// Connected in-memory store handed out by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryRemote {
    state: Rc<RefCell<MemoryState>>,
}

impl RemoteStore for MemoryRemote {
    type Error = MemoryRemoteError;

    fn ensure_empty(&mut self, path: &Utf8Path) -> Result<(), MemoryRemoteError> {
        let mut state = self.state.borrow_mut();
        if state.fail_clean {
            return Err(MemoryRemoteError::Clean);
        }
        state.files.retain(|file, _| !file.starts_with(path));
        state.dirs.retain(|dir| !dir.starts_with(path));
        state.dirs.insert(path.to_path_buf());
        state.cleaned.push(path.to_path_buf());
        Ok(())
    }

    fn make_dir(&mut self, path: &Utf8Path) -> Result<(), MemoryRemoteError> {
        self.state.borrow_mut().dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn put_file(
        &mut self,
        path: &Utf8Path,
        contents: &mut dyn Read,
    ) -> Result<(), MemoryRemoteError> {
        let mut state = self.state.borrow_mut();
        if state.files_before_first_put.is_none() {
            state.files_before_first_put = Some(state.files.len());
        }
        if state.fail_puts.contains(path) {
            return Err(MemoryRemoteError::Store {
                path: path.to_path_buf(),
            });
        }
        let mut body = Vec::new();
        contents
            .read_to_end(&mut body)
            .map_err(|_| MemoryRemoteError::Store {
                path: path.to_path_buf(),
            })?;
        state.files.insert(path.to_path_buf(), body);
        Ok(())
    }

    fn close(&mut self) -> Result<(), MemoryRemoteError> {
        let mut state = self.state.borrow_mut();
        state.closes += 1;
        if state.fail_close {
            return Err(MemoryRemoteError::Close);
        }
        Ok(())
    }
}

/// Observer that records every event for later assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    events: Rc<RefCell<Vec<DeployEvent>>>,
}

impl RecordingObserver {
    /// Creates an observer with no recorded events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<DeployEvent> {
        self.events.borrow().clone()
    }
}

impl DeployObserver for RecordingObserver {
    fn on_event(&mut self, event: &DeployEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
