//! Orchestrates the end-to-end deployment pipeline.
//!
//! The pipeline is a strictly ordered chain: validate inputs, load the
//! credential, plan the upload, connect, optionally empty the remote root,
//! upload the planned files, and close the connection. Any stage failure
//! short-circuits the remainder and surfaces to the caller; nothing is
//! retried. Closing is always attempted once a connection exists, and a
//! close failure is reported through the observer rather than failing a run
//! whose work already succeeded.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::credentials::{self, CredentialError};
use crate::observer::{DeployEvent, DeployObserver, UploadProgress, percent_of};
use crate::plan::{self, PlanError, UploadPlan};
use crate::remote::{Credentials, Endpoint, RemoteConnector, RemoteStore};
use crate::settings::{DeployRequest, DeploySettings, FailurePolicy, SettingsError};

/// Store error type produced by a connector.
type StoreError<C> = <<C as RemoteConnector>::Store as RemoteStore>::Error;

/// Errors surfaced while performing a deployment.
#[derive(Debug, Error)]
pub enum DeployError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when settings or the per-run request fail validation. No
    /// filesystem or network activity has occurred.
    #[error("invalid input: {0}")]
    Request(#[from] SettingsError),
    /// Raised when the password file is missing or unreadable. No network
    /// activity has occurred.
    #[error("credential unavailable: {0}")]
    Credential(#[from] CredentialError),
    /// Raised when the local tree cannot be planned.
    #[error("upload planning failed: {0}")]
    Plan(#[from] PlanError),
    /// Raised when connecting or authenticating fails.
    #[error("connection failed: {0}")]
    Connect(#[source] E),
    /// Raised when emptying the remote root fails.
    #[error("failed to empty the remote directory {remote_root}: {source}")]
    Clean {
        /// Remote directory that could not be emptied.
        remote_root: Utf8PathBuf,
        /// Underlying store error.
        #[source]
        source: E,
    },
    /// Raised when a remote directory cannot be created.
    #[error("failed to create remote directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying store error.
        #[source]
        source: E,
    },
    /// Raised when the local root cannot be opened for reading.
    #[error("failed to open local root {path}: {message}")]
    LocalRoot {
        /// Local directory that could not be opened.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised under the strict policy when a single file fails to transfer.
    #[error("upload of '{relative_path}' failed: {message}")]
    Upload {
        /// Path of the file relative to the local root.
        relative_path: Utf8PathBuf,
        /// Description of the transfer or read error.
        message: String,
    },
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeploySummary {
    /// Number of files uploaded.
    pub uploaded: usize,
    /// Number of files skipped by the exclusion list.
    pub skipped: usize,
    /// Files that failed to transfer under the lenient policy. Always empty
    /// under the strict policy, which fails the run instead.
    pub failed: Vec<Utf8PathBuf>,
}

/// Executes the deployment pipeline using the provided connector and
/// observer.
#[derive(Debug)]
pub struct Deployer<C: RemoteConnector, O: DeployObserver> {
    connector: C,
    observer: O,
}

impl<C, O> Deployer<C, O>
where
    C: RemoteConnector,
    O: DeployObserver,
{
    /// Creates a new deployer.
    #[must_use]
    pub const fn new(connector: C, observer: O) -> Self {
        Self {
            connector,
            observer,
        }
    }

    /// Runs the pipeline and returns the run summary.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError`] when any stage fails. Input validation happens
    /// before any filesystem access, and the credential is loaded before any
    /// network activity.
    pub fn run(
        &mut self,
        settings: &DeploySettings,
        request: &DeployRequest,
    ) -> Result<DeploySummary, DeployError<StoreError<C>>> {
        settings.validate()?;
        validate_request(request)?;

        let password_path = Utf8PathBuf::from(&settings.password_file);
        self.observer.on_event(&DeployEvent::CredentialCheck {
            path: password_path.clone(),
        });
        let password = credentials::load(&password_path)?;
        self.observer.on_event(&DeployEvent::CredentialLoaded {
            path: password_path,
        });

        let upload_plan = plan::build(&request.local_root, &settings.exclude)?;
        self.observer.on_event(&DeployEvent::UploadPlanned {
            total_files: upload_plan.files.len(),
            excluded: upload_plan.excluded,
        });

        self.observer.on_event(&DeployEvent::Connecting {
            host: settings.host.clone(),
            port: settings.port,
        });
        let endpoint = Endpoint {
            host: settings.host.clone(),
            port: settings.port,
        };
        let creds = Credentials {
            username: settings.username.clone(),
            password,
        };
        let mut store = self
            .connector
            .connect(&endpoint, &creds)
            .map_err(DeployError::Connect)?;

        let outcome = self.transfer(&mut store, settings, request, &upload_plan);

        // The connection is closed regardless of the transfer outcome.
        if let Err(err) = store.close() {
            self.observer.on_event(&DeployEvent::DisconnectFailed {
                message: err.to_string(),
            });
        }

        let summary = outcome?;
        self.observer.on_event(&DeployEvent::Completed {
            uploaded: summary.uploaded,
            failed: summary.failed.len(),
        });
        Ok(summary)
    }

    fn transfer(
        &mut self,
        store: &mut C::Store,
        settings: &DeploySettings,
        request: &DeployRequest,
        upload_plan: &UploadPlan,
    ) -> Result<DeploySummary, DeployError<StoreError<C>>> {
        if settings.clean_remote {
            self.observer.on_event(&DeployEvent::CleanStarted {
                remote_root: request.remote_root.clone(),
            });
            store
                .ensure_empty(&request.remote_root)
                .map_err(|source| DeployError::Clean {
                    remote_root: request.remote_root.clone(),
                    source,
                })?;
            self.observer.on_event(&DeployEvent::CleanFinished {
                remote_root: request.remote_root.clone(),
            });
        } else {
            // Without the clean stage the root may not exist yet.
            store
                .make_dir(&request.remote_root)
                .map_err(|source| DeployError::CreateDir {
                    path: request.remote_root.clone(),
                    source,
                })?;
        }

        for dir in &upload_plan.dirs {
            let remote_dir = request.remote_root.join(dir);
            store
                .make_dir(&remote_dir)
                .map_err(|source| DeployError::CreateDir {
                    path: remote_dir.clone(),
                    source,
                })?;
        }

        let local =
            Dir::open_ambient_dir(&request.local_root, ambient_authority()).map_err(|err| {
                DeployError::LocalRoot {
                    path: request.local_root.clone(),
                    message: err.to_string(),
                }
            })?;

        let total = upload_plan.files.len();
        let mut transferred = 0usize;
        let mut summary = DeploySummary {
            uploaded: 0,
            skipped: upload_plan.excluded,
            failed: Vec::new(),
        };

        for relative in &upload_plan.files {
            transferred += 1;
            match upload_one(store, &local, &request.remote_root, relative) {
                Ok(()) => {
                    summary.uploaded += 1;
                    self.observer
                        .on_event(&DeployEvent::FileUploaded(UploadProgress {
                            relative_path: relative.clone(),
                            file_name: file_name_of(relative),
                            percent_complete: percent_of(transferred, total),
                            total_files: total,
                            transferred_files: transferred,
                        }));
                }
                Err(message) => {
                    self.observer.on_event(&DeployEvent::FileFailed {
                        relative_path: relative.clone(),
                        message: message.clone(),
                    });
                    match settings.failure_policy {
                        FailurePolicy::Strict => {
                            return Err(DeployError::Upload {
                                relative_path: relative.clone(),
                                message,
                            });
                        }
                        FailurePolicy::Lenient => summary.failed.push(relative.clone()),
                    }
                }
            }
        }

        Ok(summary)
    }
}

fn validate_request(request: &DeployRequest) -> Result<(), SettingsError> {
    // Requests built through `DeployRequest::new` are already checked; this
    // guards direct struct construction.
    if request.local_root.as_str().trim().is_empty() {
        return Err(SettingsError::MissingRoot {
            field: "local-root",
        });
    }
    if request.remote_root.as_str().trim().is_empty() {
        return Err(SettingsError::MissingRoot {
            field: "remote-root",
        });
    }
    Ok(())
}

fn file_name_of(relative: &Utf8Path) -> String {
    relative
        .file_name()
        .map_or_else(|| relative.to_string(), ToOwned::to_owned)
}

fn upload_one<S: RemoteStore>(
    store: &mut S,
    local: &Dir,
    remote_root: &Utf8Path,
    relative: &Utf8Path,
) -> Result<(), String> {
    let mut file = local
        .open(relative)
        .map_err(|err| format!("failed to read local file '{relative}': {err}"))?;
    let remote_path = remote_root.join(relative);
    store
        .put_file(&remote_path, &mut file)
        .map_err(|err| err.to_string())
}
