//! Progress reporting seam for the deployment pipeline.
//!
//! The pipeline never writes to a global stream; it emits [`DeployEvent`]s
//! through an injected [`DeployObserver`]. The binary wires a
//! [`ConsoleObserver`] over stdout; tests record events instead.

use std::io::Write;

use camino::Utf8PathBuf;

/// Progress details emitted once per uploaded file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadProgress {
    /// Path of the file relative to the local root.
    pub relative_path: Utf8PathBuf,
    /// File name without its directory.
    pub file_name: String,
    /// Running percentage of the batch, rounded down.
    pub percent_complete: u8,
    /// Total number of files planned for upload.
    pub total_files: usize,
    /// Number of files attempted so far, including this one.
    pub transferred_files: usize,
}

impl UploadProgress {
    /// Number of files still to upload after this one.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total_files.saturating_sub(self.transferred_files)
    }
}

/// Events emitted while a deployment runs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeployEvent {
    /// The password file is about to be probed.
    CredentialCheck {
        /// Path of the password file.
        path: Utf8PathBuf,
    },
    /// The password was retrieved. The value itself is never part of any
    /// event.
    CredentialLoaded {
        /// Path of the password file.
        path: Utf8PathBuf,
    },
    /// A connection to the remote server is being opened.
    Connecting {
        /// Hostname being dialled.
        host: String,
        /// Control-channel port.
        port: u16,
    },
    /// The remote root is about to be emptied.
    CleanStarted {
        /// Remote directory being emptied.
        remote_root: Utf8PathBuf,
    },
    /// The remote root exists and is empty.
    CleanFinished {
        /// Remote directory that was emptied.
        remote_root: Utf8PathBuf,
    },
    /// The upload plan is known.
    UploadPlanned {
        /// Number of files that will be uploaded.
        total_files: usize,
        /// Number of files skipped by the exclusion list.
        excluded: usize,
    },
    /// One file was uploaded.
    FileUploaded(UploadProgress),
    /// One file failed to transfer. Under the lenient policy the run
    /// continues; under the strict policy this is followed by run failure.
    FileFailed {
        /// Path of the file relative to the local root.
        relative_path: Utf8PathBuf,
        /// Description of the transfer error.
        message: String,
    },
    /// Closing the connection failed after the work was done. Advisory only.
    DisconnectFailed {
        /// Description of the close error.
        message: String,
    },
    /// The run finished and the connection was closed.
    Completed {
        /// Number of files uploaded.
        uploaded: usize,
        /// Number of files that failed under the lenient policy.
        failed: usize,
    },
}

/// Receives pipeline events.
pub trait DeployObserver {
    /// Called once per event, in order.
    fn on_event(&mut self, event: &DeployEvent);
}

/// Renders events as console lines through any writer.
#[derive(Debug)]
pub struct ConsoleObserver<W: Write> {
    out: W,
}

impl<W: Write> ConsoleObserver<W> {
    /// Wraps a writer. Write failures are ignored; progress output must not
    /// abort a deployment.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> DeployObserver for ConsoleObserver<W> {
    fn on_event(&mut self, event: &DeployEvent) {
        match event {
            DeployEvent::CredentialCheck { path } => {
                writeln!(self.out, "Checking for the ftp password file at '{path}'.").ok();
            }
            DeployEvent::CredentialLoaded { path } => {
                writeln!(
                    self.out,
                    "The password was retrieved successfully from '{path}'."
                )
                .ok();
            }
            DeployEvent::Connecting { host, port } => {
                writeln!(self.out, "Connecting to {host}:{port}.").ok();
            }
            DeployEvent::CleanStarted { remote_root } => {
                writeln!(
                    self.out,
                    "Removing the existing files from the target deployment directory '{remote_root}'."
                )
                .ok();
            }
            DeployEvent::CleanFinished { remote_root } => {
                writeln!(
                    self.out,
                    "Successfully emptied the target deployment directory '{remote_root}'."
                )
                .ok();
            }
            DeployEvent::UploadPlanned {
                total_files,
                excluded,
            } => {
                writeln!(
                    self.out,
                    "Deploying files: {total_files} to upload, {excluded} excluded."
                )
                .ok();
            }
            DeployEvent::FileUploaded(progress) => {
                writeln!(
                    self.out,
                    "{}%\tUploaded file '{}'. Remaining to upload: {}.",
                    progress.percent_complete,
                    progress.file_name,
                    progress.remaining()
                )
                .ok();
            }
            DeployEvent::FileFailed {
                relative_path,
                message,
            } => {
                writeln!(
                    self.out,
                    "An error happened during transfer of file '{relative_path}'.\n{message}"
                )
                .ok();
            }
            DeployEvent::DisconnectFailed { message } => {
                writeln!(
                    self.out,
                    "Error occurred while trying to close the ftp connection.\n{message}"
                )
                .ok();
            }
            DeployEvent::Completed { uploaded, failed } => {
                if *failed > 0 {
                    writeln!(
                        self.out,
                        "Deployment finished with {failed} failed transfer(s); {uploaded} uploaded."
                    )
                    .ok();
                } else {
                    writeln!(self.out, "100%\tDeployment complete.").ok();
                }
            }
        }
    }
}

/// Computes the running percentage for a progress event, rounding down.
#[must_use]
pub fn percent_of(transferred: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    #[expect(
        clippy::integer_division,
        reason = "progress percentages round down by design"
    )]
    let percent = transferred.saturating_mul(100) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}
