//! Core library for the sitedrop deployment tool.
//!
//! The crate exposes a linear, short-circuiting deployment pipeline: load
//! layered settings, retrieve a password from a local file, optionally empty
//! the remote target directory, and upload a local tree over FTP while
//! reporting per-file progress. The remote side sits behind the
//! [`remote::RemoteStore`] seam so tests can run the whole pipeline against
//! an in-memory store.

pub mod cli;
pub mod credentials;
pub mod deploy;
pub mod observer;
pub mod plan;
pub mod remote;
pub mod settings;
pub mod test_support;

pub use cli::Cli;
pub use credentials::{CredentialError, Password};
pub use deploy::{DeployError, DeploySummary, Deployer};
pub use observer::{ConsoleObserver, DeployEvent, DeployObserver, UploadProgress};
pub use plan::{PlanError, UploadPlan};
pub use remote::{
    Credentials, Endpoint, FtpConnector, FtpRemote, FtpStoreError, RemoteConnector, RemoteStore,
};
pub use settings::{
    DeployRequest, DeploySettings, FailurePolicy, SettingsError, SettingsLoadError,
};
