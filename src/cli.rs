//! Command-line interface definitions for the `sitedrop` binary.
//!
//! This module isolates the clap parser structure so the build script can
//! reuse it when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `sitedrop` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sitedrop",
    about = "Upload a local directory tree to a remote FTP server"
)]
pub struct Cli {
    /// Local directory whose contents are uploaded.
    #[arg(long, short = 'l', value_name = "DIR")]
    pub local_root: String,
    /// Remote directory to receive the files.
    #[arg(long, short = 'r', value_name = "DIR")]
    pub remote_root: String,
    /// Skip emptying the remote directory before uploading.
    #[arg(long)]
    pub keep_remote: bool,
}
