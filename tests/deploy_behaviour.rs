//! End-to-end pipeline behaviour against the in-memory remote store.

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use sitedrop::deploy::DeployError;
use sitedrop::settings::DEFAULT_PORT;
use sitedrop::test_support::{MemoryConnector, MemoryRemoteError, RecordingObserver};
use sitedrop::{
    CredentialError, DeployEvent, DeployRequest, DeploySettings, Deployer, FailurePolicy,
    SettingsError,
};

/// A local workspace with a password file and a small site tree.
struct Workspace {
    settings: DeploySettings,
    local_root: Utf8PathBuf,
    _tmp: TempDir,
}

impl Workspace {
    fn write_file(&self, relative: &str, contents: &str) {
        let path = self.local_root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("create {parent}: {err}"));
        }
        std::fs::write(&path, contents).unwrap_or_else(|err| panic!("write {path}: {err}"));
    }

    fn request(&self) -> DeployRequest {
        DeployRequest::new(self.local_root.as_str(), "/site")
            .unwrap_or_else(|err| panic!("request: {err}"))
    }
}

#[fixture]
fn workspace() -> Workspace {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    let local_root = root.join("dist");
    std::fs::create_dir_all(&local_root).unwrap_or_else(|err| panic!("create dist: {err}"));

    let password_file = root.join(".ftp.password");
    std::fs::write(&password_file, "secret\n").unwrap_or_else(|err| panic!("password: {err}"));

    let settings = DeploySettings {
        host: String::from("ftp.example.net"),
        port: DEFAULT_PORT,
        username: String::from("deploy"),
        password_file: password_file.into_string(),
        exclude: vec![String::from(".git"), String::from(".ftp.password")],
        clean_remote: true,
        failure_policy: FailurePolicy::Strict,
    };

    Workspace {
        settings,
        local_root,
        _tmp: tmp,
    }
}

fn deployer(connector: &MemoryConnector) -> Deployer<MemoryConnector, RecordingObserver> {
    Deployer::new(connector.clone(), RecordingObserver::new())
}

fn uploaded_progress(events: &[DeployEvent]) -> Vec<(usize, usize, u8)> {
    events
        .iter()
        .filter_map(|event| match event {
            DeployEvent::FileUploaded(progress) => Some((
                progress.transferred_files,
                progress.total_files,
                progress.percent_complete,
            )),
            _ => None,
        })
        .collect()
}

#[rstest]
fn empty_local_root_fails_before_any_io(workspace: Workspace) {
    let connector = MemoryConnector::new();
    let observer = RecordingObserver::new();
    let mut runner = Deployer::new(connector.clone(), observer.clone());
    let request = DeployRequest {
        local_root: Utf8PathBuf::new(),
        remote_root: Utf8PathBuf::from("/site"),
    };

    let err = runner
        .run(&workspace.settings, &request)
        .expect_err("empty local root should fail");

    assert!(matches!(
        err,
        DeployError::Request(SettingsError::MissingRoot {
            field: "local-root"
        })
    ));
    assert_eq!(connector.connect_count(), 0);
    assert!(observer.events().is_empty(), "no stage should have run");
}

#[rstest]
fn missing_password_file_fails_before_network(workspace: Workspace) {
    let mut settings = workspace.settings.clone();
    settings.password_file = workspace.local_root.join("absent.password").into_string();
    let connector = MemoryConnector::new();

    let err = deployer(&connector)
        .run(&settings, &workspace.request())
        .expect_err("missing password file should fail");

    assert!(matches!(
        err,
        DeployError::Credential(CredentialError::Missing { .. })
    ));
    assert_eq!(connector.connect_count(), 0);
}

#[rstest]
fn password_file_contents_are_trimmed(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let connector = MemoryConnector::new();

    deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    assert_eq!(
        connector.credentials_seen(),
        vec![(String::from("deploy"), String::from("secret"))]
    );
}

#[rstest]
fn clean_stage_empties_remote_before_first_upload(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let connector = MemoryConnector::new();
    connector.seed_file("/site/stale.html", b"old");
    connector.seed_file("/site/assets/stale.css", b"old");

    let summary = deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    assert_eq!(connector.cleaned(), vec![Utf8PathBuf::from("/site")]);
    assert_eq!(connector.files_before_first_put(), Some(0));
    assert_eq!(summary.uploaded, 1);
    assert_eq!(connector.files(), vec![Utf8PathBuf::from("/site/index.html")]);
}

#[rstest]
fn keep_remote_skips_the_clean_stage(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let mut settings = workspace.settings.clone();
    settings.clean_remote = false;
    let connector = MemoryConnector::new();
    connector.seed_file("/site/keep.html", b"kept");

    deployer(&connector)
        .run(&settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    assert!(connector.cleaned().is_empty());
    assert_eq!(
        connector.files(),
        vec![
            Utf8PathBuf::from("/site/index.html"),
            Utf8PathBuf::from("/site/keep.html"),
        ]
    );
}

#[rstest]
fn excluded_files_are_skipped_and_counted(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    workspace.write_file("assets/site.css", "body{}");
    workspace.write_file(".git/config", "[core]");
    workspace.write_file(".git/HEAD", "ref: main");
    let connector = MemoryConnector::new();

    let summary = deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    assert_eq!(summary.uploaded, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(
        connector.files(),
        vec![
            Utf8PathBuf::from("/site/assets/site.css"),
            Utf8PathBuf::from("/site/index.html"),
        ]
    );
    assert!(connector.dirs().contains(&Utf8PathBuf::from("/site/assets")));
}

#[rstest]
fn uploaded_bodies_match_local_contents(workspace: Workspace) {
    workspace.write_file("index.html", "<html>hello</html>");
    let connector = MemoryConnector::new();

    deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    assert_eq!(
        connector.file_contents(Utf8Path::new("/site/index.html")),
        Some(b"<html>hello</html>".to_vec())
    );
}

#[rstest]
fn strict_policy_fails_the_run_on_the_first_file_error(workspace: Workspace) {
    workspace.write_file("a.html", "a");
    workspace.write_file("b.html", "b");
    workspace.write_file("c.html", "c");
    let connector = MemoryConnector::new();
    connector.fail_put("/site/b.html");
    let observer = RecordingObserver::new();
    let mut runner = Deployer::new(connector.clone(), observer.clone());

    let err = runner
        .run(&workspace.settings, &workspace.request())
        .expect_err("strict policy should fail the run");

    let DeployError::Upload { relative_path, .. } = err else {
        panic!("expected Upload error");
    };
    assert_eq!(relative_path, Utf8PathBuf::from("b.html"));
    // a.html went through before the failure; c.html was never attempted.
    assert_eq!(connector.files(), vec![Utf8PathBuf::from("/site/a.html")]);
    assert_eq!(connector.close_count(), 1, "connection should still close");
    assert!(
        observer
            .events()
            .iter()
            .any(|event| matches!(event, DeployEvent::FileFailed { .. })),
        "the failed file should be reported"
    );
    assert!(
        !observer
            .events()
            .iter()
            .any(|event| matches!(event, DeployEvent::Completed { .. })),
        "a failed run must not report completion"
    );
}

#[rstest]
fn lenient_policy_records_failures_and_succeeds(workspace: Workspace) {
    workspace.write_file("a.html", "a");
    workspace.write_file("b.html", "b");
    workspace.write_file("c.html", "c");
    let mut settings = workspace.settings.clone();
    settings.failure_policy = FailurePolicy::Lenient;
    let connector = MemoryConnector::new();
    connector.fail_put("/site/b.html");

    let summary = deployer(&connector)
        .run(&settings, &workspace.request())
        .unwrap_or_else(|err| panic!("lenient run should succeed: {err}"));

    assert_eq!(summary.uploaded, 2);
    assert_eq!(summary.failed, vec![Utf8PathBuf::from("b.html")]);
    assert_eq!(
        connector.files(),
        vec![
            Utf8PathBuf::from("/site/a.html"),
            Utf8PathBuf::from("/site/c.html"),
        ]
    );
}

#[rstest]
fn progress_is_monotonic_and_finishes_at_the_total(workspace: Workspace) {
    workspace.write_file("a.html", "a");
    workspace.write_file("b.html", "b");
    workspace.write_file("c.html", "c");
    let connector = MemoryConnector::new();
    let observer = RecordingObserver::new();
    let mut runner = Deployer::new(connector, observer.clone());

    runner
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("deploy: {err}"));

    let progress = uploaded_progress(&observer.events());
    assert_eq!(progress.len(), 3);
    for (index, (transferred, total, _)) in progress.iter().enumerate() {
        assert_eq!(*transferred, index + 1);
        assert_eq!(*total, 3);
    }
    let Some((last_transferred, last_total, last_percent)) = progress.last() else {
        panic!("expected progress events");
    };
    assert_eq!(last_transferred, last_total);
    assert_eq!(*last_percent, 100);
}

#[rstest]
fn connect_failure_aborts_the_run(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let connector = MemoryConnector::new();
    connector.fail_connect();

    let err = deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .expect_err("connect failure should abort");

    assert!(matches!(
        err,
        DeployError::Connect(MemoryRemoteError::Connect)
    ));
    assert_eq!(connector.close_count(), 0);
}

#[rstest]
fn clean_failure_aborts_before_any_upload(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let connector = MemoryConnector::new();
    connector.fail_clean();

    let err = deployer(&connector)
        .run(&workspace.settings, &workspace.request())
        .expect_err("clean failure should abort");

    assert!(matches!(err, DeployError::Clean { .. }));
    assert!(connector.files().is_empty());
    assert_eq!(connector.close_count(), 1, "connection should still close");
}

#[rstest]
fn close_failure_is_advisory_only(workspace: Workspace) {
    workspace.write_file("index.html", "<html/>");
    let connector = MemoryConnector::new();
    connector.fail_close();
    let observer = RecordingObserver::new();
    let mut runner = Deployer::new(connector, observer.clone());

    let summary = runner
        .run(&workspace.settings, &workspace.request())
        .unwrap_or_else(|err| panic!("close failure must not fail the run: {err}"));

    assert_eq!(summary.uploaded, 1);
    let events = observer.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, DeployEvent::DisconnectFailed { .. })),
        "close failure should be reported"
    );
    assert!(
        events
            .iter()
            .any(|event| matches!(event, DeployEvent::Completed { .. })),
        "the run should still complete"
    );
}
