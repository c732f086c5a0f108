//! Tests for the sync server lifecycle and background reloads

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use pretty_assertions::assert_eq;
use sync_access::AccessController;
use sync_core::{
    CacheBuilder, Error, RuleDefinitions, RuleProvider, ServerConfig, SnapshotStore, SyncCacheEngine,
    SyncServer, TaskStatus,
};
use sync_fs::NormalizedPath;
use sync_test_utils::{RuleBuilder, ServerDir, definitions};

/// Provider that blocks each pass until the test lets it through.
struct GatedProvider {
    gate: Mutex<Receiver<()>>,
}

impl RuleProvider for GatedProvider {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn refresh(&self, _definitions: &mut RuleDefinitions) -> sync_core::Result<bool> {
        let _ = self.gate.lock().unwrap().recv();
        Ok(false)
    }
}

fn write_pack(dir: &ServerDir) {
    dir.write_file("packs/p/mods/a.jar", "a");
    dir.write_rules(&definitions(&[(
        "p",
        RuleBuilder::new("packs/p").folder("mods", "mods").build(),
    )]));
}

fn access() -> AccessController {
    AccessController::new(3, Duration::from_secs(1), Duration::from_secs(60))
}

fn gated_server(dir: &ServerDir) -> (SyncServer, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel();
    let engine = SyncCacheEngine::new(
        Box::new(GatedProvider { gate: Mutex::new(rx) }),
        dir.rules_path(),
        SnapshotStore::new(dir.cache_path()),
        CacheBuilder::new(dir.root()),
    )
    .unwrap();
    (SyncServer::new(engine, access()), tx)
}

#[test]
fn start_from_default_config_builds_packages() {
    let dir = ServerDir::new();
    write_pack(&dir);

    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();
    let report = server.start().unwrap();

    assert_eq!(report.built, vec!["p"]);
    assert_eq!(server.access().limiter().limit(), 20);
}

#[test]
fn start_fails_without_rule_definitions() {
    let dir = ServerDir::new();
    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();

    assert!(matches!(server.start(), Err(Error::RulesNotFound { .. })));
}

#[test]
fn spawn_reload_needs_a_runtime() {
    let dir = ServerDir::new();
    write_pack(&dir);
    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();

    assert!(matches!(server.spawn_reload("sync"), Err(Error::NoRuntime)));
}

#[tokio::test(flavor = "multi_thread")]
async fn reload_runs_in_background_and_reports_status() {
    let dir = ServerDir::new();
    write_pack(&dir);
    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();

    let token = server.spawn_reload("sync").unwrap();
    server.join_reloads().await;

    assert_eq!(
        server.task_status(token).unwrap(),
        TaskStatus {
            finished: true,
            failed: false
        }
    );
    assert!(server.engine().package("p").unwrap().init);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_reload_is_rejected_while_in_flight() {
    let dir = ServerDir::new();
    write_pack(&dir);
    let (server, gate) = gated_server(&dir);

    let token = server.spawn_reload("sync").unwrap();
    match server.spawn_reload("sync") {
        Err(Error::TaskInFlight { token: running, .. }) => assert_eq!(running, token),
        other => panic!("expected TaskInFlight, got {other:?}"),
    }
    assert_eq!(server.task_status(token).unwrap(), TaskStatus::default());

    gate.send(()).unwrap();
    server.join_reloads().await;
    assert!(server.task_status(token).unwrap().finished);

    // Finished, so the same name may run again.
    gate.send(()).unwrap();
    assert_eq!(server.spawn_reload("sync").unwrap(), token);
    server.join_reloads().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_reload_is_reported() {
    let dir = ServerDir::new();
    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();

    let token = server.spawn_reload("sync").unwrap();
    server.join_reloads().await;

    assert_eq!(
        server.task_status(token).unwrap(),
        TaskStatus {
            finished: true,
            failed: true
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_cancels_in_flight_reload() {
    let dir = ServerDir::new();
    write_pack(&dir);
    let (server, gate) = gated_server(&dir);
    let token = server.spawn_reload("sync").unwrap();

    let release = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        let _ = gate.send(());
    });
    server.shutdown().await;
    release.join().unwrap();

    assert!(server.task_status(token).unwrap().failed);
    assert!(server.engine().package_names().is_empty());
    assert!(dir.read_json(sync_test_utils::server::CACHE_FILE)["packages"]
        .as_object()
        .unwrap()
        .is_empty());
    assert!(matches!(server.spawn_reload("again"), Err(Error::Cancelled)));
}

#[test]
fn unknown_task_token_is_reported() {
    let dir = ServerDir::new();
    let server = SyncServer::from_config(&ServerConfig::default(), &NormalizedPath::new(dir.root())).unwrap();

    assert!(matches!(
        server.task_status(uuid::Uuid::new_v4()),
        Err(Error::TaskNotFound { .. })
    ));
}
