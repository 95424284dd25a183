//! Integration tests for AccessServer
//!
//! Each test binds a server on an ephemeral port, drives it with a plain
//! TCP operator client and a mock badge reader, and checks the exact lines
//! the operator sees and the registry contents afterwards.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use badgegate_core::{HolderName, TagId};
use badgegate_hardware::{MockReader, MockReaderHandle};
use badgegate_network::{AccessServer, ServerConfig, ServerError};
use badgegate_storage::{FileRegistry, TagRegistry};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const QUANTUM: Duration = Duration::from_millis(20);

/// Plain line-oriented operator client.
struct Operator {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Operator {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    /// Next line without its terminator, `None` on EOF.
    async fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("no response from server")
            .unwrap();
        (n > 0).then(|| line.trim_end_matches('\n').to_string())
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.next_line().await.as_deref(), Some(expected));
    }
}

fn tag(s: &str) -> TagId {
    TagId::new(s).unwrap()
}

fn name(s: &str) -> HolderName {
    HolderName::new(s).unwrap()
}

async fn registry_in(dir: &TempDir) -> FileRegistry {
    FileRegistry::open(dir.path().join("tags.db")).await.unwrap()
}

/// Run a server until `script` finishes, then shut it down.
///
/// The script runs in its own task with the server address and the handle
/// of the mock reader the server scans. The reader stays connected until
/// the server has stopped.
async fn run_scenario<F, Fut>(registry: &FileRegistry, script: F) -> Result<(), ServerError>
where
    F: FnOnce(SocketAddr, MockReaderHandle) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
        .accept_timeout(QUANTUM)
        .idle_timeout(QUANTUM);
    let server = AccessServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (mut reader, handle) = MockReader::with_timeout(QUANTUM);
    let _connected = handle.clone();
    let cancel = CancellationToken::new();

    let script = script(addr, handle);
    let guard = cancel.clone().drop_guard();
    let client = tokio::spawn(async move {
        let _guard = guard;
        script.await;
    });

    let result = timeout(
        Duration::from_secs(20),
        server.run(&mut reader, registry, &cancel),
    )
    .await
    .expect("server did not stop");

    client.await.expect("operator script failed");
    result
}

#[tokio::test]
async fn test_add_then_unsolicited_scan_grants_access() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let alice = tag("AAAAAAAAAAAA");

    let scan = alice.clone();
    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        op.send("ADD").await;
        op.expect("Scan tag to add").await;
        reader.present_tag(&scan).await.unwrap();
        op.expect("Enter name").await;
        op.send("Alice").await;
        op.expect("Tag added").await;

        reader.present_tag(&scan).await.unwrap();
        op.expect("Access Granted. Welcome!").await;
        op.expect("Data: Alice").await;
        let stamp = op.next_line().await.unwrap();
        let stamp = stamp.strip_prefix("Last Modified: ").unwrap();
        assert_eq!(stamp.len(), 18);
    })
    .await
    .unwrap();

    let record = registry.lookup(&alice).await.unwrap().unwrap();
    assert_eq!(record.holder_name.as_str(), "Alice");
}

#[tokio::test]
async fn test_delete_twice_reports_not_in_system() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let bob = tag("BBBBBBBBBBBB");
    registry.upsert(&bob, &name("Bob")).await.unwrap();

    let scan = bob.clone();
    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        op.send("DELETE").await;
        op.expect("Scan tag to delete").await;
        reader.present_tag(&scan).await.unwrap();
        op.expect("Tag deleted").await;

        op.send("DELETE").await;
        op.expect("Scan tag to delete").await;
        reader.present_tag(&scan).await.unwrap();
        op.expect("Tag not in system").await;
    })
    .await
    .unwrap();

    assert_eq!(registry.lookup(&bob).await.unwrap(), None);
}

#[tokio::test]
async fn test_unrecognized_command_keeps_session_usable() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        op.send("FOO").await;
        op.expect("Unrecognized command").await;
        op.send("").await;
        op.send("add").await;
        op.expect("Unrecognized command").await;

        op.send("EDIT").await;
        op.expect("Scan tag to edit").await;
        reader.present_tag(&tag("CCCCCCCCCCCC")).await.unwrap();
        op.expect("Tag not in system. Use ADD").await;
    })
    .await
    .unwrap();

    assert!(registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_renames_holder() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let carol = tag("0415AB12CD34");
    registry.upsert(&carol, &name("Carol")).await.unwrap();

    let scan = carol.clone();
    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        op.send("EDIT").await;
        op.expect("Scan tag to edit").await;
        reader.present_tag(&scan).await.unwrap();
        op.expect("Enter new name").await;
        op.send("Carol Danvers\r").await;
        op.expect("Tag updated").await;
    })
    .await
    .unwrap();

    let records = registry.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].holder_name.as_str(), "Carol Danvers");
}

#[tokio::test]
async fn test_add_existing_and_unknown_scan() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let alice = tag("AAAAAAAAAAAA");
    registry.upsert(&alice, &name("Alice")).await.unwrap();

    let scan = alice.clone();
    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        op.send("ADD").await;
        op.expect("Scan tag to add").await;
        reader.present_tag(&scan).await.unwrap();
        op.expect("Tag already registered").await;

        reader.present_tag(&tag("ZZZZZZZZZZZZ")).await.unwrap();
        op.expect("Access Denied.").await;
    })
    .await
    .unwrap();

    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_short_frame_is_not_a_scan() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;

        reader.send_frame(b"\x02AAAAAAAA".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        op.send("FOO").await;
        op.expect("Unrecognized command").await;
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_server_accepts_next_operator_after_disconnect() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    run_scenario(&registry, |addr, reader| async move {
        let mut first = Operator::connect(addr).await;
        first.send("ADD").await;
        first.expect("Scan tag to add").await;
        reader.present_tag(&tag("AAAAAAAAAAAA")).await.unwrap();
        first.expect("Enter name").await;
        drop(first);

        let mut second = Operator::connect(addr).await;
        second.send("FOO").await;
        second.expect("Unrecognized command").await;
    })
    .await
    .unwrap();

    assert!(registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_unwinds_blocked_flow() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    run_scenario(&registry, |addr, _reader| async move {
        let mut op = Operator::connect(addr).await;
        op.send("DELETE").await;
        op.expect("Scan tag to delete").await;
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_registry_failure_stops_server() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    std::fs::write(registry.path(), "AAAA\n").unwrap();

    let result = run_scenario(&registry, |addr, reader| async move {
        let mut op = Operator::connect(addr).await;
        op.send("FOO").await;
        op.expect("Unrecognized command").await;

        reader.present_tag(&tag("AAAAAAAAAAAA")).await.unwrap();
        assert_eq!(op.next_line().await, None);
    })
    .await;

    assert!(matches!(result, Err(ServerError::Storage(_))));
    assert_eq!(std::fs::read_to_string(registry.path()).unwrap(), "AAAA\n");
}
