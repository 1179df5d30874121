use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use hclus::server::Message;
use hclus::{Client, ClientError, Config, CsvDirectorySource, Server};

async fn start_server(dir: &Path, max_connections: Option<usize>) -> SocketAddr {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".into();
    config.server.port = 0;
    config.server.max_connections = max_connections;
    config.storage.data_dir = dir.to_path_buf();
    config.storage.snapshot_dir = dir.to_path_buf();

    let source = Arc::new(CsvDirectorySource::new(dir));
    let server = Server::bind(&config, source).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn write_tables(dir: &Path) {
    std::fs::write(dir.join("line.csv"), "x\n0\n1\n5\n6\n").unwrap();
    std::fs::write(dir.join("plane.csv"), "x,y\n0,0\n0,1\n10,10\n10,11\n5,5\n").unwrap();
    std::fs::write(dir.join("labels.csv"), "x,name\n1,a\n").unwrap();
    std::fs::write(dir.join("blank.csv"), "x\n").unwrap();
}

#[tokio::test]
async fn load_mine_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;

    let mut client = Client::connect(addr).await.unwrap();
    client.load_table("line").await.unwrap();

    let mined = client.mine(3, 1, "line.bin").await.unwrap();
    assert_eq!(mined.saved, Ok(()));
    assert_eq!(
        mined.dendrogram,
        "level0:\ncluster0:<[0.0]>\ncluster1:<[1.0]>\ncluster2:<[5.0]>\ncluster3:<[6.0]>\n\n\
         level1:\ncluster0:<[0.0]><[1.0]>\ncluster1:<[5.0]>\ncluster2:<[6.0]>\n\n\
         level2:\ncluster0:<[0.0]><[1.0]>\ncluster1:<[5.0]><[6.0]>\n\n"
    );

    let reloaded = client.load_snapshot("line.bin").await.unwrap();
    assert_eq!(reloaded, mined.dendrogram);
}

#[tokio::test]
async fn snapshot_loads_in_a_fresh_session_without_data() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;

    let mut first = Client::connect(addr).await.unwrap();
    first.load_table("plane").await.unwrap();
    first.mine(4, 2, "plane.bin").await.unwrap();

    // No table loaded here, so clusters render as indices.
    let mut second = Client::connect(addr).await.unwrap();
    let text = second.load_snapshot("plane.bin").await.unwrap();
    assert!(text.starts_with("level0:\ncluster0:0\ncluster1:1\n"));
    assert!(text.contains("level3:\n"));
}

#[tokio::test]
async fn ingestion_failures_are_reported_and_session_survives() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;
    let mut client = Client::connect(addr).await.unwrap();

    for table in ["missing", "labels", "blank"] {
        match client.load_table(table).await {
            Err(ClientError::Refused(reason)) => assert!(reason.contains(table), "{reason}"),
            other => panic!("expected refusal for {table}, got {other:?}"),
        }
    }

    client.load_table("line").await.unwrap();
}

#[tokio::test]
async fn mine_before_load_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;
    let mut client = Client::connect(addr).await.unwrap();

    assert!(matches!(
        client.mine(2, 1, "never.bin").await,
        Err(ClientError::Refused(_))
    ));
    assert!(!dir.path().join("never.bin").exists());

    client.load_table("line").await.unwrap();
    assert!(client.mine(2, 2, "ok.bin").await.is_ok());
}

#[tokio::test]
async fn save_failure_still_returns_dendrogram() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;
    let mut client = Client::connect(addr).await.unwrap();

    client.load_table("line").await.unwrap();
    let mined = client.mine(2, 1, "no/such/dir/out.bin").await.unwrap();
    assert!(mined.dendrogram.starts_with("level0:"));
    assert!(mined.saved.is_err());

    // Session is still usable.
    client.load_table("plane").await.unwrap();
}

#[tokio::test]
async fn sessions_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), Some(4)).await;

    let mut a = Client::connect(addr).await.unwrap();
    let mut b = Client::connect(addr).await.unwrap();
    a.load_table("line").await.unwrap();

    // b never loaded a table, whatever a did.
    assert!(matches!(b.mine(2, 1, "b.bin").await, Err(ClientError::Refused(_))));
    assert!(a.mine(2, 1, "a.bin").await.is_ok());
}

#[tokio::test]
async fn broken_client_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());
    let addr = start_server(dir.path(), None).await;

    let mut bad = Client::connect(addr).await.unwrap();
    bad.send(Message::text("not an opcode")).await.unwrap();
    assert!(bad.receive().await.is_err());

    let mut good = Client::connect(addr).await.unwrap();
    good.load_table("line").await.unwrap();
}
