//! Loopback end-to-end scenarios against a real `Supervisor`.

use std::path::PathBuf;
use std::time::Duration;

use lottery_server::{Config, Supervisor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_store_path(tag: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "lottery-e2e-{tag}-{}-{}.csv",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    p
}

struct RunningServer {
    port: u16,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    store_path: PathBuf,
}

impl RunningServer {
    async fn start(port: u16, required_agencies: u32, store_path: PathBuf) -> Self {
        let cfg = Config {
            port,
            listen_backlog: 64,
            required_agencies,
            store_path: store_path.clone(),
            max_batch_bytes: 8192,
        };
        let supervisor = Supervisor::bind(cfg).await.expect("bind");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            supervisor
                .run(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            store_path,
        }
    }

    async fn connect(&self) -> TcpStream {
        TcpStream::connect(("127.0.0.1", self.port)).await.unwrap()
    }

    async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap();
        }
        let _ = tokio::fs::remove_file(&self.store_path).await;
    }
}

fn encode_batch(records: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    for record in records {
        payload.push(record.len() as u8);
        payload.extend_from_slice(record.as_bytes());
    }
    let mut framed = Vec::new();
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(&payload);
    framed
}

async fn handshake(stream: &mut TcpStream, agency_id: u32) {
    stream
        .write_all(format!("{agency_id}\n").as_bytes())
        .await
        .unwrap();
}

async fn send_batch(stream: &mut TcpStream, records: &[&str]) {
    stream.write_all(&[0u8]).await.unwrap(); // BET tag
    stream.write_all(&encode_batch(records)).await.unwrap();
    let mut ack = [0u8; 2];
    stream.read_exact(&mut ack).await.unwrap();
    assert_eq!(&ack, b"OK");
}

async fn send_end(stream: &mut TcpStream) {
    stream.write_all(&[1u8]).await.unwrap(); // END tag
}

async fn request_winners(stream: &mut TcpStream) -> Vec<String> {
    stream.write_all(&[2u8]).await.unwrap(); // WINNERS tag
    let mut winners = Vec::new();
    loop {
        let mut tag = [0u8; 1];
        if stream.read_exact(&mut tag).await.is_err() {
            break;
        }
        match tag[0] {
            3 => {
                let mut len = [0u8; 1];
                stream.read_exact(&mut len).await.unwrap();
                let mut buf = vec![0u8; len[0] as usize];
                stream.read_exact(&mut buf).await.unwrap();
                winners.push(String::from_utf8(buf).unwrap());
            }
            1 => break, // END
            other => panic!("unexpected tag {other}"),
        }
    }
    winners
}

#[tokio::test]
async fn single_agency_single_batch_barrier_unmet() {
    let server = RunningServer::start(19401, 5, test_store_path("single-agency")).await;

    let mut stream = server.connect().await;
    handshake(&mut stream, 1).await;
    send_batch(&mut stream, &["Ana;Gomez;40000001;2000-01-02;1234"]).await;

    let winners = request_winners(&mut stream).await;
    assert!(winners.is_empty(), "barrier unmet: no winners should stream");

    // The session should simply close without a WINNER or END frame.
    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "server must close the socket without responding");

    server.shutdown().await;
}

#[tokio::test]
async fn five_agencies_barrier_met_one_winner() {
    let store_path = test_store_path("five-agencies");
    let server = RunningServer::start(19402, 5, store_path).await;

    for agency in 1..=5u32 {
        let number = if agency == 3 { 7574 } else { 9999 };
        let record = format!("X;Y;4000000{agency};2000-01-0{agency};{number}");
        let mut stream = server.connect().await;
        handshake(&mut stream, agency).await;
        send_batch(&mut stream, &[&record]).await;
        send_end(&mut stream).await;
        drop(stream);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for agency in 1..=5u32 {
        let mut stream = server.connect().await;
        handshake(&mut stream, agency).await;
        let winners = request_winners(&mut stream).await;
        if agency == 3 {
            assert_eq!(winners, vec!["3;X;Y;40000003;2000-01-03;7574".to_string()]);
        } else {
            assert!(winners.is_empty());
        }
    }

    server.shutdown().await;
}

#[tokio::test]
async fn malformed_batch_closes_session_and_leaves_store_untouched() {
    let store_path = test_store_path("malformed-batch");
    let server = RunningServer::start(19403, 5, store_path.clone()).await;

    let mut stream = server.connect().await;
    handshake(&mut stream, 2).await;

    // Declared batch length 10, but the one inner record claims length 20 —
    // far more bytes than the 9 remaining in the batch.
    stream.write_all(&[0u8]).await.unwrap(); // BET tag
    stream.write_all(&10u32.to_be_bytes()).await.unwrap();
    let mut bogus_payload = vec![20u8];
    bogus_payload.extend_from_slice(b"short");
    bogus_payload.resize(10, 0);
    stream.write_all(&bogus_payload).await.unwrap();

    // No OK should ever arrive; the server closes the connection instead,
    // so read_exact fails with UnexpectedEof rather than returning data.
    let mut buf = [0u8; 2];
    let result = stream.read_exact(&mut buf).await;
    assert!(result.is_err());

    assert!(
        !store_path.exists() || tokio::fs::read_to_string(&store_path).await.unwrap().is_empty(),
        "store must be unchanged after a malformed batch"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn winners_request_before_any_end_is_refused_silently() {
    let server = RunningServer::start(19404, 1, test_store_path("refuse")).await;

    let mut stream = server.connect().await;
    handshake(&mut stream, 1).await;
    let winners = request_winners(&mut stream).await;
    assert!(winners.is_empty());

    server.shutdown().await;
}
