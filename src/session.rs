use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{error, info, info_span, Instrument};

use crate::bet::Bet;
use crate::codec::{
    self, write_tag_frame, write_winner_frame, FrameTag,
};
use crate::config::Config;
use crate::coordinator::NotificationSet;
use crate::draw::has_won;
use crate::error::ServerError;
use crate::store::FileBetStore;

/// Runs one connection to completion: handshake, then a loop over typed
/// frames dispatching to batch processing, the end signal, or a winners
/// request. Every error kind is caught here — the single close-and-log
/// point — and never propagates to the supervisor.
pub async fn handle_session(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    store: Arc<FileBetStore>,
    coordinator: Arc<NotificationSet>,
    config: Arc<Config>,
) {
    let span = info_span!("session", peer = %peer_addr);
    async move {
        let result = run(&mut stream, &store, &coordinator, &config).await;
        match result {
            Ok(bets_processed) => {
                info!(action = "client_disconnected", result = "success", bets_processed, "session ended");
            }
            Err(e) => {
                error!(action = "handle_client_connection", result = "fail", error = %e, kind = e.kind(), "session ended");
            }
        }
    }
    .instrument(span)
    .await;
}

async fn run(
    stream: &mut TcpStream,
    store: &FileBetStore,
    coordinator: &NotificationSet,
    config: &Config,
) -> Result<u64, ServerError> {
    let agency_id = read_handshake(stream).await?;
    let mut bets_processed: u64 = 0;

    loop {
        match codec::read_frame_tag(stream).await? {
            FrameTag::Bet => {
                let bets = read_batch(stream, agency_id, config.max_batch_bytes).await?;
                store.append(&bets).await?;
                bets_processed += bets.len() as u64;
                codec::write_confirmation(stream).await?;
            }
            FrameTag::End => {
                coordinator.mark(agency_id);
                return Ok(bets_processed);
            }
            FrameTag::Winners => {
                if coordinator.all_received() {
                    answer_winners(stream, store, agency_id).await?;
                }
                return Ok(bets_processed);
            }
            FrameTag::Winner => {
                return Err(ServerError::Protocol(
                    "WINNER frame is server-to-client only".into(),
                ));
            }
        }
    }
}

async fn read_handshake(stream: &mut TcpStream) -> Result<u32, ServerError> {
    let line = codec::read_line_until(stream, b'\n').await?;
    line.trim()
        .parse()
        .map_err(|_| ServerError::Protocol(format!("malformed handshake: {line:?}")))
}

/// Reads the 4-byte batch length, then exactly that many bytes of payload,
/// and parses every `<len:1><record>` item packed back to back. Enforces
/// the configured maximum batch length before reading the payload.
async fn read_batch(
    stream: &mut TcpStream,
    agency_id: u32,
    max_batch_bytes: u32,
) -> Result<Vec<Bet>, ServerError> {
    let batch_len = codec::read_u32_be(stream).await?;
    if batch_len > max_batch_bytes {
        return Err(ServerError::Protocol(format!(
            "batch length {batch_len} exceeds bound {max_batch_bytes}"
        )));
    }

    let payload = codec::read_exact(stream, batch_len as usize).await?;
    parse_batch_payload(&payload, agency_id)
}

fn parse_batch_payload(payload: &[u8], agency_id: u32) -> Result<Vec<Bet>, ServerError> {
    let mut bets = Vec::new();
    let mut i = 0usize;
    while i < payload.len() {
        let record_len = payload[i] as usize;
        let start = i + 1;
        let end = start + record_len;
        if end > payload.len() {
            return Err(ServerError::Parse(
                "declared record length exceeds remaining batch bytes".into(),
            ));
        }
        let text = std::str::from_utf8(&payload[start..end])
            .map_err(|e| ServerError::Parse(format!("invalid utf-8 in record: {e}")))?;
        let record = format!("{agency_id};{text}");
        bets.push(Bet::parse(&record)?);
        i = end;
    }
    Ok(bets)
}

/// Scans the store and streams back every winning bet belonging to
/// `agency_id`, terminated by an END frame.
async fn answer_winners(
    stream: &mut TcpStream,
    store: &FileBetStore,
    agency_id: u32,
) -> Result<(), ServerError> {
    let all_bets = store.scan().await?;
    for bet in all_bets.iter().filter(|b| b.agency == agency_id && has_won(b)) {
        write_winner_frame(stream, &bet.to_winner_record()).await?;
    }
    write_tag_frame(stream, FrameTag::End).await
}
