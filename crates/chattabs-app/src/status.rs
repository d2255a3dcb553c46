//! Game connection status
//!
//! The backend reports the timestamp of the last captured game packet. A
//! background task polls it and feeds the result into the engine loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chattabs_core::prelude::*;

use crate::backend::ChatBackend;
use crate::message::Message;

/// Latest known connection state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// Unix milliseconds of the last captured packet, once known
    pub last_packet_timestamp: Option<i64>,
    pub game_version: Option<String>,
}

impl ConnectionStatus {
    /// Whether a packet arrived within `stale_after_ms` of `now_ms`
    pub fn is_live(&self, now_ms: i64, stale_after_ms: i64) -> bool {
        match self.last_packet_timestamp {
            Some(ts) if ts > 0 => now_ms.saturating_sub(ts) < stale_after_ms,
            _ => false,
        }
    }
}

/// Poll `get_last_packet_timestamp` every `interval` until shutdown.
///
/// Results are sent as [`Message::LastPacketTimestamp`]; failures as
/// [`Message::StatusPollFailed`]. The task exits when the engine's message
/// channel closes.
pub fn spawn_status_poller<B>(
    backend: Arc<B>,
    interval: Duration,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    B: ChatBackend + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let msg = match backend.get_last_packet_timestamp().await {
                        Ok(ts) => Message::LastPacketTimestamp(ts),
                        Err(e) => Message::StatusPollFailed(e.to_string()),
                    };
                    if msg_tx.send(msg).await.is_err() {
                        debug!("Status poller: engine channel closed");
                        break;
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        debug!("Status poller: shutdown");
                        break;
                    }
                }
            }
        }
    })
}
