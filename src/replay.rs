use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::errors::SinkResult;
use crate::game::ACTION_COUNT;
use crate::net::encoder::Features;

/// The replay-store wire format: three parallel tensors over the plies of
/// one game, plus an id the remote buffer can deduplicate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRequest {
    pub game_id: Uuid,
    pub boards: Vec<Features>,
    pub policy_labels: Vec<[f32; ACTION_COUNT]>,
    pub value_labels: Vec<f32>,
}

impl StoreRequest {
    /// The three tensors must stay positionally aligned.
    pub fn is_consistent(&self) -> bool {
        self.boards.len() == self.policy_labels.len()
            && self.boards.len() == self.value_labels.len()
    }
}

/// Where finished trajectories go. Every store is independent and
/// idempotent with respect to duplicate game ids.
#[async_trait]
pub trait ReplaySink: Send + Sync {
    async fn store(&self, request: &StoreRequest) -> SinkResult<()>;
}

/// Collects trajectories in memory. Test and single-process use.
#[derive(Default)]
pub struct MemorySink {
    games: Mutex<Vec<StoreRequest>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    pub fn len(&self) -> usize {
        self.games.lock().expect("sink lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<StoreRequest> {
        self.games.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl ReplaySink for MemorySink {
    async fn store(&self, request: &StoreRequest) -> SinkResult<()> {
        let mut games = self.games.lock().expect("sink lock");
        if games.iter().any(|g| g.game_id == request.game_id) {
            return Ok(());
        }
        games.push(request.clone());
        Ok(())
    }
}

/// Ships each trajectory to a remote replay buffer as one JSON line over a
/// fresh TCP connection. Connections are per-store: trajectory writes are
/// independent, so there is no connection state to share across fibers.
pub struct TcpSink {
    endpoint: String,
}

impl TcpSink {
    pub fn new(endpoint: impl Into<String>) -> TcpSink {
        TcpSink {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ReplaySink for TcpSink {
    async fn store(&self, request: &StoreRequest) -> SinkResult<()> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        let mut stream = TcpStream::connect(&self.endpoint).await?;
        stream.write_all(&line).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

/// Logs and drops. Used when no replay endpoint is configured.
pub struct DiscardSink;

#[async_trait]
impl ReplaySink for DiscardSink {
    async fn store(&self, request: &StoreRequest) -> SinkResult<()> {
        log::debug!(
            "discarding trajectory {} ({} plies)",
            request.game_id,
            request.boards.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    fn sample_request() -> StoreRequest {
        StoreRequest {
            game_id: Uuid::new_v4(),
            boards: vec![Features::zeroed(), Features::zeroed()],
            policy_labels: vec![[0.25; ACTION_COUNT], [0.5, 0.5, 0.0, 0.0]],
            value_labels: vec![1.0, 1.0],
        }
    }

    #[tokio::test]
    async fn test_memory_sink_deduplicates_by_game_id() {
        let sink = MemorySink::new();
        let request = sample_request();
        sink.store(&request).await.unwrap();
        sink.store(&request).await.unwrap();
        assert_eq!(sink.len(), 1);

        sink.store(&sample_request()).await.unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_store_request_consistency() {
        let mut request = sample_request();
        assert!(request.is_consistent());
        request.value_labels.pop();
        assert!(!request.is_consistent());
    }

    #[tokio::test]
    async fn test_tcp_sink_writes_one_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = Vec::new();
            socket.read_to_end(&mut buffer).await.unwrap();
            buffer
        });

        let request = sample_request();
        TcpSink::new(endpoint).store(&request).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(*received.last().unwrap(), b'\n');
        let decoded: StoreRequest = serde_json::from_slice(&received).unwrap();
        assert_eq!(decoded.game_id, request.game_id);
        assert_eq!(decoded.value_labels, request.value_labels);
    }
}
