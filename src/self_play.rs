use std::rc::Rc;
use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::errors::SearchResult;
use crate::game::{SnakeBoard, ACTION_COUNT};
use crate::net::batcher::Batcher;
use crate::net::encoder::{encode_board, Features};
use crate::net::types::PolicyValueNet;
use crate::replay::{ReplaySink, StoreRequest};
use crate::search::adapter::GameAdapter;
use crate::search::mcts::Mcts;

// Hyperparameters
pub const SELF_PLAY_SIMULATIONS: usize = 50;
pub const GAMES_PER_SCHEDULER: usize = 256;
const MAX_PLIES: usize = 2048;

/// One decision's training example: the position the search saw and the
/// visit distribution it produced.
pub struct PlyRecord {
    pub features: Features,
    pub policy: [f32; ACTION_COUNT],
}

/// A finished game: per-ply records plus the terminal outcome in player 1's
/// frame, which becomes the value label for every ply.
pub struct GameRecord {
    pub id: Uuid,
    pub plies: Vec<PlyRecord>,
    pub outcome: f32,
}

impl GameRecord {
    pub fn to_store_request(&self) -> StoreRequest {
        StoreRequest {
            game_id: self.id,
            boards: self.plies.iter().map(|p| p.features.clone()).collect(),
            policy_labels: self.plies.iter().map(|p| p.policy).collect(),
            value_labels: vec![self.outcome; self.plies.len()],
        }
    }
}

/// Plays one game from the opening position: engine `a` answers player 1's
/// plies, engine `b` player 2's, both searching the same positions the
/// opponent just shaped.
pub async fn play_game(
    a: &mut Mcts,
    b: &mut Mcts,
    num_simulations: usize,
) -> SearchResult<GameRecord> {
    let mut adapter = GameAdapter::new(SnakeBoard::default());
    let mut plies = Vec::new();

    while !adapter.is_terminal() && plies.len() < MAX_PLIES {
        let features = encode_board(adapter.board());
        let action = a.search(adapter.clone(), num_simulations).await?;
        adapter.execute(action)?;
        if let Some(policy) = a.last_policy() {
            plies.push(PlyRecord { features, policy });
        }

        // Latching never ends the game, only the committing ply can.
        let features = encode_board(adapter.board());
        let action = b.search(adapter.clone(), num_simulations).await?;
        adapter.execute(action)?;
        if let Some(policy) = b.last_policy() {
            plies.push(PlyRecord { features, policy });
        }
    }

    let status = adapter.board().status();
    let outcome = match status.value() {
        Some(v) => f32::from(v),
        None => {
            log::warn!("game hit the {} ply cap, scoring as a draw", MAX_PLIES);
            0.0
        }
    };
    log::debug!("game over in {} plies: {:?}", plies.len(), status);

    Ok(GameRecord {
        id: Uuid::new_v4(),
        plies,
        outcome,
    })
}

/// One OS thread's worth of self-play: a single-threaded cooperative
/// scheduler multiplexing `games` search fibers over two batching
/// coordinators (one per engine seat, so both seats' leaf evaluations batch
/// independently), pushing finished trajectories into the sink.
///
/// Returns the number of games that completed and were stored.
pub fn run_scheduler(
    net: Arc<dyn PolicyValueNet>,
    sink: Arc<dyn ReplaySink>,
    games: usize,
    num_simulations: usize,
) -> std::io::Result<usize> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    let completed = local.block_on(&runtime, async move {
        let batcher_a = Rc::new(Batcher::new(net.clone()));
        let batcher_b = Rc::new(Batcher::new(net));

        let mut game_tasks = Vec::with_capacity(games);
        for game_index in 0..games {
            let (handle_a, handle_b) =
                match (batcher_a.new_handle(), batcher_b.new_handle()) {
                    (Ok(a), Ok(b)) => (a, b),
                    (Err(e), _) | (_, Err(e)) => {
                        log::error!("could not register game {}: {}", game_index, e);
                        continue;
                    }
                };
            let sink = sink.clone();
            game_tasks.push(tokio::task::spawn_local(async move {
                let mut a = Mcts::alphazero(handle_a);
                let mut b = Mcts::alphazero(handle_b);
                match play_game(&mut a, &mut b, num_simulations).await {
                    Ok(record) => {
                        let request = record.to_store_request();
                        if let Err(e) = sink.store(&request).await {
                            log::error!("storing game {} failed: {}", record.id, e);
                        }
                        1usize
                    }
                    Err(e) => {
                        // This game is abandoned; the rest keep playing.
                        log::error!("game {} abandoned: {}", game_index, e);
                        0usize
                    }
                }
            }));
        }

        let coordinator_a = {
            let batcher = batcher_a.clone();
            tokio::task::spawn_local(async move { batcher.run().await })
        };
        let coordinator_b = {
            let batcher = batcher_b.clone();
            tokio::task::spawn_local(async move { batcher.run().await })
        };

        let completed: usize = join_all(game_tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap_or(0))
            .sum();
        let _ = coordinator_a.await;
        let _ = coordinator_b.await;
        completed
    });

    Ok(completed)
}
