use std::cell::{Cell, RefCell};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::oneshot;

use crate::errors::{NetError, SearchError, SearchResult};
use crate::net::encoder::Features;
use crate::net::types::{PolicyValueNet, Prediction};

/// One evaluation request paired with its single-use reply slot. The
/// requesting fiber owns the receiving end, the coordinator the sending end.
struct EvalRequest {
    features: Features,
    reply: oneshot::Sender<SearchResult<Prediction>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatcherPhase {
    /// Handles may be created; the coordinator has not started.
    Accepting,
    /// The coordinator is sweeping; the handle set is frozen.
    Draining,
    /// Every handle has closed and the coordinator has exited.
    Closed,
}

/// The per-search evaluator client. Each search fiber owns exactly one
/// handle; dropping it closes the fiber's channel and the coordinator
/// forgets it on the next sweep.
pub struct EvalHandle {
    tx: mpsc::Sender<EvalRequest>,
}

impl EvalHandle {
    /// Requests one policy/value prediction. Looks synchronous to the
    /// caller but suspends the fiber until the coordinator delivers the
    /// reply. Fails `EvaluatorClosed` if the channel closes first.
    pub async fn evaluate(&self, features: Features) -> SearchResult<Prediction> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EvalRequest {
                features,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SearchError::EvaluatorClosed)?;
        reply_rx.await.map_err(|_| SearchError::EvaluatorClosed)?
    }
}

/// The batching coordinator. Drains evaluation requests from every live
/// search fiber on its thread, forms one batch per sweep, invokes the shared
/// network once, and fulfills each reply slot.
///
/// Single-threaded by design: one coordinator runs per scheduler thread, so
/// interior mutability is `Cell`/`RefCell`, never a lock. A sweep attempts
/// one non-blocking receive per channel, which bounds any fiber to one slot
/// per batch and keeps a chatty search from starving the rest. An empty
/// sweep yields the scheduler: suspended producers become runnable exactly
/// when they are inserting an item, so one yield between sweeps is enough.
pub struct Batcher {
    net: Arc<dyn PolicyValueNet>,
    phase: Cell<BatcherPhase>,
    receivers: RefCell<Vec<mpsc::Receiver<EvalRequest>>>,
}

impl Batcher {
    pub fn new(net: Arc<dyn PolicyValueNet>) -> Batcher {
        Batcher {
            net,
            phase: Cell::new(BatcherPhase::Accepting),
            receivers: RefCell::new(Vec::new()),
        }
    }

    pub fn phase(&self) -> BatcherPhase {
        self.phase.get()
    }

    /// Creates the evaluator client for one search fiber. Only legal before
    /// the coordinator starts.
    pub fn new_handle(&self) -> SearchResult<EvalHandle> {
        if self.phase.get() != BatcherPhase::Accepting {
            return Err(SearchError::usage(
                "new_handle is only valid while the coordinator is accepting",
            ));
        }
        // Capacity 1 keeps the rendezvous discipline: a fiber has at most
        // one outstanding request, and a sweep takes at most one item.
        let (tx, rx) = mpsc::channel(1);
        self.receivers.borrow_mut().push(rx);
        Ok(EvalHandle { tx })
    }

    /// Closes every registered channel. Pending and future `evaluate` calls
    /// fail `EvaluatorClosed`; a subsequent `run` drains whatever was
    /// already enqueued and exits.
    pub fn shutdown(&self) {
        if self.phase.get() == BatcherPhase::Accepting {
            self.phase.set(BatcherPhase::Draining);
        }
        for rx in self.receivers.borrow_mut().iter_mut() {
            rx.close();
        }
    }

    /// The coordinator loop. Runs until every handle has closed.
    pub async fn run(&self) {
        self.phase.set(BatcherPhase::Draining);
        let mut receivers: Vec<mpsc::Receiver<EvalRequest>> =
            self.receivers.borrow_mut().drain(..).collect();
        let mut batches: usize = 0;

        loop {
            let mut batch = Vec::new();
            let mut open = Vec::with_capacity(receivers.len());
            for mut rx in receivers {
                match rx.try_recv() {
                    Ok(request) => {
                        batch.push(request);
                        open.push(rx);
                    }
                    Err(TryRecvError::Empty) => open.push(rx),
                    Err(TryRecvError::Disconnected) => {}
                }
            }
            receivers = open;

            if batch.is_empty() {
                if receivers.is_empty() {
                    break;
                }
                tokio::task::yield_now().await;
                continue;
            }

            batches += 1;
            self.predict_and_deliver(batch);
        }

        self.phase.set(BatcherPhase::Closed);
        log::debug!("batching coordinator closed after {} batches", batches);
    }

    fn predict_and_deliver(&self, batch: Vec<EvalRequest>) {
        let mut inputs = Vec::with_capacity(batch.len());
        let mut replies = Vec::with_capacity(batch.len());
        for request in batch {
            inputs.push(request.features);
            replies.push(request.reply);
        }

        let result = self.net.predict_batch(&inputs).and_then(|predictions| {
            if predictions.len() == inputs.len() {
                Ok(predictions)
            } else {
                Err(NetError::SizeMismatch {
                    sent: inputs.len(),
                    received: predictions.len(),
                })
            }
        });

        match result {
            Ok(predictions) => {
                for (reply, prediction) in replies.into_iter().zip(predictions) {
                    let _ = reply.send(Ok(prediction));
                }
            }
            Err(e) => {
                // Recoverable from the coordinator's perspective: every
                // waiter in this batch is told, the loop carries on.
                log::warn!("evaluator failed for a batch of {}: {}", inputs.len(), e);
                for reply in replies {
                    let _ = reply.send(Err(SearchError::from(e.clone())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::errors::NetResult;
    use crate::game::types::ACTION_COUNT;

    /// Records which fiber (encoded in the first feature) appeared in each
    /// batch, then answers uniformly.
    struct RecordingNet {
        batches: Mutex<Vec<Vec<u32>>>,
    }

    impl RecordingNet {
        fn new() -> Arc<RecordingNet> {
            Arc::new(RecordingNet {
                batches: Mutex::new(Vec::new()),
            })
        }
    }

    impl PolicyValueNet for RecordingNet {
        fn predict_batch(&self, batch: &[Features]) -> NetResult<Vec<Prediction>> {
            let ids: Vec<u32> = batch.iter().map(|f| f.0[0] as u32).collect();
            self.batches.lock().unwrap().push(ids);
            Ok(batch
                .iter()
                .map(|_| Prediction {
                    policy: [0.25; ACTION_COUNT],
                    value: 0.0,
                })
                .collect())
        }
    }

    /// Fails the first batch, answers afterwards.
    struct FlakyNet {
        failed_once: AtomicBool,
    }

    impl PolicyValueNet for FlakyNet {
        fn predict_batch(&self, batch: &[Features]) -> NetResult<Vec<Prediction>> {
            if !self.failed_once.swap(true, Ordering::Relaxed) {
                return Err(crate::errors::NetError::Inference("backend gone".into()));
            }
            Ok(batch
                .iter()
                .map(|_| Prediction {
                    policy: [0.25; ACTION_COUNT],
                    value: 0.5,
                })
                .collect())
        }
    }

    fn tagged(id: u32) -> Features {
        let mut f = Features::zeroed();
        f.0[0] = id as f32;
        f
    }

    #[tokio::test]
    async fn test_two_fibers_one_coordinator_batches_of_two() {
        let net = RecordingNet::new();
        let batcher = Rc::new(Batcher::new(net.clone()));
        let rounds = 5;

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut fibers = Vec::new();
                for id in 0..2u32 {
                    let handle = batcher.new_handle().unwrap();
                    fibers.push(tokio::task::spawn_local(async move {
                        for _ in 0..rounds {
                            handle.evaluate(tagged(id)).await.unwrap();
                        }
                    }));
                }
                let coordinator = {
                    let batcher = batcher.clone();
                    tokio::task::spawn_local(async move { batcher.run().await })
                };
                for fiber in fibers {
                    fiber.await.unwrap();
                }
                coordinator.await.unwrap();
            })
            .await;

        assert_eq!(batcher.phase(), BatcherPhase::Closed);
        let batches = net.batches.lock().unwrap();
        assert_eq!(batches.len(), rounds);
        for batch in batches.iter() {
            assert_eq!(batch.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_shutdown_fails_evaluate_and_exits_cleanly() {
        let net = RecordingNet::new();
        let batcher = Rc::new(Batcher::new(net.clone()));
        let handle = batcher.new_handle().unwrap();

        batcher.shutdown();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let fiber = tokio::task::spawn_local(async move {
                    handle.evaluate(tagged(0)).await
                });
                let coordinator = {
                    let batcher = batcher.clone();
                    tokio::task::spawn_local(async move { batcher.run().await })
                };
                assert_eq!(fiber.await.unwrap(), Err(SearchError::EvaluatorClosed));
                coordinator.await.unwrap();
            })
            .await;

        assert_eq!(batcher.phase(), BatcherPhase::Closed);
        assert!(net.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_enqueued_before_shutdown_is_still_answered() {
        let net = RecordingNet::new();
        let batcher = Rc::new(Batcher::new(net.clone()));
        let handle = batcher.new_handle().unwrap();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let fiber =
                    tokio::task::spawn_local(
                        async move { handle.evaluate(tagged(7)).await },
                    );
                // Let the fiber enqueue, then close the channel under it.
                tokio::task::yield_now().await;
                batcher.shutdown();
                batcher.run().await;
                assert!(fiber.await.unwrap().is_ok());
            })
            .await;

        assert_eq!(net.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_handle_after_run_is_a_usage_error() {
        let batcher = Batcher::new(RecordingNet::new());
        batcher.run().await;
        assert_eq!(batcher.phase(), BatcherPhase::Closed);
        assert!(matches!(
            batcher.new_handle(),
            Err(SearchError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_new_handle_after_shutdown_is_a_usage_error() {
        let batcher = Batcher::new(RecordingNet::new());
        let _handle = batcher.new_handle().unwrap();
        batcher.shutdown();
        assert!(matches!(
            batcher.new_handle(),
            Err(SearchError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_evaluator_failure_drops_batch_and_recovers() {
        let net = Arc::new(FlakyNet {
            failed_once: AtomicBool::new(false),
        });
        let batcher = Rc::new(Batcher::new(net));

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let handle = batcher.new_handle().unwrap();
                let fiber = tokio::task::spawn_local(async move {
                    let first = handle.evaluate(tagged(0)).await;
                    assert!(matches!(
                        first,
                        Err(SearchError::EvaluatorUnavailable(_))
                    ));
                    // The coordinator survived; a retry goes through.
                    handle.evaluate(tagged(0)).await.unwrap()
                });
                let coordinator = {
                    let batcher = batcher.clone();
                    tokio::task::spawn_local(async move { batcher.run().await })
                };
                let prediction = fiber.await.unwrap();
                assert_eq!(prediction.value, 0.5);
                coordinator.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_hundred_fibers_fair_batching() {
        let net = RecordingNet::new();
        let batcher = Rc::new(Batcher::new(net.clone()));
        let fibers = 100u32;
        let burst = 3;

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut tasks = Vec::new();
                for id in 0..fibers {
                    let handle = batcher.new_handle().unwrap();
                    tasks.push(tokio::task::spawn_local(async move {
                        let mut delivered = 0usize;
                        for _ in 0..burst {
                            handle.evaluate(tagged(id)).await.unwrap();
                            delivered += 1;
                        }
                        delivered
                    }));
                }
                let coordinator = {
                    let batcher = batcher.clone();
                    tokio::task::spawn_local(async move { batcher.run().await })
                };
                let mut delivered = 0usize;
                for task in tasks {
                    delivered += task.await.unwrap();
                }
                coordinator.await.unwrap();
                // Batching safety: every request got exactly one reply.
                assert_eq!(delivered, fibers as usize * burst);
            })
            .await;

        let batches = net.batches.lock().unwrap();
        let mut seen = vec![0u32; fibers as usize];
        for batch in batches.iter() {
            // Fairness: one slot per fiber per sweep.
            let mut in_batch = vec![false; fibers as usize];
            for &id in batch {
                assert!(!in_batch[id as usize], "fiber {} twice in one batch", id);
                in_batch[id as usize] = true;
                seen[id as usize] += 1;
            }
        }
        // Every fiber appears in some batch, exactly burst times overall.
        for (id, &count) in seen.iter().enumerate() {
            assert_eq!(count, burst as u32, "fiber {} starved", id);
        }
    }
}
