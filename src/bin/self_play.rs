use std::sync::Arc;
use std::thread;

use clap::Parser;

use snakezero::replay::{DiscardSink, ReplaySink, TcpSink};
use snakezero::self_play::{run_scheduler, GAMES_PER_SCHEDULER, SELF_PLAY_SIMULATIONS};
use snakezero::{PolicyValueNet, UniformNet};

/// Self-play driver: every worker thread runs its own cooperative scheduler
/// full of paired searches over a shared network.
#[derive(Parser, Debug)]
#[command(name = "self_play", version)]
struct Args {
    /// Replay buffer endpoint (host:port). Trajectories are discarded when
    /// absent.
    #[arg(long)]
    replay_buffer: Option<String>,

    /// Number of OS worker threads.
    #[arg(long, default_value_t = 8)]
    threads: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    // The real accelerator-backed model is loaded out of process; the
    // uniform stand-in keeps the pipeline runnable without it.
    let net: Arc<dyn PolicyValueNet> = Arc::new(UniformNet);
    let sink: Arc<dyn ReplaySink> = match &args.replay_buffer {
        Some(endpoint) => {
            log::info!("storing trajectories to {}", endpoint);
            Arc::new(TcpSink::new(endpoint.clone()))
        }
        None => {
            log::warn!("no --replay-buffer given, trajectories will be discarded");
            Arc::new(DiscardSink)
        }
    };

    let mut workers = Vec::with_capacity(args.threads);
    for thread_index in 0..args.threads {
        let net = net.clone();
        let sink = sink.clone();
        let worker = thread::Builder::new()
            .name(format!("self-play-{}", thread_index))
            .spawn(move || run_scheduler(net, sink, GAMES_PER_SCHEDULER, SELF_PLAY_SIMULATIONS))
            .expect("spawning a worker thread");
        workers.push(worker);
    }

    let mut completed = 0;
    let mut failed = false;
    for worker in workers {
        match worker.join() {
            Ok(Ok(games)) => completed += games,
            Ok(Err(e)) => {
                log::error!("scheduler failed: {}", e);
                failed = true;
            }
            Err(_) => {
                log::error!("worker thread panicked");
                failed = true;
            }
        }
    }

    log::info!("self-play finished, {} games completed", completed);
    if failed {
        std::process::exit(1);
    }
}
