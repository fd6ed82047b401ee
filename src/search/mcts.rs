use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Dirichlet, Distribution};

use crate::errors::{SearchError, SearchResult};
use crate::game::{ActionSet, Direction, ACTION_COUNT};
use crate::net::batcher::EvalHandle;
use crate::search::adapter::GameAdapter;
use crate::search::evaluator::{LeafEvaluator, NetworkEvaluator, RolloutEvaluator};
use crate::search::tree::{Node, SearchTree, ROOT};

// Hyperparameters
const UCB_EXPLORATION_CONSTANT: f64 = 2.0;
const PUCT_INIT: f64 = 1.25;
const PUCT_BASE: f64 = 19652.0;
const ROOT_DIRICHLET_ALPHA: f64 = 0.3;
const ROOT_DIRICHLET_EPS: f64 = 0.25;
const DEFAULT_BASE_SEED: u64 = 0x5EED_C0DE;

/// How children are scored during selection.
#[derive(Clone, Copy, Debug)]
pub enum ScorePolicy {
    /// Plain UCB1. No priors involved.
    Ucb { exploration: f64 },
    /// AlphaZero PUCT over network priors, with Dirichlet noise mixed into
    /// the root priors once per search.
    Puct { init: f64, base: f64 },
}

impl ScorePolicy {
    pub fn ucb() -> ScorePolicy {
        ScorePolicy::Ucb {
            exploration: UCB_EXPLORATION_CONSTANT,
        }
    }

    pub fn alphazero() -> ScorePolicy {
        ScorePolicy::Puct {
            init: PUCT_INIT,
            base: PUCT_BASE,
        }
    }

    fn needs_priors(self) -> bool {
        matches!(self, ScorePolicy::Puct { .. })
    }

    /// Rewards are kept in player 1's frame throughout the tree. The sign
    /// of the ply owner stored in the child turns every level into a
    /// maximization from its own perspective; dropping it would silently
    /// bias the search.
    fn score(self, parent: &Node, child: &Node, action: Direction) -> f64 {
        if child.num_visits == 0 {
            // Only reachable when a dropped simulation left an expanded
            // child behind; visit it before anything scored.
            return f64::INFINITY;
        }
        let perspective = f64::from(child.adapter.player());
        let child_visits = f64::from(child.num_visits);
        match self {
            ScorePolicy::Ucb { exploration } => {
                (child.total_reward / child_visits) * perspective
                    + exploration
                        * (2.0 * f64::from(parent.num_visits).ln() / child_visits).sqrt()
            }
            ScorePolicy::Puct { init, base } => {
                let parent_visits = f64::from(parent.num_visits);
                let pb_c = (((parent_visits + base + 1.0) / base).ln() + init)
                    * parent_visits.sqrt()
                    / (child_visits + 1.0);
                pb_c * parent.priors[action.index()] + child.mean_reward() * perspective
            }
        }
    }
}

/// The MCTS engine. One engine drives one search fiber: it owns its leaf
/// evaluator (random rollout or batched network client) and builds a fresh
/// tree per decision.
pub struct Mcts {
    policy: ScorePolicy,
    evaluator: Box<dyn LeafEvaluator>,
    rng: StdRng,
    last_policy: Option<[f32; ACTION_COUNT]>,
}

impl Mcts {
    pub fn new(policy: ScorePolicy, evaluator: Box<dyn LeafEvaluator>) -> Mcts {
        Mcts::with_seed(policy, evaluator, DEFAULT_BASE_SEED)
    }

    pub fn with_seed(policy: ScorePolicy, evaluator: Box<dyn LeafEvaluator>, seed: u64) -> Mcts {
        Mcts {
            policy,
            evaluator,
            rng: StdRng::seed_from_u64(seed),
            last_policy: None,
        }
    }

    /// Plain MCTS: UCB selection over random rollouts. Self-contained, no
    /// coordinator required.
    pub fn rollout(seed: u64) -> Mcts {
        Mcts::with_seed(
            ScorePolicy::ucb(),
            Box::new(RolloutEvaluator::new(seed)),
            seed,
        )
    }

    /// AlphaZero-style MCTS: PUCT selection over batched network
    /// evaluations through `handle`.
    pub fn alphazero(handle: EvalHandle) -> Mcts {
        Mcts::new(
            ScorePolicy::alphazero(),
            Box::new(NetworkEvaluator::new(handle)),
        )
    }

    /// The root visit distribution of the last completed search, normalized
    /// to a probability over actions. This is the policy label self-play
    /// hands to the replay sink.
    pub fn last_policy(&self) -> Option<[f32; ACTION_COUNT]> {
        self.last_policy
    }

    /// Runs `num_simulations` simulations from `root` and returns the
    /// action whose root child collected the most visits (ties to the
    /// lowest action index).
    pub async fn search(
        &mut self,
        root: GameAdapter,
        num_simulations: usize,
    ) -> SearchResult<Direction> {
        let mut tree = SearchTree::new(root);
        self.run(&mut tree, num_simulations).await
    }

    pub(crate) async fn run(
        &mut self,
        tree: &mut SearchTree,
        num_simulations: usize,
    ) -> SearchResult<Direction> {
        self.last_policy = None;
        if tree.node(ROOT).is_terminal {
            return Err(SearchError::usage("search started on a terminal position"));
        }

        if self.policy.needs_priors() {
            self.evaluate_root(tree).await?;
            self.apply_root_noise(tree);
        }

        let mut completed: usize = 0;
        for simulation in 0..num_simulations {
            match self.simulate(tree).await {
                Ok(()) => completed += 1,
                Err(e) if e.is_transient() => {
                    log::debug!("simulation {} dropped: {}", simulation, e);
                }
                Err(e) => return Err(e),
            }
        }
        if completed == 0 {
            return Err(SearchError::unavailable(
                "every simulation of this decision was dropped",
            ));
        }

        let visits = tree.root_visits();
        let action = best_visited_action(&visits)?;

        let total: f32 = visits.iter().map(|v| *v as f32).sum();
        let mut policy = [0.0f32; ACTION_COUNT];
        for (slot, v) in visits.iter().enumerate() {
            policy[slot] = *v as f32 / total;
        }
        self.last_policy = Some(policy);

        Ok(action)
    }

    /// One simulation: select a leaf, evaluate it, credit the path.
    async fn simulate(&mut self, tree: &mut SearchTree) -> SearchResult<()> {
        let leaf = self.select(tree)?;
        let reward = if tree.node(leaf).is_terminal {
            // Terminal leaves are their own evaluation; no network call.
            tree.node(leaf).adapter.value()?
        } else {
            let evaluation = self.evaluator.evaluate(&tree.node(leaf).adapter).await?;
            if let Some(policy) = evaluation.policy {
                let priors = masked_priors(policy, tree.node(leaf).valid_actions);
                tree.set_priors(leaf, priors);
            }
            evaluation.value
        };
        tree.backpropagate(leaf, reward);
        Ok(())
    }

    /// Descends through fully expanded nodes by score; the first node with
    /// an unexpanded legal action is expanded and its new child returned;
    /// terminal nodes are the leaf.
    fn select(&self, tree: &mut SearchTree) -> SearchResult<usize> {
        let mut index = ROOT;
        loop {
            if tree.node(index).is_terminal {
                return Ok(index);
            }
            if !tree.node(index).is_fully_expanded() {
                return tree.expand(index);
            }
            index = self
                .best_child(tree, index)
                .ok_or_else(|| SearchError::usage("fully expanded node without children"))?;
        }
    }

    fn best_child(&self, tree: &SearchTree, index: usize) -> Option<usize> {
        let parent = tree.node(index);
        let mut best: Option<(usize, f64)> = None;
        for d in Direction::ALL {
            if let Some(child_index) = parent.children[d.index()] {
                let score = self.policy.score(parent, tree.node(child_index), d);
                // Strictly-greater keeps the lowest action index on ties.
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((child_index, score));
                }
            }
        }
        best.map(|(i, _)| i)
    }

    /// Evaluates the root once so PUCT has priors to select with. A
    /// transient failure falls back to uniform priors rather than wasting
    /// the decision.
    async fn evaluate_root(&mut self, tree: &mut SearchTree) -> SearchResult<()> {
        let legal = tree.node(ROOT).valid_actions;
        let priors = match self.evaluator.evaluate(&tree.node(ROOT).adapter).await {
            Ok(evaluation) => match evaluation.policy {
                Some(policy) => masked_priors(policy, legal),
                None => uniform_priors(legal),
            },
            Err(e) if e.is_transient() => {
                log::debug!("root evaluation dropped, using uniform priors: {}", e);
                uniform_priors(legal)
            }
            Err(e) => return Err(e),
        };
        tree.set_priors(ROOT, priors);
        Ok(())
    }

    /// Mixes Dirichlet noise into the root priors, once per search.
    fn apply_root_noise(&mut self, tree: &mut SearchTree) {
        let legal = tree.node(ROOT).valid_actions;
        let k = legal.len();
        if k < 2 {
            return;
        }
        let Ok(dirichlet) = Dirichlet::new_with_size(ROOT_DIRICHLET_ALPHA, k) else {
            return;
        };
        let noise = dirichlet.sample(&mut self.rng);
        let root = tree.node_mut(ROOT);
        for (slot, d) in legal.iter().enumerate() {
            let prior = root.priors[d.index()];
            root.priors[d.index()] =
                prior * (1.0 - ROOT_DIRICHLET_EPS) + noise[slot] * ROOT_DIRICHLET_EPS;
        }
    }
}

/// Argmax over visited actions, ties to the lowest action index.
fn best_visited_action(visits: &[u32; ACTION_COUNT]) -> SearchResult<Direction> {
    let mut best: Option<(Direction, u32)> = None;
    for d in Direction::ALL {
        let v = visits[d.index()];
        if v == 0 {
            continue;
        }
        if best.map_or(true, |(_, bv)| v > bv) {
            best = Some((d, v));
        }
    }
    best.map(|(d, _)| d)
        .ok_or_else(|| SearchError::usage("no root child was visited"))
}

/// Restricts a policy to the legal actions and renormalizes; a degenerate
/// policy falls back to uniform.
fn masked_priors(policy: [f64; ACTION_COUNT], legal: ActionSet) -> [f64; ACTION_COUNT] {
    let mut priors = [0.0; ACTION_COUNT];
    let mut total = 0.0;
    for d in legal.iter() {
        let p = policy[d.index()].max(0.0);
        priors[d.index()] = p;
        total += p;
    }
    if total <= 0.0 {
        return uniform_priors(legal);
    }
    for p in priors.iter_mut() {
        *p /= total;
    }
    priors
}

fn uniform_priors(legal: ActionSet) -> [f64; ACTION_COUNT] {
    let mut priors = [0.0; ACTION_COUNT];
    let p = 1.0 / legal.len() as f64;
    for d in legal.iter() {
        priors[d.index()] = p;
    }
    priors
}
