use crate::errors::{SearchError, SearchResult};
use crate::game::types::ACTION_COUNT;
use crate::game::{ActionSet, Direction};
use crate::search::adapter::GameAdapter;

/// Index of the root node in every tree's arena.
pub(crate) const ROOT: usize = 0;

/// One vertex of the search tree. The adapter, incoming action, terminal
/// flag and legal set are fixed at construction; only the search statistics
/// mutate afterwards.
pub(crate) struct Node {
    pub adapter: GameAdapter,
    pub parent: Option<usize>,
    pub action: Option<Direction>,
    pub is_terminal: bool,
    pub valid_actions: ActionSet,

    pub num_visits: u32,
    pub total_reward: f64,
    pub num_children_expanded: usize,
    /// Network priors for this node's children, indexed by action.
    pub priors: [f64; ACTION_COUNT],
    /// Child arena indices, one slot per action.
    pub children: [Option<usize>; ACTION_COUNT],
}

impl Node {
    fn new(adapter: GameAdapter, parent: Option<usize>, action: Option<Direction>) -> Node {
        let is_terminal = adapter.is_terminal();
        let valid_actions = adapter.valid_actions();
        Node {
            adapter,
            parent,
            action,
            is_terminal,
            valid_actions,
            num_visits: 0,
            total_reward: 0.0,
            num_children_expanded: 0,
            priors: [0.0; ACTION_COUNT],
            children: [None; ACTION_COUNT],
        }
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.num_children_expanded == self.valid_actions.len()
    }

    pub fn mean_reward(&self) -> f64 {
        if self.num_visits == 0 {
            0.0
        } else {
            self.total_reward / f64::from(self.num_visits)
        }
    }
}

/// An arena-allocated rooted tree. Nodes refer to each other by index, so
/// parent links cannot form ownership cycles and dropping the arena drops
/// the whole tree.
pub(crate) struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    pub fn new(root_adapter: GameAdapter) -> SearchTree {
        SearchTree {
            nodes: vec![Node::new(root_adapter, None, None)],
        }
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Expands the lowest-indexed legal action without a child and returns
    /// the new node's index. The tie-break by action index is contractual:
    /// it is what makes expansion order testable.
    pub fn expand(&mut self, index: usize) -> SearchResult<usize> {
        let (action, child_adapter) = {
            let node = &self.nodes[index];
            if node.is_terminal {
                return Err(SearchError::usage("expand called on a terminal node"));
            }
            let action = node
                .valid_actions
                .iter()
                .find(|d| node.children[d.index()].is_none())
                .ok_or_else(|| {
                    SearchError::usage("expand called on a fully expanded node")
                })?;
            let mut adapter = node.adapter.clone();
            adapter.execute(action)?;
            (action, adapter)
        };

        let child_index = self.nodes.len();
        self.nodes
            .push(Node::new(child_adapter, Some(index), Some(action)));
        let parent = &mut self.nodes[index];
        parent.children[action.index()] = Some(child_index);
        parent.num_children_expanded += 1;
        Ok(child_index)
    }

    /// Walks from `index` back to the root, crediting one visit and the
    /// reward (player-1 frame) to every node on the path.
    pub fn backpropagate(&mut self, index: usize, reward: f64) {
        let mut current = Some(index);
        while let Some(i) = current {
            let node = &mut self.nodes[i];
            node.num_visits += 1;
            node.total_reward += reward;
            current = node.parent;
        }
    }

    pub fn set_priors(&mut self, index: usize, priors: [f64; ACTION_COUNT]) {
        self.nodes[index].priors = priors;
    }

    /// Root-child visit counts, indexed by action; zero for unexpanded
    /// slots.
    pub fn root_visits(&self) -> [u32; ACTION_COUNT] {
        let root = &self.nodes[ROOT];
        let mut visits = [0u32; ACTION_COUNT];
        for d in Direction::ALL {
            if let Some(child) = root.children[d.index()] {
                visits[d.index()] = self.nodes[child].num_visits;
            }
        }
        visits
    }
}
