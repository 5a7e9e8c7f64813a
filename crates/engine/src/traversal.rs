//! Node visiting order for a single run.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use nodes::{FlowNode, NodeOutcome};

use crate::models::Workflow;

/// How the engine picks the next node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Every node once, in declaration order.  Edges and decision outcomes
    /// are ignored.
    #[default]
    Declaration,
    /// Topological order along edges.  A node runs once all of its incoming
    /// edges are settled and at least one of them was taken.  A decision node
    /// only takes the edges labelled with its result (and any unlabelled
    /// ones); nodes left with no taken incoming edge are skipped.  Each node
    /// runs at most once.
    Graph,
}

impl std::str::FromStr for TraversalMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declaration" => Ok(Self::Declaration),
            "graph" => Ok(Self::Graph),
            other => Err(format!("unknown traversal mode: {other}")),
        }
    }
}

/// Cursor over the nodes of one validated workflow.
pub(crate) struct Traversal<'a> {
    workflow: &'a Workflow,
    state: State<'a>,
}

enum State<'a> {
    Declaration { next: usize },
    Graph(GraphWalk<'a>),
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(workflow: &'a Workflow, mode: TraversalMode) -> Self {
        let state = match mode {
            TraversalMode::Declaration => State::Declaration { next: 0 },
            TraversalMode::Graph => State::Graph(GraphWalk::new(workflow)),
        };
        Self { workflow, state }
    }

    /// The next node to run, or `None` when the run is complete.
    pub(crate) fn next_node(&mut self) -> Option<&'a FlowNode> {
        let workflow = self.workflow;
        match &mut self.state {
            State::Declaration { next } => {
                let node = workflow.nodes.get(*next)?;
                *next += 1;
                Some(node)
            }
            State::Graph(walk) => walk.next().map(|idx| &workflow.nodes[idx]),
        }
    }

    /// Tell the cursor how `node` finished so it can release its successors.
    pub(crate) fn complete(&mut self, node: &'a FlowNode, outcome: NodeOutcome) {
        if let State::Graph(walk) = &mut self.state {
            walk.complete(node, outcome);
        }
    }

    /// Ids of nodes never handed out.  Always empty in declaration mode once
    /// the cursor is exhausted.
    pub(crate) fn skipped(&self) -> Vec<&'a str> {
        let nodes = &self.workflow.nodes;
        match &self.state {
            State::Declaration { next } => nodes[(*next).min(nodes.len())..]
                .iter()
                .map(|n| n.id.as_str())
                .collect(),
            State::Graph(walk) => nodes
                .iter()
                .zip(&walk.slots)
                .filter(|(_, slot)| **slot != Slot::Done)
                .map(|(n, _)| n.id.as_str())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph walk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Some incoming edges are still unsettled.
    Waiting,
    Queued,
    Done,
    /// Every incoming edge settled and none was taken.
    Skipped,
}

/// Kahn's algorithm over node indices, with branch pruning.
///
/// Every edge is settled exactly once: taken when its source completes and
/// follows it, not taken when its source skips it or is itself skipped.  A
/// cycle stalls the queue; it is broken by releasing the first declared
/// waiting node that already has a taken incoming edge, or failing that the
/// first declared node of a region no entry node can reach.
struct GraphWalk<'a> {
    workflow: &'a Workflow,
    index: HashMap<&'a str, usize>,
    successors: Vec<Vec<usize>>,
    slots: Vec<Slot>,
    /// Unsettled incoming edges per node.
    remaining: Vec<usize>,
    /// Whether any incoming edge was taken.
    reached: Vec<bool>,
    /// Reachable along any edges from a node the walk started from.
    rooted: Vec<bool>,
    queue: VecDeque<usize>,
}

impl<'a> GraphWalk<'a> {
    fn new(workflow: &'a Workflow) -> Self {
        let count = workflow.nodes.len();
        let index: HashMap<&str, usize> = workflow
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut successors = vec![Vec::new(); count];
        let mut remaining = vec![0; count];
        for edge in &workflow.edges {
            if let (Some(&from), Some(&to)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
                successors[from].push(to);
                remaining[to] += 1;
            }
        }

        let mut walk = Self {
            workflow,
            index,
            successors,
            slots: vec![Slot::Waiting; count],
            remaining,
            reached: vec![false; count],
            rooted: vec![false; count],
            queue: VecDeque::new(),
        };

        // Seed the queue with nodes that have no incoming edges.
        for idx in 0..count {
            if walk.remaining[idx] == 0 {
                walk.release(idx);
            }
        }
        walk
    }

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(idx) = self.queue.pop_front() {
                self.slots[idx] = Slot::Done;
                return Some(idx);
            }
            let seed = self.cycle_entry()?;
            self.release(seed);
        }
    }

    fn complete(&mut self, node: &FlowNode, outcome: NodeOutcome) {
        let workflow = self.workflow;
        for edge in workflow.outgoing(&node.id) {
            let taken = match (outcome, edge.branch_label()) {
                (NodeOutcome::Branch(branch), Some(label)) => branch == label,
                _ => true,
            };
            if let Some(&target) = self.index.get(edge.target.as_str()) {
                self.settle(target, taken);
            }
        }
    }

    /// Queue `idx` regardless of its unsettled edges and mark everything
    /// downstream of it as rooted.
    fn release(&mut self, idx: usize) {
        self.slots[idx] = Slot::Queued;
        self.reached[idx] = true;
        self.queue.push_back(idx);

        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if std::mem::replace(&mut self.rooted[i], true) {
                continue;
            }
            stack.extend(self.successors[i].iter().copied());
        }
    }

    /// Settle one incoming edge of `target`; skipping a node settles its
    /// outgoing edges as not taken.
    fn settle(&mut self, target: usize, taken: bool) {
        let mut pending = vec![(target, taken)];
        while let Some((idx, taken)) = pending.pop() {
            if self.slots[idx] != Slot::Waiting {
                continue;
            }
            self.remaining[idx] = self.remaining[idx].saturating_sub(1);
            self.reached[idx] |= taken;
            if self.remaining[idx] > 0 {
                continue;
            }

            if self.reached[idx] {
                self.slots[idx] = Slot::Queued;
                self.queue.push_back(idx);
            } else {
                self.slots[idx] = Slot::Skipped;
                pending.extend(self.successors[idx].iter().map(|&next| (next, false)));
            }
        }
    }

    fn cycle_entry(&self) -> Option<usize> {
        let waiting = |i: &usize| self.slots[*i] == Slot::Waiting;
        (0..self.slots.len())
            .filter(waiting)
            .find(|&i| self.reached[i])
            .or_else(|| (0..self.slots.len()).filter(waiting).find(|&i| !self.rooted[i]))
    }
}
