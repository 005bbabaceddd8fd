//! Index-based arena backing the reverse-mode tape.
//!
//! Nodes live in one growable array and the operand/partials buffers of
//! bundled nodes live in two parallel slot arrays. A node id is its position
//! in the node array, so "pointers" are plain `u32` indices and rewinding a
//! nested scope is a truncation back to a saved [`Checkpoint`]. Individual
//! allocations are never freed.

use crate::node::{Node, NodeKind, CONSTANT};
use crate::Float;

/// Saved arena extent, used to discard everything allocated after it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint {
    pub(crate) nodes: u32,
    pub(crate) slots: u32,
}

impl Checkpoint {
    /// Number of nodes that existed when the checkpoint was taken.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.nodes as usize
    }

    /// Number of operand slots that existed when the checkpoint was taken.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots as usize
    }
}

/// A contiguous range of operand/partials slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRange {
    pub start: u32,
    pub len: u32,
}

impl SlotRange {
    #[inline]
    fn span(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// Bump-style storage for tape nodes and bundled partials.
pub struct Arena<F: Float> {
    nodes: Vec<Node<F>>,
    operands: Vec<u32>,
    partials: Vec<F>,
}

impl<F: Float> Default for Arena<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Arena<F> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Arena {
            nodes: Vec::new(),
            operands: Vec::new(),
            partials: Vec::new(),
        }
    }

    /// Create an arena with room for `nodes` nodes and `slots` bundled slots.
    pub fn with_capacity(nodes: usize, slots: usize) -> Self {
        Arena {
            nodes: Vec::with_capacity(nodes),
            operands: Vec::with_capacity(slots),
            partials: Vec::with_capacity(slots),
        }
    }

    /// Number of nodes currently allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of bundled operand slots currently allocated.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.operands.len()
    }

    /// Store `node` and return its id.
    ///
    /// Operand ids must refer to nodes that already exist; this keeps reverse
    /// creation order a valid reverse-topological order.
    #[inline]
    pub fn alloc_node(&mut self, node: Node<F>) -> u32 {
        let id = self.nodes.len() as u32;
        debug_assert!(id != CONSTANT, "tape node id space exhausted");
        debug_assert!(self.operands_precede(&node, id), "node refers forward");
        self.nodes.push(node);
        id
    }

    /// Reserve `len` operand/partials slots, initialized to the constant
    /// sentinel and zero.
    #[inline]
    pub fn alloc_slots(&mut self, len: usize) -> SlotRange {
        let start = self.operands.len() as u32;
        self.operands.resize(self.operands.len() + len, CONSTANT);
        self.partials.resize(self.partials.len() + len, F::zero());
        SlotRange {
            start,
            len: len as u32,
        }
    }

    /// Operand ids and partials of a slot range.
    #[inline]
    pub fn slots(&self, range: SlotRange) -> (&[u32], &[F]) {
        (&self.operands[range.span()], &self.partials[range.span()])
    }

    /// Mutable operand ids and partials of a slot range.
    #[inline]
    pub fn slots_mut(&mut self, range: SlotRange) -> (&mut [u32], &mut [F]) {
        let span = range.span();
        (&mut self.operands[span.clone()], &mut self.partials[span])
    }

    #[inline]
    pub fn node(&self, id: u32) -> &Node<F> {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, id: u32) -> &mut Node<F> {
        &mut self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    /// Current extent of the arena.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len() as u32,
            slots: self.operands.len() as u32,
        }
    }

    /// Whether `cp` lies within the current extent.
    #[inline]
    pub fn contains(&self, cp: Checkpoint) -> bool {
        cp.nodes() <= self.nodes.len() && cp.slots() <= self.operands.len()
    }

    /// Discard every node and slot allocated after `cp`.
    ///
    /// # Panics
    ///
    /// Panics if `cp` is ahead of the arena (it was taken in a scope that has
    /// already been rewound).
    pub fn rewind_to(&mut self, cp: Checkpoint) {
        assert!(
            self.contains(cp),
            "checkpoint ({} nodes) is ahead of the arena ({} nodes)",
            cp.nodes(),
            self.nodes.len()
        );
        self.nodes.truncate(cp.nodes());
        self.operands.truncate(cp.slots());
        self.partials.truncate(cp.slots());
    }

    /// Discard everything, keeping capacity.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.operands.clear();
        self.partials.clear();
    }

    /// Set every adjoint in `[from, len)` to zero.
    pub fn zero_adjoints_from(&mut self, from: usize) {
        for node in &mut self.nodes[from..] {
            node.adjoint = F::zero();
        }
    }

    /// Set the adjoints of interior (non-leaf) nodes in `range` to zero.
    pub(crate) fn zero_interior(&mut self, range: std::ops::Range<usize>) {
        for node in &mut self.nodes[range] {
            if !node.is_leaf() {
                node.adjoint = F::zero();
            }
        }
    }

    /// Push the adjoint of node `id` onto its operands:
    /// `operand.adjoint += adjoint * partial` for every tracked operand.
    #[inline]
    pub fn propagate(&mut self, id: u32) {
        let Node { adjoint, kind, .. } = self.nodes[id as usize];
        if adjoint == F::zero() {
            return;
        }
        match kind {
            NodeKind::Leaf => {}
            NodeKind::Unary { operand, partial } => {
                self.accumulate(operand, adjoint * partial);
            }
            NodeKind::Binary {
                lhs,
                lhs_partial,
                rhs,
                rhs_partial,
            } => {
                self.accumulate(lhs, adjoint * lhs_partial);
                self.accumulate(rhs, adjoint * rhs_partial);
            }
            NodeKind::Bundle { start, len } => {
                for j in start as usize..(start + len) as usize {
                    let operand = self.operands[j];
                    let contribution = adjoint * self.partials[j];
                    self.accumulate(operand, contribution);
                }
            }
        }
    }

    #[inline]
    fn accumulate(&mut self, operand: u32, contribution: F) {
        if operand != CONSTANT {
            let node = &mut self.nodes[operand as usize];
            node.adjoint = node.adjoint + contribution;
        }
    }

    fn operands_precede(&self, node: &Node<F>, id: u32) -> bool {
        let ok = |op: u32| op == CONSTANT || op < id;
        match node.kind {
            NodeKind::Leaf => true,
            NodeKind::Unary { operand, .. } => ok(operand),
            NodeKind::Binary { lhs, rhs, .. } => ok(lhs) && ok(rhs),
            NodeKind::Bundle { start, len } => {
                let range = SlotRange { start, len };
                self.operands[range.span()].iter().all(|&op| ok(op))
            }
        }
    }
}
