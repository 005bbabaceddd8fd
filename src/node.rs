//! Tape node records.
//!
//! A node stores its computed value, its adjoint accumulator, and the local
//! partial derivatives with respect to its operands. The node kinds form a
//! closed set so the reverse sweep dispatches with a single `match`; nothing
//! about a node changes after it is recorded except its adjoint.

use crate::Float;

/// Sentinel operand id for an untracked constant (no node on the tape).
///
/// Operand slots holding `CONSTANT` are skipped during propagation.
pub const CONSTANT: u32 = u32::MAX;

/// The operand/partials layout of a recorded node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind<F> {
    /// Independent variable or lifted constant: no operands.
    Leaf,
    /// One operand with partial `d(self)/d(operand)`.
    Unary { operand: u32, partial: F },
    /// Two operands with their partials.
    Binary {
        lhs: u32,
        lhs_partial: F,
        rhs: u32,
        rhs_partial: F,
    },
    /// Operands and partials stored in the arena slot range
    /// `[start, start + len)`, written by a
    /// [`PartialsCollector`](crate::partials::PartialsCollector).
    Bundle { start: u32, len: u32 },
}

/// A single recorded operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node<F> {
    pub(crate) value: F,
    pub(crate) adjoint: F,
    pub(crate) kind: NodeKind<F>,
}

impl<F: Float> Node<F> {
    /// A leaf node holding `value`.
    #[inline]
    pub fn leaf(value: F) -> Self {
        Node {
            value,
            adjoint: F::zero(),
            kind: NodeKind::Leaf,
        }
    }

    /// A node with the given operand layout and a zero adjoint.
    #[inline]
    pub fn new(value: F, kind: NodeKind<F>) -> Self {
        Node {
            value,
            adjoint: F::zero(),
            kind,
        }
    }

    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    #[inline]
    pub fn adjoint(&self) -> F {
        self.adjoint
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind<F> {
        &self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    /// Number of operand slots this node refers to.
    pub fn arity(&self) -> usize {
        match self.kind {
            NodeKind::Leaf => 0,
            NodeKind::Unary { .. } => 1,
            NodeKind::Binary { .. } => 2,
            NodeKind::Bundle { len, .. } => len as usize,
        }
    }
}
