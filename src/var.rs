use std::fmt::{self, Display};

use crate::node::CONSTANT;
use crate::tape::{self, Tape, TapeThreadLocal};
use crate::Float;

/// Reverse-mode AD handle.
///
/// A node id plus a cached copy of the node's value: 12 bytes for `f64`.
/// `Copy` because the node lives on the thread-local tape, not inside this
/// struct; any number of handles may alias one node.
#[derive(Clone, Copy, Debug)]
pub struct Var<F: Float> {
    pub(crate) value: F,
    pub(crate) index: u32,
}

impl<F: Float> Var<F> {
    /// Create an untracked constant (no node on the tape).
    #[inline]
    pub fn constant(value: F) -> Self {
        Var {
            value,
            index: CONSTANT,
        }
    }

    /// Wrap an existing node id.
    /// Typically only used internally by the API layer and tests.
    #[inline]
    pub fn from_tape(value: F, index: u32) -> Self {
        Var { value, index }
    }

    /// The node id, or [`CONSTANT`] for an untracked constant.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// Whether this handle refers to no node.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.index == CONSTANT
    }
}

impl<F: Float + TapeThreadLocal> Var<F> {
    /// Lift `value` into a fresh leaf node on the active tape.
    ///
    /// # Panics
    ///
    /// Panics if no tape is active on this thread.
    #[inline]
    pub fn new(value: F) -> Self {
        let index = tape::with_active_tape(|t: &mut Tape<F>| t.new_variable(value).0);
        Var { value, index }
    }

    /// The adjoint currently accumulated on this handle's node.
    #[inline]
    pub fn adj(&self) -> F {
        tape::with_active_tape(|t: &mut Tape<F>| t.adjoint(self.index))
    }

    /// Gradient of `self` with respect to `inputs` on the active tape.
    pub fn grad(&self, inputs: &[Var<F>]) -> Vec<F> {
        tape::gradient(*self, inputs)
    }
}

impl<F: Float> Display for Var<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Default for Var<F> {
    fn default() -> Self {
        Var::constant(F::zero())
    }
}

/// Record a unary elemental on the active tape.
#[inline]
pub(crate) fn rev_unary<F: TapeThreadLocal>(x: Var<F>, value: F, partial: F) -> Var<F> {
    if x.is_constant() {
        return Var::constant(value);
    }
    let index = tape::with_active_tape(|t: &mut Tape<F>| t.push_unary(value, x.index, partial));
    Var { value, index }
}

/// Record a binary elemental on the active tape.
#[inline]
pub(crate) fn rev_binary<F: TapeThreadLocal>(x: Var<F>, y: Var<F>, value: F, dx: F, dy: F) -> Var<F> {
    if x.is_constant() && y.is_constant() {
        return Var::constant(value);
    }
    let index =
        tape::with_active_tape(|t: &mut Tape<F>| t.push_binary(value, x.index, dx, y.index, dy));
    Var { value, index }
}
