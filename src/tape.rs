//! Reverse-mode tape: recording, the backpropagation driver, and nested
//! scopes.
//!
//! A [`Tape`] owns an [`Arena`] of nodes plus a LIFO stack of nested-scope
//! checkpoints. Operators on [`Var`] reach the tape through a thread-local
//! pointer installed by [`TapeGuard`]; the tape itself is an ordinary value
//! owned by the caller, so its lifetime is visible at every call site.

use std::cell::Cell;

use crate::arena::{Arena, Checkpoint, SlotRange};
use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, CONSTANT};
use crate::var::Var;
use crate::Float;

/// Reverse-mode computation tape.
pub struct Tape<F: Float> {
    arena: Arena<F>,
    nested: Vec<Checkpoint>,
}

impl<F: Float> Default for Tape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> std::fmt::Debug for Tape<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tape")
            .field("nodes", &self.arena.len())
            .field("slots", &self.arena.num_slots())
            .field("nested_depth", &self.nested.len())
            .finish()
    }
}

impl<F: Float> Tape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Tape {
            arena: Arena::new(),
            nested: Vec::new(),
        }
    }

    /// Create a tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        Tape {
            arena: Arena::with_capacity(est_ops, est_ops * 2),
            nested: Vec::new(),
        }
    }

    /// Number of recorded nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of bundled operand slots in use.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.arena.num_slots()
    }

    /// Read-only access to the underlying arena.
    #[inline]
    pub fn arena(&self) -> &Arena<F> {
        &self.arena
    }

    /// Register a new independent variable. Returns `(node_id, value)`.
    #[inline]
    pub fn new_variable(&mut self, value: F) -> (u32, F) {
        (self.arena.alloc_node(Node::leaf(value)), value)
    }

    /// Record `value = f(operand)` with `partial = df/d(operand)`.
    ///
    /// A constant operand yields a constant result and records nothing.
    #[inline]
    pub fn push_unary(&mut self, value: F, operand: u32, partial: F) -> u32 {
        if operand == CONSTANT {
            return CONSTANT;
        }
        self.arena
            .alloc_node(Node::new(value, NodeKind::Unary { operand, partial }))
    }

    /// Record a binary operation with precomputed partial derivatives.
    ///
    /// Constant operands are dropped, so a binary op with one tracked operand
    /// records a unary node and one with none records nothing.
    #[inline]
    pub fn push_binary(&mut self, value: F, lhs: u32, lhs_partial: F, rhs: u32, rhs_partial: F) -> u32 {
        match (lhs == CONSTANT, rhs == CONSTANT) {
            (true, true) => CONSTANT,
            (false, true) => self.push_unary(value, lhs, lhs_partial),
            (true, false) => self.push_unary(value, rhs, rhs_partial),
            (false, false) => self.arena.alloc_node(Node::new(
                value,
                NodeKind::Binary {
                    lhs,
                    lhs_partial,
                    rhs,
                    rhs_partial,
                },
            )),
        }
    }

    /// Reserve `len` bundle slots: constant-sentinel operands, zero partials.
    #[inline]
    pub fn alloc_slots(&mut self, len: usize) -> SlotRange {
        self.arena.alloc_slots(len)
    }

    /// Operand ids and partials of a slot range.
    #[inline]
    pub fn slots(&self, range: SlotRange) -> (&[u32], &[F]) {
        self.arena.slots(range)
    }

    /// Mutable operand ids and partials of a slot range.
    #[inline]
    pub fn slots_mut(&mut self, range: SlotRange) -> (&mut [u32], &mut [F]) {
        self.arena.slots_mut(range)
    }

    /// Record one node over the operands and partials already written into
    /// `range`.
    ///
    /// `CONSTANT` operands are kept as placeholders and skipped during
    /// propagation. Returns `CONSTANT` when no operand is tracked; the slots
    /// then stay unreferenced until the next rewind.
    pub fn push_bundle(&mut self, value: F, range: SlotRange) -> u32 {
        if self.arena.slots(range).0.iter().all(|&op| op == CONSTANT) {
            return CONSTANT;
        }
        self.arena.alloc_node(Node::new(
            value,
            NodeKind::Bundle {
                start: range.start,
                len: range.len,
            },
        ))
    }

    /// Value stored at node `id`.
    #[inline]
    pub fn value(&self, id: u32) -> F {
        self.arena.node(id).value()
    }

    /// Adjoint accumulated at node `id`; zero for the constant sentinel.
    #[inline]
    pub fn adjoint(&self, id: u32) -> F {
        if id == CONSTANT {
            F::zero()
        } else {
            self.arena.node(id).adjoint()
        }
    }

    /// Overwrite the adjoint of node `id`.
    #[inline]
    pub fn set_adjoint(&mut self, id: u32, adjoint: F) {
        self.arena.node_mut(id).adjoint = adjoint;
    }

    // ── Backpropagation ──

    /// Run the reverse sweep from `root` over the whole tape.
    ///
    /// Interior adjoints on the swept range are cleared first and the root
    /// adjoint is incremented by one. Leaf adjoints are never cleared here, so
    /// a second call without [`zero_adjoints`](Self::zero_adjoints) doubles
    /// them.
    pub fn backprop(&mut self, root: u32) {
        self.backprop_from(root, Checkpoint::default());
    }

    /// Run the reverse sweep from `root` down to the innermost nested
    /// checkpoint (the whole tape when no scope is open).
    pub fn backprop_nested(&mut self, root: u32) {
        let cp = self.nested.last().copied().unwrap_or_default();
        self.backprop_from(root, cp);
    }

    /// Run the reverse sweep from `root`, visiting nodes `root, root-1, …,
    /// cp.nodes()` in strict reverse creation order.
    ///
    /// Nodes created before `cp` receive adjoint contributions but are not
    /// propagated further. A constant root is a no-op.
    pub fn backprop_from(&mut self, root: u32, cp: Checkpoint) {
        if root == CONSTANT {
            return;
        }
        let root_pos = root as usize;
        assert!(root_pos < self.arena.len(), "root node {root} is not on the tape");
        let start = cp.nodes().min(root_pos);

        self.arena.zero_interior(start..root_pos + 1);
        let node = self.arena.node_mut(root);
        node.adjoint = node.adjoint + F::one();

        for id in (start..=root_pos).rev() {
            self.arena.propagate(id as u32);
        }
    }

    /// Run a reverse sweep seeded with several `(node_id, weight)` pairs.
    ///
    /// Clears all adjoints first; returns nothing, read results with
    /// [`adjoint`](Self::adjoint).
    pub fn reverse_seeded(&mut self, seeds: &[(u32, F)]) {
        self.zero_adjoints();
        let mut top = None;
        for &(id, weight) in seeds {
            if id == CONSTANT {
                continue;
            }
            let node = self.arena.node_mut(id);
            node.adjoint = node.adjoint + weight;
            top = top.max(Some(id));
        }
        if let Some(top) = top {
            for id in (0..=top).rev() {
                self.arena.propagate(id);
            }
        }
    }

    /// Clear every adjoint on the tape.
    pub fn zero_adjoints(&mut self) {
        self.arena.zero_adjoints_from(0);
    }

    /// Clear the adjoints of nodes created in the innermost nested scope.
    pub fn zero_adjoints_nested(&mut self) {
        let from = self.nested.last().map_or(0, Checkpoint::nodes);
        self.arena.zero_adjoints_from(from);
    }

    /// Gradient of `root` with respect to `inputs`.
    ///
    /// Clears all adjoints, runs the driver once from `root`, and reads each
    /// input's adjoint. Constant inputs get a zero gradient.
    pub fn gradient(&mut self, root: Var<F>, inputs: &[Var<F>]) -> Vec<F> {
        self.zero_adjoints();
        self.backprop(root.index());
        inputs.iter().map(|x| self.adjoint(x.index())).collect()
    }

    // ── Memory and nested scopes ──

    /// Current extent of the tape.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        self.arena.checkpoint()
    }

    /// Discard all nodes recorded after `cp`, popping any nested scope opened
    /// after it.
    ///
    /// # Panics
    ///
    /// Panics if `cp` is ahead of the tape.
    pub fn rewind_to(&mut self, cp: Checkpoint) {
        if let Err(e) = self.try_rewind_to(cp) {
            panic!("{e}");
        }
    }

    /// Checked form of [`rewind_to`](Self::rewind_to).
    pub fn try_rewind_to(&mut self, cp: Checkpoint) -> Result<()> {
        if !self.arena.contains(cp) {
            return Err(Error::StaleCheckpoint {
                checkpoint: cp.nodes(),
                len: self.arena.len(),
            });
        }
        while self.nested.last().is_some_and(|top| *top >= cp) {
            self.nested.pop();
        }
        self.arena.rewind_to(cp);
        Ok(())
    }

    /// Discard everything, including open nested scopes. Keeps capacity.
    pub fn reset(&mut self) {
        self.nested.clear();
        self.arena.reset();
    }

    /// Open a nested scope at the current extent.
    pub fn start_nested(&mut self) -> Checkpoint {
        let cp = self.arena.checkpoint();
        self.nested.push(cp);
        cp
    }

    /// Close the innermost nested scope and discard everything recorded in it.
    ///
    /// # Panics
    ///
    /// Panics if no nested scope is open.
    pub fn recover_memory_nested(&mut self) {
        if let Err(e) = self.try_recover_memory_nested() {
            panic!("{e}");
        }
    }

    /// Checked form of [`recover_memory_nested`](Self::recover_memory_nested).
    pub fn try_recover_memory_nested(&mut self) -> Result<()> {
        let cp = self.nested.pop().ok_or(Error::NoNestedScope)?;
        self.arena.rewind_to(cp);
        Ok(())
    }

    /// Number of open nested scopes.
    #[inline]
    pub fn nested_depth(&self) -> usize {
        self.nested.len()
    }

    /// One line per node (`id value adjoint kind`), for debugging.
    pub fn nodes_debug(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (i, node) in self.arena.nodes().iter().enumerate() {
            let _ = writeln!(
                out,
                "{i:>6}  val={:<14} adj={:<14} {:?}",
                node.value(),
                node.adjoint(),
                node.kind()
            );
        }
        out
    }
}

// Thread-local active tape pointer.
thread_local! {
    static TAPE_F32: Cell<*mut Tape<f32>> = const { Cell::new(std::ptr::null_mut()) };
    static TAPE_F64: Cell<*mut Tape<f64>> = const { Cell::new(std::ptr::null_mut()) };
}

/// Trait to select the correct thread-local for a given float type.
pub trait TapeThreadLocal: Float {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Tape<Self>>>;
}

impl TapeThreadLocal for f32 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Tape<Self>>> {
        &TAPE_F32
    }
}

impl TapeThreadLocal for f64 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Tape<Self>>> {
        &TAPE_F64
    }
}

/// Whether a tape is active for `F` on the current thread.
#[inline]
pub fn has_active_tape<F: TapeThreadLocal>() -> bool {
    F::cell().with(|cell| !cell.get().is_null())
}

/// Access the active tape for the current thread. Panics if no tape is active.
///
/// The closure must not record operations itself (no `Var` arithmetic inside).
#[inline]
pub fn with_active_tape<F: TapeThreadLocal, R>(f: impl FnOnce(&mut Tape<F>) -> R) -> R {
    match try_with_active_tape(f) {
        Ok(r) => r,
        Err(e) => panic!("{e}"),
    }
}

/// Checked form of [`with_active_tape`].
#[inline]
pub fn try_with_active_tape<F: TapeThreadLocal, R>(f: impl FnOnce(&mut Tape<F>) -> R) -> Result<R> {
    F::cell().with(|cell| {
        let ptr = cell.get();
        if ptr.is_null() {
            return Err(Error::NoActiveTape);
        }
        // SAFETY: TapeGuard keeps the pointer valid while it is installed, and
        // the thread-local confines access to one thread. Callers of this
        // function never hold the reference beyond the closure.
        let tape = unsafe { &mut *ptr };
        Ok(f(tape))
    })
}

/// RAII guard that sets a tape as the thread-local active tape and restores
/// the previous one on drop.
///
/// While the guard is alive, reach the tape through [`with_active_tape`] or
/// the free functions in [`nested`](crate::nested), not through the original
/// `&mut Tape` binding.
pub struct TapeGuard<F: TapeThreadLocal> {
    prev: *mut Tape<F>,
}

impl<F: TapeThreadLocal> TapeGuard<F> {
    /// Activate `tape` as the thread-local tape. Returns a guard that restores
    /// the previous tape on drop.
    pub fn new(tape: &mut Tape<F>) -> Self {
        let prev = F::cell().with(|cell| {
            let prev = cell.get();
            cell.set(tape as *mut Tape<F>);
            prev
        });
        TapeGuard { prev }
    }
}

impl<F: TapeThreadLocal> Drop for TapeGuard<F> {
    fn drop(&mut self) {
        F::cell().with(|cell| {
            cell.set(self.prev);
        });
    }
}

/// Gradient of `root` with respect to `inputs` on the active tape.
///
/// ```
/// use numbat::{gradient, Tape, TapeGuard, Var};
/// use num_traits::Float;
///
/// let mut tape = Tape::<f64>::new();
/// let _guard = TapeGuard::new(&mut tape);
/// let x = Var::new(2.0);
/// let y = Var::new(3.0);
/// let f = x * y + x.sin();
/// let g = gradient(f, &[x, y]);
/// assert!((g[0] - (3.0 + 2.0_f64.cos())).abs() < 1e-12);
/// assert!((g[1] - 2.0).abs() < 1e-12);
/// ```
pub fn gradient<F: TapeThreadLocal>(root: Var<F>, inputs: &[Var<F>]) -> Vec<F> {
    with_active_tape(|t: &mut Tape<F>| t.gradient(root, inputs))
}

/// Clear every adjoint on the active tape.
pub fn set_zero_all_adjoints<F: TapeThreadLocal>() {
    with_active_tape(|t: &mut Tape<F>| t.zero_adjoints());
}

/// Discard everything on the active tape (once per sampler iteration).
pub fn recover_memory<F: TapeThreadLocal>() {
    with_active_tape(|t: &mut Tape<F>| t.reset());
}
