//! Nested scopes on the active tape.
//!
//! A nested scope records a checkpoint; leaving it discards every node made
//! since. Scopes are strictly LIFO. Handles created inside a scope must not
//! be used after it is left.
//!
//! ```
//! use numbat::nested::{self, NestedGuard};
//! use numbat::{Tape, TapeGuard, Var};
//! use num_traits::Float;
//!
//! let mut tape = Tape::<f64>::new();
//! let _guard = TapeGuard::new(&mut tape);
//! let x = Var::new(1.0);
//! let y = x.exp();
//! {
//!     let _scope = NestedGuard::<f64>::new();
//!     let z = Var::new(3.0);
//!     let w = z * z;
//!     assert_eq!(w.grad(&[z]), vec![6.0]);
//! }
//! assert_eq!(nested::nested_depth::<f64>(), 0);
//! assert_eq!(y.grad(&[x]), vec![1.0_f64.exp()]);
//! ```

use std::marker::PhantomData;

use crate::arena::Checkpoint;
use crate::error::Result;
use crate::tape::{self, Tape, TapeThreadLocal};

/// Open a nested scope on the active tape.
///
/// # Panics
///
/// Panics if no tape is active.
pub fn enter_nested<F: TapeThreadLocal>() -> Checkpoint {
    tape::with_active_tape(|t: &mut Tape<F>| t.start_nested())
}

/// Checked form of [`enter_nested`].
pub fn try_enter_nested<F: TapeThreadLocal>() -> Result<Checkpoint> {
    tape::try_with_active_tape(|t: &mut Tape<F>| t.start_nested())
}

/// Close the innermost nested scope and discard its nodes.
///
/// # Panics
///
/// Panics if no tape is active or no scope is open.
pub fn leave_nested_and_recover_memory<F: TapeThreadLocal>() {
    tape::with_active_tape(|t: &mut Tape<F>| t.recover_memory_nested());
}

/// Checked form of [`leave_nested_and_recover_memory`].
pub fn try_leave_nested_and_recover_memory<F: TapeThreadLocal>() -> Result<()> {
    tape::try_with_active_tape(|t: &mut Tape<F>| t.try_recover_memory_nested())?
}

/// Number of open nested scopes on the active tape (0 when none is active).
pub fn nested_depth<F: TapeThreadLocal>() -> usize {
    tape::try_with_active_tape(|t: &mut Tape<F>| t.nested_depth()).unwrap_or(0)
}

/// Clear the adjoints of the innermost scope's nodes.
pub fn set_zero_all_adjoints_nested<F: TapeThreadLocal>() {
    tape::with_active_tape(|t: &mut Tape<F>| t.zero_adjoints_nested());
}

/// Run the reverse sweep from `root` down to the innermost scope's start.
pub fn grad_nested<F: TapeThreadLocal>(root: crate::Var<F>) {
    tape::with_active_tape(|t: &mut Tape<F>| t.backprop_nested(root.index()));
}

/// RAII nested scope: entered on construction, left on drop.
///
/// Not `Send`: the scope belongs to the current thread's active tape.
pub struct NestedGuard<F: TapeThreadLocal> {
    checkpoint: Checkpoint,
    _not_send: PhantomData<*const F>,
}

impl<F: TapeThreadLocal> NestedGuard<F> {
    /// Enter a nested scope on the active tape.
    ///
    /// # Panics
    ///
    /// Panics if no tape is active.
    pub fn new() -> Self {
        NestedGuard {
            checkpoint: enter_nested::<F>(),
            _not_send: PhantomData,
        }
    }

    /// The checkpoint the scope rewinds to.
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }
}

impl<F: TapeThreadLocal> Default for NestedGuard<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: TapeThreadLocal> Drop for NestedGuard<F> {
    fn drop(&mut self) {
        // Rewinding to the scope's own checkpoint also pops scopes opened
        // inside it that were never closed. A tape swapped out underneath
        // the guard is left alone.
        let cp = self.checkpoint;
        let _ = tape::try_with_active_tape(|t: &mut Tape<F>| t.try_rewind_to(cp));
    }
}
