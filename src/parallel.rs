//! Batched gradients across rayon's thread pool.
//!
//! Every evaluation records on its own tape, installed on the worker thread
//! that runs it, so no tape is ever shared between threads.

use rayon::prelude::*;

use crate::float::Float;
use crate::tape::TapeThreadLocal;
use crate::var::Var;

/// Gradient of `f` at every point of `xs`, in parallel.
pub fn grad_batch_par<F, Func>(f: Func, xs: &[Vec<F>]) -> Vec<Vec<F>>
where
    F: Float + TapeThreadLocal,
    Func: Fn(&[Var<F>]) -> Var<F> + Sync,
{
    xs.par_iter().map(|x| crate::api::grad(&f, x)).collect()
}

/// Value and gradient of `f` at every point of `xs`, in parallel.
pub fn value_and_grad_batch_par<F, Func>(f: Func, xs: &[Vec<F>]) -> Vec<(F, Vec<F>)>
where
    F: Float + TapeThreadLocal,
    Func: Fn(&[Var<F>]) -> Var<F> + Sync,
{
    xs.par_iter()
        .map(|x| crate::api::value_and_grad(&f, x))
        .collect()
}
