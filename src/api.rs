//! Closure-based derivative functionals.
//!
//! Each function records on a private tape (installed for the duration of
//! the call) or runs pure forward sweeps, and leaves no state behind.
//! Second- and third-order functionals take closures over the nested AD type
//! they need; write the model once as `fn f<T: Scalar>(x: &[T]) -> T` and
//! pass `|x| f(x)` to any of them.

use crate::dual::Dual;
use crate::float::Float;
use crate::nested::NestedGuard;
use crate::tape::{self, Tape, TapeGuard, TapeThreadLocal};
use crate::var::Var;

/// Register `x` as leaves on `tape`, before the tape is activated.
fn register<F: Float>(tape: &mut Tape<F>, x: &[F]) -> Vec<Var<F>> {
    x.iter()
        .map(|&val| {
            let (idx, v) = tape.new_variable(val);
            Var::from_tape(v, idx)
        })
        .collect()
}

#[inline]
fn unit<F: Float>(i: usize, j: usize) -> F {
    if i == j {
        F::one()
    } else {
        F::zero()
    }
}

// ══════════════════════════════════════════════
//  First order
// ══════════════════════════════════════════════

/// Compute the gradient of a scalar function `f : R^n → R` using reverse mode.
///
/// ```
/// let g = numbat::grad(|x: &[numbat::Var<f64>]| {
///     x[0] * x[0] + x[1] * x[1]
/// }, &[3.0, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn grad<F: Float + TapeThreadLocal>(f: impl FnOnce(&[Var<F>]) -> Var<F>, x: &[F]) -> Vec<F> {
    value_and_grad(f, x).1
}

/// Value and gradient of `f` at `x` in one reverse sweep.
pub fn value_and_grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Var<F>,
    x: &[F],
) -> (F, Vec<F>) {
    let mut tape = Tape::with_capacity(x.len() * 10);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    let output = f(&inputs);
    (output.value(), tape::gradient(output, &inputs))
}

/// Value and gradient by `n` forward sweeps, one per input.
pub fn gradient_fwd<F: Float>(f: impl Fn(&[Dual<F>]) -> Dual<F>, x: &[F]) -> (F, Vec<F>) {
    let n = x.len();
    if n == 0 {
        return (f(&[]).re, Vec::new());
    }
    let mut value = F::zero();
    let mut grad = vec![F::zero(); n];
    for (i, g) in grad.iter_mut().enumerate() {
        let inputs: Vec<Dual<F>> = x
            .iter()
            .enumerate()
            .map(|(k, &xk)| Dual::new(xk, unit(i, k)))
            .collect();
        let out = f(&inputs);
        value = out.re;
        *g = out.eps;
    }
    (value, grad)
}

/// Value and derivative of a univariate function (forward mode).
///
/// ```
/// use numbat::Dual64;
/// use num_traits::Float;
///
/// let (v, d) = numbat::derivative(|x: Dual64| x.sin() * x, 1.0);
/// assert!((v - 1.0_f64.sin()).abs() < 1e-15);
/// assert!((d - (1.0_f64.cos() + 1.0_f64.sin())).abs() < 1e-15);
/// ```
pub fn derivative<F: Float>(f: impl FnOnce(Dual<F>) -> Dual<F>, x: F) -> (F, F) {
    let out = f(Dual::variable(x));
    (out.re, out.eps)
}

/// Value and `∂f/∂x_n` by one forward sweep.
pub fn partial_derivative<F: Float>(
    f: impl FnOnce(&[Dual<F>]) -> Dual<F>,
    x: &[F],
    n: usize,
) -> (F, F) {
    assert!(n < x.len(), "partial index {n} out of range for {} inputs", x.len());
    let inputs: Vec<Dual<F>> = x
        .iter()
        .enumerate()
        .map(|(k, &xk)| Dual::new(xk, unit(n, k)))
        .collect();
    let out = f(&inputs);
    (out.re, out.eps)
}

/// Value and directional derivative `∇f(x)·v` by one forward sweep.
pub fn gradient_dot_vector<F: Float>(
    f: impl FnOnce(&[Dual<F>]) -> Dual<F>,
    x: &[F],
    v: &[F],
) -> (F, F) {
    assert_eq!(x.len(), v.len(), "x and v must have the same length");
    let inputs: Vec<Dual<F>> = x.iter().zip(v).map(|(&xi, &vi)| Dual::new(xi, vi)).collect();
    let out = f(&inputs);
    (out.re, out.eps)
}

/// Jacobian-vector product (forward mode): `(f(x), J·v)`.
///
/// Evaluates `f` at `x` and computes the directional derivative in direction `v`.
pub fn jvp<F: Float>(f: impl Fn(&[Dual<F>]) -> Vec<Dual<F>>, x: &[F], v: &[F]) -> (Vec<F>, Vec<F>) {
    assert_eq!(x.len(), v.len(), "x and v must have the same length");
    let inputs: Vec<Dual<F>> = x.iter().zip(v).map(|(&xi, &vi)| Dual::new(xi, vi)).collect();
    let outputs = f(&inputs);
    let values = outputs.iter().map(|d| d.re).collect();
    let tangents = outputs.iter().map(|d| d.eps).collect();
    (values, tangents)
}

/// Vector-Jacobian product (reverse mode): `(f(x), wᵀ·J)`.
///
/// Evaluates `f` at `x` and computes the adjoint product with weights `w`.
pub fn vjp<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Vec<Var<F>>,
    x: &[F],
    w: &[F],
) -> (Vec<F>, Vec<F>) {
    let mut tape = Tape::with_capacity(x.len() * 10);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    let outputs = f(&inputs);

    assert_eq!(
        outputs.len(),
        w.len(),
        "output length must match weight vector length"
    );

    let values: Vec<F> = outputs.iter().map(|r| r.value()).collect();
    let seeds: Vec<(u32, F)> = outputs
        .iter()
        .zip(w)
        .map(|(r, &wi)| (r.index(), wi))
        .collect();
    let grad = tape::with_active_tape(|t: &mut Tape<F>| {
        t.reverse_seeded(&seeds);
        inputs.iter().map(|v| t.adjoint(v.index())).collect()
    });
    (values, grad)
}

/// Compute the full Jacobian of `f : R^n → R^m` using forward mode.
///
/// Returns `(f(x), J)` where `J[i][j] = ∂f_i/∂x_j`.
pub fn jacobian<F: Float>(
    f: impl Fn(&[Dual<F>]) -> Vec<Dual<F>>,
    x: &[F],
) -> (Vec<F>, Vec<Vec<F>>) {
    let n = x.len();

    // First pass to get output dimension and values.
    let const_inputs: Vec<Dual<F>> = x.iter().map(|&xi| Dual::constant(xi)).collect();
    let const_outputs = f(&const_inputs);
    let m = const_outputs.len();
    let values: Vec<F> = const_outputs.iter().map(|d| d.re).collect();

    let mut jac = vec![vec![F::zero(); n]; m];
    for j in 0..n {
        let inputs: Vec<Dual<F>> = x
            .iter()
            .enumerate()
            .map(|(k, &xk)| Dual::new(xk, unit(j, k)))
            .collect();
        let outputs = f(&inputs);
        for (row, out) in jac.iter_mut().zip(outputs.iter()) {
            row[j] = out.eps;
        }
    }

    (values, jac)
}

/// Jacobian of `f : R^n → R^m` by one reverse sweep per output.
///
/// `f` is recorded once; adjoints are cleared between outputs.
pub fn jacobian_rev<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Vec<Var<F>>,
    x: &[F],
) -> (Vec<F>, Vec<Vec<F>>) {
    let mut tape = Tape::with_capacity(x.len() * 10);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    let outputs = f(&inputs);

    let values = outputs.iter().map(|o| o.value()).collect();
    let jac = outputs
        .iter()
        .map(|&o| tape::gradient(o, &inputs))
        .collect();
    (values, jac)
}

// ══════════════════════════════════════════════
//  Second order
// ══════════════════════════════════════════════

/// Value, gradient and Hessian by forward-over-reverse.
///
/// One forward sweep over `Dual<Var<F>>` per input direction, each followed
/// by one reverse sweep from the tangent, inside its own nested scope.
///
/// ```
/// use numbat::{Dual, Var};
///
/// let (v, g, h) = numbat::hessian(
///     |x: &[Dual<Var<f64>>]| x[0] * x[0] * x[1],
///     &[2.0, 3.0],
/// );
/// assert_eq!(v, 12.0);
/// assert_eq!(g, vec![12.0, 4.0]);
/// assert_eq!(h, vec![vec![6.0, 4.0], vec![4.0, 0.0]]);
/// ```
pub fn hessian<F: Float + TapeThreadLocal>(
    f: impl Fn(&[Dual<Var<F>>]) -> Dual<Var<F>>,
    x: &[F],
) -> (F, Vec<F>, Vec<Vec<F>>) {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 20);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    if n == 0 {
        return (f(&[]).re.value(), Vec::new(), Vec::new());
    }

    let mut value = F::zero();
    let mut grad = vec![F::zero(); n];
    let mut hess = Vec::with_capacity(n);
    for (i, g) in grad.iter_mut().enumerate() {
        let _scope = NestedGuard::<F>::new();
        let duals: Vec<Dual<Var<F>>> = inputs
            .iter()
            .enumerate()
            .map(|(k, &xk)| Dual::new(xk, Var::constant(unit(i, k))))
            .collect();
        let out = f(&duals);
        value = out.re.value();
        *g = out.eps.value();
        hess.push(tape::gradient(out.eps, &inputs));
    }
    (value, grad, hess)
}

/// Value, gradient and Hessian by forward-over-forward (`Dual<Dual<F>>`).
///
/// Evaluates the lower triangle and mirrors it, `n(n+1)/2` sweeps.
pub fn hessian_fwd<F: Float>(
    f: impl Fn(&[Dual<Dual<F>>]) -> Dual<Dual<F>>,
    x: &[F],
) -> (F, Vec<F>, Vec<Vec<F>>) {
    let n = x.len();
    if n == 0 {
        return (f(&[]).re.re, Vec::new(), Vec::new());
    }

    let mut value = F::zero();
    let mut grad = vec![F::zero(); n];
    let mut hess = vec![vec![F::zero(); n]; n];
    for i in 0..n {
        for j in 0..=i {
            let inputs: Vec<Dual<Dual<F>>> = x
                .iter()
                .enumerate()
                .map(|(k, &xk)| {
                    Dual::new(Dual::new(xk, unit(i, k)), Dual::constant(unit(j, k)))
                })
                .collect();
            let out = f(&inputs);
            value = out.re.re;
            grad[i] = out.re.eps;
            hess[i][j] = out.eps.eps;
            hess[j][i] = out.eps.eps;
        }
    }
    (value, grad, hess)
}

/// Value and Hessian-vector product `H·v` by one forward-over-reverse sweep.
pub fn hessian_times_vector<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Dual<Var<F>>]) -> Dual<Var<F>>,
    x: &[F],
    v: &[F],
) -> (F, Vec<F>) {
    assert_eq!(x.len(), v.len(), "x and v must have the same length");
    let mut tape = Tape::with_capacity(x.len() * 20);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    let duals: Vec<Dual<Var<F>>> = inputs
        .iter()
        .zip(v)
        .map(|(&xk, &vk)| Dual::new(xk, Var::constant(vk)))
        .collect();
    let out = f(&duals);
    (out.re.value(), tape::gradient(out.eps, &inputs))
}

// ══════════════════════════════════════════════
//  Third order
// ══════════════════════════════════════════════

/// Gradient of `tr(M·H(x))` with respect to `x`.
///
/// Each row `i` contributes `Σ_k M[i][k]·H[k][i]` as the second-order
/// tangent of a `Dual<Dual<Var<F>>>` sweep seeded with `e_i` and `M[i]`;
/// one reverse sweep over the summed trace finishes the job.
pub fn grad_tr_mat_times_hessian<F: Float + TapeThreadLocal>(
    f: impl Fn(&[Dual<Dual<Var<F>>>]) -> Dual<Dual<Var<F>>>,
    x: &[F],
    m: &[Vec<F>],
) -> Vec<F> {
    let n = x.len();
    assert_eq!(m.len(), n, "M must be {n}×{n}");
    let mut tape = Tape::with_capacity(n * n * 20);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    let mut trace = Var::constant(F::zero());
    for (i, row) in m.iter().enumerate() {
        assert_eq!(row.len(), n, "M must be {n}×{n}");
        let duals: Vec<Dual<Dual<Var<F>>>> = inputs
            .iter()
            .zip(row)
            .enumerate()
            .map(|(k, (&xk, &mik))| {
                Dual::new(
                    Dual::new(xk, Var::constant(unit(i, k))),
                    Dual::constant(Var::constant(mik)),
                )
            })
            .collect();
        trace = trace + f(&duals).eps.eps;
    }
    tape::gradient(trace, &inputs)
}

/// Value, Hessian, and the gradient of every Hessian entry.
///
/// Returns `(f(x), H, dH)` with `dH[k][i][j] = ∂H[i][j]/∂x_k`. One
/// `Dual<Dual<Var<F>>>` sweep and one reverse sweep per lower-triangle entry,
/// each in its own nested scope.
pub fn grad_hessian<F: Float + TapeThreadLocal>(
    f: impl Fn(&[Dual<Dual<Var<F>>>]) -> Dual<Dual<Var<F>>>,
    x: &[F],
) -> (F, Vec<Vec<F>>, Vec<Vec<Vec<F>>>) {
    let n = x.len();
    let mut tape = Tape::with_capacity(n * 20);
    let inputs = register(&mut tape, x);

    let _guard = TapeGuard::new(&mut tape);
    if n == 0 {
        return (f(&[]).re.re.value(), Vec::new(), Vec::new());
    }

    let mut value = F::zero();
    let mut hess = vec![vec![F::zero(); n]; n];
    let mut grad_hess = vec![vec![vec![F::zero(); n]; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let _scope = NestedGuard::<F>::new();
            let duals: Vec<Dual<Dual<Var<F>>>> = inputs
                .iter()
                .enumerate()
                .map(|(k, &xk)| {
                    Dual::new(
                        Dual::new(xk, Var::constant(unit(i, k))),
                        Dual::constant(Var::constant(unit(j, k))),
                    )
                })
                .collect();
            let out = f(&duals);
            value = out.re.re.value();
            let hij = out.eps.eps;
            hess[i][j] = hij.value();
            hess[j][i] = hij.value();
            for (k, dk) in tape::gradient(hij, &inputs).into_iter().enumerate() {
                grad_hess[k][i][j] = dk;
                grad_hess[k][j][i] = dk;
            }
        }
    }
    (value, hess, grad_hess)
}

/// Value and first three derivatives of a univariate function, by one sweep
/// over `Dual<Dual<Dual<F>>>` seeded with a unit tangent at every level.
///
/// ```
/// use numbat::Dual;
///
/// let (v, d1, d2, d3) = numbat::third_derivative(|x: Dual<Dual<Dual<f64>>>| x * x * x * x, 2.0);
/// assert_eq!((v, d1, d2, d3), (16.0, 32.0, 48.0, 48.0));
/// ```
pub fn third_derivative<F: Float>(
    f: impl FnOnce(Dual<Dual<Dual<F>>>) -> Dual<Dual<Dual<F>>>,
    x: F,
) -> (F, F, F, F) {
    let out = f(Dual::variable(Dual::variable(Dual::variable(x))));
    (out.re.re.re, out.re.re.eps, out.re.eps.eps, out.eps.eps.eps)
}
