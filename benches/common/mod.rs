#![allow(dead_code)]

use num_traits::{Float, One, Zero};
use numbat::partials::{Operand, PartialsCollector};
use numbat::{lit, Bundle, Scalar};

// ─── Rosenbrock ────────────────────────────────────────────────────────────

pub fn rosenbrock<T: Scalar>(x: &[T]) -> T {
    let hundred: T = lit(100.0);
    let mut sum = T::zero();
    for i in 0..x.len() - 1 {
        let t1 = T::one() - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum = sum + t1 * t1 + hundred * t2 * t2;
    }
    sum
}

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

// ─── Rastrigin ─────────────────────────────────────────────────────────────
// f(x) = 10n + Σ[x_i² - 10·cos(2π·x_i)]

pub fn rastrigin<T: Scalar>(x: &[T]) -> T {
    let ten: T = lit(10.0);
    let two_pi: T = lit(2.0 * std::f64::consts::PI);
    let mut sum = ten * lit::<T>(x.len() as f64);
    for &xi in x {
        sum = sum + xi * xi - ten * (two_pi * xi).cos();
    }
    sum
}

// ─── Normal log density ────────────────────────────────────────────────────
// Σ_i log N(y_i | μ, σ), once elementwise and once as a single bundle.

pub fn normal_lpdf_elementwise<T: Scalar>(y: &[f64], mu: T, sigma: T) -> T {
    let half: T = lit(0.5);
    let log_sqrt_two_pi: T = lit(0.918_938_533_204_672_7);
    let mut sum = T::zero();
    for &yi in y {
        let z = (lit::<T>(yi) - mu) / sigma;
        sum = sum - half * z * z - sigma.ln() - log_sqrt_two_pi;
    }
    sum
}

pub fn normal_lpdf_bundled<R, Y, M, S>(y: Y, mu: M, sigma: S) -> R
where
    R: Bundle,
    Y: Operand<R>,
    M: Operand<R>,
    S: Operand<R>,
{
    let half: R::Partial = lit(0.5);
    let log_sqrt_two_pi: R::Partial = lit(0.918_938_533_204_672_7);
    let mut ops = PartialsCollector::<R>::new((&y, &mu, &sigma));
    let mut value = R::Partial::zero();
    for i in 0..ops.max_size() {
        let s = sigma.value_at(i);
        let inv = s.recip();
        let z = (y.value_at(i) - mu.value_at(i)) * inv;
        value = value - half * z * z - s.ln() - log_sqrt_two_pi;
        ops.partials(0).add(i, -z * inv);
        ops.partials(1).add(i, z * inv);
        ops.partials(2).add(i, (z * z - R::Partial::one()) * inv);
    }
    ops.finish(value)
}

// ─── Finite Differences ────────────────────────────────────────────────────

pub fn finite_diff_gradient(f: impl Fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    let n = x.len();
    let mut grad = vec![0.0; n];
    for i in 0..n {
        let mut xp = x.to_vec();
        let mut xm = x.to_vec();
        xp[i] += h;
        xm[i] -= h;
        grad[i] = (f(&xp) - f(&xm)) / (2.0 * h);
    }
    grad
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}

pub fn make_direction(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.1 * (i + 1) as f64).collect()
}
