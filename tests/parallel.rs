#![cfg(feature = "parallel")]

use approx::assert_relative_eq;
use numbat::{grad, grad_batch_par, lit, value_and_grad, value_and_grad_batch_par, Scalar};

fn rosenbrock<T: Scalar>(x: &[T]) -> T {
    let hundred: T = lit(100.0);
    let dx = x[0] - T::one();
    let t = x[1] - x[0] * x[0];
    dx * dx + hundred * t * t
}

fn trig_mix<T: Scalar>(x: &[T]) -> T {
    x[0].sin() * x[1].cos() + x[2].exp()
}

#[test]
fn batch_matches_serial() {
    let xs: Vec<Vec<f64>> = (0..64)
        .map(|i| vec![0.1 * i as f64, 1.0 - 0.05 * i as f64])
        .collect();
    let batch = grad_batch_par(|v| rosenbrock(v), &xs);
    assert_eq!(batch.len(), xs.len());
    for (x, g) in xs.iter().zip(&batch) {
        let serial = grad(|v| rosenbrock(v), x);
        for (s, p) in serial.iter().zip(g) {
            assert_relative_eq!(s, p, max_relative = 1e-14);
        }
    }
}

#[test]
fn values_and_gradients_in_input_order() {
    let xs: Vec<Vec<f64>> = vec![
        vec![0.5, 1.0, 0.1],
        vec![2.0, 3.0, -1.0],
        vec![0.0, 0.0, 0.0],
    ];
    let batch = value_and_grad_batch_par(|v| trig_mix(v), &xs);
    for (x, (v, g)) in xs.iter().zip(&batch) {
        let (sv, sg) = value_and_grad(|p| trig_mix(p), x);
        assert_relative_eq!(*v, sv, max_relative = 1e-14);
        assert_relative_eq!(g[2], x[2].exp(), max_relative = 1e-14);
        assert_eq!(g, &sg);
    }
}

#[test]
fn empty_batch() {
    let xs: Vec<Vec<f64>> = Vec::new();
    assert!(grad_batch_par(|v| rosenbrock(v), &xs).is_empty());
}
