use approx::assert_relative_eq;
use numbat::{
    grad_hessian, grad_tr_mat_times_hessian, hessian, hessian_fwd, hessian_times_vector, lit,
    third_derivative, Scalar,
};

fn rosenbrock<T: Scalar>(x: &[T]) -> T {
    let hundred: T = lit(100.0);
    let dx = T::one() - x[0];
    let t = x[1] - x[0] * x[0];
    dx * dx + hundred * t * t
}

/// Closed-form Hessian of the 2-D Rosenbrock function.
fn rosenbrock_hessian(x: &[f64]) -> [[f64; 2]; 2] {
    [
        [2.0 - 400.0 * x[1] + 1200.0 * x[0] * x[0], -400.0 * x[0]],
        [-400.0 * x[0], 200.0],
    ]
}

fn mixed<T: Scalar>(x: &[T]) -> T {
    // f = exp(x0·x1) + sin(x2)·x0² + ln(1 + x1²)
    (x[0] * x[1]).exp() + x[2].sin() * x[0] * x[0] + (T::one() + x[1] * x[1]).ln()
}

fn assert_matrix_eq(a: &[Vec<f64>], b: &[Vec<f64>], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (ra, rb) in a.iter().zip(b) {
        for (x, y) in ra.iter().zip(rb) {
            assert_relative_eq!(x, y, max_relative = tol, epsilon = 1e-12);
        }
    }
}

// ── Hessian ──

#[test]
fn hessian_rosenbrock() {
    let x = [1.5, 2.0];
    let (v, g, h) = hessian(|p| rosenbrock(p), &x);
    let expected = rosenbrock_hessian(&x);
    assert_relative_eq!(v, rosenbrock(&x), max_relative = 1e-14);
    assert_relative_eq!(g[1], 200.0 * (2.0 - 2.25), max_relative = 1e-12);
    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(h[i][j], expected[i][j], max_relative = 1e-12);
        }
    }
}

#[test]
fn hessian_at_minimum() {
    let (v, g, h) = hessian(|p| rosenbrock(p), &[1.0, 1.0]);
    assert_eq!(v, 0.0);
    assert_eq!(g, vec![0.0, 0.0]);
    assert_eq!(h, vec![vec![802.0, -400.0], vec![-400.0, 200.0]]);
}

#[test]
fn hessian_modes_agree() {
    let x = [0.3, -0.7, 1.1];
    let (v_r, g_r, h_r) = hessian(|p| mixed(p), &x);
    let (v_f, g_f, h_f) = hessian_fwd(|p| mixed(p), &x);
    assert_relative_eq!(v_r, v_f, max_relative = 1e-14);
    for (a, b) in g_r.iter().zip(&g_f) {
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }
    assert_matrix_eq(&h_r, &h_f, 1e-12);
}

#[test]
fn hessian_is_symmetric() {
    let (_, _, h) = hessian(|p| mixed(p), &[0.9, 0.2, -0.4]);
    for i in 0..3 {
        for j in 0..i {
            assert_relative_eq!(h[i][j], h[j][i], max_relative = 1e-12);
        }
    }
}

#[test]
fn hessian_of_linear_function_is_zero() {
    let (_, g, h) = hessian(|p| p[0] * 3.0 - p[1] * 2.0, &[5.0_f64, 6.0]);
    assert_eq!(g, vec![3.0, -2.0]);
    assert_eq!(h, vec![vec![0.0; 2]; 2]);
}

#[test]
fn hessian_times_vector_matches_full_hessian() {
    let x = [0.3, -0.7, 1.1];
    let v = [0.5, 2.0, -1.0];
    let (_, _, h) = hessian(|p| mixed(p), &x);
    let (fx, hv) = hessian_times_vector(|p| mixed(p), &x, &v);
    assert_relative_eq!(fx, mixed(&x), max_relative = 1e-14);
    for i in 0..3 {
        let expected: f64 = (0..3).map(|j| h[i][j] * v[j]).sum();
        assert_relative_eq!(hv[i], expected, max_relative = 1e-12);
    }
}

// ── Third order ──

#[test]
fn third_derivative_of_polynomial() {
    // f = x⁵: 5x⁴, 20x³, 60x² at x = 1.5
    let (v, d1, d2, d3) = third_derivative(|x| x.powi(5), 1.5_f64);
    assert_relative_eq!(v, 1.5_f64.powi(5), max_relative = 1e-14);
    assert_relative_eq!(d1, 5.0 * 1.5_f64.powi(4), max_relative = 1e-14);
    assert_relative_eq!(d2, 20.0 * 1.5_f64.powi(3), max_relative = 1e-14);
    assert_relative_eq!(d3, 60.0 * 1.5_f64.powi(2), max_relative = 1e-14);
}

#[test]
fn constant_power_of_negative_base() {
    // f = x³ at -2: 12, -12, 6
    let (v, d1, d2, d3) = third_derivative(|x| x.powf(lit(3.0)), -2.0_f64);
    assert_relative_eq!(v, -8.0, max_relative = 1e-14);
    assert_relative_eq!(d1, 12.0, max_relative = 1e-14);
    assert_relative_eq!(d2, -12.0, max_relative = 1e-14);
    assert_relative_eq!(d3, 6.0, max_relative = 1e-14);

    // f = x0³·x1 at (-2, 1)
    let (_, g, h) = hessian_fwd(|x| x[0].powf(lit(3.0)) * x[1], &[-2.0_f64, 1.0]);
    assert_relative_eq!(g[0], 12.0, max_relative = 1e-14);
    assert_relative_eq!(g[1], -8.0, max_relative = 1e-14);
    assert_relative_eq!(h[0][0], -12.0, max_relative = 1e-14);
    assert_relative_eq!(h[0][1], 12.0, max_relative = 1e-14);
    assert_relative_eq!(h[1][0], 12.0, max_relative = 1e-14);
    assert_eq!(h[1][1], 0.0);
}

#[test]
fn third_derivative_of_transcendental() {
    // d³/dx³ sin(x) = -cos(x), d³/dx³ exp(2x) = 8exp(2x)
    let (_, _, _, d3) = third_derivative(|x| x.sin(), 0.4_f64);
    assert_relative_eq!(d3, -0.4_f64.cos(), max_relative = 1e-14);
    let (_, _, d2, d3) = third_derivative(|x| (x * 2.0).exp(), 0.4_f64);
    assert_relative_eq!(d2, 4.0 * 0.8_f64.exp(), max_relative = 1e-14);
    assert_relative_eq!(d3, 8.0 * 0.8_f64.exp(), max_relative = 1e-14);
}

#[test]
fn grad_hessian_rosenbrock() {
    // Non-zero third derivatives: ∂H00/∂x = 2400x, ∂H00/∂y = ∂H01/∂x = -400.
    let x = [1.5, 2.0];
    let (v, h, dh) = grad_hessian(|p| rosenbrock(p), &x);
    assert_relative_eq!(v, rosenbrock(&x), max_relative = 1e-14);
    let expected = rosenbrock_hessian(&x);
    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(h[i][j], expected[i][j], max_relative = 1e-12);
        }
    }
    assert_relative_eq!(dh[0][0][0], 2400.0 * 1.5, max_relative = 1e-12);
    assert_relative_eq!(dh[1][0][0], -400.0, max_relative = 1e-12);
    assert_relative_eq!(dh[0][0][1], -400.0, max_relative = 1e-12);
    assert_relative_eq!(dh[0][1][0], -400.0, max_relative = 1e-12);
    assert_eq!(dh[1][1][1], 0.0);
    assert_eq!(dh[1][0][1], 0.0);
}

#[test]
fn grad_hessian_hessian_matches_hessian() {
    let x = [0.3, -0.7, 1.1];
    let (_, _, h) = hessian(|p| mixed(p), &x);
    let (_, h3, _) = grad_hessian(|p| mixed(p), &x);
    assert_matrix_eq(&h, &h3, 1e-12);
}

#[test]
fn grad_tr_mat_times_hessian_identity() {
    // tr(H) = H00 + H11; its gradient is (2400x, -400).
    let m = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let g = grad_tr_mat_times_hessian(|p| rosenbrock(p), &[1.5, 2.0], &m);
    assert_relative_eq!(g[0], 3600.0, max_relative = 1e-12);
    assert_relative_eq!(g[1], -400.0, max_relative = 1e-12);
}

#[test]
fn grad_tr_mat_times_hessian_contracts_grad_hessian() {
    let x = [0.3, -0.7, 1.1];
    let m = vec![
        vec![0.5, -1.0, 2.0],
        vec![0.25, 1.5, 0.0],
        vec![-0.75, 0.1, 1.0],
    ];
    let (_, _, dh) = grad_hessian(|p| mixed(p), &x);
    let g = grad_tr_mat_times_hessian(|p| mixed(p), &x, &m);
    for k in 0..3 {
        // tr(M·H) = Σ_ij M[i][j]·H[j][i]
        let expected: f64 = (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .map(|(i, j)| m[i][j] * dh[k][j][i])
            .sum();
        assert_relative_eq!(g[k], expected, max_relative = 1e-10, epsilon = 1e-12);
    }
}

#[test]
#[should_panic(expected = "M must be")]
fn grad_tr_mat_times_hessian_checks_shape() {
    let m = vec![vec![1.0, 0.0]];
    let _ = grad_tr_mat_times_hessian(|p| rosenbrock(p), &[1.5, 2.0], &m);
}
