use approx::assert_relative_eq;
use numbat::{lit, value_of, Dual, Dual64, Scalar, Tape, TapeGuard, Var};
use num_traits::Float;

/// Central finite difference: (f(x+h) - f(x-h)) / 2h
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-7;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Test a dual elemental against finite differences.
fn check_elemental(
    f_dual: impl Fn(Dual64) -> Dual64,
    f_f64: impl Fn(f64) -> f64,
    x: f64,
) {
    let d = f_dual(Dual::variable(x));
    assert_relative_eq!(d.re, f_f64(x), max_relative = 1e-12);
    assert_relative_eq!(d.eps, finite_diff(&f_f64, x), max_relative = 1e-5);
}

// ── Arithmetic ──

#[test]
fn product_rule() {
    // (3 + ε)(4 + ε) = 12 + 7ε
    let c = Dual::new(3.0, 1.0) * Dual::new(4.0, 1.0);
    assert_relative_eq!(c.re, 12.0);
    assert_relative_eq!(c.eps, 7.0);
}

#[test]
fn quotient_rule() {
    // d/dx (x / (x+1)) at x=2: 1/(x+1)^2 = 1/9
    let x = Dual::<f64>::variable(2.0);
    let y = x / (x + 1.0);
    assert_relative_eq!(y.re, 2.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(y.eps, 1.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn mixed_scalar_ops() {
    let x = Dual::<f64>::variable(3.0);
    assert_relative_eq!((x * 2.0).eps, 2.0);
    assert_relative_eq!((2.0 * x).eps, 2.0);
    assert_relative_eq!((5.0 - x).eps, -1.0);
    assert_relative_eq!((1.0 / x).eps, -1.0 / 9.0, max_relative = 1e-12);

    let mut acc = x;
    acc += x;
    acc *= x;
    assert_relative_eq!(acc.re, 18.0);
    assert_relative_eq!(acc.eps, 12.0);
}

#[test]
fn powf_in_both_arguments() {
    // d/dx x^x = x^x (ln x + 1)
    let x = Dual::<f64>::variable(1.7);
    let y = x.powf(x);
    let expected = 1.7_f64.powf(1.7) * (1.7_f64.ln() + 1.0);
    assert_relative_eq!(y.eps, expected, max_relative = 1e-12);
}

#[test]
fn elementals_match_finite_differences() {
    type Case = (fn(Dual64) -> Dual64, fn(f64) -> f64, f64);
    let cases: [Case; 24] = [
        (|x| x.recip(), |x| x.recip(), 2.5),
        (|x| x.sqrt(), |x| x.sqrt(), 4.0),
        (|x| x.cbrt(), |x| x.cbrt(), 8.0),
        (|x| x.powi(3), |x| x.powi(3), 2.0),
        (|x| x.exp(), |x| x.exp(), 1.0),
        (|x| x.exp2(), |x| x.exp2(), 1.5),
        (|x| x.exp_m1(), |x| x.exp_m1(), 0.5),
        (|x| x.ln(), |x| x.ln(), 2.0),
        (|x| x.log2(), |x| x.log2(), 2.0),
        (|x| x.log10(), |x| x.log10(), 2.0),
        (|x| x.ln_1p(), |x| x.ln_1p(), 0.5),
        (|x| x.sin(), |x| x.sin(), 1.0),
        (|x| x.cos(), |x| x.cos(), 1.0),
        (|x| x.tan(), |x| x.tan(), 0.5),
        (|x| x.asin(), |x| x.asin(), 0.5),
        (|x| x.acos(), |x| x.acos(), 0.5),
        (|x| x.atan(), |x| x.atan(), 1.0),
        (|x| x.sinh(), |x| x.sinh(), 1.0),
        (|x| x.cosh(), |x| x.cosh(), 1.0),
        (|x| x.tanh(), |x| x.tanh(), 1.0),
        (|x| x.asinh(), |x| x.asinh(), 1.0),
        (|x| x.acosh(), |x| x.acosh(), 2.0),
        (|x| x.atanh(), |x| x.atanh(), 0.5),
        (|x| x.to_radians(), |x| x.to_radians(), 40.0),
    ];
    for (f_dual, f_f64, x) in cases {
        check_elemental(f_dual, f_f64, x);
    }
}

#[test]
fn sin_cos() {
    let (s, c) = Dual::<f64>::variable(1.0).sin_cos();
    assert_relative_eq!(s.eps, 1.0_f64.cos(), max_relative = 1e-12);
    assert_relative_eq!(c.eps, -1.0_f64.sin(), max_relative = 1e-12);
}

#[test]
fn abs_follows_sign() {
    assert_relative_eq!(Dual::<f64>::variable(3.0).abs().eps, 1.0);
    assert_relative_eq!(Dual::<f64>::variable(-3.0).abs().eps, -1.0);
}

#[test]
fn abs_is_flat_at_zero() {
    assert_eq!(Dual::<f64>::variable(0.0).abs().eps, 0.0);
    let x: Dual<Dual64> = Dual::variable(Dual::variable(0.0));
    let y = x.abs();
    assert_eq!(y.re.eps, 0.0);
    assert_eq!(y.eps.re, 0.0);
}

#[test]
fn powf_with_constant_exponent_at_non_positive_base() {
    // x³ at -2: f' = 12
    let y = Dual64::variable(-2.0).powf(Dual::constant(3.0));
    assert_relative_eq!(y.re, -8.0);
    assert_relative_eq!(y.eps, 12.0, max_relative = 1e-12);

    // x² at 0: f' = 0
    let y = Dual64::variable(0.0).powf(Dual::constant(2.0));
    assert_eq!(y.eps, 0.0);

    // Nested: f' = 12, f'' = -12
    let x: Dual<Dual64> = Dual::variable(Dual::variable(-2.0));
    let y = x.powf(lit(3.0));
    assert_relative_eq!(y.re.eps, 12.0, max_relative = 1e-12);
    assert_relative_eq!(y.eps.re, 12.0, max_relative = 1e-12);
    assert_relative_eq!(y.eps.eps, -12.0, max_relative = 1e-12);
}

#[test]
fn powf_with_constant_exponent_agrees_with_reverse() {
    for &x0 in &[-2.0, -0.5, 0.0, 1.5] {
        let fwd = Dual64::variable(x0).powf(lit(3.0)).eps;

        let mut tape = Tape::<f64>::new();
        let _guard = TapeGuard::new(&mut tape);
        let x = Var::new(x0);
        let rev = x.powf(Var::constant(3.0)).grad(&[x])[0];

        assert_relative_eq!(fwd, rev, max_relative = 1e-12);
        assert_relative_eq!(fwd, 3.0 * x0 * x0, max_relative = 1e-12);
    }
}

#[test]
fn zero_derivative_funcs() {
    let x = Dual::<f64>::variable(2.7);
    assert_relative_eq!(x.floor().eps, 0.0);
    assert_relative_eq!(x.ceil().eps, 0.0);
    assert_relative_eq!(x.round().eps, 0.0);
    assert_relative_eq!(x.trunc().eps, 0.0);
    assert_relative_eq!(x.signum().eps, 0.0);
    assert_relative_eq!(x.fract().eps, 1.0);
}

// ── Nesting ──

#[test]
fn doubly_nested_cube() {
    // x³ at 2 with a unit tangent at each level: f' = 12, f'' = 12.
    let x: Dual<Dual64> = Dual::variable(Dual::variable(2.0));
    let y = x * x * x;
    assert_relative_eq!(y.re.re, 8.0);
    assert_relative_eq!(y.re.eps, 12.0);
    assert_relative_eq!(y.eps.re, 12.0);
    assert_relative_eq!(y.eps.eps, 12.0);
}

#[test]
fn nested_elementals_give_second_derivatives() {
    // d²/dx² sin(x)·exp(x) = 2·cos(x)·exp(x)
    let x: Dual<Dual64> = Dual::variable(Dual::variable(0.8));
    let y = x.sin() * x.exp();
    assert_relative_eq!(y.eps.eps, 2.0 * 0.8_f64.cos() * 0.8_f64.exp(), max_relative = 1e-12);

    // d²/dx² ln(x) = -1/x²
    let x: Dual<Dual64> = Dual::variable(Dual::variable(1.5));
    assert_relative_eq!(x.ln().eps.eps, -1.0 / 2.25, max_relative = 1e-12);
}

#[test]
fn nested_mixed_scalar_ops() {
    let x: Dual<Dual64> = Dual::variable(Dual::variable(3.0));
    let y = 2.0 * x * x + 1.0;
    assert_relative_eq!(value_of(y), 19.0);
    assert_relative_eq!(y.eps.eps, 4.0);
}

#[test]
fn dual_over_var_records_tangent_on_tape() {
    // f = x²·y; tangent direction e_x gives ∂f/∂x = 2xy, whose gradient is
    // (2y, 2x): one row of the Hessian.
    let mut tape = Tape::<f64>::new();
    let _guard = TapeGuard::new(&mut tape);
    let x = Var::new(2.0);
    let y = Var::new(3.0);
    let dx = Dual::new(x, Var::constant(1.0));
    let dy = Dual::constant(y);
    let f = dx * dx * dy;
    assert_relative_eq!(f.re.value(), 12.0);
    assert_relative_eq!(f.eps.value(), 12.0);
    let row = f.eps.grad(&[x, y]);
    assert_relative_eq!(row[0], 6.0);
    assert_relative_eq!(row[1], 4.0);
}

// ── Forward/reverse agreement ──

fn model<T: Scalar>(x: T) -> T {
    let half: T = lit(0.5);
    (x * x + T::one()).ln() * x.sin() + (half * x).exp() / x.cosh() - x.atan().powi(2)
}

#[test]
fn forward_and_reverse_agree() {
    for &x0 in &[-1.3, 0.2, 0.9, 2.4] {
        let fwd = model(Dual64::variable(x0)).eps;

        let mut tape = Tape::<f64>::new();
        let _guard = TapeGuard::new(&mut tape);
        let x = Var::new(x0);
        let rev = model(x).grad(&[x])[0];

        assert_relative_eq!(fwd, rev, max_relative = 1e-12);
        assert_relative_eq!(fwd, finite_diff(model::<f64>, x0), max_relative = 1e-6);
    }
}

// ── num-traits ──

#[test]
fn float_trait_methods() {
    let y = Float::sin(Dual64::variable(2.0));
    assert_relative_eq!(y.re, 2.0_f64.sin(), max_relative = 1e-12);
    assert_relative_eq!(y.eps, 2.0_f64.cos(), max_relative = 1e-12);
}

#[test]
fn from_primitive_zero_derivative() {
    use num_traits::FromPrimitive;
    let x = Dual::<Dual64>::from_f64(3.25).unwrap();
    assert_relative_eq!(value_of(x), 3.25);
    assert_relative_eq!(x.eps.re, 0.0);
    assert_relative_eq!(x.re.eps, 0.0);
}

#[test]
fn display() {
    assert_eq!(Dual::new(1.5, 2.0).to_string(), "1.5 + 2ε");
}
