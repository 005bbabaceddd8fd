use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use numbat::{gradient_fwd, grad, hessian, hessian_times_vector, Tape, TapeGuard, Var};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_reverse_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_gradient");
    for n in [2, 10, 100, 1000] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("f64_eval", n), &x, |b, x| {
            b.iter(|| black_box(rosenbrock_f64(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_rev", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| rosenbrock(v), black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_fd", n), &x, |b, x| {
            b.iter(|| black_box(finite_diff_gradient(rosenbrock_f64, x, 1e-7)))
        });

        group.bench_with_input(BenchmarkId::new("rastrigin_rev", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| rastrigin(v), black_box(x))))
        });
    }
    group.finish();
}

fn bench_reverse_crossover(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossover_fwd_vs_rev");
    for n in [2, 3, 5, 10, 20] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("forward_n_passes", n), &x, |b, x| {
            b.iter(|| black_box(gradient_fwd(|v| rosenbrock(v), black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("reverse_1_pass", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| rosenbrock(v), black_box(x))))
        });
    }
    group.finish();
}

fn bench_tape_reuse(c: &mut Criterion) {
    // One tape for every iteration, reset between sweeps.
    let mut group = c.benchmark_group("tape_reuse");
    for n in [10, 100] {
        let x = make_input(n);
        group.bench_with_input(BenchmarkId::new("reset_and_record", n), &x, |b, x| {
            let mut tape = Tape::<f64>::with_capacity(n * 10);
            let _guard = TapeGuard::new(&mut tape);
            b.iter(|| {
                numbat::recover_memory::<f64>();
                let inputs: Vec<Var<f64>> = x.iter().map(|&xi| Var::new(xi)).collect();
                let f = rosenbrock(&inputs);
                black_box(numbat::gradient(f, &inputs))
            })
        });
    }
    group.finish();
}

fn bench_second_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("second_order");
    for n in [2, 10, 50] {
        let x = make_input(n);
        let v = make_direction(n);

        group.bench_with_input(BenchmarkId::new("hessian", n), &x, |b, x| {
            b.iter(|| black_box(hessian(|p| rosenbrock(p), black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("hessian_times_vector", n), &x, |b, x| {
            b.iter(|| black_box(hessian_times_vector(|p| rosenbrock(p), black_box(x), &v)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_reverse_gradient,
    bench_reverse_crossover,
    bench_tape_reuse,
    bench_second_order
);
criterion_main!(benches);
