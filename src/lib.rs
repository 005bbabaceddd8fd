pub mod api;
pub mod arena;
pub mod dual;
pub mod error;
pub mod float;
pub mod nested;
pub mod node;
pub mod partials;
pub mod scalar;
pub mod tape;
pub mod var;
mod rules;
mod traits;

#[cfg(feature = "nalgebra")]
pub mod nalgebra_support;
#[cfg(feature = "ndarray")]
pub mod ndarray_support;
#[cfg(feature = "parallel")]
pub mod parallel;

pub use api::{
    derivative, grad, grad_hessian, grad_tr_mat_times_hessian, gradient_dot_vector, gradient_fwd,
    hessian, hessian_fwd, hessian_times_vector, jacobian, jacobian_rev, jvp, partial_derivative,
    third_derivative, value_and_grad, vjp,
};
pub use arena::Checkpoint;
pub use dual::Dual;
pub use error::{Error, Result};
pub use float::Float;
pub use nested::{enter_nested, leave_nested_and_recover_memory, nested_depth, NestedGuard};
pub use partials::{check_consistent_sizes, max_size, Bundle, Const, Operand, PartialsCollector};
pub use scalar::{lit, value_of, Scalar};
pub use tape::{gradient, recover_memory, set_zero_all_adjoints, Tape, TapeGuard};
pub use var::Var;

#[cfg(feature = "parallel")]
pub use parallel::{grad_batch_par, value_and_grad_batch_par};

/// Type alias for forward-mode dual numbers over `f64`.
pub type Dual64 = Dual<f64>;
/// Type alias for forward-mode dual numbers over `f32`.
pub type Dual32 = Dual<f32>;
/// Type alias for reverse-mode variables over `f64`.
pub type Var64 = Var<f64>;
/// Type alias for reverse-mode variables over `f32`.
pub type Var32 = Var<f32>;
