//! nalgebra adapters.
//!
//! `DVector` arguments for bundled functions, and functionals accepting
//! `DVector<F>` and returning `DVector<F>` / `DMatrix<F>`.

use nalgebra::{DMatrix, DVector};

use crate::dual::Dual;
use crate::float::Float;
use crate::partials::{write_element_refs, Bundle, Element, Operand};
use crate::tape::TapeThreadLocal;
use crate::var::Var;

impl<R, X> Operand<R> for DVector<X>
where
    R: Bundle,
    X: Element<R> + nalgebra::Scalar,
{
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }
    #[inline]
    fn is_vector(&self) -> bool {
        true
    }
    #[inline]
    fn is_constant(&self) -> bool {
        !<X as Element<R>>::LIVE
    }
    #[inline]
    fn value_at(&self, n: usize) -> R::Partial {
        <X as Element<R>>::primal(&self[n])
    }
    fn write_refs(&self, out: &mut [R::Ref]) {
        write_element_refs::<R, X, _>(self.iter(), out);
    }
}

/// Compute the gradient, returning a `DVector`.
pub fn grad_nalgebra<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Var<F>,
    x: &DVector<F>,
) -> DVector<F> {
    DVector::from_vec(crate::api::grad(f, x.as_slice()))
}

/// Value and gradient, returning `(value, DVector)`.
pub fn grad_nalgebra_val<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Var<F>,
    x: &DVector<F>,
) -> (F, DVector<F>) {
    let (val, g) = crate::api::value_and_grad(f, x.as_slice());
    (val, DVector::from_vec(g))
}

/// Forward-over-reverse Hessian, returning `(value, gradient, hessian)`.
pub fn hessian_nalgebra<F: Float + TapeThreadLocal>(
    f: impl Fn(&[Dual<Var<F>>]) -> Dual<Var<F>>,
    x: &DVector<F>,
) -> (F, DVector<F>, DMatrix<F>) {
    let n = x.len();
    let (val, grad, hess) = crate::api::hessian(f, x.as_slice());
    let hess_flat: Vec<F> = hess.into_iter().flatten().collect();
    (
        val,
        DVector::from_vec(grad),
        DMatrix::from_row_slice(n, n, &hess_flat),
    )
}

/// Reverse-mode Jacobian of a multi-output function, returning `DMatrix<F>`.
///
/// Returns `J[i][j] = ∂f_i/∂x_j`.
pub fn jacobian_nalgebra<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Var<F>]) -> Vec<Var<F>>,
    x: &DVector<F>,
) -> DMatrix<F> {
    let (_, jac) = crate::api::jacobian_rev(f, x.as_slice());
    let m = jac.len();
    let flat: Vec<F> = jac.into_iter().flatten().collect();
    DMatrix::from_row_slice(m, x.len(), &flat)
}
