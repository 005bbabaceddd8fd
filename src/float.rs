use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

use crate::scalar::Scalar;

/// Marker trait for the primitive floating-point types (`f32`, `f64`) that
/// sit at the bottom of every AD type.
///
/// Tape nodes, partials buffers and adjoints are stored in this type. AD
/// wrapper types ([`Var`](crate::Var), [`Dual`](crate::Dual)) do not
/// implement it; they implement [`Scalar`] instead. Every `Float` is its own
/// `Scalar`, so `Dual<F>` is always available for a `Float` `F`.
pub trait Float:
    Scalar<Float = Self>
    + NumFloat
    + FloatConst
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
