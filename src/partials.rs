//! Gradient bundling: publish analytic partials as one combined node.
//!
//! A function with known derivatives (a log density, a special function)
//! takes up to [`MAX_OPERANDS`] heterogeneous arguments: constants, scalars
//! or slices, each either a primitive float, a [`Var`], a [`Dual`], or a
//! [`Const`]-wrapped value. A [`PartialsCollector`] flattens the
//! differentiable elements into one operand list and one partials buffer;
//! the function writes one partial per slot and calls
//! [`finish`](PartialsCollector::finish). The return type decides what is
//! produced:
//!
//! - a primitive float: the value, nothing recorded;
//! - `Var<F>`: exactly one bundle node on the active tape;
//! - `Dual<T>`: one dual whose tangent is `Σ partial_i · tangent_i`.
//!
//! ```
//! use numbat::partials::{Bundle, Operand, PartialsCollector};
//! use numbat::{Tape, TapeGuard, Var};
//! use num_traits::Float;
//!
//! // log(exp(a) + exp(b)) with hand-written partials.
//! fn log_sum_exp<R, A, B>(a: A, b: B) -> R
//! where
//!     R: Bundle,
//!     A: Operand<R>,
//!     B: Operand<R>,
//! {
//!     let (av, bv) = (a.value_at(0), b.value_at(0));
//!     let m = av.max(bv);
//!     let value = m + ((av - m).exp() + (bv - m).exp()).ln();
//!     let mut ops = PartialsCollector::<R>::new((&a, &b));
//!     ops.partials(0).add(0, (av - value).exp());
//!     ops.partials(1).add(0, (bv - value).exp());
//!     ops.finish(value)
//! }
//!
//! let mut tape = Tape::<f64>::new();
//! let _guard = TapeGuard::new(&mut tape);
//! let a = Var::new(0.5);
//! let f: Var<f64> = log_sum_exp(a, 1.5_f64);
//! let g = f.grad(&[a]);
//! let expected = 0.5_f64.exp() / (0.5_f64.exp() + 1.5_f64.exp());
//! assert!((g[0] - expected).abs() < 1e-12);
//!
//! let plain: f64 = log_sum_exp(0.5_f64, 1.5_f64);
//! assert!((plain - f.value()).abs() < 1e-12);
//! ```

use std::marker::PhantomData;

use num_traits::Zero;

use crate::arena::SlotRange;
use crate::dual::Dual;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::scalar::Scalar;
use crate::tape::{self, Tape, TapeThreadLocal};
use crate::var::Var;

/// Largest number of arguments one collector accepts.
pub const MAX_OPERANDS: usize = 6;

// ══════════════════════════════════════════════
//  Return kinds
// ══════════════════════════════════════════════

/// A type a bundled function can return.
pub trait Bundle: Scalar {
    /// What is recorded per slot at construction: a node id for `Var`, the
    /// incoming tangent for `Dual`, nothing for plain floats.
    type Ref: Copy + Default;

    /// The type of values and partials the function computes with.
    type Partial: Scalar;

    /// Where one call's slot references and partials live.
    type Slots: SlotStore<Self::Ref, Self::Partial>;

    /// Build the result from the value and the filled slots.
    fn finish(value: Self::Partial, slots: Self::Slots) -> Self;
}

/// Backing storage for a collector's slots.
pub trait SlotStore<Ref, P>: Sized {
    /// Reserve `len` slots with zeroed partials; `fill` writes the references.
    fn alloc(len: usize, fill: impl FnOnce(&mut [Ref])) -> Self;

    fn len(&self) -> usize;

    /// Partial at slot `i`.
    fn get(&self, i: usize) -> P;

    /// Replace the partial at slot `i` with `f` of its current value.
    fn update(&mut self, i: usize, f: impl FnOnce(P) -> P);
}

/// Slots held by the collector itself, for return kinds that record nothing
/// on a tape.
#[derive(Clone, Debug)]
pub struct LocalSlots<Ref, P> {
    refs: Vec<Ref>,
    partials: Vec<P>,
}

impl<Ref: Copy + Default, P: Scalar> SlotStore<Ref, P> for LocalSlots<Ref, P> {
    fn alloc(len: usize, fill: impl FnOnce(&mut [Ref])) -> Self {
        let mut refs = vec![Ref::default(); len];
        fill(&mut refs);
        LocalSlots {
            refs,
            partials: vec![P::zero(); len],
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.partials.len()
    }

    #[inline]
    fn get(&self, i: usize) -> P {
        self.partials[i]
    }

    #[inline]
    fn update(&mut self, i: usize, f: impl FnOnce(P) -> P) {
        self.partials[i] = f(self.partials[i]);
    }
}

/// Slots reserved on the active tape at construction; the bundle node
/// recorded by `finish` points straight at them.
#[derive(Clone, Copy, Debug)]
pub struct TapeSlots<F> {
    range: SlotRange,
    _float: PhantomData<F>,
}

impl<F: TapeThreadLocal> SlotStore<u32, F> for TapeSlots<F> {
    fn alloc(len: usize, fill: impl FnOnce(&mut [u32])) -> Self {
        let range = if len == 0 {
            SlotRange { start: 0, len: 0 }
        } else {
            tape::with_active_tape(|t: &mut Tape<F>| {
                let range = t.alloc_slots(len);
                fill(t.slots_mut(range).0);
                range
            })
        };
        TapeSlots {
            range,
            _float: PhantomData,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.range.len as usize
    }

    #[inline]
    fn get(&self, i: usize) -> F {
        let range = self.range;
        tape::with_active_tape(|t: &mut Tape<F>| t.slots(range).1[i])
    }

    #[inline]
    fn update(&mut self, i: usize, f: impl FnOnce(F) -> F) {
        let range = self.range;
        tape::with_active_tape(|t: &mut Tape<F>| {
            let p = &mut t.slots_mut(range).1[i];
            *p = f(*p);
        });
    }
}

macro_rules! impl_bundle_primitive {
    ($f:ty) => {
        impl Bundle for $f {
            type Ref = ();
            type Partial = $f;
            type Slots = LocalSlots<(), $f>;

            #[inline]
            fn finish(value: $f, _slots: Self::Slots) -> $f {
                value
            }
        }
    };
}

impl_bundle_primitive!(f32);
impl_bundle_primitive!(f64);

impl<F: Float + TapeThreadLocal> Bundle for Var<F> {
    type Ref = u32;
    type Partial = F;
    type Slots = TapeSlots<F>;

    fn finish(value: F, slots: TapeSlots<F>) -> Self {
        if slots.range.len == 0 {
            return Var::constant(value);
        }
        let index = tape::with_active_tape(|t: &mut Tape<F>| t.push_bundle(value, slots.range));
        Var::from_tape(value, index)
    }
}

impl<T: Scalar> Bundle for Dual<T> {
    type Ref = T;
    type Partial = T;
    type Slots = LocalSlots<T, T>;

    fn finish(value: T, slots: LocalSlots<T, T>) -> Self {
        let eps = slots
            .refs
            .iter()
            .zip(&slots.partials)
            .fold(None, |acc: Option<T>, (&tangent, &partial)| {
                let term = partial * tangent;
                Some(match acc {
                    Some(sum) => sum + term,
                    None => term,
                })
            })
            .unwrap_or_else(T::zero);
        Dual::new(value, eps)
    }
}

// ══════════════════════════════════════════════
//  Argument kinds
// ══════════════════════════════════════════════

/// One scalar element of an argument, as seen by return kind `R`.
pub trait Element<R: Bundle>: Copy {
    /// Whether this element type contributes a slot.
    const LIVE: bool;

    /// The element's value in the function's working type.
    fn primal(&self) -> R::Partial;

    /// The slot reference for a live element, `None` otherwise.
    fn reference(&self) -> Option<R::Ref>;
}

impl<F: Float + TapeThreadLocal> Element<Var<F>> for Var<F> {
    const LIVE: bool = true;

    #[inline]
    fn primal(&self) -> F {
        self.value
    }

    // A constant-sentinel handle still occupies its slot.
    #[inline]
    fn reference(&self) -> Option<u32> {
        Some(self.index)
    }
}

impl<T: Scalar> Element<Dual<T>> for Dual<T> {
    const LIVE: bool = true;

    #[inline]
    fn primal(&self) -> T {
        self.re
    }

    #[inline]
    fn reference(&self) -> Option<T> {
        Some(self.eps)
    }
}

macro_rules! impl_element_primitive {
    ($f:ty) => {
        impl Element<$f> for $f {
            const LIVE: bool = false;
            #[inline]
            fn primal(&self) -> $f {
                *self
            }
            #[inline]
            fn reference(&self) -> Option<()> {
                None
            }
        }

        impl Element<Var<$f>> for $f {
            const LIVE: bool = false;
            #[inline]
            fn primal(&self) -> $f {
                *self
            }
            #[inline]
            fn reference(&self) -> Option<u32> {
                None
            }
        }

        impl<T: Scalar<Float = $f>> Element<Dual<T>> for $f {
            const LIVE: bool = false;
            #[inline]
            fn primal(&self) -> T {
                T::from_f(*self)
            }
            #[inline]
            fn reference(&self) -> Option<T> {
                None
            }
        }
    };
}

impl_element_primitive!(f32);
impl_element_primitive!(f64);

/// One argument of a bundled function: a scalar, an array-like of scalars,
/// or a [`Const`] wrapper around either.
pub trait Operand<R: Bundle> {
    /// Number of elements (1 for scalars).
    fn size(&self) -> usize;

    /// Whether the argument is array-like.
    fn is_vector(&self) -> bool;

    /// Whether the argument contributes no slots.
    fn is_constant(&self) -> bool;

    /// Value of element `n`; scalars return their value for every `n`.
    fn value_at(&self, n: usize) -> R::Partial;

    /// Write one slot reference per element into `out`, which holds exactly
    /// [`slots`](Self::slots) entries.
    fn write_refs(&self, out: &mut [R::Ref]);

    /// Slots this argument occupies: 0 if constant, else its size.
    #[inline]
    fn slots(&self) -> usize {
        if self.is_constant() {
            0
        } else {
            self.size()
        }
    }
}

macro_rules! impl_scalar_operand {
    ([$($g:tt)*] $r:ty, $e:ty) => {
        impl<$($g)*> Operand<$r> for $e {
            #[inline]
            fn size(&self) -> usize {
                1
            }
            #[inline]
            fn is_vector(&self) -> bool {
                false
            }
            #[inline]
            fn is_constant(&self) -> bool {
                !<$e as Element<$r>>::LIVE
            }
            #[inline]
            fn value_at(&self, _n: usize) -> <$r as Bundle>::Partial {
                <$e as Element<$r>>::primal(self)
            }
            #[inline]
            fn write_refs(&self, out: &mut [<$r as Bundle>::Ref]) {
                if let Some(r) = <$e as Element<$r>>::reference(self) {
                    out[0] = r;
                }
            }
        }
    };
}

impl_scalar_operand!([F: Float + TapeThreadLocal] Var<F>, Var<F>);
impl_scalar_operand!([T: Scalar] Dual<T>, Dual<T>);
impl_scalar_operand!([] f32, f32);
impl_scalar_operand!([] f64, f64);
impl_scalar_operand!([] Var<f32>, f32);
impl_scalar_operand!([] Var<f64>, f64);
impl_scalar_operand!([T: Scalar<Float = f32>] Dual<T>, f32);
impl_scalar_operand!([T: Scalar<Float = f64>] Dual<T>, f64);

/// Fill `out` from the references of an array-like argument's elements.
pub fn write_element_refs<'a, R, X, I>(elements: I, out: &mut [R::Ref])
where
    R: Bundle,
    X: Element<R> + 'a,
    I: IntoIterator<Item = &'a X>,
{
    for (slot, x) in out.iter_mut().zip(elements) {
        if let Some(r) = x.reference() {
            *slot = r;
        }
    }
}

impl<R: Bundle, X: Element<R>> Operand<R> for [X] {
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

impl<R: Bundle, X: Element<R>> Operand<R> for Vec<X> {
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
        <[X] as Operand<R>>::value_at(self.as_slice(), n)
    }
    fn write_refs(&self, out: &mut [R::Ref]) {
        <[X] as Operand<R>>::write_refs(self.as_slice(), out);
    }
}

impl<R: Bundle, X: Element<R>, const N: usize> Operand<R> for [X; N] {
    #[inline]
    fn size(&self) -> usize {
        N
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
        <[X] as Operand<R>>::value_at(self.as_slice(), n)
    }
    fn write_refs(&self, out: &mut [R::Ref]) {
        <[X] as Operand<R>>::write_refs(self.as_slice(), out);
    }
}

impl<R: Bundle, O: Operand<R> + ?Sized> Operand<R> for &O {
    #[inline]
    fn size(&self) -> usize {
        O::size(*self)
    }
    #[inline]
    fn is_vector(&self) -> bool {
        O::is_vector(*self)
    }
    #[inline]
    fn is_constant(&self) -> bool {
        O::is_constant(*self)
    }
    #[inline]
    fn value_at(&self, n: usize) -> R::Partial {
        O::value_at(*self, n)
    }
    fn write_refs(&self, out: &mut [R::Ref]) {
        O::write_refs(*self, out);
    }
}

/// Declares an argument non-differentiable regardless of its element type.
///
/// `Const(x)` contributes zero slots and its partials view is empty, exactly
/// like a plain float constant, even when `x` is a `Var` or a `Dual`.
#[derive(Clone, Copy, Debug)]
pub struct Const<X>(pub X);

impl<R: Bundle, O: Operand<R>> Operand<R> for Const<O> {
    #[inline]
    fn size(&self) -> usize {
        O::size(&self.0)
    }
    #[inline]
    fn is_vector(&self) -> bool {
        O::is_vector(&self.0)
    }
    #[inline]
    fn is_constant(&self) -> bool {
        true
    }
    #[inline]
    fn value_at(&self, n: usize) -> R::Partial {
        O::value_at(&self.0, n)
    }
    #[inline]
    fn write_refs(&self, _out: &mut [R::Ref]) {}
}

// ══════════════════════════════════════════════
//  Argument tuples
// ══════════════════════════════════════════════

/// Per-argument layout gathered while flattening a tuple of operands.
#[derive(Clone, Copy, Debug, Default)]
pub struct Layout {
    /// Number of arguments.
    pub arity: usize,
    /// Element count per argument.
    pub sizes: [usize; MAX_OPERANDS],
    /// Slot count per argument.
    pub slots: [usize; MAX_OPERANDS],
    /// Whether each argument is array-like.
    pub vector: [bool; MAX_OPERANDS],
}

/// A tuple of one to six [`Operand`]s.
pub trait Operands<R: Bundle> {
    /// Shapes of each argument, in argument order.
    fn layout(&self) -> Layout;

    /// Write each live argument's slot references into its range
    /// `offsets[k]..offsets[k + 1]` of `refs`.
    fn write_refs(&self, refs: &mut [R::Ref], offsets: &[usize; MAX_OPERANDS + 1]);
}

macro_rules! impl_operands_tuple {
    ($n:expr; $($name:ident : $idx:tt),+) => {
        impl<R: Bundle, $($name: Operand<R>),+> Operands<R> for ($($name,)+) {
            fn write_refs(&self, refs: &mut [R::Ref], offsets: &[usize; MAX_OPERANDS + 1]) {
                $(
                    if !self.$idx.is_constant() {
                        self.$idx.write_refs(&mut refs[offsets[$idx]..offsets[$idx + 1]]);
                    }
                )+
            }

            fn layout(&self) -> Layout {
                let mut layout = Layout {
                    arity: $n,
                    ..Layout::default()
                };
                $(
                    layout.sizes[$idx] = self.$idx.size();
                    layout.slots[$idx] = self.$idx.slots();
                    layout.vector[$idx] = self.$idx.is_vector();
                )+
                layout
            }
        }
    };
}

impl_operands_tuple!(1; A: 0);
impl_operands_tuple!(2; A: 0, B: 1);
impl_operands_tuple!(3; A: 0, B: 1, C: 2);
impl_operands_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_operands_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_operands_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, G: 5);

/// Length of the longest argument. Scalars count as 1, so this is 0 only
/// when every argument is an empty array.
pub fn max_size<R: Bundle, O: Operands<R>>(operands: &O) -> usize {
    operands.layout().max_size()
}

impl Layout {
    /// Largest element count over the arguments.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.sizes[..self.arity].iter().copied().fold(0, usize::max)
    }
}

/// Check that every array-like argument has the same length.
///
/// Returns the common length (1 if all arguments are scalar), the iteration
/// count a bundled function loops over.
pub fn check_consistent_sizes<R: Bundle, O: Operands<R>>(operands: &O) -> Result<usize> {
    let layout = operands.layout();
    let mut expected = None;
    for arg in 0..layout.arity {
        if !layout.vector[arg] {
            continue;
        }
        let got = layout.sizes[arg];
        match expected {
            None => expected = Some(got),
            Some(expected) if expected != got => {
                return Err(Error::SizeMismatch { arg, expected, got });
            }
            Some(_) => {}
        }
    }
    Ok(expected.unwrap_or(1))
}

// ══════════════════════════════════════════════
//  Collector
// ══════════════════════════════════════════════

/// Call-scoped flattening of a bundled function's arguments.
///
/// Slots are laid out argument by argument in element order; argument `k`
/// owns `offsets[k]..offsets[k + 1]`. `finish` consumes the collector, so it
/// runs exactly once and no write can follow it.
pub struct PartialsCollector<R: Bundle> {
    slots: R::Slots,
    offsets: [usize; MAX_OPERANDS + 1],
    vector: [bool; MAX_OPERANDS],
    max_size: usize,
}

impl<R: Bundle> PartialsCollector<R> {
    /// Reserve the slots, write the operand references and zero the
    /// partials. For a `Var` return the slots live on the active tape.
    ///
    /// Shapes are assumed valid; see [`try_new`](Self::try_new).
    pub fn new<O: Operands<R>>(operands: O) -> Self {
        let layout = operands.layout();
        let mut offsets = [0; MAX_OPERANDS + 1];
        for k in 0..MAX_OPERANDS {
            offsets[k + 1] = offsets[k] + layout.slots[k];
        }
        let slots = R::Slots::alloc(offsets[MAX_OPERANDS], |refs| {
            operands.write_refs(refs, &offsets)
        });

        PartialsCollector {
            slots,
            offsets,
            vector: layout.vector,
            max_size: layout.max_size(),
        }
    }

    /// [`new`](Self::new) after [`check_consistent_sizes`].
    pub fn try_new<O: Operands<R>>(operands: O) -> Result<Self> {
        check_consistent_sizes(&operands)?;
        Ok(Self::new(operands))
    }

    /// Total number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots owned by argument `k`.
    #[inline]
    pub fn slots(&self, k: usize) -> usize {
        self.offsets[k + 1] - self.offsets[k]
    }

    /// Offset of argument `k`'s first slot.
    #[inline]
    pub fn offset(&self, k: usize) -> usize {
        self.offsets[k]
    }

    /// Length of the longest argument.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Writable view onto argument `k`'s slots.
    #[inline]
    pub fn partials(&mut self, k: usize) -> PartialsView<'_, R> {
        assert!(k < MAX_OPERANDS, "argument index {k} out of range");
        PartialsView {
            slots: &mut self.slots,
            start: self.offsets[k],
            len: self.offsets[k + 1] - self.offsets[k],
            broadcast: !self.vector[k],
        }
    }

    /// Emit the result: a plain value, one tape node, or one dual.
    pub fn finish(self, value: R::Partial) -> R {
        R::finish(value, self.slots)
    }
}

/// Mutable window onto one argument's partials.
///
/// Scalar arguments broadcast: every element index maps to their single
/// slot, so per-element contributions sum. Writes to a constant argument
/// (no slots) are dropped.
pub struct PartialsView<'a, R: Bundle> {
    slots: &'a mut R::Slots,
    start: usize,
    len: usize,
    broadcast: bool,
}

impl<R: Bundle> PartialsView<'_, R> {
    #[inline]
    fn slot(&self, n: usize) -> usize {
        let i = if self.broadcast { 0 } else { n };
        assert!(i < self.len, "element {n} is past the end of a {}-slot argument", self.len);
        self.start + i
    }

    /// `partial[n] += v`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is past the end of an array-like argument.
    #[inline]
    pub fn add(&mut self, n: usize, v: R::Partial) {
        if self.len == 0 {
            return;
        }
        let i = self.slot(n);
        self.slots.update(i, |p| p + v);
    }

    /// `partial[n] = v`.
    #[inline]
    pub fn set(&mut self, n: usize, v: R::Partial) {
        if self.len == 0 {
            return;
        }
        let i = self.slot(n);
        self.slots.update(i, |_| v);
    }

    /// Current partial at element `n` (zero for constants).
    #[inline]
    pub fn get(&self, n: usize) -> R::Partial {
        if self.len == 0 {
            <R::Partial as Zero>::zero()
        } else {
            self.slots.get(self.slot(n))
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
