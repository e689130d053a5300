use anyhow::{Context, Result};
use std::fmt;
use std::marker::PhantomData;

/// A stateless, fallible step that turns an `I` into an `O`.
///
/// Everything that runs on an item goes through this trait: image loading,
/// resizing, tensor conversion, normalizers and caller-supplied augmentations.
/// Steps compose with [`Transform::then`]; closures are lifted with [`from_fn`].
///
/// Implementations must be `Send + Sync` so a dataset holding them can be
/// read from several threads at once.
pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain::new(self, next)
    }
}

/// Two transforms run back to back (`A` then `B`).
/// `PhantomData<M>` pins the intermediate type.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>()
                )
            })
    }
}

/// Wraps a closure so it can be used wherever a [`Transform`] is expected.
///
/// ```ignore
/// let clamp = from_fn(|t: Tensor| Ok(t.clamp(0.0, 1.0)));
/// ```
pub fn from_fn<I, O, F>(f: F) -> FromFn<F>
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    FromFn(f)
}

/// See [`from_fn`].
#[derive(Clone, Copy)]
pub struct FromFn<F>(F);

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FromFn")
    }
}

impl<I, O, F> Transform<I, O> for FromFn<F>
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    fn apply(&self, input: I) -> Result<O> {
        (self.0)(input)
    }
}
