//! Values, suppliers of values, and nested deferred values.
//!
//! Fallbacks, delayed payloads and rejection reasons can each be given in
//! three shapes. [`ValueSource::resolve`] flattens them: suppliers are called
//! lazily and at most once, and nested deferred values are awaited until a
//! plain outcome remains.

use super::Deferred;
use std::fmt;

/// A value, a deferred value, or a supplier of either.
pub enum ValueSource<T, E> {
    /// A ready value.
    Value(T),
    /// Called once, at resolution time.
    Supplier(Box<dyn FnOnce() -> ValueSource<T, E>>),
    /// Adopts whatever this settles to.
    Deferred(Deferred<T, E>),
}

impl<T, E> ValueSource<T, E> {
    /// Wraps a ready value.
    pub const fn value(value: T) -> Self {
        Self::Value(value)
    }

    /// Wraps a supplier that may yield any shape, including another supplier.
    pub fn supplier<F>(supplier: F) -> Self
    where
        F: FnOnce() -> Self + 'static,
    {
        Self::Supplier(Box::new(supplier))
    }

    /// Wraps a supplier of a plain value.
    pub fn lazy<F>(supplier: F) -> Self
    where
        F: FnOnce() -> T + 'static,
    {
        Self::Supplier(Box::new(move || Self::Value(supplier())))
    }

    /// Wraps a deferred value.
    pub const fn deferred(deferred: Deferred<T, E>) -> Self {
        Self::Deferred(deferred)
    }
}

impl<T: Clone, E: Clone> ValueSource<T, E> {
    /// Produces the final outcome.
    ///
    /// A ready value fulfils. A nested deferred value passes its outcome
    /// through unchanged, success or failure.
    pub async fn resolve(self) -> Result<T, E> {
        let mut source = self;
        loop {
            match source {
                Self::Value(value) => return Ok(value),
                Self::Supplier(supplier) => source = supplier(),
                Self::Deferred(deferred) => return deferred.await,
            }
        }
    }
}

impl<T, E> From<Deferred<T, E>> for ValueSource<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Self::Deferred(deferred)
    }
}

impl<T, E> fmt::Debug for ValueSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("ValueSource::Value(..)"),
            Self::Supplier(_) => f.write_str("ValueSource::Supplier(..)"),
            Self::Deferred(deferred) => f
                .debug_tuple("ValueSource::Deferred")
                .field(deferred)
                .finish(),
        }
    }
}
