//! Row-parallel evaluation with a sequential fallback.
//!
//! With the `parallel` feature this re-exports rayon's prelude; without it
//! `into_par_iter()` degrades to `into_iter()` so the same iterator chains
//! compile. Every helper here yields rows in order, so outputs do not depend
//! on how work was split across threads.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

/// Evaluate one row at a time and concatenate the rows (row-major).
pub(crate) fn collect_rows<T, F>(rows: usize, row_fn: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    (0..rows).into_par_iter().flat_map(row_fn).collect()
}

/// Compute one partial result per row, returned in row order.
///
/// Callers fold the partials sequentially so floating-point sums come out
/// the same whether or not rows ran in parallel.
pub(crate) fn row_partials<P, F>(rows: usize, row_fn: F) -> Vec<P>
where
    P: Send,
    F: Fn(usize) -> P + Sync + Send,
{
    (0..rows).into_par_iter().map(row_fn).collect()
}
