//! Order-preserving fan-out for independent evaluator calls.
//!
//! With the `parallel` feature the work runs on the rayon pool; results
//! always come back indexed like the input, so callers never depend on
//! completion order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map every item, in parallel when enabled, keeping input order.
pub fn ordered_map<T, R, F>(items: &[T], mapper: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        items.par_iter().map(mapper).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(mapper).collect()
    }
}

/// Sequential counterpart, used to check parallel output is identical.
pub fn sequential_map<T, R, F>(items: &[T], mapper: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(mapper).collect()
}
