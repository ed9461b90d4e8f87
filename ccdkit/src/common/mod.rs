//! Common utilities for ccdkit.

pub mod parallel;

use crate::error::{Error, Result};

/// Allocate a vector of `len` copies of `value`, reporting failure instead of aborting.
///
/// `what` names the buffer in the resulting [`Error::Allocation`].
pub(crate) fn try_filled_vec<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { what, len })?;
    data.resize(len, value);
    Ok(data)
}
