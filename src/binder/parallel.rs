//! Parallel Binding
//!
//! Uses Rayon to bind independent documents concurrently. All inputs share
//! the binder's hbm binding context, which is still compiled only once.

use rayon::prelude::*;

use super::{Binding, DocumentBinder};
use crate::error::Result;
use crate::origin::Origin;

impl DocumentBinder {
    /// Bind several in-memory documents in parallel
    ///
    /// Results are returned in input order; one failing document does not
    /// affect the others.
    pub fn bind_all<B>(&self, inputs: &[(B, Origin)]) -> Vec<Result<Binding>>
    where
        B: AsRef<[u8]> + Sync,
    {
        inputs
            .par_iter()
            .map(|(input, origin)| self.bind_bytes(input.as_ref(), origin))
            .collect()
    }
}
