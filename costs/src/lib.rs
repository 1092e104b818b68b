#![deny(missing_docs)]
//! Interface crate to unify how staging operations' costs are passed and
//! retrieved.

pub mod context;

use std::ops::{Add, AddAssign};

pub use context::{CostContext, CostResult, CostsExt};

/// Piece of data representing what a staging operation touched
/// (approximately). Callers use it to decide when a buffer is large enough to
/// be flushed.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct OperationCost {
    /// How many map lookups were done.
    pub seek_count: u32,
    /// How many key and value bytes were staged.
    pub written_bytes: u64,
    /// How many value bytes were read back out of the buffer.
    pub loaded_bytes: u64,
    /// How many previously staged value bytes were replaced.
    pub freed_bytes: u64,
    /// How many chunk boundaries were added to the boundary index.
    pub boundary_writes: u32,
}

impl OperationCost {
    /// Helper function to build default `OperationCost` with different
    /// `seek_count`.
    pub fn with_seek_count(seek_count: u32) -> Self {
        OperationCost {
            seek_count,
            ..Default::default()
        }
    }

    /// Helper function to build default `OperationCost` with different
    /// `loaded_bytes`.
    pub fn with_loaded_bytes(loaded_bytes: u64) -> Self {
        OperationCost {
            loaded_bytes,
            ..Default::default()
        }
    }

    /// True if nothing was touched.
    pub fn is_nothing(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for OperationCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        OperationCost {
            seek_count: self.seek_count + rhs.seek_count,
            written_bytes: self.written_bytes + rhs.written_bytes,
            loaded_bytes: self.loaded_bytes + rhs.loaded_bytes,
            freed_bytes: self.freed_bytes + rhs.freed_bytes,
            boundary_writes: self.boundary_writes + rhs.boundary_writes,
        }
    }
}

impl AddAssign for OperationCost {
    fn add_assign(&mut self, rhs: Self) {
        self.seek_count += rhs.seek_count;
        self.written_bytes += rhs.written_bytes;
        self.loaded_bytes += rhs.loaded_bytes;
        self.freed_bytes += rhs.freed_bytes;
        self.boundary_writes += rhs.boundary_writes;
    }
}

/// Macro to achieve a kind of what `?` operator does, but with `CostContext` on
/// top: returns early on `Err`, wrapping the error with the cost accumulated
/// so far.
#[macro_export]
macro_rules! cost_return_on_error_no_add {
    ( $cost:expr, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result = { $($body)+ };
            match result {
                Ok(x) => x,
                Err(e) => return Err(e).wrap_with_cost($cost),
            }
        }
    };
}
