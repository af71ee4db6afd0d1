use std::sync::Arc;

use crate::error::Result;

/// A minimal interface for minting IDs.
///
/// Components that need IDs should depend on this trait and receive a shared
/// handle (typically an [`Arc`]) built once at startup, rather than reaching
/// for a process-wide global.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nest::{IdGenerator, NEST_EPOCH, SnowflakeGenerator};
///
/// fn mint_order_id(ids: &impl IdGenerator) -> nest::Result<i64> {
///     ids.next_id()
/// }
///
/// let generator = Arc::new(SnowflakeGenerator::new(1, 1, NEST_EPOCH).unwrap());
/// let id = mint_order_id(&generator).unwrap();
/// assert!(id > 0);
/// ```
pub trait IdGenerator {
    /// Generates the next available ID.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::next_id`].
    ///
    /// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
    fn next_id(&self) -> Result<i64>;

    /// Generates `count` IDs as one atomic batch.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::next_ids`].
    ///
    /// [`SnowflakeGenerator::next_ids`]: crate::SnowflakeGenerator::next_ids
    fn next_ids(&self, count: i64) -> Result<Vec<i64>>;
}

impl<G: IdGenerator + ?Sized> IdGenerator for Arc<G> {
    fn next_id(&self) -> Result<i64> {
        (**self).next_id()
    }

    fn next_ids(&self, count: i64) -> Result<Vec<i64>> {
        (**self).next_ids(count)
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn next_id(&self) -> Result<i64> {
        (**self).next_id()
    }

    fn next_ids(&self, count: i64) -> Result<Vec<i64>> {
        (**self).next_ids(count)
    }
}
