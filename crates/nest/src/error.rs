use core::fmt;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `nest` can produce.
///
/// Configuration errors come from [`SnowflakeGenerator::new`]; the rest are
/// surfaced by [`SnowflakeGenerator::next_id`] and
/// [`SnowflakeGenerator::next_ids`]. None of them are retried internally.
///
/// [`SnowflakeGenerator::new`]: crate::SnowflakeGenerator::new
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
/// [`SnowflakeGenerator::next_ids`]: crate::SnowflakeGenerator::next_ids
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Error {
    /// The datacenter ID is outside `0..=31`.
    InvalidDatacenterId {
        /// The rejected value.
        value: i64,
    },

    /// The worker ID is outside `0..=31`.
    InvalidWorkerId {
        /// The rejected value.
        value: i64,
    },

    /// The clock reported a time earlier than the last timestamp used to mint
    /// an ID. The generator refuses to produce IDs until the clock catches
    /// up again.
    ClockMovedBackwards {
        /// How far behind the last recorded timestamp the clock is, in
        /// milliseconds.
        millis: i64,
    },

    /// A batch request asked for fewer than 0 or more than
    /// [`MAX_BATCH_SIZE`] IDs.
    ///
    /// [`MAX_BATCH_SIZE`]: crate::layout::MAX_BATCH_SIZE
    BatchSizeOutOfRange {
        /// The requested batch size.
        count: i64,
    },

    /// The time elapsed since the epoch does not fit in the 41-bit timestamp
    /// field, either because the clock is earlier than the epoch or because
    /// the timestamp space is exhausted.
    TimestampOutOfRange {
        /// Milliseconds elapsed since the epoch.
        elapsed: i64,
    },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    LockPoisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDatacenterId { value } => write!(
                f,
                "datacenter id {value} out of range (0..={})",
                crate::layout::MAX_DATACENTER_ID
            ),
            Self::InvalidWorkerId { value } => write!(
                f,
                "worker id {value} out of range (0..={})",
                crate::layout::MAX_WORKER_ID
            ),
            Self::ClockMovedBackwards { millis } => write!(
                f,
                "clock moved backwards, refusing to generate id for {millis} milliseconds"
            ),
            Self::BatchSizeOutOfRange { count } => write!(
                f,
                "batch size {count} out of range (0..={})",
                crate::layout::MAX_BATCH_SIZE
            ),
            Self::TimestampOutOfRange { elapsed } => write!(
                f,
                "{elapsed} milliseconds since epoch does not fit in the timestamp field"
            ),
            #[cfg(not(feature = "parking-lot"))]
            Self::LockPoisoned => f.write_str("generator lock poisoned"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
