#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::{Error, Result},
    generator::{IdGenerator, Mutex, MutexGuard},
    layout::{self, MAX_BATCH_SIZE, MAX_DATACENTER_ID, MAX_TIMESTAMP, MAX_WORKER_ID, SEQUENCE_MASK},
    time::{SystemClock, TimeSource},
};

/// Sentinel stored in `last_timestamp` before the first ID is minted.
const NO_TIMESTAMP: i64 = -1;

#[derive(Debug)]
struct State {
    last_timestamp: i64,
    sequence: i64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Each ID packs the milliseconds elapsed since `epoch`, the datacenter ID,
/// the worker ID and a per-millisecond sequence into a non-negative `i64`
/// (see [`layout`](crate::layout)). Mutable state sits behind a single
/// mutex held for the whole generation step, clock read included, so callers
/// on any number of threads observe one linear sequence of IDs.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Strictly increasing IDs across successful calls
/// - ✅ Refuses to mint when the clock moves backwards
///
/// Construct it once at startup and share it with an [`Arc`](std::sync::Arc).
///
/// # Example
///
/// ```
/// use nest::{NEST_EPOCH, SnowflakeGenerator};
///
/// let generator = SnowflakeGenerator::new(1, 1, NEST_EPOCH).unwrap();
///
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(a < b);
/// ```
#[derive(Debug)]
pub struct SnowflakeGenerator<T = SystemClock> {
    datacenter_id: i64,
    worker_id: i64,
    epoch: i64,
    state: Mutex<State>,
    time: T,
}

impl SnowflakeGenerator {
    /// Creates a generator for the given node identity that reads the system
    /// wall clock.
    ///
    /// # Parameters
    ///
    /// - `datacenter_id`: must be in `0..=31`.
    /// - `worker_id`: must be in `0..=31`.
    /// - `epoch`: the zero point of the timestamp field, in milliseconds since
    ///   the Unix epoch. Every generator in a fleet must share it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] or [`Error::InvalidDatacenterId`] if
    /// either ID is out of range. This is a configuration error; retrying with
    /// the same values will fail again.
    pub fn new(datacenter_id: i64, worker_id: i64, epoch: i64) -> Result<Self> {
        Self::with_time_source(datacenter_id, worker_id, epoch, SystemClock)
    }
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator that reads time from `time` instead of the system
    /// clock.
    ///
    /// # Errors
    ///
    /// Same as [`SnowflakeGenerator::new`].
    pub fn with_time_source(
        datacenter_id: i64,
        worker_id: i64,
        epoch: i64,
        time: T,
    ) -> Result<Self> {
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(Error::InvalidWorkerId { value: worker_id });
        }
        if !(0..=MAX_DATACENTER_ID).contains(&datacenter_id) {
            return Err(Error::InvalidDatacenterId {
                value: datacenter_id,
            });
        }

        Ok(Self {
            datacenter_id,
            worker_id,
            epoch,
            state: Mutex::new(State {
                last_timestamp: NO_TIMESTAMP,
                sequence: 0,
            }),
            time,
        })
    }

    /// Returns the datacenter ID packed into every minted ID, in `0..=31`.
    pub const fn datacenter_id(&self) -> i64 {
        self.datacenter_id
    }

    /// Returns the worker ID packed into every minted ID, in `0..=31`.
    pub const fn worker_id(&self) -> i64 {
        self.worker_id
    }

    /// Returns the epoch, in milliseconds since the Unix epoch, that the
    /// timestamp field counts from.
    pub const fn epoch(&self) -> i64 {
        self.epoch
    }

    /// Returns the millisecond timestamp (since the Unix epoch) of the most
    /// recently minted ID, or `None` if no ID has been minted yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if another thread panicked while
    /// holding the lock (std mutex only).
    pub fn last_timestamp(&self) -> Result<Option<i64>> {
        let state = self.lock()?;
        Ok((state.last_timestamp != NO_TIMESTAMP).then_some(state.last_timestamp))
    }

    /// Generates the next ID.
    ///
    /// If 4096 IDs have already been minted in the current millisecond, this
    /// spins on the clock until the next millisecond begins and mints the ID
    /// there.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reports a time earlier
    ///   than the last minted ID. The generator state is left untouched, so a
    ///   later call succeeds once the clock catches up.
    /// - [`Error::TimestampOutOfRange`] if the clock is before the epoch or
    ///   beyond the 41-bit timestamp range.
    /// - [`Error::LockPoisoned`] if the lock was poisoned (std mutex only).
    ///
    /// # Example
    ///
    /// ```
    /// use nest::{Error, NEST_EPOCH, SnowflakeGenerator};
    ///
    /// let generator = SnowflakeGenerator::new(3, 7, NEST_EPOCH).unwrap();
    /// match generator.next_id() {
    ///     Ok(id) => assert!(id > 0),
    ///     Err(Error::ClockMovedBackwards { millis }) => {
    ///         eprintln!("clock went back {millis} ms, try again later");
    ///     }
    ///     Err(e) => panic!("generator error: {e}"),
    /// }
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<i64> {
        let mut state = self.lock()?;
        self.next_id_locked(&mut state)
    }

    /// Generates `count` IDs under a single lock acquisition.
    ///
    /// The result is identical to `count` back-to-back calls to
    /// [`SnowflakeGenerator::next_id`] with no other caller interleaving.
    /// The batch is all-or-nothing: if any step fails, no IDs are returned.
    /// IDs consumed by a failed batch are never handed out again.
    ///
    /// # Errors
    ///
    /// - [`Error::BatchSizeOutOfRange`] if `count` is negative or greater than
    ///   [`MAX_BATCH_SIZE`]. Checked before any ID is minted.
    /// - Any error of [`SnowflakeGenerator::next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_ids(&self, count: i64) -> Result<Vec<i64>> {
        if !(0..=MAX_BATCH_SIZE).contains(&count) {
            return Err(Error::BatchSizeOutOfRange { count });
        }

        // Bounded by MAX_BATCH_SIZE above.
        let len = count as usize;
        let mut ids = Vec::with_capacity(len);

        let mut state = self.lock()?;
        for _ in 0..len {
            ids.push(self.next_id_locked(&mut state)?);
        }
        Ok(ids)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    fn next_id_locked(&self, state: &mut State) -> Result<i64> {
        let mut timestamp = self.time.current_millis();

        if timestamp < state.last_timestamp {
            return Err(Self::cold_clock_behind(timestamp, state.last_timestamp));
        }

        let sequence = if timestamp == state.last_timestamp {
            let sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if sequence == 0 {
                timestamp = self.til_next_millis(state.last_timestamp);
            }
            sequence
        } else {
            0
        };

        let elapsed = timestamp.saturating_sub(self.epoch);
        if !(0..=MAX_TIMESTAMP).contains(&elapsed) {
            return Err(Error::TimestampOutOfRange { elapsed });
        }

        state.last_timestamp = timestamp;
        state.sequence = sequence;

        Ok(layout::pack(
            elapsed,
            self.datacenter_id,
            self.worker_id,
            sequence,
        ))
    }

    /// Spins until the clock reports a millisecond strictly after
    /// `last_timestamp`.
    fn til_next_millis(&self, last_timestamp: i64) -> i64 {
        #[cfg(feature = "tracing")]
        tracing::debug!(last_timestamp, "sequence exhausted, waiting for next millisecond");

        loop {
            let timestamp = self.time.current_millis();
            if timestamp > last_timestamp {
                break timestamp;
            }
            core::hint::spin_loop();
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: i64, last_timestamp: i64) -> Error {
        let millis = last_timestamp.saturating_sub(now);
        debug_assert!(millis > 0);

        #[cfg(feature = "tracing")]
        tracing::warn!(millis, "clock moved backwards, refusing to generate id");

        Error::ClockMovedBackwards { millis }
    }
}

impl<T> IdGenerator for SnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn next_id(&self) -> Result<i64> {
        self.next_id()
    }

    fn next_ids(&self, count: i64) -> Result<Vec<i64>> {
        self.next_ids(count)
    }
}
