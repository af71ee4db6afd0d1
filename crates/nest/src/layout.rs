//! Bit layout of a generated ID.
//!
//! ```text
//!  Bit Index:  63           63 62            22 21               17 16             12 11             0
//!              +--------------+----------------+-------------------+----------------+---------------+
//!  Field:      | reserved (1) | timestamp (41) | datacenter ID (5) | worker ID (5)  | sequence (12) |
//!              +--------------+----------------+-------------------+----------------+---------------+
//!              |<------------------- MSB ------------- 64 bits ------------ LSB ------------------->|
//! ```
//!
//! The reserved bit is always zero, so every ID is a non-negative `i64`.

/// Width of the per-millisecond sequence counter.
pub const SEQUENCE_BITS: u32 = 12;

/// Width of the worker ID field.
pub const WORKER_ID_BITS: u32 = 5;

/// Width of the datacenter ID field.
pub const DATACENTER_ID_BITS: u32 = 5;

/// Width of the timestamp field (milliseconds since the epoch).
pub const TIMESTAMP_BITS: u32 = 41;

/// Number of bits to shift the worker ID to its position (bit 12).
pub const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;

/// Number of bits to shift the datacenter ID to its position (bit 17).
pub const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;

/// Number of bits to shift the timestamp to its position (bit 22).
pub const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

/// Largest valid worker ID (31).
pub const MAX_WORKER_ID: i64 = (1 << WORKER_ID_BITS) - 1;

/// Largest valid datacenter ID (31).
pub const MAX_DATACENTER_ID: i64 = (1 << DATACENTER_ID_BITS) - 1;

/// Largest number of milliseconds past the epoch the timestamp field can hold,
/// roughly 69.7 years.
pub const MAX_TIMESTAMP: i64 = (1 << TIMESTAMP_BITS) - 1;

/// Bitmask for the 12-bit sequence field.
pub const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

/// Upper bound on the number of IDs a single batch call may request. Kept well
/// under the 4096 IDs available per millisecond so that one batch holds the
/// lock for a bounded time.
pub const MAX_BATCH_SIZE: i64 = 1000;

const _: () = assert!(1 + TIMESTAMP_BITS + TIMESTAMP_SHIFT == 64);
const _: () = assert!(MAX_BATCH_SIZE <= SEQUENCE_MASK + 1);

/// Packs already-validated components into an ID.
#[inline]
pub(crate) const fn pack(elapsed: i64, datacenter_id: i64, worker_id: i64, sequence: i64) -> i64 {
    debug_assert!(elapsed >= 0 && elapsed <= MAX_TIMESTAMP, "timestamp overflow");
    debug_assert!(datacenter_id >= 0 && datacenter_id <= MAX_DATACENTER_ID, "datacenter_id overflow");
    debug_assert!(worker_id >= 0 && worker_id <= MAX_WORKER_ID, "worker_id overflow");
    debug_assert!(sequence >= 0 && sequence <= SEQUENCE_MASK, "sequence overflow");
    (elapsed << TIMESTAMP_SHIFT)
        | (datacenter_id << DATACENTER_ID_SHIFT)
        | (worker_id << WORKER_ID_SHIFT)
        | sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_match_field_widths() {
        assert_eq!(WORKER_ID_SHIFT, 12);
        assert_eq!(DATACENTER_ID_SHIFT, 17);
        assert_eq!(TIMESTAMP_SHIFT, 22);
        assert_eq!(MAX_WORKER_ID, 31);
        assert_eq!(MAX_DATACENTER_ID, 31);
        assert_eq!(SEQUENCE_MASK, 4095);
    }

    #[test]
    fn pack_places_fields_most_significant_first() {
        let id = pack(1000, 1, 1, 0);
        assert_eq!(id, (1000 << 22) | (1 << 17) | (1 << 12));

        let max = pack(MAX_TIMESTAMP, MAX_DATACENTER_ID, MAX_WORKER_ID, SEQUENCE_MASK);
        assert_eq!(max, i64::MAX);
    }
}
