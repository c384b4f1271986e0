/*!
 * Part planning for multipart transfers
 *
 * A part is a contiguous byte range of exactly one file. The planner is pure:
 * given a size and a part size it produces the same ordered sequence every
 * time, and concatenating the parts in index order reproduces the file with no
 * gaps or overlaps.
 */

/// Minimum part size accepted by the remote store (5 MiB)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default part size (the store minimum)
pub const DEFAULT_PART_SIZE: u64 = MIN_PART_SIZE;

/// Default number of concurrent part workers
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on concurrent part workers
pub const MAX_WORKERS: usize = 16;

/// One contiguous byte range of a file, zero-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// Zero-based part index; also the wire `part_number`
    pub index: usize,

    /// Byte offset of the range within the file
    pub offset: u64,

    /// Length of the range; equals the part size for all parts but the last
    pub length: u64,
}

/// Compute the ordered part sequence for a file of `size` bytes.
///
/// `count = ceil(size / part_size)`; every part is `part_size` bytes long
/// except the last, which carries the remainder. A zero-byte file still
/// produces a single zero-length part so that empty objects round-trip
/// through the same code path.
pub fn plan_parts(size: u64, part_size: u64) -> Vec<Part> {
    assert!(part_size > 0, "part size must be positive");

    if size == 0 {
        return vec![Part {
            index: 0,
            offset: 0,
            length: 0,
        }];
    }

    let count = size.div_ceil(part_size);
    (0..count)
        .map(|i| {
            let offset = i * part_size;
            Part {
                index: i as usize,
                offset,
                length: part_size.min(size - offset),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parts must tile the file exactly: contiguous, ordered, no overlap.
    fn assert_tiles(size: u64, part_size: u64) {
        let parts = plan_parts(size, part_size);
        let mut expected_offset = 0;
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.index, i);
            assert_eq!(part.offset, expected_offset);
            expected_offset += part.length;
        }
        assert_eq!(expected_offset, size);
    }

    #[test]
    fn test_even_split() {
        let parts = plan_parts(3 * DEFAULT_PART_SIZE, DEFAULT_PART_SIZE);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.length == DEFAULT_PART_SIZE));
        assert_tiles(3 * DEFAULT_PART_SIZE, DEFAULT_PART_SIZE);
    }

    #[test]
    fn test_remainder_in_last_part() {
        let size = 2 * DEFAULT_PART_SIZE + 16;
        let parts = plan_parts(size, DEFAULT_PART_SIZE);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].length, DEFAULT_PART_SIZE);
        assert_eq!(parts[1].length, DEFAULT_PART_SIZE);
        assert_eq!(parts[2].length, 16);
        assert_tiles(size, DEFAULT_PART_SIZE);
    }

    #[test]
    fn test_single_small_file() {
        let parts = plan_parts(100, DEFAULT_PART_SIZE);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], Part { index: 0, offset: 0, length: 100 });
    }

    #[test]
    fn test_zero_size_yields_single_empty_part() {
        let parts = plan_parts(0, DEFAULT_PART_SIZE);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].length, 0);
    }

    #[test]
    fn test_at_most_one_short_part() {
        for size in [1, 7, 99, 100, 101, 999, 1000, 1001] {
            let parts = plan_parts(size, 100);
            let short = parts.iter().filter(|p| p.length < 100).count();
            assert!(short <= 1, "size {} produced {} short parts", size, short);
            assert_tiles(size, 100);
        }
    }
}
