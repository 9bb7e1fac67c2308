//! Split planning: decide whether a file is worth splitting and cut it into
//! contiguous parts.

use crate::config::TransferSettings;
use crate::types::{FilePart, TransferPlan};

/// Verdict on whether a file should be transferred in parallel parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Splitability {
    Splittable,
    Unsplittable { reason: String },
}

impl Splitability {
    pub fn is_splittable(&self) -> bool {
        matches!(self, Splitability::Splittable)
    }
}

/// Cuts files into chunk-sized parts according to the configured limits.
///
/// Plans are deterministic: the same file size always yields the same parts.
#[derive(Debug, Clone)]
pub struct Splitter {
    chunk_size: i64,
    min_multipart_size: i64,
    part_count_cap: u32,
}

impl Splitter {
    pub fn new(settings: &TransferSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            min_multipart_size: settings.min_multipart_size,
            part_count_cap: settings.part_count_cap,
        }
    }

    /// Judges whether `file_size` should be split.
    ///
    /// Small files are not worth the extra round-trips, and the store caps
    /// the number of parts per object.
    pub fn assess(&self, file_size: i64) -> Splitability {
        if file_size == 0 {
            return Splitability::Unsplittable {
                reason: "file is empty".into(),
            };
        }
        if file_size < self.min_multipart_size {
            return Splitability::Unsplittable {
                reason: format!(
                    "file size {} is below the multipart threshold {}",
                    file_size, self.min_multipart_size
                ),
            };
        }
        let parts = Self::part_count_for(file_size, self.chunk_size);
        if parts > self.part_count_cap as i64 {
            return Splitability::Unsplittable {
                reason: format!(
                    "chunk size {} would produce {} parts, exceeding the {}-part limit",
                    self.chunk_size, parts, self.part_count_cap
                ),
            };
        }
        Splitability::Splittable
    }

    /// Cuts `file_size` into chunk-sized contiguous parts.
    ///
    /// Only meaningful after a [`Splitability::Splittable`] verdict. All
    /// parts have the configured chunk size except the last, which absorbs
    /// the remainder, so the lengths always sum to `file_size` exactly.
    pub fn split(&self, file_size: i64) -> TransferPlan {
        debug_assert!(file_size > 0);
        let count = Self::part_count_for(file_size, self.chunk_size);
        let mut parts = Vec::with_capacity(count as usize);
        for index in 0..count {
            let offset = index * self.chunk_size;
            let length = self.chunk_size.min(file_size - offset);
            parts.push(FilePart {
                index: index as u32,
                offset,
                length,
            });
        }
        TransferPlan::new(parts, file_size, self.chunk_size)
    }

    /// Convenience: split when splittable, otherwise a whole-file plan.
    pub fn plan(&self, file_size: i64) -> (TransferPlan, Splitability) {
        let verdict = self.assess(file_size);
        let plan = match &verdict {
            Splitability::Splittable => self.split(file_size),
            Splitability::Unsplittable { .. } => TransferPlan::whole_file(file_size),
        };
        (plan, verdict)
    }

    fn part_count_for(file_size: i64, chunk_size: i64) -> i64 {
        (file_size + chunk_size - 1) / chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: i64, min_multipart_size: i64, part_count_cap: u32) -> Splitter {
        Splitter::new(&TransferSettings {
            chunk_size,
            min_multipart_size,
            part_count_cap,
            ..TransferSettings::default()
        })
    }

    #[test]
    fn parts_cover_the_file_exactly() {
        let splitter = splitter(3_000_000, 1, 10_000);
        let plan = splitter.split(10_000_000);

        assert_eq!(plan.part_count(), 4);
        let lengths: Vec<i64> = plan.parts().iter().map(|p| p.length).collect();
        assert_eq!(lengths, vec![3_000_000, 3_000_000, 3_000_000, 1_000_000]);

        // Contiguous, non-overlapping, starting at 0.
        let mut expected_offset = 0;
        for (i, part) in plan.parts().iter().enumerate() {
            assert_eq!(part.index, i as u32);
            assert_eq!(part.offset, expected_offset);
            expected_offset = part.end();
        }
        assert_eq!(expected_offset, 10_000_000);
    }

    #[test]
    fn exact_multiple_has_no_short_part() {
        let splitter = splitter(1_000, 1, 10_000);
        let plan = splitter.split(5_000);
        assert_eq!(plan.part_count(), 5);
        assert!(plan.parts().iter().all(|p| p.length == 1_000));
    }

    #[test]
    fn single_chunk_file_yields_one_part() {
        let splitter = splitter(1_000, 1, 10_000);
        let plan = splitter.split(999);
        assert_eq!(plan.part_count(), 1);
        assert_eq!(plan.parts()[0].length, 999);
    }

    #[test]
    fn split_is_deterministic() {
        let splitter = splitter(4_096, 1, 10_000);
        assert_eq!(splitter.split(1_234_567), splitter.split(1_234_567));
    }

    #[test]
    fn last_part_length_matches_remainder() {
        let splitter = splitter(3_000_000, 1, 10_000);
        for file_size in [10_000_000_i64, 9_000_000, 3_000_001, 7_500_000] {
            let plan = splitter.split(file_size);
            let n = plan.part_count() as i64;
            assert_eq!(n, (file_size + 3_000_000 - 1) / 3_000_000);
            let last = plan.parts().last().unwrap();
            assert_eq!(last.length, file_size - 3_000_000 * (n - 1));
        }
    }

    #[test]
    fn empty_file_is_unsplittable() {
        let splitter = splitter(1_000, 1, 10_000);
        assert!(!splitter.assess(0).is_splittable());
    }

    #[test]
    fn small_file_is_unsplittable() {
        let splitter = splitter(1_000, 1_000_000, 10_000);
        match splitter.assess(500) {
            Splitability::Unsplittable { reason } => {
                assert!(reason.contains("below the multipart threshold"));
            }
            Splitability::Splittable => panic!("500 bytes must not be splittable"),
        }
    }

    #[test]
    fn part_cap_rejects_tiny_chunks() {
        // 1 GiB in 64 KiB chunks would need 16384 parts.
        let splitter = splitter(64 * 1024, 1, 10_000);
        match splitter.assess(1024 * 1024 * 1024) {
            Splitability::Unsplittable { reason } => {
                assert!(reason.contains("part limit"));
            }
            Splitability::Splittable => panic!("part cap must reject this plan"),
        }
    }

    #[test]
    fn large_file_within_limits_is_splittable() {
        let splitter = splitter(8 * 1024 * 1024, 1_000_000, 10_000);
        assert!(splitter.assess(100 * 1024 * 1024).is_splittable());
    }

    #[test]
    fn plan_falls_back_to_whole_file() {
        let splitter = splitter(1_000, 1_000_000, 10_000);
        let (plan, verdict) = splitter.plan(500);
        assert!(!verdict.is_splittable());
        assert_eq!(plan.part_count(), 1);
        assert_eq!(plan.chunk_size(), 500);
        assert_eq!(plan.parts()[0].length, 500);
    }

    #[test]
    fn multi_terabyte_sizes_do_not_overflow() {
        let splitter = splitter(512 * 1024 * 1024, 1, 10_000);
        let four_tib = 4_i64 * 1024 * 1024 * 1024 * 1024;
        let plan = splitter.split(four_tib);
        assert_eq!(plan.parts().iter().map(|p| p.length).sum::<i64>(), four_tib);
        assert_eq!(plan.part_count() as i64, four_tib / (512 * 1024 * 1024));
    }
}
