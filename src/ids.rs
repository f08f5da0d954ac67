//! Work-ID allocation.
//!
//! Every orchestrator frame receives an [`IdRange`] by value. An internal frame over `L` tokens
//! names its two temporary files with IDs from its range and hands each recursive call a
//! sub-range sized for that call's subtree. A subtree over `k` tokens consumes exactly `2k - 2`
//! IDs, so the layout below is contiguous:
//!
//! ```text
//! start        left file
//! start + 1    left child range, 2 * n1 - 2 IDs
//! ...          right file
//! ...          right child range, 2 * n2 - 2 IDs
//! ```
//!
//! Sibling ranges never overlap, which is the only coordination the parallel subtrees need.

use std::fmt;

use crate::sort::SortError;

/// Temporary file identifier.
pub type WorkId = u64;

/// Half-open interval of work IDs `[start, start + budget)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    start: WorkId,
    budget: u64,
}

/// IDs assigned to one internal frame: its own two temporary files and the ranges of its
/// two recursive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carving {
    pub left_file: WorkId,
    pub left_child: IdRange,
    pub right_file: WorkId,
    pub right_child: IdRange,
}

impl IdRange {
    /// Creates a range of `budget` IDs starting at `start`.
    /// The budget is clamped so that the range does not run past [`WorkId::MAX`].
    pub fn new(start: WorkId, budget: u64) -> Self {
        IdRange {
            start,
            budget: budget.min(WorkId::MAX - start),
        }
    }

    /// Creates the widest range starting at `seed`.
    pub fn from_seed(seed: WorkId) -> Self {
        IdRange::new(seed, u64::MAX)
    }

    /// Number of IDs consumed by a subtree sorting `len` tokens.
    pub fn required(len: usize) -> u64 {
        (len as u64).saturating_mul(2).saturating_sub(2)
    }

    pub fn start(&self) -> WorkId {
        self.start
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// First ID past the range.
    pub fn end(&self) -> WorkId {
        self.start + self.budget
    }

    pub fn contains(&self, id: WorkId) -> bool {
        id >= self.start && id < self.end()
    }

    pub fn is_disjoint(&self, other: &IdRange) -> bool {
        self.end() <= other.start || other.end() <= self.start
    }

    /// Carves the IDs of an internal frame sorting `len` tokens out of this range.
    /// Fails if the range cannot hold `2 * len - 2` IDs.
    pub fn carve(&self, len: usize) -> Result<Carving, SortError> {
        let required = IdRange::required(len);
        if len < 2 || self.budget < required {
            return Err(SortError::IdRangeExhausted {
                range: *self,
                required,
            });
        }

        let left_len = (len + 1) / 2;
        let right_len = len / 2;

        let left_file = self.start;
        let left_child = IdRange::new(left_file + 1, IdRange::required(left_len));
        let right_file = left_child.end();
        let right_child = IdRange::new(right_file + 1, IdRange::required(right_len));

        return Ok(Carving {
            left_file,
            left_child,
            right_file,
            right_child,
        });
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
