//! Resource amounts tracked by the ledger.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A slice of cluster capacity: memory in megabytes and virtual cores.
///
/// Arithmetic is componentwise. Nothing here clamps; callers that need a
/// floored view (headroom) ask for it explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAmount {
    /// Memory in megabytes.
    pub memory: i64,
    /// Virtual cores.
    pub cores: i32,
}

impl ResourceAmount {
    /// The empty amount.
    pub const ZERO: Self = Self { memory: 0, cores: 0 };

    /// Create an amount from memory and cores.
    #[must_use]
    pub const fn new(memory: i64, cores: i32) -> Self {
        Self { memory, cores }
    }

    /// True if both components are zero or above.
    #[must_use]
    pub const fn is_non_negative(&self) -> bool {
        self.memory >= 0 && self.cores >= 0
    }

    /// Copy with memory floored at zero. Cores are left as they are.
    #[must_use]
    pub fn with_memory_floored(self) -> Self {
        Self {
            memory: self.memory.max(0),
            cores: self.cores,
        }
    }

    /// Subtract `other`, flooring each component at zero.
    ///
    /// Returns the floored result and whether any component would have gone
    /// negative.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> (Self, bool) {
        let raw = self - other;
        let underflow = !raw.is_non_negative();
        (
            Self {
                memory: raw.memory.max(0),
                cores: raw.cores.max(0),
            },
            underflow,
        )
    }
}

impl Add for ResourceAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            memory: self.memory + rhs.memory,
            cores: self.cores + rhs.cores,
        }
    }
}

impl AddAssign for ResourceAmount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ResourceAmount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            memory: self.memory - rhs.memory,
            cores: self.cores - rhs.cores,
        }
    }
}

impl SubAssign for ResourceAmount {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for ResourceAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<memory:{}, vCores:{}>", self.memory, self.cores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_componentwise_arithmetic() {
        let mut a = ResourceAmount::new(1024, 1);
        a += ResourceAmount::new(512, 2);
        assert_eq!(a, ResourceAmount::new(1536, 3));
        a -= ResourceAmount::new(1536, 1);
        assert_eq!(a, ResourceAmount::new(0, 2));
    }

    #[test]
    fn test_memory_floor_leaves_cores() {
        let limit = ResourceAmount::new(-100, -2);
        assert_eq!(limit.with_memory_floored(), ResourceAmount::new(0, -2));
    }

    #[test]
    fn test_saturating_sub_reports_underflow() {
        let (left, underflow) = ResourceAmount::new(512, 1).saturating_sub(ResourceAmount::new(1024, 1));
        assert!(underflow);
        assert_eq!(left, ResourceAmount::ZERO);

        let (left, underflow) = ResourceAmount::new(2048, 2).saturating_sub(ResourceAmount::new(1024, 1));
        assert!(!underflow);
        assert_eq!(left, ResourceAmount::new(1024, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceAmount::new(2048, 2).to_string(), "<memory:2048, vCores:2>");
    }
}
