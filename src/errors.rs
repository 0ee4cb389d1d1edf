use std::fmt::{self, Display, Formatter};

/// Failure reported by a node allocation strategy.
///
/// Only [`PatriciaSet::insert`](crate::PatriciaSet::insert) can surface it;
/// the set the error came from is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllocError {
    /// The strategy has no storage left to hand out.
    Exhausted,
    /// The strategy was asked for a size no configured pool accepts. This is
    /// a configuration bug, not a transient condition.
    UnsupportedSize(usize),
}

impl Display for AllocError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            AllocError::Exhausted => {
                write!(f, "node allocation failed: no storage available")
            }
            AllocError::UnsupportedSize(size) => {
                write!(f, "no configured pool accepts an allocation of {size} bytes")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}
