use std::fmt;

/// Identifies a single target polygon within a `TargetLayer`.
///
/// Ids are assigned contiguously from `0` in load order and survive into the written output,
/// so two target polygons sharing a bounding box never collapse into one accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

impl TargetId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}
