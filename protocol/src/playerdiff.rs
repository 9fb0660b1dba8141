//! Joined/left computation between two successive player rosters of one
//! instance.

/// Result of diffing two roster snapshots. Order inside each list follows
/// the snapshot the entry came from; the diff itself is pure set
/// difference, so `joined` and `left` are disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl PlayerDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// `joined = next − previous`, `left = previous − next`.
pub fn diff(previous: &[String], next: &[String]) -> PlayerDiff {
    PlayerDiff {
        joined: next
            .iter()
            .filter(|p| !previous.contains(p))
            .cloned()
            .collect(),
        left: previous
            .iter()
            .filter(|p| !next.contains(p))
            .cloned()
            .collect(),
    }
}
