use std::collections::HashMap;
use std::time::{Duration, Instant};

use mcdash_protocol::playerdiff::diff;

/// One user-facing presence notification. `names` carries the affected
/// players; `message` is the display copy (singular for one player,
/// aggregated above that).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerNotice {
    Joined { names: Vec<String>, message: String },
    Left { names: Vec<String>, message: String },
}

/// Tracks player presence on the watched instance across successive roster
/// observations: computes who joined and left, arms a short highlight per
/// joined player and shapes the notification copy.
pub struct PlayerTracker {
    previous: Vec<String>,
    /// Highlight expiry per player. A re-join while highlighted re-arms the
    /// deadline, last write wins.
    highlights: HashMap<String, Instant>,
    window: Duration,
}

impl Default for PlayerTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl PlayerTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            previous: Vec::new(),
            highlights: HashMap::new(),
            window,
        }
    }

    /// Feeds the next observed roster and returns the notifications it
    /// produces. An unchanged roster produces none.
    pub fn observe(&mut self, roster: &[String], now: Instant) -> Vec<PlayerNotice> {
        let changes = diff(&self.previous, roster);
        self.previous = roster.to_vec();

        for name in &changes.joined {
            self.highlights.insert(name.clone(), now + self.window);
        }
        for name in &changes.left {
            self.highlights.remove(name);
        }

        let mut notices = Vec::new();
        if !changes.joined.is_empty() {
            notices.push(PlayerNotice::Joined {
                message: join_message(&changes.joined),
                names: changes.joined,
            });
        }
        if !changes.left.is_empty() {
            notices.push(PlayerNotice::Left {
                message: leave_message(&changes.left),
                names: changes.left,
            });
        }
        notices
    }

    /// True while the player's join highlight is still armed.
    pub fn is_highlighted(&self, name: &str, now: Instant) -> bool {
        self.highlights.get(name).is_some_and(|deadline| now < *deadline)
    }

    /// Drops expired highlight entries. Purely a size bound, visibility is
    /// already time-gated by `is_highlighted`.
    pub fn prune(&mut self, now: Instant) {
        self.highlights.retain(|_, deadline| now < *deadline);
    }
}

fn join_message(joined: &[String]) -> String {
    if joined.len() == 1 {
        format!("{} joined the server", joined[0])
    } else {
        format!("{} players joined the server", joined.len())
    }
}

fn leave_message(left: &[String]) -> String {
    if left.len() == 1 {
        format!("{} left the server", left[0])
    } else {
        format!("{} players left the server", left.len())
    }
}
