//! Local roster of running instances: filter predicate, reconciling store
//! and the player-presence tracker of the watched instance.

pub mod filter;
pub mod players;
pub mod store;

pub use filter::RosterFilter;
pub use players::{PlayerNotice, PlayerTracker};
pub use store::{RosterNotice, RosterOutcome, RosterStore};
