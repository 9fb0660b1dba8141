use std::sync::Mutex;

use log::debug;
use mcdash_protocol::records::InstanceRecord;

use super::filter::RosterFilter;
use crate::utils::Event;

/// What a push-driven mutation did to the store. Every apply returns one and
/// the caller acts on it; nothing happens silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterOutcome {
    /// The store changed.
    Applied,
    /// The event carried nothing new for this store (duplicate create,
    /// delete of an unknown instance, filtered-out record).
    Ignored,
    /// The push state and the local state disagree in a way only an
    /// authoritative refetch can fix. The store did not guess.
    ResyncNeeded,
}

/// Change notification for observers driving toasts and counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterNotice {
    Created { id: String },
    Deleted { id: String },
}

struct RosterState {
    records: Vec<InstanceRecord>,
    total: u64,
    filter: RosterFilter,
}

/// Reconciling cache of the instance roster.
///
/// `replace_all` installs an authoritative snapshot; the `apply_*` calls
/// fold push events into it. Each mutation is atomic under one lock, so
/// observers never see a half-applied event.
pub struct RosterStore {
    state: Mutex<RosterState>,
    pub notices: Event<RosterNotice>,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RosterState {
                records: Vec::new(),
                total: 0,
                filter: RosterFilter::default(),
            }),
            notices: Event::new(),
        }
    }

    pub fn records(&self) -> Vec<InstanceRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn total(&self) -> u64 {
        self.state.lock().unwrap().total
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filter(&self) -> RosterFilter {
        self.state.lock().unwrap().filter.clone()
    }

    /// Replaces the filter. The caller is expected to follow up with an
    /// authoritative refetch; the store does not re-evaluate held records.
    pub fn set_filter(&self, filter: RosterFilter) {
        self.state.lock().unwrap().filter = filter;
    }

    /// Installs an authoritative snapshot: server-supplied order, fresh
    /// total. Always wins over whatever push state accumulated before it.
    pub fn replace_all(&self, records: Vec<InstanceRecord>, total: u64) {
        let mut state = self.state.lock().unwrap();
        debug!("roster resync: {} records, total {}", records.len(), total);
        state.records = records;
        state.total = total;
    }

    /// Folds a create event in: filter-gated, identity-deduped, newest
    /// first. Duplicate creates are idempotent no-ops.
    pub fn apply_create(&self, record: InstanceRecord) -> RosterOutcome {
        let id = {
            let mut state = self.state.lock().unwrap();
            if !state.filter.matches(&record) {
                return RosterOutcome::Ignored;
            }
            if state.records.iter().any(|r| r.id == record.id) {
                return RosterOutcome::Ignored;
            }
            let id = record.id.clone();
            state.records.insert(0, record);
            state.total += 1;
            id
        };
        self.notices.emit(RosterNotice::Created { id });
        RosterOutcome::Applied
    }

    /// Folds an update in. A held record is replaced in place, keeping its
    /// position. An update for an instance the store does not hold is never
    /// inserted: if it would be visible here, the store asks for a resync
    /// instead of guessing (the event may be a late echo of a deleted
    /// instance).
    pub fn apply_update(&self, id: &str, record: Option<InstanceRecord>) -> RosterOutcome {
        let mut state = self.state.lock().unwrap();
        if let Some(held) = state.records.iter_mut().find(|r| r.id == id) {
            match record {
                Some(record) => {
                    *held = record;
                    RosterOutcome::Applied
                }
                // An update without payload carries nothing applicable.
                None => RosterOutcome::Ignored,
            }
        } else {
            match record {
                Some(record) if !state.filter.matches(&record) => RosterOutcome::Ignored,
                _ => {
                    debug!("update for unheld instance {}, resync needed", id);
                    RosterOutcome::ResyncNeeded
                }
            }
        }
    }

    /// Folds a delete in: removal, total decrement, Deleted notice. Unknown
    /// ids are no-ops.
    pub fn apply_delete(&self, id: &str) -> RosterOutcome {
        {
            let mut state = self.state.lock().unwrap();
            let before = state.records.len();
            state.records.retain(|r| r.id != id);
            if state.records.len() == before {
                return RosterOutcome::Ignored;
            }
            state.total = state.total.saturating_sub(1);
        }
        self.notices.emit(RosterNotice::Deleted { id: id.to_string() });
        RosterOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mcdash_protocol::records::{LifecycleState, Players, Resources};
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: &str, game: &str) -> InstanceRecord {
        InstanceRecord {
            id: id.into(),
            minigame_type: game.into(),
            map: "default".into(),
            lifecycle_state: LifecycleState::Running,
            started_at: chrono::Utc::now(),
            players: Players::default(),
            resources: Resources::placeholder(),
            tps: 19.8,
            display_color: "blue".into(),
            version: None,
            java_version: None,
        }
    }

    #[test]
    fn replace_all_installs_server_order_and_total() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars"), record("b", "bedwars")], 25);
        let ids: Vec<String> = store.records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.total(), 25);
    }

    #[test]
    fn creates_prepend_and_dedup_by_identity() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars")], 1);

        assert_eq!(store.apply_create(record("b", "bedwars")), RosterOutcome::Applied);
        assert_eq!(store.apply_create(record("b", "bedwars")), RosterOutcome::Ignored);

        let ids: Vec<String> = store.records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.total(), 2);
    }

    #[test]
    fn creates_are_gated_by_the_filter() {
        let store = RosterStore::new();
        store.set_filter(RosterFilter::external("skywars"));
        assert_eq!(store.apply_create(record("a", "bedwars")), RosterOutcome::Ignored);
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn updates_replace_in_place_keeping_position() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars"), record("b", "bedwars")], 2);

        let mut updated = record("b", "bedwars");
        updated.map = "volcano".into();
        assert_eq!(store.apply_update("b", Some(updated)), RosterOutcome::Applied);

        let records = store.records();
        assert_eq!(records[1].id, "b");
        assert_eq!(records[1].map, "volcano");
    }

    #[test]
    fn update_without_payload_is_ignored_when_held() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars")], 1);
        assert_eq!(store.apply_update("a", None), RosterOutcome::Ignored);
    }

    #[test]
    fn delete_then_update_requests_resync_instead_of_resurrecting() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars")], 1);

        assert_eq!(store.apply_delete("a"), RosterOutcome::Applied);
        assert_eq!(
            store.apply_update("a", Some(record("a", "bedwars"))),
            RosterOutcome::ResyncNeeded
        );
        assert!(store.is_empty());
    }

    #[test]
    fn update_for_filtered_out_record_is_ignored() {
        let store = RosterStore::new();
        store.set_filter(RosterFilter::external("skywars"));
        assert_eq!(
            store.apply_update("a", Some(record("a", "bedwars"))),
            RosterOutcome::Ignored
        );
    }

    #[test]
    fn deletes_decrement_and_are_noops_when_absent() {
        let store = RosterStore::new();
        store.replace_all(vec![record("a", "bedwars")], 5);
        assert_eq!(store.apply_delete("a"), RosterOutcome::Applied);
        assert_eq!(store.total(), 4);
        assert_eq!(store.apply_delete("a"), RosterOutcome::Ignored);
        assert_eq!(store.total(), 4);
    }

    #[test]
    fn created_and_deleted_notices_fan_out() {
        let store = RosterStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.notices.subscribe(move |notice: RosterNotice| {
            sink.lock().unwrap().push(notice);
        });

        store.apply_create(record("a", "bedwars"));
        store.apply_delete("a");

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                RosterNotice::Created { id: "a".into() },
                RosterNotice::Deleted { id: "a".into() },
            ]
        );
    }
}
