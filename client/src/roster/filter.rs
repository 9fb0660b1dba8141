use mcdash_protocol::records::InstanceRecord;

/// Visibility predicate over the roster.
///
/// An external filter is imposed by a parent view (a per-minigame page); it
/// takes precedence over the user-chosen filter and the search text and is
/// never combined with them. Without any filter everything matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterFilter {
    pub external: Option<String>,
    pub user: Option<String>,
    pub search: Option<String>,
}

impl RosterFilter {
    pub fn external(game_type: impl Into<String>) -> Self {
        Self {
            external: Some(game_type.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &InstanceRecord) -> bool {
        if let Some(external) = &self.external {
            return record.minigame_type.eq_ignore_ascii_case(external);
        }

        if let Some(user) = &self.user {
            if !record.minigame_type.eq_ignore_ascii_case(user) {
                return false;
            }
        }

        match &self.search {
            Some(search) if !search.is_empty() => {
                let needle = search.to_lowercase();
                record.id.to_lowercase().contains(&needle)
                    || record.minigame_type.to_lowercase().contains(&needle)
                    || record.map.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use mcdash_protocol::records::{InstanceRecord, LifecycleState, Players, Resources};

    use super::*;

    fn record(id: &str, game: &str, map: &str) -> InstanceRecord {
        InstanceRecord {
            id: id.into(),
            minigame_type: game.into(),
            map: map.into(),
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
    fn no_filter_matches_everything() {
        let filter = RosterFilter::default();
        assert!(filter.matches(&record("bw-1", "bedwars", "aquarium")));
    }

    #[test]
    fn external_filter_wins_even_over_a_search_hit() {
        let filter = RosterFilter {
            external: Some("skywars".into()),
            user: None,
            search: Some("bw-1".into()),
        };
        // The search would match, the imposed game type does not.
        assert!(!filter.matches(&record("bw-1", "bedwars", "aquarium")));
        assert!(filter.matches(&record("sw-9", "skywars", "clouds")));
    }

    #[test]
    fn user_filter_and_search_combine() {
        let filter = RosterFilter {
            external: None,
            user: Some("bedwars".into()),
            search: Some("aqua".into()),
        };
        assert!(filter.matches(&record("bw-1", "bedwars", "aquarium")));
        assert!(!filter.matches(&record("bw-2", "bedwars", "volcano")));
        assert!(!filter.matches(&record("sw-1", "skywars", "aquarium")));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let filter = RosterFilter {
            external: None,
            user: None,
            search: Some("BEDWARS".into()),
        };
        assert!(filter.matches(&record("x-1", "bedwars", "aquarium")));
    }
}
