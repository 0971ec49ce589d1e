//! Commitment/Root Store
//!
//! Exactly one live root per pool version. A transition is accepted only
//! when its `old_root` equals the live root; the replaced roots are kept
//! in a short history for audit queries but are never accepted again.

use std::collections::{BTreeMap, VecDeque};

use cloak_privacy::{PoolVersion, Root};

use crate::error::{Result, RouterError};

/// Past roots retained per version
pub const ROOT_HISTORY_SIZE: usize = 64;

#[derive(Debug, Clone)]
struct RootTrack {
    live: Root,
    history: VecDeque<Root>,
    transitions: u64,
}

impl RootTrack {
    fn new(live: Root) -> Self {
        Self {
            live,
            history: VecDeque::with_capacity(ROOT_HISTORY_SIZE),
            transitions: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootStore {
    tracks: BTreeMap<PoolVersion, RootTrack>,
}

impl RootStore {
    /// Every version starts at `Root::EMPTY` unless a root is supplied
    pub fn new(initial: impl IntoIterator<Item = (PoolVersion, Root)>) -> Self {
        let mut tracks: BTreeMap<PoolVersion, RootTrack> = PoolVersion::ALL
            .into_iter()
            .map(|v| (v, RootTrack::new(Root::EMPTY)))
            .collect();

        for (version, root) in initial {
            tracks.insert(version, RootTrack::new(root));
        }

        Self { tracks }
    }

    pub fn current(&self, version: PoolVersion) -> Root {
        self.tracks
            .get(&version)
            .map(|t| t.live)
            .unwrap_or(Root::EMPTY)
    }

    pub fn check_transition(&self, version: PoolVersion, old_root: &Root) -> Result<()> {
        let expected = self.current(version);
        if &expected != old_root {
            return Err(RouterError::RootMismatch {
                version,
                expected,
                got: *old_root,
            });
        }
        Ok(())
    }

    /// Swap the live root; `old_root` must still be live
    pub fn advance(&mut self, version: PoolVersion, old_root: &Root, new_root: Root) -> Result<()> {
        self.check_transition(version, old_root)?;

        let track = self
            .tracks
            .entry(version)
            .or_insert_with(|| RootTrack::new(Root::EMPTY));

        if track.history.len() == ROOT_HISTORY_SIZE {
            track.history.pop_front();
        }
        track.history.push_back(track.live);
        track.live = new_root;
        track.transitions += 1;
        Ok(())
    }

    /// Recently replaced roots, oldest first
    pub fn history(&self, version: PoolVersion) -> Vec<Root> {
        self.tracks
            .get(&version)
            .map(|t| t.history.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Transitions accepted since this store was built
    pub fn transitions(&self, version: PoolVersion) -> u64 {
        self.tracks.get(&version).map(|t| t.transitions).unwrap_or(0)
    }

    /// Live root of every version
    pub fn live_roots(&self) -> BTreeMap<PoolVersion, Root> {
        self.tracks.iter().map(|(v, t)| (*v, t.live)).collect()
    }
}

impl Default for RootStore {
    fn default() -> Self {
        Self::new([])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloak_privacy::FieldElement;

    fn root(v: u64) -> Root {
        Root(FieldElement::from_u64(v))
    }

    #[test]
    fn test_versions_start_empty() {
        let store = RootStore::default();
        for v in PoolVersion::ALL {
            assert_eq!(store.current(v), Root::EMPTY);
        }
    }

    #[test]
    fn test_advance_is_linear() {
        let mut store = RootStore::new([(PoolVersion::V3, root(1))]);

        store.advance(PoolVersion::V3, &root(1), root(2)).unwrap();
        store.advance(PoolVersion::V3, &root(2), root(3)).unwrap();

        assert_eq!(store.current(PoolVersion::V3), root(3));
        assert_eq!(store.history(PoolVersion::V3), vec![root(1), root(2)]);
        assert_eq!(store.transitions(PoolVersion::V3), 2);
    }

    #[test]
    fn test_stale_root_is_rejected() {
        let mut store = RootStore::new([(PoolVersion::V3, root(1))]);
        store.advance(PoolVersion::V3, &root(1), root(2)).unwrap();

        let err = store.advance(PoolVersion::V3, &root(1), root(9)).unwrap_err();
        match err {
            RouterError::RootMismatch {
                version,
                expected,
                got,
            } => {
                assert_eq!(version, PoolVersion::V3);
                assert_eq!(expected, root(2));
                assert_eq!(got, root(1));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.current(PoolVersion::V3), root(2));
    }

    #[test]
    fn test_versions_are_independent() {
        let mut store = RootStore::new([(PoolVersion::V2, root(10)), (PoolVersion::V3, root(20))]);
        store.advance(PoolVersion::V2, &root(10), root(11)).unwrap();

        assert_eq!(store.current(PoolVersion::V2), root(11));
        assert_eq!(store.current(PoolVersion::V3), root(20));
        assert!(store.check_transition(PoolVersion::V3, &root(11)).is_err());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = RootStore::default();
        let mut live = Root::EMPTY;
        for i in 1..=(ROOT_HISTORY_SIZE as u64 + 5) {
            store.advance(PoolVersion::V3, &live, root(i)).unwrap();
            live = root(i);
        }
        let history = store.history(PoolVersion::V3);
        assert_eq!(history.len(), ROOT_HISTORY_SIZE);
        assert_eq!(history.last(), Some(&root(ROOT_HISTORY_SIZE as u64 + 4)));
    }
}
