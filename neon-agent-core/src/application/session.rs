use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Turn, TurnKind};

/// Append-only turn log for one conversation thread.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    turns: RwLock<Arc<Vec<Turn>>>,
    active_run: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            turns: RwLock::new(Arc::new(Vec::new())),
            active_run: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Appends a turn, assigning the next sequence number (starting at 1).
    pub fn append(&self, kind: TurnKind) -> Turn {
        let mut guard = self.turns.write().unwrap_or_else(PoisonError::into_inner);
        // Copy-on-write: outstanding `History` snapshots keep the old vector.
        let turns = Arc::make_mut(&mut guard);
        let turn = Turn {
            seq: turns.last().map_or(1, |last| last.seq + 1),
            created_at: Utc::now(),
            kind,
        };
        turns.push(turn.clone());
        debug!(session_id = %self.id, seq = turn.seq, "Appended turn");
        turn
    }

    pub fn history(&self) -> History {
        let guard = self.turns.read().unwrap_or_else(PoisonError::into_inner);
        History {
            turns: Arc::clone(&guard),
        }
    }

    pub fn len(&self) -> usize {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claims the session for a run. Returns `None` while another run holds it.
    pub fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        self.active_run
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { session: self })
    }

    pub fn is_busy(&self) -> bool {
        self.active_run.load(Ordering::Acquire)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the session's run slot on drop.
pub struct RunGuard<'a> {
    session: &'a Session,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.session.active_run.store(false, Ordering::Release);
    }
}

/// Point-in-time view of a session's turns. Iterating it any number of times
/// yields the same turns; later appends are not visible.
#[derive(Debug, Clone)]
pub struct History {
    turns: Arc<Vec<Turn>>,
}

impl History {
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns with a sequence number greater than `seq`.
    pub fn after(&self, seq: u64) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(move |turn| turn.seq > seq)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
