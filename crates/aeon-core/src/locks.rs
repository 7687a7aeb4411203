//! Per-game mutual exclusion.
//!
//! [`GameLocks`] is an arena of lock handles keyed by game. A handle is
//! created on first use and reused after that, so independent games never
//! contend. The scheduler prunes handles of games that stopped ticking.
//! Acquisition never waits: if a game's tick is already in flight the
//! caller skips that game for this cycle.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use aeon_types::GameId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Proof that the holder is the only tick in flight for a game.
pub type GameGuard = OwnedMutexGuard<()>;

/// Arena of per-game locks.
#[derive(Debug, Default)]
pub struct GameLocks {
    handles: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
}

impl GameLocks {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock for `game`. Returns `None` while another
    /// holder has it.
    pub fn try_acquire(&self, game: GameId) -> Option<GameGuard> {
        let handle = {
            // Inserts are single calls, so a poisoned map is still whole.
            let mut handles = self
                .handles
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(handles.entry(game).or_default())
        };
        handle.try_lock_owned().ok()
    }

    /// Drop the handles of games not in `live`. Handles still held by a
    /// tick are kept until a later call. Returns the number dropped.
    pub fn retain(&self, live: &HashSet<GameId>) -> usize {
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = handles.len();
        // A held handle has a second owner in its guard.
        handles.retain(|game, handle| live.contains(game) || Arc::strong_count(handle) > 1);
        before.saturating_sub(handles.len())
    }

    /// Number of games that have a lock handle.
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |h| h.len())
    }

    /// Whether no game has a lock handle yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let locks = GameLocks::new();
        let game = GameId::new();
        let guard = locks.try_acquire(game);
        assert!(guard.is_some());
        assert!(locks.try_acquire(game).is_none());
        drop(guard);
        assert!(locks.try_acquire(game).is_some());
    }

    #[test]
    fn games_do_not_contend() {
        let locks = GameLocks::new();
        let a = locks.try_acquire(GameId::new());
        let b = locks.try_acquire(GameId::new());
        assert!(a.is_some() && b.is_some());
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn handles_are_reused() {
        let locks = GameLocks::new();
        let game = GameId::new();
        for _ in 0..5 {
            drop(locks.try_acquire(game));
        }
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn retain_drops_idle_handles_of_dead_games() {
        let locks = GameLocks::new();
        let live = GameId::new();
        let idle = GameId::new();
        let busy = GameId::new();
        drop(locks.try_acquire(live));
        drop(locks.try_acquire(idle));
        let held = locks.try_acquire(busy);
        assert!(held.is_some());

        let keep = HashSet::from([live]);
        assert_eq!(locks.retain(&keep), 1);
        assert_eq!(locks.len(), 2);
        assert!(locks.try_acquire(busy).is_none());

        drop(held);
        assert_eq!(locks.retain(&keep), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn guard_can_move_into_a_task() {
        let locks = Arc::new(GameLocks::new());
        let game = GameId::new();
        let guard = locks.try_acquire(game);
        assert!(guard.is_some());
        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::task::yield_now().await;
        });
        assert!(handle.await.is_ok());
        assert!(locks.try_acquire(game).is_some());
    }
}
