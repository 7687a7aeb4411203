//! Tick cadence.
//!
//! One tick is one in-world year. A started game is due when it has never
//! ticked, or when at least the tick interval of real time has passed since
//! its last tick. A stalled scheduler fires one tick per due game on its
//! next poll; missed years are not caught up.

use std::time::Duration;

use aeon_types::Game;
use chrono::{DateTime, Utc};

/// Default real time between two ticks of one game.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Whether `game` should tick at `now`.
///
/// Waiting games never tick. A clock that moved backwards counts as no
/// time elapsed.
pub fn should_tick(game: &Game, now: DateTime<Utc>, interval: Duration) -> bool {
    if !game.is_started() {
        return false;
    }
    let Some(last) = game.last_tick_at() else {
        return true;
    };
    now.signed_duration_since(last)
        .to_std()
        .is_ok_and(|elapsed| elapsed >= interval)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_types::PlayerId;
    use chrono::TimeDelta;

    use super::*;

    fn waiting_game(now: DateTime<Utc>) -> Game {
        Game::new(PlayerId::new(), 4, -5000, now).unwrap()
    }

    fn started_game(now: DateTime<Utc>) -> Game {
        let mut game = waiting_game(now);
        game.start(now).unwrap();
        game
    }

    #[test]
    fn waiting_games_never_tick() {
        let now = Utc::now();
        let game = waiting_game(now);
        assert!(!should_tick(&game, now, TICK_INTERVAL));
        assert!(!should_tick(&game, now + TimeDelta::days(1), TICK_INTERVAL));
    }

    #[test]
    fn first_tick_is_always_due() {
        let now = Utc::now();
        assert!(should_tick(&started_game(now), now, TICK_INTERVAL));
    }

    #[test]
    fn boundary_is_inclusive() {
        let now = Utc::now();
        let mut game = started_game(now);
        game.record_tick(now).unwrap();
        assert!(!should_tick(&game, now + TimeDelta::milliseconds(999), TICK_INTERVAL));
        assert!(should_tick(&game, now + TimeDelta::milliseconds(1000), TICK_INTERVAL));
        assert!(should_tick(&game, now + TimeDelta::seconds(3600), TICK_INTERVAL));
    }

    #[test]
    fn backwards_clock_is_not_due() {
        let now = Utc::now();
        let mut game = started_game(now);
        game.record_tick(now).unwrap();
        assert!(!should_tick(&game, now - TimeDelta::seconds(5), TICK_INTERVAL));
    }
}
