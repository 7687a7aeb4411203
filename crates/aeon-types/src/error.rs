//! Invariant violations detected on entity records.
//!
//! These errors are raised at the boundary where a value is set or a record
//! is loaded, so the rest of the engine can assume well-formed entities.

use crate::ids::{GameId, PlayerId};

/// Errors describing malformed or inconsistent entity data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// A stored name did not match any variant of the enum.
    #[error("unknown {kind} value: {value}")]
    UnknownVariant {
        /// Name of the enum type.
        kind: &'static str,
        /// The unrecognised text.
        value: String,
    },

    /// The player roster of a game is inconsistent.
    #[error("game {game}: {reason}")]
    Roster {
        /// The offending game.
        game: GameId,
        /// What is wrong with the roster.
        reason: String,
    },

    /// The lifecycle timestamps of a game contradict its state.
    #[error("game {game}: {reason}")]
    Lifecycle {
        /// The offending game.
        game: GameId,
        /// What is wrong with the lifecycle fields.
        reason: String,
    },

    /// A player tried to join a game that already contains them.
    #[error("player {player} already joined game {game}")]
    AlreadyJoined {
        /// The game.
        game: GameId,
        /// The duplicate player.
        player: PlayerId,
    },

    /// The calendar would leave the representable range.
    #[error("year overflow in game {0}")]
    YearOverflow(GameId),

    /// A coordinate lies outside the map.
    #[error("location ({x}, {y}) outside map {width}x{height}")]
    OutOfBounds {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Map width.
        width: u32,
        /// Map height.
        height: u32,
    },

    /// A tile carries data that its terrain forbids.
    #[error("tile ({x}, {y}): {reason}")]
    Tile {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// What is wrong with the tile.
        reason: String,
    },
}
