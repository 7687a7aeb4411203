//! Error types for the `aeon-world` crate.

use aeon_types::TypesError;

/// Errors that can occur during map generation and player placement.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Requested map dimensions are unusable.
    #[error("invalid map dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Why they were rejected.
        reason: &'static str,
    },

    /// A generation parameter is out of range.
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),

    /// Stored metadata cannot reproduce a map.
    #[error("invalid map metadata: {0}")]
    InvalidMetadata(String),

    /// A loaded tile set does not form a complete grid.
    #[error("incomplete tile field: {0}")]
    IncompleteField(String),

    /// No placement satisfies the non-overlap constraint for a player.
    /// Retry with a larger map or fewer players.
    #[error(
        "no viable starting position for player {player_index} of {players} on {width}x{height} map"
    )]
    NoViableStartingPosition {
        /// Zero-based index of the first player that could not be placed.
        player_index: usize,
        /// Number of players requested.
        players: usize,
        /// Map width.
        width: u32,
        /// Map height.
        height: u32,
    },

    /// A tile or location violated an entity invariant.
    #[error(transparent)]
    Types(#[from] TypesError),
}
