//! Shared type definitions for the Aeon world simulation.
//!
//! This crate is the single source of truth for the entities every other
//! Aeon crate passes around. Types flow to `TypeScript` via `ts-rs` for the
//! external API layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Lifecycle, terrain, climate, resource and unit enums
//! - [`structs`] -- Games, tiles, generation metadata, units, settlements
//! - [`calendar`] -- Year formatting
//! - [`error`] -- Invariant violations

pub mod calendar;
pub mod enums;
pub mod error;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use calendar::format_year;
pub use enums::{
    CircleType, ClimateZone, GameState, ImprovementTag, ResourceTag, SettlementType, TerrainType,
    UnitType,
};
pub use error::TypesError;
pub use ids::{GameId, PlayerId, SettlementId, UnitId};
pub use structs::{
    Footprint, Game, GameRecord, GreatCircle, Location, MAX_ELEVATION, MIN_ELEVATION, MapMetadata,
    MapTile, Settlement, StartingPosition, Unit, Vec3,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::GameId::export_all();
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::UnitId::export_all();
        let _ = crate::ids::SettlementId::export_all();

        // Enums
        let _ = crate::enums::GameState::export_all();
        let _ = crate::enums::TerrainType::export_all();
        let _ = crate::enums::ClimateZone::export_all();
        let _ = crate::enums::CircleType::export_all();
        let _ = crate::enums::ResourceTag::export_all();
        let _ = crate::enums::ImprovementTag::export_all();
        let _ = crate::enums::UnitType::export_all();
        let _ = crate::enums::SettlementType::export_all();

        // Structs
        let _ = crate::structs::Location::export_all();
        let _ = crate::structs::GameRecord::export_all();
        let _ = crate::structs::MapTile::export_all();
        let _ = crate::structs::Vec3::export_all();
        let _ = crate::structs::GreatCircle::export_all();
        let _ = crate::structs::MapMetadata::export_all();
        let _ = crate::structs::Footprint::export_all();
        let _ = crate::structs::StartingPosition::export_all();
        let _ = crate::structs::Unit::export_all();
        let _ = crate::structs::Settlement::export_all();
    }
}
