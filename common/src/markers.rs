use bevy_ecs::prelude::*;

// Marker components to disambiguate entity archetypes.
#[derive(Component, Debug, Default)]
pub struct PlayerMarker;

#[derive(Component, Debug, Default)]
pub struct BotMarker;

// Entities that portals may move.
#[derive(Component, Debug, Default)]
pub struct TravellerMarker;

#[derive(Component, Debug, Default)]
pub struct RailBeamMarker;
