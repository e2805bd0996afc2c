/// Shared building blocks for services
pub mod common;
/// Virtual dashboard media player
pub mod player;

pub use player::{PlayerCommand, PlayerService, PlayerSnapshot};
