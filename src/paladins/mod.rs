//! Paladins endpoints on top of the core kernel: wire types, their conversion to the
//! core models, player handles and the `PaladinsApi` client itself.

pub mod builder;
pub mod catalogs;
pub mod client;
pub mod conversions;
pub mod player;
pub mod types;

// Re-export main types for easier importing
pub use builder::PaladinsApiBuilder;
pub use catalogs::Catalogs;
pub use client::{PaladinsApi, PlayerSearch, PC_PLATFORMS, PLAYER_BATCH_SIZE};
pub use player::{PartialPlayer, PlayerIdentity};
