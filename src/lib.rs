pub mod core;
pub mod paladins;
pub mod utils;

pub use crate::core::{
    cache::CacheKey,
    config::ClientConfig,
    errors::ApiError,
    expander::ResolveState,
    types::*,
};
pub use paladins::{PaladinsApi, PaladinsApiBuilder, PartialPlayer, PlayerIdentity, PlayerSearch};
