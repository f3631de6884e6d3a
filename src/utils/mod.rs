pub mod lookup;

pub use lookup::{find, Lookup, LookupKey, Named};
