//! IRC message source types.

mod serialize;
mod types;

pub use self::types::Source;
