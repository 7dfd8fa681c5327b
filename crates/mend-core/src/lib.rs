pub mod classify;
pub mod diff;
pub mod hash;
pub mod types;

pub use classify::classify;
pub use types::*;
