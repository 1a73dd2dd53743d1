//! Position and market inputs.
//!
//! Collaborators (contract readers, unit converters, reward clients) build
//! these records; the risk layer only reads them.

mod change;
mod snapshot;
mod types;

pub use change::{PositionAction, PositionChange};
pub(crate) use snapshot::validate_category;
pub use snapshot::PositionSnapshot;
pub use types::*;
