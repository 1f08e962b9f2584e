//! Types that represent the core data model: a `Movement` and its `MovementType`.
mod amount;
mod kind;
mod movement;

pub use amount::AmountError;
pub use kind::MovementType;
pub use movement::{Movement, DEFAULT_CONCEPT};
pub(crate) use movement::parse_iso_date;
