pub mod alert;
pub mod lot;

pub use alert::{Alert, Direction};
pub use lot::Lot;
