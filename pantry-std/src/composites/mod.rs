//! Composite cookers

mod share;

pub use share::{KeyShare, SHARE_OUTPUTS};
