//! Magazine models.

pub mod magazine;

pub use magazine::Magazine;
