//! Browser utilities.

pub mod dom;
