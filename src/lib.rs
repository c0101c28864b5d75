//! Public library API for copying runtime value graphs.

/// Value model, selective assignment, deep copy, and serde bridge helpers.
pub mod copy;
