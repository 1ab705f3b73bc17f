//! Derived tables, flags and rollup counts computed in the database.
//!
//! These run after the loaders and write their results back into the
//! workspace so the reports can aggregate over them.

pub mod operational;
pub mod region;
pub mod traffic;
