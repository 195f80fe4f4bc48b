//! Application services layer.

pub mod error;
pub mod ingredients;
pub mod recipes;
pub mod repos;
