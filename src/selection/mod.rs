//! Deterministic backend and variant selection.

pub mod selector;

pub use selector::{Selection, Selector};
