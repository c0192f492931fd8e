//! Persona bundle assembly.
//!
//! Each of a fixed number of slots is bound to one category per run; its
//! directory is rebuilt from the cache and a shuffled playlist is written per
//! language. How a slot gets its category is a pluggable
//! [`CategoryAssigner`].

pub mod assembler;
pub mod assignment;

// Re-export commonly used types
pub use assembler::{playlist_name, slot_dir_name, AssemblyReport, PersonaAssembler, SlotReport};
pub use assignment::{
    ChainAssigner, CategoryAssigner, DefaultTableAssigner, InteractiveAssigner, PositionalAssigner,
};
