// Battle Resolver Schema - Shared reference-data records
// This crate contains the species and move records that are shared between
// the main pkm-battle-resolver crate and its build script, enabling the use of
// postcard for compact compiled data.

// Re-export the main types
pub use pokemon_types::*;
pub use records::*;

pub mod pokemon_types;
pub mod records;
