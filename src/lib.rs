//! Pokemon Battle Resolver
//!
//! Turns the loosely-structured battle declarations an agent writes into its
//! chat messages into complete, validated battle payloads for a front-end
//! battle engine, folding persisted training progress back into the player's
//! stored party along the way.

// --- MODULE DECLARATIONS ---
pub mod config;
pub mod declaration;
pub mod dex;
pub mod errors;
pub mod extract;
pub mod generator;
pub mod names;
pub mod payload;
pub mod pipeline;
pub mod player;
pub mod reconcile;
pub mod resolver;
pub mod roster;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod summary;
pub mod unlocks;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{MoveCategory, MoveRecord, PokemonType, SpeciesRecord};

// --- From this crate's modules (`src/`) ---

// Configuration and reference data.
pub use config::ResolverConfig;
pub use dex::Dex;

// The one-shot pipeline and its pieces.
pub use declaration::BattleDeclaration;
pub use payload::BattlePayload;
pub use pipeline::{process_message, MessageOutcome, PipelineInputs, SkipReason};
pub use resolver::{ResolvedBattle, ResolvedTrainer, Resolver, TrainerKind};
pub use roster::RosterEntry;

// Persistence and the long-running session.
pub use player::StoredPlayer;
pub use reconcile::Reconciler;
pub use session::{Session, SessionEvent, SessionHandle, SkipCause};
pub use storage::{plan_transfer, TransferKind, TransferSelection};
pub use store::{InMemoryStore, StateStore, StoreClient, StorePatch, StoreSnapshot};
pub use summary::TeamSummary;

#[cfg(test)]
mod tests;
