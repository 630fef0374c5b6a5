//! Read-only species and move reference data.
//!
//! The default dex is compiled from `data/*.ron` by the build script and
//! decoded once on first use. Tests and custom deployments can build their
//! own with [`Dex::from_records`].

use crate::names::{base_species_name, fix_id_suffix, normalize_species_name, to_id};
use schema::{MoveRecord, SpeciesRecord};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, error, warn};

// Include the generated dex blobs
include!(concat!(env!("OUT_DIR"), "/compiled_dex.rs"));

static COMPILED_DEX: LazyLock<Dex> = LazyLock::new(Dex::decode_compiled);

#[derive(Debug, Clone, Default)]
pub struct Dex {
    species: HashMap<String, SpeciesRecord>,
    moves: Vec<MoveRecord>,
    move_index: HashMap<String, usize>,
}

impl Dex {
    /// The dex compiled into the binary.
    pub fn compiled() -> &'static Dex {
        &COMPILED_DEX
    }

    pub fn from_records<S, M>(species: S, moves: M) -> Self
    where
        S: IntoIterator<Item = SpeciesRecord>,
        M: IntoIterator<Item = MoveRecord>,
    {
        let species = species
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        let mut moves: Vec<MoveRecord> = moves.into_iter().collect();
        moves.sort_by(|a, b| a.id.cmp(&b.id));
        let move_index = moves
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
        Self {
            species,
            moves,
            move_index,
        }
    }

    fn decode_compiled() -> Self {
        let species = SPECIES_BLOBS
            .entries()
            .filter_map(|(id, bytes)| match SpeciesRecord::from_bytes(bytes) {
                Ok(record) => Some(record),
                Err(e) => {
                    error!(species = %id, error = %e, "corrupt compiled species record");
                    None
                }
            });
        let moves = MOVE_BLOBS
            .entries()
            .filter_map(|(id, bytes)| match MoveRecord::from_bytes(bytes) {
                Ok(record) => Some(record),
                Err(e) => {
                    error!(move_id = %id, error = %e, "corrupt compiled move record");
                    None
                }
            });
        let dex = Self::from_records(species, moves);
        debug!(
            species = dex.species.len(),
            moves = dex.moves.len(),
            "decoded compiled dex"
        );
        dex
    }

    pub fn species_by_id(&self, id: &str) -> Option<&SpeciesRecord> {
        self.species.get(id)
    }

    /// Resolves a free-text species name: normalized id, then the id with a
    /// regional adjective rewritten, then the base species. A miss is logged
    /// and returns `None`.
    pub fn lookup_species(&self, raw_name: &str) -> Option<&SpeciesRecord> {
        let normalized = normalize_species_name(raw_name);
        let id = to_id(&normalized);
        if let Some(record) = self.species.get(&id) {
            return Some(record);
        }

        if let Some(record) = fix_id_suffix(&to_id(raw_name)).and_then(|id| self.species.get(&id)) {
            return Some(record);
        }

        let base_id = to_id(base_species_name(&normalized));
        if base_id != id {
            if let Some(record) = self.species.get(&base_id) {
                debug!(requested = raw_name, resolved = %record.name, "using base species");
                return Some(record);
            }
        }

        warn!(species = raw_name, "species not found in dex");
        None
    }

    pub fn lookup_move(&self, name: &str) -> Option<&MoveRecord> {
        self.move_index
            .get(&to_id(name))
            .and_then(|&i| self.moves.get(i))
    }

    /// All moves, ordered by id.
    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }
}
