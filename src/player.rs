//! The player side as read from the store document.

use crate::roster::{parse_party, RosterEntry};
use crate::settings::PartialSettings;
use crate::unlocks::PartialUnlocks;
use serde_json::{Map, Value};

/// The player's side as recorded in the authoritative store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPlayer {
    pub name: Option<String>,
    /// Filled party slots, in slot order.
    pub party: Vec<RosterEntry>,
    /// Box contents keyed by `storage_NN`.
    pub storage: Map<String, Value>,
    pub unlocks: PartialUnlocks,
    /// Bond-track unlocks; merged together with `unlocks`.
    pub bonds: PartialUnlocks,
    pub settings: PartialSettings,
    pub proficiency: u8,
    pub proficiency_up: i64,
}

impl StoredPlayer {
    /// Reads the player from a store document whose top level holds
    /// `player` and `settings`.
    pub fn from_document(doc: &Value) -> Self {
        let player = doc.get("player");
        let field = |key: &str| player.and_then(|p| p.get(key));

        Self {
            name: field("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            party: field("party").map(parse_party).unwrap_or_default(),
            storage: field("box")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            unlocks: PartialUnlocks::from_value(field("unlocks")),
            bonds: PartialUnlocks::from_value(field("bonds")),
            settings: PartialSettings::from_value(doc.get("settings")),
            proficiency: field("trainerProficiency")
                .and_then(Value::as_f64)
                .map(|n| n.clamp(0.0, 255.0) as u8)
                .unwrap_or(0),
            proficiency_up: field("proficiency_up")
                .and_then(Value::as_f64)
                .map(|n| n.trunc() as i64)
                .unwrap_or(0),
        }
    }

    pub fn has_party(&self) -> bool {
        !self.party.is_empty()
    }

    /// Finds a party member by species or nickname: exact (case-insensitive)
    /// first, then by base species or substring containment. Entries listed
    /// in `taken` are skipped.
    pub fn find_member(&self, name: &str, taken: &[usize]) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let candidates: Vec<(usize, &RosterEntry)> = self
            .party
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken.contains(i))
            .collect();

        let exact = candidates.iter().find(|(_, entry)| {
            entry.name.to_lowercase() == wanted
                || entry
                    .nickname
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase() == wanted)
        });
        if let Some((i, _)) = exact {
            return Some(*i);
        }

        let wanted_base = wanted.split('-').next().unwrap_or(&wanted);
        candidates
            .iter()
            .find(|(_, entry)| {
                let species = entry.name.to_lowercase();
                let species_base = species.split('-').next().unwrap_or(&species);
                species_base == wanted_base
                    || species.contains(&wanted)
                    || wanted.contains(&species)
            })
            .map(|(i, _)| *i)
    }
}
