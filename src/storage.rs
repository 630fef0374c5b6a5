//! Party ⇄ box transfer planning.
//!
//! A plan is computed entirely from a snapshot and either rejected up front
//! or returned as a single [`StorePatch`]. Entries move as raw JSON so that
//! fields this crate does not model survive the trip.

use crate::errors::{TransferError, TransferResult};
use crate::roster::slot_key;
use crate::store::StorePatch;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

pub const BOX_KEY_PREFIX: &str = "storage_";
pub const PARTY_SLOTS: u8 = 6;

/// Fields that only make sense while an entry is in the party.
const PARTY_ONLY_FIELDS: [&str; 3] = ["slot", "currHp", "maxHp"];

/// What the user picked in the transfer UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSelection {
    /// Party slot numbers, 1-based.
    #[serde(default)]
    pub party_slots: Vec<u8>,
    /// Occupied box cells, by key.
    #[serde(default)]
    pub box_keys: Vec<String>,
    /// Number of empty box cells picked as destinations.
    #[serde(default)]
    pub empty_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Store,
    Retrieve,
    Swap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    pub kind: TransferKind,
    pub patch: StorePatch,
    /// Names moved from the party into the box.
    pub uploaded: Vec<String>,
    /// Names moved from the box into the party.
    pub downloaded: Vec<String>,
}

pub fn box_key(index: u32) -> String {
    format!("{}{:02}", BOX_KEY_PREFIX, index)
}

/// One past the highest `storage_NN` index in use, starting at 1.
pub fn next_box_index(boxed: &Map<String, Value>) -> u32 {
    boxed
        .keys()
        .filter_map(|key| key.strip_prefix(BOX_KEY_PREFIX))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .map_or(1, |max| max + 1)
}

/// The placeholder written into a party slot that was emptied.
pub fn empty_slot(slot: u8) -> Value {
    json!({
        "slot": slot,
        "name": null,
        "nickname": null,
        "gender": null,
        "lv": null,
        "quality": null,
        "nature": null,
        "ability": null,
        "shiny": false,
        "item": null,
        "mechanic": null,
        "teraType": null,
        "isAce": false,
        "isLead": false,
        "bonds": 0,
        "moves": {"move1": null, "move2": null, "move3": null, "move4": null},
        "stats_meta": {
            "ivs": {"hp": null, "atk": null, "def": null, "spa": null, "spd": null, "spe": null},
            "ev_level": 0,
            "ev_up": 0
        }
    })
}

fn to_box_format(entry: &Value) -> Value {
    let mut entry = entry.clone();
    if let Value::Object(map) = &mut entry {
        for field in PARTY_ONLY_FIELDS {
            map.remove(field);
        }
    }
    entry
}

fn to_party_format(entry: &Value, slot: u8) -> Value {
    let mut map = Map::new();
    map.insert("slot".to_string(), json!(slot));
    if let Value::Object(fields) = entry {
        for (key, value) in fields {
            if key != "slot" {
                map.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(map)
}

fn entry_name(entry: Option<&Value>) -> Option<&str> {
    entry?
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
}

struct PartyPick<'a> {
    slot: u8,
    entry: Option<&'a Value>,
}

impl PartyPick<'_> {
    fn name(&self) -> Option<&str> {
        entry_name(self.entry)
    }

    fn path(&self) -> String {
        format!("player.party.{}", slot_key(self.slot))
    }
}

/// Plans a transfer against a store document (`player.party`, `player.box`).
///
/// * filled party slots + empty box cells: store, counts must match;
/// * empty party slots + box entries: retrieve, counts must match;
/// * party slots (any filled) + box entries: swap pairwise in selection
///   order, with empty party slots pulling their box entry out.
pub fn plan_transfer(document: &Value, selection: &TransferSelection) -> TransferResult<TransferPlan> {
    if selection.party_slots.is_empty() {
        return Err(TransferError::NothingSelected);
    }
    if selection.box_keys.is_empty() && selection.empty_cells == 0 {
        return Err(TransferError::NothingSelected);
    }

    let player = document.get("player");
    let party = player.and_then(|p| p.get("party"));
    let boxed = player
        .and_then(|p| p.get("box"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let picks = selection
        .party_slots
        .iter()
        .map(|&slot| {
            if slot == 0 || slot > PARTY_SLOTS {
                return Err(TransferError::UnknownSlot(slot_key(slot)));
            }
            Ok(PartyPick {
                slot,
                entry: party.and_then(|p| p.get(slot_key(slot))),
            })
        })
        .collect::<TransferResult<Vec<_>>>()?;
    let box_entries = selection
        .box_keys
        .iter()
        .map(|key| match boxed.get(key) {
            Some(entry) if entry_name(Some(entry)).is_some() => Ok((key.as_str(), entry)),
            _ => Err(TransferError::UnknownBoxEntry(key.clone())),
        })
        .collect::<TransferResult<Vec<_>>>()?;

    let filled: Vec<&PartyPick> = picks.iter().filter(|p| p.name().is_some()).collect();
    let mut patch = StorePatch::new();
    let mut uploaded = Vec::new();
    let mut downloaded = Vec::new();

    let kind = if selection.empty_cells > 0 && !filled.is_empty() {
        if filled.len() != selection.empty_cells {
            return Err(TransferError::QuantityMismatch {
                selected: filled.len(),
                targets: selection.empty_cells,
            });
        }
        let mut next = next_box_index(&boxed);
        for pick in &filled {
            if let Some(entry) = pick.entry {
                patch.set(format!("player.box.{}", box_key(next)), to_box_format(entry));
                patch.set(pick.path(), empty_slot(pick.slot));
                uploaded.extend(pick.name().map(str::to_string));
                next += 1;
            }
        }
        TransferKind::Store
    } else if !box_entries.is_empty() && filled.is_empty() {
        if picks.len() != box_entries.len() {
            return Err(TransferError::QuantityMismatch {
                selected: box_entries.len(),
                targets: picks.len(),
            });
        }
        for (pick, (key, entry)) in picks.iter().zip(&box_entries) {
            patch.set(pick.path(), to_party_format(entry, pick.slot));
            patch.delete(format!("player.box.{}", key));
            downloaded.extend(entry_name(Some(entry)).map(str::to_string));
        }
        TransferKind::Retrieve
    } else if !box_entries.is_empty() {
        if picks.len() != box_entries.len() {
            return Err(TransferError::QuantityMismatch {
                selected: picks.len(),
                targets: box_entries.len(),
            });
        }
        for (pick, (key, entry)) in picks.iter().zip(&box_entries) {
            let box_path = format!("player.box.{}", key);
            patch.set(pick.path(), to_party_format(entry, pick.slot));
            match pick.entry.filter(|_| pick.name().is_some()) {
                Some(outgoing) => {
                    patch.set(box_path, to_box_format(outgoing));
                    uploaded.extend(pick.name().map(str::to_string));
                }
                None => {
                    patch.delete(box_path);
                }
            }
            downloaded.extend(entry_name(Some(entry)).map(str::to_string));
        }
        TransferKind::Swap
    } else {
        return Err(TransferError::InvalidCombination);
    };

    info!(
        ?kind,
        uploaded = uploaded.len(),
        downloaded = downloaded.len(),
        "planned storage transfer"
    );
    Ok(TransferPlan {
        kind,
        patch,
        uploaded,
        downloaded,
    })
}
