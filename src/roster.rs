//! Roster entries: the creature records shared by the store, declarations and
//! the resolved payload.
//!
//! Deserialization is lenient. Agent output and hand-edited stores carry
//! stringly numbers, move maps and unknown enum spellings, so every optional
//! field that fails to parse is treated as absent instead of rejecting the
//! whole entry. The raw value of a field that fails to parse is kept in
//! `extra`, so a stored entry passed through verbatim loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

pub const MAX_MOVES: usize = 4;
pub const MAX_IV: u8 = 31;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Nature {
    Hardy,
    Lonely,
    Brave,
    Adamant,
    Naughty,
    Bold,
    Docile,
    Relaxed,
    Impish,
    Lax,
    Timid,
    Hasty,
    Serious,
    Jolly,
    Naive,
    Modest,
    Mild,
    Quiet,
    Bashful,
    Rash,
    Calm,
    Gentle,
    Sassy,
    Careful,
    Quirky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    #[serde(rename = "M")]
    #[strum(serialize = "M", serialize = "male", serialize = "♂")]
    Male,
    #[serde(rename = "F")]
    #[strum(serialize = "F", serialize = "female", serialize = "♀")]
    Female,
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown", serialize = "N", serialize = "genderless", serialize = "⚪")]
    Unknown,
}

impl Gender {
    pub fn symbol(self) -> &'static str {
        match self {
            Gender::Male => "♂",
            Gender::Female => "♀",
            Gender::Unknown => "⚪",
        }
    }
}

/// Individual-value generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Quality {
    Low,
    #[strum(serialize = "medium", serialize = "normal")]
    Medium,
    High,
    Perfect,
}

/// Once-per-battle transformation mechanic declared on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Mechanic {
    #[strum(serialize = "mega")]
    Mega,
    #[strum(serialize = "zmove", serialize = "z_move", serialize = "z-move", serialize = "z")]
    Zmove,
    #[strum(serialize = "dynamax", serialize = "gmax", serialize = "gigantamax")]
    Dynamax,
    #[strum(serialize = "tera", serialize = "terastal", serialize = "terastallize")]
    Tera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndividualValues {
    pub hp: u8,
    pub atk: u8,
    pub def: u8,
    pub spa: u8,
    pub spd: u8,
    pub spe: u8,
}

impl IndividualValues {
    pub const PERFECT: IndividualValues = IndividualValues::splat(MAX_IV);

    pub const fn splat(value: u8) -> Self {
        Self {
            hp: value,
            atk: value,
            def: value,
            spa: value,
            spd: value,
            spe: value,
        }
    }

    pub fn from_array(values: [u8; 6]) -> Self {
        let [hp, atk, def, spa, spd, spe] = values.map(|v| v.min(MAX_IV));
        Self {
            hp,
            atk,
            def,
            spa,
            spd,
            spe,
        }
    }

    pub fn to_array(self) -> [u8; 6] {
        [self.hp, self.atk, self.def, self.spa, self.spd, self.spe]
    }

    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|&v| v <= MAX_IV)
    }

    pub fn total(&self) -> u16 {
        self.to_array().iter().map(|&v| v as u16).sum()
    }

    /// Stats at the maximum value.
    pub fn perfect_count(&self) -> usize {
        self.to_array().iter().filter(|&&v| v == MAX_IV).count()
    }
}

/// Statistical bookkeeping stored alongside each entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsMeta {
    #[serde(default, deserialize_with = "lenient::ivs", skip_serializing_if = "Option::is_none")]
    pub ivs: Option<IndividualValues>,
    #[serde(default, deserialize_with = "lenient::opt_u16")]
    pub ev_level: Option<u16>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub ev_up: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One creature instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(default, deserialize_with = "lenient::opt_u8", skip_serializing_if = "Option::is_none")]
    pub slot: Option<u8>,
    /// Key of the entry inside the stored party (`slot1`, `0`, ...), when it
    /// was read from a plain object element and can be patched in place.
    #[serde(skip)]
    pub store_key: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(rename = "lv", alias = "level", default = "default_level", deserialize_with = "lenient::level")]
    pub level: u8,
    #[serde(default, deserialize_with = "lenient::parse_opt", skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "lenient::parse_opt", skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(default, deserialize_with = "lenient::parse_opt", skip_serializing_if = "Option::is_none")]
    pub nature: Option<Nature>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ability: Option<String>,
    #[serde(rename = "shiny", alias = "isShiny", default, deserialize_with = "lenient::boolish")]
    pub is_shiny: bool,
    #[serde(rename = "item", alias = "heldItem", default, deserialize_with = "lenient::opt_string")]
    pub held_item: Option<String>,
    #[serde(default, deserialize_with = "lenient::parse_opt", skip_serializing_if = "Option::is_none")]
    pub mechanic: Option<Mechanic>,
    #[serde(rename = "teraType", default, deserialize_with = "lenient::opt_string")]
    pub tera_type: Option<String>,
    /// Special-form marker (`"primal"`, `"crowned"`, a mega stone form, ...).
    #[serde(rename = "mega", default, deserialize_with = "lenient::opt_string")]
    pub form_marker: Option<String>,
    #[serde(rename = "isAce", default, deserialize_with = "lenient::boolish")]
    pub is_ace: bool,
    #[serde(rename = "isLead", default, deserialize_with = "lenient::boolish")]
    pub is_lead: bool,
    /// Owning alliance member, set when rosters are merged.
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub trainer: Option<String>,
    #[serde(default, deserialize_with = "lenient::stats_meta")]
    pub stats_meta: StatsMeta,
    #[serde(default, deserialize_with = "lenient::moves")]
    pub moves: Vec<String>,
    #[serde(default, deserialize_with = "lenient::bonds")]
    pub bonds: u8,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub bonds_up: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_level() -> u8 {
    5
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, level: u8) -> Self {
        Self {
            slot: None,
            store_key: None,
            name: name.into(),
            nickname: None,
            level: level.clamp(1, 100),
            gender: None,
            quality: None,
            nature: None,
            ability: None,
            is_shiny: false,
            held_item: None,
            mechanic: None,
            tera_type: None,
            form_marker: None,
            is_ace: false,
            is_lead: false,
            trainer: None,
            stats_meta: StatsMeta::default(),
            moves: Vec::new(),
            bonds: 0,
            bonds_up: None,
            extra: Map::new(),
        }
    }

    /// Parses one entry, returning `None` (and logging) for anything without a
    /// usable name.
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value::<RosterEntry>(value.clone()) {
            Ok(mut entry) if !entry.name.trim().is_empty() => {
                entry.keep_unparsed(value);
                Some(entry)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "skipping unreadable roster entry");
                None
            }
        }
    }

    /// Moves raw values that the typed fields rejected into `extra`.
    fn keep_unparsed(&mut self, raw: &Value) {
        let present = |value: Option<&Value>| value.filter(|v| !v.is_null()).cloned();
        let rejected = [
            ("nature", self.nature.is_none()),
            ("gender", self.gender.is_none()),
            ("mechanic", self.mechanic.is_none()),
        ];
        for (key, missing) in rejected {
            if let Some(value) = present(raw.get(key)).filter(|_| missing) {
                self.extra.insert(key.to_string(), value);
            }
        }
        if self.stats_meta.ivs.is_none() {
            if let Some(ivs) = present(raw.get("stats_meta").and_then(|meta| meta.get("ivs"))) {
                self.stats_meta.extra.insert("ivs".to_string(), ivs);
            }
        }
    }

    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    /// Document path of this entry in the store, when it can be patched.
    pub fn store_path(&self) -> Option<String> {
        self.store_key
            .as_ref()
            .map(|key| format!("player.party.{}", key))
    }

    pub fn with_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = sanitize_moves(moves.into_iter().map(Into::into));
        self
    }
}

pub fn slot_key(slot: u8) -> String {
    format!("slot{}", slot)
}

/// Trims, drops empties and case-insensitive duplicates, keeps at most four.
pub fn sanitize_moves<I>(moves: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::with_capacity(MAX_MOVES);
    for name in moves {
        let name = name.trim();
        if name.is_empty() || out.iter().any(|m| m.eq_ignore_ascii_case(name)) {
            continue;
        }
        out.push(name.to_string());
        if out.len() == MAX_MOVES {
            break;
        }
    }
    out
}

/// Reads a stored party in any of its historical layouts: a `slot1..slotN`
/// map, a numeric-key map, an array, or a single entry object. String
/// elements are parsed as JSON, and so are objects holding a JSON text split
/// into numbered characters. Slot numbers are filled from the layout when an
/// entry lacks one. Plain object elements remember their store key; encoded
/// ones do not, since a path patch cannot reach inside them.
pub fn parse_party(value: &Value) -> Vec<RosterEntry> {
    let elements: Vec<PartyElement<'_>> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (u8::try_from(i + 1).ok(), Some(i.to_string()), v))
            .collect(),
        Value::Object(map) => {
            let slots = numbered_keys(map, "slot");
            if !slots.is_empty() {
                slots
            } else {
                let numeric = numbered_keys(map, "");
                if !numeric.is_empty() {
                    numeric
                        .into_iter()
                        .map(|(n, key, v)| (n.and_then(|n| n.checked_add(1)), key, v))
                        .collect()
                } else if map.contains_key("name") {
                    vec![(None, None, value)]
                } else {
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };

    elements
        .into_iter()
        .filter_map(|(slot, key, element)| {
            let decoded = decode_element(element)?;
            let mut entry = RosterEntry::from_value(&decoded)?;
            if entry.slot.is_none() {
                entry.slot = slot;
            }
            if is_plain_entry(element) {
                entry.store_key = key;
            }
            Some(entry)
        })
        .collect()
}

/// Slot number, store key, element.
type PartyElement<'a> = (Option<u8>, Option<String>, &'a Value);

fn numbered_keys<'a>(map: &'a Map<String, Value>, prefix: &str) -> Vec<PartyElement<'a>> {
    let mut keyed: Vec<(u32, &String, &Value)> = map
        .iter()
        .filter_map(|(key, value)| {
            let digits = key.strip_prefix(prefix)?;
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse::<u32>().ok().map(|n| (n, key, value))
        })
        .collect();
    keyed.sort_by_key(|(n, _, _)| *n);
    keyed
        .into_iter()
        .map(|(n, key, v)| (u8::try_from(n).ok(), Some(key.clone()), v))
        .collect()
}

fn is_plain_entry(element: &Value) -> bool {
    element
        .as_object()
        .is_some_and(|map| !map.get("0").is_some_and(Value::is_string))
}

fn decode_element(element: &Value) -> Option<Value> {
    match element {
        Value::Null => None,
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| warn!(error = %e, "stored entry is not valid JSON"))
            .ok(),
        Value::Object(map) if map.get("0").is_some_and(Value::is_string) => {
            let joined: String = numbered_keys(map, "")
                .into_iter()
                .filter_map(|(_, _, v)| v.as_str())
                .collect();
            serde_json::from_str(&joined).ok()
        }
        other => Some(other.clone()),
    }
}

pub(crate) mod lenient {
    use super::{sanitize_moves, IndividualValues, StatsMeta, MAX_IV};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn parse_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse().ok()))
    }

    pub fn opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn opt_i64<'de, D>(d: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(as_f64).map(|n| n.trunc() as i64))
    }

    pub fn opt_u16<'de, D>(d: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .filter(|n| *n >= 0.0)
            .map(|n| n.min(u16::MAX as f64) as u16))
    }

    pub fn opt_u8<'de, D>(d: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .filter(|n| *n >= 0.0 && *n <= u8::MAX as f64)
            .map(|n| n as u8))
    }

    pub fn level<'de, D>(d: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .map(|n| n.clamp(1.0, 100.0) as u8)
            .unwrap_or_else(super::default_level))
    }

    pub fn opt_level<'de, D>(d: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .map(|n| n.clamp(1.0, 100.0) as u8))
    }

    pub fn opt_bool<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => Some(true),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        })
    }

    pub fn bonds<'de, D>(d: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .map(|n| n.clamp(0.0, 255.0) as u8)
            .unwrap_or(0))
    }

    pub fn boolish<'de, D>(d: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        })
    }

    pub fn moves<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Array(items)) => sanitize_moves(
                items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string)),
            ),
            Some(Value::Object(map)) => {
                let mut keyed: Vec<(String, String)> = map
                    .into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                sanitize_moves(keyed.into_iter().map(|(_, v)| v))
            }
            _ => Vec::new(),
        })
    }

    pub fn stats_meta<'de, D>(d: D) -> Result<StatsMeta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
            _ => StatsMeta::default(),
        })
    }

    pub fn ivs<'de, D>(d: D) -> Result<Option<IndividualValues>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(d)?;
        let Some(Value::Object(map)) = value else {
            return Ok(None);
        };
        let stat = |key: &str| -> Option<u8> {
            let n = map.get(key)?.as_f64()?;
            (n >= 0.0 && n <= MAX_IV as f64 && n.fract() == 0.0).then_some(n as u8)
        };
        Ok((|| {
            Some(IndividualValues {
                hp: stat("hp")?,
                atk: stat("atk")?,
                def: stat("def")?,
                spa: stat("spa")?,
                spd: stat("spd")?,
                spe: stat("spe")?,
            })
        })())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_lenient_entry_parsing() {
        let entry = RosterEntry::from_value(&json!({
            "name": "Pikachu",
            "level": "42",
            "gender": "female",
            "nature": "adamant",
            "shiny": "true",
            "mechanic": "Z-Move",
            "quality": "normal",
            "moves": {"move2": "Quick Attack", "move1": "Thunderbolt", "move3": " ", "move4": "thunderbolt"},
            "stats_meta": {"ivs": {"hp": 31, "atk": 31, "def": 31, "spa": 31, "spd": 31, "spe": 31}, "ev_level": 40},
            "bonds": 300,
            "friendship": {"avs": {"trust": 10}}
        }))
        .unwrap();

        assert_eq!(entry.level, 42);
        assert_eq!(entry.gender, Some(Gender::Female));
        assert_eq!(entry.nature, Some(Nature::Adamant));
        assert!(entry.is_shiny);
        assert_eq!(entry.mechanic, Some(Mechanic::Zmove));
        assert_eq!(entry.quality, Some(Quality::Medium));
        assert_eq!(entry.moves, vec!["Thunderbolt", "Quick Attack"]);
        assert_eq!(entry.stats_meta.ivs, Some(IndividualValues::PERFECT));
        assert_eq!(entry.stats_meta.ev_level, Some(40));
        assert_eq!(entry.bonds, 255);
        assert_eq!(entry.extra["friendship"], json!({"avs": {"trust": 10}}));
    }

    #[test]
    fn test_unknown_enum_spellings_become_absent() {
        let entry = RosterEntry::from_value(&json!({
            "name": "Eevee", "lv": 10, "nature": "Sleepy", "mechanic": "ultra_burst"
        }))
        .unwrap();
        assert_eq!(entry.nature, None);
        assert_eq!(entry.mechanic, None);
    }

    #[test]
    fn test_unparsed_values_survive_serialization() {
        let raw = json!({
            "name": "Eevee", "lv": 10, "nature": "Sleepy", "gender": "M",
            "stats_meta": {"ivs": {"hp": 40, "atk": 0, "def": 0, "spa": 0, "spd": 0, "spe": 0}, "ev_level": 12}
        });
        let entry = RosterEntry::from_value(&raw).unwrap();
        assert_eq!(entry.stats_meta.ivs, None);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["nature"], json!("Sleepy"));
        assert_eq!(json["gender"], json!("M"));
        assert_eq!(json["stats_meta"]["ivs"], raw["stats_meta"]["ivs"]);
        assert_eq!(json["stats_meta"]["ev_level"], json!(12));
        assert!(json.get("mechanic").is_none());
    }

    #[rstest]
    #[case(json!({"hp": 31, "atk": 0, "def": 1, "spa": 2, "spd": 3, "spe": 4}), true)]
    #[case(json!({"hp": 32, "atk": 0, "def": 1, "spa": 2, "spd": 3, "spe": 4}), false)]
    #[case(json!({"hp": 31, "atk": 0, "def": 1, "spa": 2, "spd": 3}), false)]
    #[case(json!({"hp": null, "atk": 0, "def": 1, "spa": 2, "spd": 3, "spe": 4}), false)]
    #[case(json!("31/31/31/31/31/31"), false)]
    fn test_iv_validation(#[case] ivs: Value, #[case] valid: bool) {
        let entry = RosterEntry::from_value(&json!({"name": "Mew", "stats_meta": {"ivs": ivs}})).unwrap();
        assert_eq!(entry.stats_meta.ivs.is_some(), valid);
    }

    #[test]
    fn test_sanitize_moves() {
        let moves = sanitize_moves(
            ["Tackle", " Ember ", "", "tackle", "Growl", "Leer", "Bite"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(moves, vec!["Tackle", "Ember", "Growl", "Leer"]);
    }

    #[test]
    fn test_parse_party_slot_layout() {
        let party = parse_party(&json!({
            "slot10": {"name": "Mew", "lv": 5},
            "slot2": {"name": "Eevee", "lv": 12},
            "slot1": {"name": "Pikachu", "lv": 42},
            "slot3": {"name": null, "lv": null}
        }));
        let names: Vec<_> = party.iter().map(|e| (e.slot, e.name.as_str())).collect();
        assert_eq!(
            names,
            vec![(Some(1), "Pikachu"), (Some(2), "Eevee"), (Some(10), "Mew")]
        );
        assert_eq!(party[2].store_path().as_deref(), Some("player.party.slot10"));
    }

    #[test]
    fn test_parse_party_other_layouts() {
        let from_array = parse_party(&json!([
            {"name": "Onix", "lv": 14},
            "{\"name\": \"Geodude\", \"lv\": 12}",
            "not json",
            null
        ]));
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array[0].store_key.as_deref(), Some("0"));
        assert_eq!(from_array[1].name, "Geodude");
        assert_eq!(from_array[1].slot, Some(2));
        assert_eq!(from_array[1].store_key, None);

        let from_numeric = parse_party(&json!({"1": {"name": "B"}, "0": {"name": "A"}}));
        assert_eq!(from_numeric[0].name, "A");
        assert_eq!(from_numeric[0].slot, Some(1));
        assert_eq!(from_numeric[0].store_key.as_deref(), Some("0"));

        let single = parse_party(&json!({"name": "Snorlax", "lv": 30}));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].store_path(), None);

        let chars = parse_party(&json!([{"0": "{", "1": "\"name\":", "2": "\"Abra\"", "3": "}"}]));
        assert_eq!(chars[0].name, "Abra");
        assert_eq!(chars[0].store_key, None);
    }

    #[test]
    fn test_serializes_wire_names() {
        let mut entry = RosterEntry::new("Rattata", 5).with_moves(["Tackle"]);
        entry.is_shiny = true;
        entry.held_item = Some("Oran Berry".to_string());
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["lv"], json!(5));
        assert_eq!(json["shiny"], json!(true));
        assert_eq!(json["item"], json!("Oran Berry"));
        assert_eq!(json["isAce"], json!(false));
        assert_eq!(json["moves"], json!(["Tackle"]));
        assert!(json.get("slot").is_none());
        assert_eq!(RosterEntry::from_value(&json).unwrap(), entry);
    }
}
