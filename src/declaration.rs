//! Typed battle declarations.
//!
//! Agent output is sniffed exactly once here. Everything downstream matches
//! on the closed variant sets below instead of probing JSON shapes.

use crate::config::IdentityConfig;
use crate::errors::{DeclarationError, DeclarationResult};
use crate::roster::{
    lenient, sanitize_moves, Gender, Mechanic, Nature, Quality, RosterEntry, StatsMeta,
};
use crate::settings::PartialSettings;
use crate::unlocks::PartialUnlocks;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// One declared party member.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecl {
    /// A bare species (or nickname) string.
    Name(String),
    /// An object missing a level or moves; completed by lookup or generation.
    Sketch(PartialEntry),
    /// Carries at least a level and a non-empty move list; used verbatim.
    Complete(Box<RosterEntry>),
}

/// Whatever the agent did specify about a creature it wants generated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialEntry {
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nickname: Option<String>,
    #[serde(rename = "lv", alias = "level", default, deserialize_with = "lenient::opt_level")]
    pub level: Option<u8>,
    #[serde(default, deserialize_with = "lenient::parse_opt")]
    pub quality: Option<Quality>,
    #[serde(default, deserialize_with = "lenient::parse_opt")]
    pub nature: Option<Nature>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ability: Option<String>,
    #[serde(default, deserialize_with = "lenient::moves")]
    pub moves: Vec<String>,
    #[serde(default, deserialize_with = "lenient::parse_opt")]
    pub gender: Option<Gender>,
    #[serde(rename = "shiny", alias = "isShiny", default, deserialize_with = "lenient::opt_bool")]
    pub shiny: Option<bool>,
    #[serde(rename = "item", alias = "heldItem", default, deserialize_with = "lenient::opt_string")]
    pub held_item: Option<String>,
    #[serde(default, deserialize_with = "lenient::parse_opt")]
    pub mechanic: Option<Mechanic>,
    #[serde(rename = "teraType", default, deserialize_with = "lenient::opt_string")]
    pub tera_type: Option<String>,
    #[serde(rename = "mega", default, deserialize_with = "lenient::opt_string")]
    pub form_marker: Option<String>,
    #[serde(rename = "isAce", default, deserialize_with = "lenient::boolish")]
    pub is_ace: bool,
    #[serde(rename = "isLead", default, deserialize_with = "lenient::boolish")]
    pub is_lead: bool,
    #[serde(default, deserialize_with = "lenient::opt_u8")]
    pub tier: Option<u8>,
    #[serde(default, deserialize_with = "lenient::stats_meta")]
    pub stats_meta: StatsMeta,
}

impl PartialEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl EntryDecl {
    /// Classifies one party element. Elements without a usable name are
    /// dropped with a warning.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => {
                let name = name.trim();
                (!name.is_empty()).then(|| EntryDecl::Name(name.to_string()))
            }
            Value::Object(map) => {
                let has_name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| !n.trim().is_empty());
                if !has_name {
                    warn!("dropping declared entry without a name");
                    return None;
                }
                if is_complete(map) {
                    RosterEntry::from_value(value).map(|entry| EntryDecl::Complete(Box::new(entry)))
                } else {
                    match serde_json::from_value::<PartialEntry>(value.clone()) {
                        Ok(partial) => Some(EntryDecl::Sketch(partial)),
                        Err(e) => {
                            warn!(error = %e, "dropping unreadable declared entry");
                            None
                        }
                    }
                }
            }
            other => {
                warn!(value = %other, "dropping declared entry of unexpected type");
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntryDecl::Name(name) => name,
            EntryDecl::Sketch(partial) => &partial.name,
            EntryDecl::Complete(entry) => &entry.name,
        }
    }

    /// Generator input for entries that still need completing.
    pub fn to_partial(&self) -> PartialEntry {
        match self {
            EntryDecl::Name(name) => PartialEntry::named(name.clone()),
            EntryDecl::Sketch(partial) => partial.clone(),
            EntryDecl::Complete(entry) => PartialEntry {
                name: entry.name.clone(),
                level: Some(entry.level),
                moves: entry.moves.clone(),
                ..PartialEntry::default()
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, EntryDecl::Complete(_))
    }
}

fn is_complete(map: &Map<String, Value>) -> bool {
    let has_level = map
        .get("lv")
        .or_else(|| map.get("level"))
        .is_some_and(Value::is_number);
    let has_moves = match map.get("moves") {
        Some(Value::Array(moves)) => !sanitize_moves(
            moves.iter().filter_map(Value::as_str).map(str::to_string),
        )
        .is_empty(),
        _ => false,
    };
    has_level && has_moves
}

/// One declared trainer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainerDecl {
    pub name: Option<String>,
    pub id: Option<String>,
    /// The declared `type` (`"wild"`, `"trainer"`, ...).
    pub kind_hint: Option<String>,
    pub party: Vec<EntryDecl>,
    pub unlocks: PartialUnlocks,
    pub tier: Option<u8>,
    pub proficiency: Option<u8>,
    pub lines: Option<Value>,
}

/// Several trainers fighting as one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllianceDecl {
    pub name: String,
    pub members: Vec<TrainerDecl>,
    /// Side-level flags; these take precedence over the members' merged flags.
    pub unlocks: PartialUnlocks,
    pub kind_hint: Option<String>,
    pub tier: Option<u8>,
    pub lines: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CombatantDecl {
    Single(TrainerDecl),
    Alliance(AllianceDecl),
}

impl CombatantDecl {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            CombatantDecl::Single(trainer) => trainer.name.as_deref(),
            CombatantDecl::Alliance(alliance) => Some(&alliance.name),
        }
    }

    pub fn lines(&self) -> Option<&Value> {
        match self {
            CombatantDecl::Single(trainer) => trainer.lines.as_ref(),
            CombatantDecl::Alliance(alliance) => alliance
                .lines
                .as_ref()
                .or_else(|| alliance.members.iter().find_map(|m| m.lines.as_ref())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentDecl {
    pub weather: Option<String>,
    pub weather_turns: Option<u32>,
    pub suppression: Option<Value>,
    pub overlay: Option<Value>,
}

/// The agent-authored battle request, parsed once per message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleDeclaration {
    /// The player's side (`player` or `p1`).
    pub side_a: Option<CombatantDecl>,
    /// The opposing side (`enemy` or `p2`).
    pub side_b: Option<CombatantDecl>,
    pub environment: Option<EnvironmentDecl>,
    pub difficulty: Option<String>,
    pub tier: Option<u8>,
    pub battle_type: Option<String>,
    pub script: Option<Value>,
    pub settings: PartialSettings,
}

impl BattleDeclaration {
    pub fn parse(value: &Value, identity: &IdentityConfig) -> DeclarationResult<Self> {
        let Value::Object(root) = value else {
            return Err(DeclarationError::NotAnObject);
        };

        let side_a = side(root, &["player", "p1"], identity)?;
        let side_b = side(root, &["enemy", "p2"], identity)?;
        if side_a.is_none() && side_b.is_none() {
            debug!("declaration names neither side");
        }

        Ok(Self {
            side_a,
            side_b,
            environment: root.get("environment").and_then(environment),
            difficulty: str_field(root, &["difficulty"]),
            tier: u8_field(root, &["tier"]),
            battle_type: str_field(root, &["battle_type"]),
            script: root.get("script").filter(|v| !v.is_null()).cloned(),
            settings: PartialSettings::from_value(root.get("settings")),
        })
    }
}

fn side(
    root: &Map<String, Value>,
    keys: &[&str],
    identity: &IdentityConfig,
) -> DeclarationResult<Option<CombatantDecl>> {
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| root.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
    else {
        return Ok(None);
    };
    let Value::Object(map) = value else {
        return Err(DeclarationError::InvalidSide {
            side: key.to_string(),
            reason: "expected an object".to_string(),
        });
    };

    let entrants = map
        .get("entrants")
        .or_else(|| map.get("trainers"))
        .and_then(Value::as_array);
    if let Some(entrants) = entrants {
        let members: Vec<TrainerDecl> = entrants
            .iter()
            .filter_map(|member| match member {
                Value::Object(member) => Some(trainer(member)),
                _ => {
                    warn!(side = key, "ignoring alliance member that is not an object");
                    None
                }
            })
            .collect();
        let name = str_field(map, &["name"]).unwrap_or_else(|| {
            members
                .iter()
                .filter_map(|m| m.name.as_deref())
                .collect::<Vec<_>>()
                .join(" & ")
        });
        return Ok(Some(CombatantDecl::Alliance(AllianceDecl {
            name,
            members,
            unlocks: PartialUnlocks::from_value(map.get("unlocks")),
            kind_hint: str_field(map, &["type"]),
            tier: u8_field(map, &["tier"]),
            lines: map.get("lines").filter(|v| !v.is_null()).cloned(),
        })));
    }

    let single = trainer(map);
    if let Some(alliance) = split_named_alliance(&single, identity) {
        return Ok(Some(CombatantDecl::Alliance(alliance)));
    }
    Ok(Some(CombatantDecl::Single(single)))
}

fn trainer(map: &Map<String, Value>) -> TrainerDecl {
    let party = match map.get("party") {
        Some(Value::Array(items)) => items.iter().filter_map(EntryDecl::from_value).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!("declared party is not an array; treating it as empty");
            Vec::new()
        }
    };
    TrainerDecl {
        name: str_field(map, &["name"]),
        id: str_field(map, &["id"]),
        kind_hint: str_field(map, &["type"]),
        party,
        unlocks: PartialUnlocks::from_value(map.get("unlocks")),
        tier: u8_field(map, &["tier"]),
        proficiency: u8_field(map, &["trainerProficiency", "proficiency"]),
        lines: map.get("lines").filter(|v| !v.is_null()).cloned(),
    }
}

/// `"Brock & Misty"` with one flat party becomes a two-member alliance; the
/// party is dealt out in contiguous chunks of `ceil(n / members)`.
fn split_named_alliance(single: &TrainerDecl, identity: &IdentityConfig) -> Option<AllianceDecl> {
    let name = single.name.as_deref()?;
    let names: Vec<&str> = name
        .split(|c| identity.alliance_separators.contains(&c))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    if names.len() < 2 || single.party.is_empty() {
        return None;
    }

    let chunk = single.party.len().div_ceil(names.len());
    let members = names
        .iter()
        .enumerate()
        .map(|(i, member_name)| {
            let start = (i * chunk).min(single.party.len());
            let end = ((i + 1) * chunk).min(single.party.len());
            TrainerDecl {
                name: Some(member_name.to_string()),
                kind_hint: single.kind_hint.clone(),
                party: single.party[start..end].to_vec(),
                tier: single.tier,
                ..TrainerDecl::default()
            }
        })
        .collect();

    Some(AllianceDecl {
        name: name.to_string(),
        members,
        unlocks: single.unlocks.clone(),
        kind_hint: single.kind_hint.clone(),
        tier: single.tier,
        lines: single.lines.clone(),
    })
}

fn environment(value: &Value) -> Option<EnvironmentDecl> {
    let Value::Object(map) = value else {
        return None;
    };
    Some(EnvironmentDecl {
        weather: str_field(map, &["weather"]),
        weather_turns: map
            .get("weatherTurns")
            .or_else(|| map.get("weather_turns"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        suppression: map.get("suppression").filter(|v| !v.is_null()).cloned(),
        overlay: map.get("overlay").filter(|v| !v.is_null()).cloned(),
    })
}

fn str_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn u8_field(map: &Map<String, Value>, keys: &[&str]) -> Option<u8> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        let n = value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))?;
        (n >= 0.0).then(|| n.min(u8::MAX as f64) as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> BattleDeclaration {
        BattleDeclaration::parse(&value, &IdentityConfig::default()).unwrap()
    }

    #[test]
    fn test_entry_classification() {
        assert_eq!(
            EntryDecl::from_value(&json!(" Pikachu ")),
            Some(EntryDecl::Name("Pikachu".to_string()))
        );
        assert_matches!(
            EntryDecl::from_value(&json!({"name": "Onix", "lv": 14})),
            Some(EntryDecl::Sketch(p)) if p.level == Some(14)
        );
        assert_matches!(
            EntryDecl::from_value(&json!({"name": "Onix", "lv": "14", "moves": ["Tackle"]})),
            Some(EntryDecl::Sketch(_))
        );
        assert_matches!(
            EntryDecl::from_value(&json!({"name": "Onix", "lv": 14, "moves": ["Tackle", "Bind"]})),
            Some(EntryDecl::Complete(e)) if e.moves.len() == 2
        );
        assert_matches!(
            EntryDecl::from_value(&json!({"name": "Onix", "lv": 14, "moves": [" "]})),
            Some(EntryDecl::Sketch(_))
        );
        assert_eq!(EntryDecl::from_value(&json!({"lv": 3})), None);
        assert_eq!(EntryDecl::from_value(&json!(42)), None);
        assert_eq!(EntryDecl::from_value(&json!("")), None);
    }

    #[test]
    fn test_single_trainer_sides() {
        let decl = parse(json!({
            "player": {"party": ["Pikachu"]},
            "enemy": {"type": "wild", "party": [{"name": "Rattata"}]},
            "difficulty": "hard",
            "environment": {"weather": "rain", "overlay": {"env_name": "Cave"}}
        }));

        let Some(CombatantDecl::Single(player)) = &decl.side_a else {
            panic!("expected single player side");
        };
        assert_eq!(player.name, None);
        assert_eq!(player.party, vec![EntryDecl::Name("Pikachu".to_string())]);

        let Some(CombatantDecl::Single(enemy)) = &decl.side_b else {
            panic!("expected single enemy side");
        };
        assert_eq!(enemy.kind_hint.as_deref(), Some("wild"));
        assert_eq!(decl.difficulty.as_deref(), Some("hard"));
        let env = decl.environment.unwrap();
        assert_eq!(env.weather.as_deref(), Some("rain"));
        assert_eq!(env.overlay, Some(json!({"env_name": "Cave"})));
    }

    #[test]
    fn test_entrants_become_alliance() {
        let decl = parse(json!({
            "p2": {
                "entrants": [
                    {"name": "Team A", "party": ["Rattata"], "unlocks": {"enable_mega": true}},
                    "garbage",
                    {"name": "Team B", "party": ["Pidgey"], "lines": {"start": "Go!"}}
                ],
                "unlocks": {"enable_tera": false}
            }
        }));
        let Some(CombatantDecl::Alliance(alliance)) = &decl.side_b else {
            panic!("expected alliance");
        };
        assert_eq!(alliance.name, "Team A & Team B");
        assert_eq!(alliance.members.len(), 2);
        assert_eq!(alliance.unlocks.0.len(), 1);
        assert_eq!(
            decl.side_b.as_ref().unwrap().lines(),
            Some(&json!({"start": "Go!"}))
        );
    }

    #[test]
    fn test_separator_name_splits_flat_party() {
        let decl = parse(json!({
            "enemy": {"name": "Tate ＆ Liza", "party": ["Solrock", "Lunatone", "Claydol"]}
        }));
        let Some(CombatantDecl::Alliance(alliance)) = decl.side_b else {
            panic!("expected alliance");
        };
        let split: Vec<(Option<String>, usize)> = alliance
            .members
            .iter()
            .map(|m| (m.name.clone(), m.party.len()))
            .collect();
        assert_eq!(
            split,
            vec![(Some("Tate".to_string()), 2), (Some("Liza".to_string()), 1)]
        );
    }

    #[test]
    fn test_separator_name_without_party_stays_single() {
        let decl = parse(json!({"enemy": {"name": "Salt & Pepper"}}));
        assert_matches!(decl.side_b, Some(CombatantDecl::Single(_)));
    }

    #[test]
    fn test_malformed_declarations() {
        let identity = IdentityConfig::default();
        assert_eq!(
            BattleDeclaration::parse(&json!([1, 2]), &identity),
            Err(DeclarationError::NotAnObject)
        );
        assert_matches!(
            BattleDeclaration::parse(&json!({"enemy": "Brock"}), &identity),
            Err(DeclarationError::InvalidSide { side, .. }) if side == "enemy"
        );
    }
}
