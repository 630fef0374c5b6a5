//! Assembles the resolved sides, settings and environment into the battle
//! payload handed to the rendering layer.

use crate::config::ResolverConfig;
use crate::declaration::{BattleDeclaration, EnvironmentDecl};
use crate::player::StoredPlayer;
use crate::resolver::{ResolvedBattle, ResolvedTrainer, TrainerKind};
use crate::roster::RosterEntry;
use crate::settings::{merge_settings, Settings};
use crate::unlocks::{merge, PartialUnlocks, UnlockFlags};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Offset between world coordinates and weather grid cells.
pub const GRID_CENTER: i64 = 26;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattlePayload {
    pub settings: Settings,
    pub difficulty: String,
    pub player: PlayerBlock,
    pub enemy: EnemyBlock,
    /// The opposing roster.
    pub party: Vec<Value>,
    pub script: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerBlock {
    pub name: String,
    #[serde(rename = "trainerProficiency")]
    pub proficiency: u8,
    pub party: Vec<Value>,
    pub unlocks: UnlockFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyBlock {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    #[serde(rename = "trainerProficiency")]
    pub proficiency: u8,
    pub lines: Option<Value>,
    pub unlocks: UnlockFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentBlock {
    pub weather: Option<String>,
    #[serde(rename = "weatherTurns")]
    pub weather_turns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppression: Option<Value>,
}

/// Weather read from the world state's grid for the current location.
#[derive(Debug, Clone, PartialEq)]
pub struct GridWeather {
    pub weather: String,
    pub suppression: Option<Value>,
}

/// `"gx_gy"` key of the weather cell holding world position `(x, y)`. World
/// coordinates skip zero on the positive side.
pub fn grid_key(x: i64, y: i64) -> String {
    let x = if x > 0 { x - 1 } else { x };
    let y = if y > 0 { y - 1 } else { y };
    format!("{}_{}", x + GRID_CENTER, GRID_CENTER - y - 1)
}

pub fn grid_weather(world_state: Option<&Value>) -> Option<GridWeather> {
    let world = world_state?;
    let location = world.get("location")?;
    let x = location.get("x")?.as_f64()? as i64;
    let y = location.get("y").and_then(Value::as_f64).unwrap_or(0.0) as i64;
    let key = grid_key(x, y);
    let cell = world.get("weather_grid")?.get(&key)?;
    let weather = cell
        .get("weather")
        .and_then(Value::as_str)
        .filter(|w| !w.is_empty())?;
    debug!(cell = %key, weather, "weather from world grid");
    Some(GridWeather {
        weather: weather.to_string(),
        suppression: cell.get("suppression").filter(|v| !v.is_null()).cloned(),
    })
}

/// Declared weather wins; otherwise the grid's. A declared overlay is kept
/// whatever the weather source. Nothing is emitted without a weather or an
/// overlay.
pub fn resolve_environment(
    declared: Option<&EnvironmentDecl>,
    grid: Option<GridWeather>,
) -> Option<EnvironmentBlock> {
    let declared = declared.cloned().unwrap_or_default();
    let (grid_weather, grid_suppression) = match grid {
        Some(cell) => (Some(cell.weather), cell.suppression),
        None => (None, None),
    };
    let weather = declared.weather.or(grid_weather);
    if weather.is_none() && declared.overlay.is_none() {
        return None;
    }
    Some(EnvironmentBlock {
        weather,
        weather_turns: declared.weather_turns.unwrap_or(0),
        overlay: declared.overlay,
        suppression: declared.suppression.or(grid_suppression),
    })
}

/// Converts an entry to the rendering layer's shape: bonds expand into the
/// four affection values, and a legacy `friendship` block is promoted.
pub fn frontend_entry(entry: &RosterEntry) -> Value {
    match serde_json::to_value(entry) {
        Ok(Value::Object(mut map)) => {
            normalize_affection(&mut map, entry.bonds);
            map.remove("bonds_up");
            if let Some(Value::Object(meta)) = map.get_mut("stats_meta") {
                meta.remove("ev_up");
            }
            Value::Object(map)
        }
        Ok(other) => other,
        Err(e) => {
            warn!(species = %entry.name, error = %e, "entry could not be serialized");
            json!({"name": entry.name, "lv": entry.level})
        }
    }
}

fn normalize_affection(map: &mut Map<String, Value>, bonds: u8) {
    let affection = |n: u8| json!({"trust": n, "passion": n, "insight": n, "devotion": n});
    let legacy = map.remove("friendship");
    let avs = if bonds > 0 {
        affection(bonds)
    } else if let Some(existing) = map.get("avs").filter(|v| v.is_object()) {
        existing.clone()
    } else {
        match legacy {
            Some(Value::Object(mut friendship)) => match friendship.remove("avs") {
                Some(avs @ Value::Object(_)) => avs,
                _ if friendship.contains_key("trust") || friendship.contains_key("passion") => {
                    Value::Object(friendship)
                }
                _ => affection(0),
            },
            _ => affection(0),
        }
    };
    map.insert("avs".to_string(), avs);
}

pub struct PayloadAssembler<'a> {
    config: &'a ResolverConfig,
}

impl<'a> PayloadAssembler<'a> {
    pub fn new(config: &'a ResolverConfig) -> Self {
        Self { config }
    }

    pub fn assemble(
        &self,
        declaration: &BattleDeclaration,
        battle: &ResolvedBattle,
        stored: &StoredPlayer,
        world_state: Option<&Value>,
    ) -> BattlePayload {
        let settings = merge_settings(
            &declaration.settings,
            &stored.settings,
            &self.config.default_settings,
        );

        let player = &battle.side_a;
        let unlocks = merge([
            &PartialUnlocks::from(&player.unlocks),
            &stored.unlocks,
            &stored.bonds,
        ]);
        let proficiency = player
            .proficiency
            .max(stored.proficiency)
            .min(self.config.reconcile.proficiency_cap);

        let environment = resolve_environment(declaration.environment.as_ref(), grid_weather(world_state));
        let enemy = &battle.side_b;

        info!(
            player = %player.name,
            enemy = %enemy.name,
            player_roster = player.roster.len(),
            enemy_roster = enemy.roster.len(),
            environment = environment.is_some(),
            "assembled battle payload"
        );

        BattlePayload {
            settings,
            difficulty: declaration
                .difficulty
                .clone()
                .unwrap_or_else(|| "normal".to_string()),
            player: PlayerBlock {
                name: player.name.clone(),
                proficiency,
                party: player.roster.iter().map(frontend_entry).collect(),
                unlocks,
            },
            enemy: enemy_block(enemy),
            party: enemy.roster.iter().map(frontend_entry).collect(),
            script: declaration.script.clone(),
            battle_type: declaration.battle_type.clone(),
            environment,
        }
    }
}

fn enemy_block(enemy: &ResolvedTrainer) -> EnemyBlock {
    EnemyBlock {
        id: enemy.id.clone(),
        kind: match enemy.kind {
            TrainerKind::Wild => "wild",
            TrainerKind::Player | TrainerKind::Generated => "trainer",
        },
        name: enemy.name.clone(),
        proficiency: enemy.proficiency,
        lines: enemy.lines.clone(),
        unlocks: enemy.unlocks.clone(),
    }
}

/// Appends the payload block to the trimmed message text.
pub fn render_message(content: &str, payload: &BattlePayload, tag: &str) -> serde_json::Result<String> {
    let json = serde_json::to_string(payload)?;
    Ok(format!("{}\n\n<{tag}>\n{}\n</{tag}>", content.trim(), json, tag = tag))
}
