//! Tunable constants for the resolver, loadable from a RON file.
//!
//! Every field has a default, so a config file only needs to name the
//! values it overrides.

use crate::errors::ConfigError;
use crate::settings::{default_settings, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub tags: TagConfig,
    pub identity: IdentityConfig,
    pub generation: GenerationConfig,
    pub reconcile: ReconcileConfig,
    pub roster: RosterConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub default_settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Wraps the agent-authored declaration.
    pub declaration: String,
    /// Wraps the resolved payload appended to the message.
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub player_keywords: Vec<String>,
    pub user_macro: String,
    pub wild_keywords: Vec<String>,
    pub alliance_separators: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub tier_levels: BTreeMap<u8, u8>,
    pub unknown_tier_level: u8,
    pub fallback_level: u8,
    /// One in `shiny_odds` generated entries is shiny.
    pub shiny_odds: u32,
    pub hidden_ability_chance: f64,
    /// Stats forced to 31 by the `high` quality band.
    pub high_quality_max_stats: usize,
    pub medium_quality_min_level: u8,
    pub powerful_species: Vec<String>,
    pub move_power_ceiling: u8,
    pub default_moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Current effort level at or above which an oversized delta is read as
    /// an absolute value.
    pub effort_replace_threshold: u16,
    pub effort_cap: u16,
    pub bond_cap: u8,
    pub proficiency_cap: u8,
    pub autofill_effort_per_level: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub capacity: usize,
    pub npc_fallback_species: String,
    pub npc_fallback_level: u8,
    pub player_fallback_species: String,
    pub player_fallback_level: u8,
    pub player_fallback_moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub read_timeout_ms: u64,
    pub write_settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub leader_cooldown_ms: u64,
    pub settings_cooldown_ms: u64,
    pub queue_depth: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            tags: TagConfig::default(),
            identity: IdentityConfig::default(),
            generation: GenerationConfig::default(),
            reconcile: ReconcileConfig::default(),
            roster: RosterConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            default_settings: default_settings(),
        }
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            declaration: "PKM_BATTLE".to_string(),
            payload: "PKM_FRONTEND".to_string(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            player_keywords: strings(&["player", "玩家", "主角", "user", "训练家"]),
            user_macro: "{{user}}".to_string(),
            wild_keywords: strings(&["wild", "野生"]),
            alliance_separators: vec!['&', '＆'],
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tier_levels: BTreeMap::from([(1, 25), (2, 50), (3, 75), (4, 85)]),
            unknown_tier_level: 50,
            fallback_level: 5,
            shiny_odds: 4096,
            hidden_ability_chance: 0.2,
            high_quality_max_stats: 3,
            medium_quality_min_level: 50,
            powerful_species: strings(&[
                "mewtwo", "mew", "lugia", "hooh", "rayquaza", "dialga", "palkia", "giratina",
                "reshiram", "zekrom", "kyurem", "xerneas", "yveltal", "zygarde", "solgaleo",
                "lunala", "necrozma", "zacian", "zamazenta", "eternatus", "koraidon", "miraidon",
            ]),
            move_power_ceiling: 100,
            default_moves: strings(&["Tackle", "Scratch", "Growl", "Leer"]),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            effort_replace_threshold: 20,
            effort_cap: 252,
            bond_cap: 255,
            proficiency_cap: 255,
            autofill_effort_per_level: 2.5,
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            capacity: 6,
            npc_fallback_species: "Rattata".to_string(),
            npc_fallback_level: 5,
            player_fallback_species: "Pikachu".to_string(),
            player_fallback_level: 5,
            player_fallback_moves: strings(&["Thunder Shock", "Quick Attack"]),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5000,
            write_settle_ms: 100,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            leader_cooldown_ms: 1000,
            settings_cooldown_ms: 500,
            queue_depth: 32,
        }
    }
}

impl ResolverConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Level for a difficulty tier, or the plain fallback level when no tier
    /// is known at all.
    pub fn level_for_tier(&self, tier: Option<u8>) -> u8 {
        match tier {
            Some(tier) => self
                .generation
                .tier_levels
                .get(&tier)
                .copied()
                .unwrap_or(self.generation.unknown_tier_level),
            None => self.generation.fallback_level,
        }
    }
}

impl StoreConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_settle(&self) -> Duration {
        Duration::from_millis(self.write_settle_ms)
    }
}

impl SessionConfig {
    pub fn leader_cooldown(&self) -> Duration {
        Duration::from_millis(self.leader_cooldown_ms)
    }

    pub fn settings_cooldown(&self) -> Duration {
        Duration::from_millis(self.settings_cooldown_ms)
    }
}
