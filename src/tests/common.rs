use crate::config::ResolverConfig;
use crate::dex::Dex;
use crate::pipeline::PipelineInputs;
use crate::player::StoredPlayer;
use crate::roster::{slot_key, RosterEntry};
use crate::store::StoreSnapshot;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

/// A builder for stored party entries, in the store's JSON shape.
///
/// # Example
/// ```ignore
/// let pikachu = TestEntryBuilder::new("Pikachu", 42)
///     .with_moves(&["Thunderbolt"])
///     .with_ivs([31, 31, 31, 31, 31, 31])
///     .build();
/// ```
pub struct TestEntryBuilder {
    name: String,
    level: u8,
    moves: Vec<String>,
    ivs: Option<[u8; 6]>,
    ev_level: Option<u16>,
    ev_up: Option<i64>,
    bonds: Option<u8>,
    bonds_up: Option<i64>,
    is_lead: bool,
    extra: Map<String, Value>,
}

impl TestEntryBuilder {
    pub fn new(name: &str, level: u8) -> Self {
        Self {
            name: name.to_string(),
            level,
            moves: Vec::new(),
            ivs: None,
            ev_level: None,
            ev_up: None,
            bonds: None,
            bonds_up: None,
            is_lead: false,
            extra: Map::new(),
        }
    }

    pub fn with_moves(mut self, moves: &[&str]) -> Self {
        self.moves = moves.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_ivs(mut self, ivs: [u8; 6]) -> Self {
        self.ivs = Some(ivs);
        self
    }

    pub fn with_effort(mut self, ev_level: u16) -> Self {
        self.ev_level = Some(ev_level);
        self
    }

    /// Pending effort delta, folded on the next reconciliation.
    pub fn with_effort_up(mut self, ev_up: i64) -> Self {
        self.ev_up = Some(ev_up);
        self
    }

    pub fn with_bonds(mut self, bonds: u8, bonds_up: i64) -> Self {
        self.bonds = Some(bonds);
        self.bonds_up = Some(bonds_up);
        self
    }

    pub fn lead(mut self) -> Self {
        self.is_lead = true;
        self
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        let mut meta = Map::new();
        if let Some([hp, atk, def, spa, spd, spe]) = self.ivs {
            meta.insert(
                "ivs".to_string(),
                json!({"hp": hp, "atk": atk, "def": def, "spa": spa, "spd": spd, "spe": spe}),
            );
        }
        if let Some(ev_level) = self.ev_level {
            meta.insert("ev_level".to_string(), json!(ev_level));
        }
        if let Some(ev_up) = self.ev_up {
            meta.insert("ev_up".to_string(), json!(ev_up));
        }

        let mut entry = self.extra;
        entry.insert("name".to_string(), json!(self.name));
        entry.insert("lv".to_string(), json!(self.level));
        entry.insert("moves".to_string(), json!(self.moves));
        entry.insert("isLead".to_string(), json!(self.is_lead));
        entry.insert("stats_meta".to_string(), Value::Object(meta));
        if let Some(bonds) = self.bonds {
            entry.insert("bonds".to_string(), json!(bonds));
        }
        if let Some(bonds_up) = self.bonds_up {
            entry.insert("bonds_up".to_string(), json!(bonds_up));
        }
        Value::Object(entry)
    }

    /// The parsed form, as the resolver would see it.
    pub fn entry(self) -> RosterEntry {
        match RosterEntry::from_value(&self.build()) {
            Some(entry) => entry,
            None => panic!("test entry did not parse"),
        }
    }
}

/// Builds a whole store document.
#[derive(Default)]
pub struct TestStoreBuilder {
    name: Option<String>,
    party: Vec<Value>,
    boxed: Vec<Value>,
    settings: Map<String, Value>,
    world_state: Option<Value>,
    proficiency: Option<(u8, i64)>,
    legacy: bool,
}

impl TestStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Appends to the party; slots are assigned in order.
    pub fn with_member(mut self, entry: TestEntryBuilder) -> Self {
        self.party.push(entry.build());
        self
    }

    pub fn with_boxed(mut self, entry: TestEntryBuilder) -> Self {
        self.boxed.push(entry.build());
        self
    }

    pub fn with_setting(mut self, flag: &str, enabled: bool) -> Self {
        self.settings.insert(flag.to_string(), json!(enabled));
        self
    }

    pub fn with_world_state(mut self, world_state: Value) -> Self {
        self.world_state = Some(world_state);
        self
    }

    pub fn with_proficiency(mut self, current: u8, pending: i64) -> Self {
        self.proficiency = Some((current, pending));
        self
    }

    /// Nests everything under the legacy `pkm` root.
    pub fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }

    pub fn build(self) -> Value {
        let mut player = Map::new();
        if let Some(name) = self.name {
            player.insert("name".to_string(), json!(name));
        }
        let party: Map<String, Value> = self
            .party
            .into_iter()
            .enumerate()
            .map(|(i, entry)| (slot_key(i as u8 + 1), entry))
            .collect();
        player.insert("party".to_string(), Value::Object(party));
        let boxed: Map<String, Value> = self
            .boxed
            .into_iter()
            .enumerate()
            .map(|(i, entry)| (crate::storage::box_key(i as u32 + 1), entry))
            .collect();
        player.insert("box".to_string(), Value::Object(boxed));
        if let Some((current, pending)) = self.proficiency {
            player.insert("trainerProficiency".to_string(), json!(current));
            player.insert("proficiency_up".to_string(), json!(pending));
        }

        let mut doc = Map::new();
        doc.insert("player".to_string(), Value::Object(player));
        doc.insert("settings".to_string(), Value::Object(self.settings));
        if let Some(world_state) = self.world_state {
            doc.insert("world_state".to_string(), world_state);
        }

        if self.legacy {
            json!({ "pkm": Value::Object(doc) })
        } else {
            Value::Object(doc)
        }
    }

    pub fn snapshot(self) -> StoreSnapshot {
        StoreSnapshot::new(self.build())
    }

    pub fn player(self) -> StoredPlayer {
        self.snapshot().player()
    }
}

/// Creates a predictable RNG for tests.
pub fn predictable_rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

pub fn inputs<'a>(config: &'a ResolverConfig, stored: &'a StoredPlayer) -> PipelineInputs<'a> {
    PipelineInputs {
        dex: Dex::compiled(),
        config,
        stored,
        world_state: None,
    }
}

/// Wraps a JSON declaration in the default declaration tag.
pub fn declaration_message(body: &str) -> String {
    format!("The battle begins!\n<PKM_BATTLE>\n{}\n</PKM_BATTLE>", body)
}
