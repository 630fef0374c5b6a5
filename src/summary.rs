//! Plain-text team summary injected into the agent's prompt.

use crate::player::StoredPlayer;
use crate::roster::{IndividualValues, RosterEntry, MAX_MOVES};
use crate::storage::PARTY_SLOTS;
use crate::unlocks::{merge, UnlockFlag};
use serde_json::Value;
use std::fmt;

const RULE: &str = "--------------------------------------------------";

/// Count of perfect stats, with `5V0A` for five perfect stats and a zero attack.
pub fn iv_summary(ivs: Option<&IndividualValues>) -> String {
    let Some(ivs) = ivs else {
        return "???".to_string();
    };
    let perfect = ivs.perfect_count();
    if perfect == 5 && ivs.atk == 0 {
        "5V0A".to_string()
    } else {
        format!("{}V", perfect)
    }
}

/// Display order for unlock labels.
const LABEL_ORDER: [UnlockFlag; 8] = [
    UnlockFlag::EnableMega,
    UnlockFlag::EnableZMove,
    UnlockFlag::EnableDynamax,
    UnlockFlag::EnableTera,
    UnlockFlag::EnableBond,
    UnlockFlag::EnableStyles,
    UnlockFlag::EnableInsight,
    UnlockFlag::EnableProficiencyCap,
];

pub struct TeamSummary<'a> {
    player: &'a StoredPlayer,
    declaration_tag: &'a str,
}

impl<'a> TeamSummary<'a> {
    pub fn new(player: &'a StoredPlayer, declaration_tag: &'a str) -> Self {
        Self {
            player,
            declaration_tag,
        }
    }

    fn unlock_labels(&self) -> Vec<&'static str> {
        let unlocks = merge([&self.player.unlocks, &self.player.bonds]);
        LABEL_ORDER
            .iter()
            .filter(|flag| unlocks.get(**flag))
            .map(|flag| flag.label())
            .collect()
    }

    fn boxed(&self) -> Vec<String> {
        self.player
            .storage
            .values()
            .filter_map(|entry| {
                let name = entry
                    .get("nickname")
                    .and_then(Value::as_str)
                    .or_else(|| entry.get("name").and_then(Value::as_str))?;
                let level = entry
                    .get("lv")
                    .or_else(|| entry.get("level"))
                    .map(|lv| lv.to_string())
                    .unwrap_or_else(|| "??".to_string());
                Some(format!("{}/Lv.{}", name, level))
            })
            .collect()
    }
}

fn write_entry(f: &mut fmt::Formatter<'_>, slot: u8, entry: &RosterEntry) -> fmt::Result {
    let gender = entry.gender.map_or("⚪", |g| g.symbol());
    let lead = if entry.is_lead { " [Lead]" } else { "" };
    writeln!(
        f,
        "slot{}. {} {} (Lv.{}){}",
        slot,
        gender,
        entry.display_name(),
        entry.level,
        lead
    )?;
    if entry.nickname.is_some() {
        writeln!(f, "   Species: {}", entry.name)?;
    }
    writeln!(
        f,
        "   [Nature: {}] [Ability: {}]",
        entry.nature.map_or_else(|| "???".to_string(), |n| n.to_string()),
        entry.ability.as_deref().unwrap_or("???")
    )?;
    writeln!(
        f,
        "   [Stats: {}] [EVs: {}] [Bonds: {}]",
        iv_summary(entry.stats_meta.ivs.as_ref()),
        entry.stats_meta.ev_level.unwrap_or(0),
        entry.bonds
    )?;
    if entry.held_item.is_some() || entry.mechanic.is_some() {
        writeln!(
            f,
            "   [Item: {}] [Mechanic: {}]",
            entry.held_item.as_deref().unwrap_or("—"),
            entry
                .mechanic
                .map_or_else(|| "—".to_string(), |m| format!("{:?}", m).to_lowercase())
        )?;
    }
    let moves: Vec<String> = (0..MAX_MOVES)
        .map(|i| format!("move{}: {}", i + 1, entry.moves.get(i).map_or("—", String::as_str)))
        .collect();
    write!(
        f,
        "   Moves ({}/{}): {}",
        entry.moves.len(),
        MAX_MOVES,
        moves.join(" | ")
    )
}

impl fmt::Display for TeamSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self.unlock_labels();
        let unlocks = if labels.is_empty() {
            "none".to_string()
        } else {
            labels.join("/")
        };

        writeln!(f, "<pkm_team_summary>")?;
        writeln!(
            f,
            "Trainer: {} | Unlocks: [{}] | Party: ({}/{})",
            self.player.name.as_deref().unwrap_or("Trainer"),
            unlocks,
            self.player.party.len(),
            PARTY_SLOTS
        )?;
        writeln!(f, "{}", RULE)?;
        for slot in 1..=PARTY_SLOTS {
            if slot > 1 {
                writeln!(f)?;
            }
            match self.player.party.iter().find(|e| e.slot == Some(slot)) {
                Some(entry) => write_entry(f, slot, entry)?,
                None => write!(f, "slot{}. —", slot)?,
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", RULE)?;
        if !labels.is_empty() {
            writeln!(f, "Unlocked: {}", labels.join(" | "))?;
        }
        let boxed = self.boxed();
        if !boxed.is_empty() {
            writeln!(f, "Box ({}): {}", boxed.len(), boxed.join(" | "))?;
        }
        writeln!(
            f,
            "Use a <{}> block to call this team into battle.",
            self.declaration_tag
        )?;
        write!(f, "</pkm_team_summary>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case([31, 31, 31, 31, 31, 31], "6V")]
    #[case([31, 0, 31, 31, 31, 31], "5V0A")]
    #[case([31, 30, 31, 31, 31, 31], "5V")]
    #[case([0, 0, 0, 0, 0, 0], "0V")]
    fn test_iv_summary(#[case] values: [u8; 6], #[case] expected: &str) {
        assert_eq!(iv_summary(Some(&IndividualValues::from_array(values))), expected);
    }

    #[test]
    fn test_summary_text() {
        let player = StoredPlayer::from_document(&json!({
            "player": {
                "name": "Red",
                "unlocks": {"enable_tera": true, "enable_mega": true},
                "bonds": {"enable_bond": true},
                "party": {
                    "slot1": {
                        "name": "Pikachu", "nickname": "Sparky", "gender": "M", "lv": 42,
                        "nature": "Timid", "ability": "Static", "isLead": true,
                        "stats_meta": {"ivs": {"hp": 31, "atk": 0, "def": 31, "spa": 31, "spd": 31, "spe": 31}, "ev_level": 105},
                        "moves": ["Thunderbolt", "Quick Attack"]
                    }
                },
                "box": {"storage_01": {"name": "Eevee", "lv": 3}}
            }
        }));
        let text = TeamSummary::new(&player, "PKM_BATTLE").to_string();

        assert!(text.starts_with("<pkm_team_summary>\nTrainer: Red | Unlocks: [Mega/Tera/Bond] | Party: (1/6)"));
        assert!(text.contains("slot1. ♂ Sparky (Lv.42) [Lead]"));
        assert!(text.contains("[Nature: Timid] [Ability: Static]"));
        assert!(text.contains("[Stats: 5V0A] [EVs: 105] [Bonds: 0]"));
        assert!(text.contains("Moves (2/4): move1: Thunderbolt | move2: Quick Attack | move3: — | move4: —"));
        assert!(text.contains("slot2. —"));
        assert!(text.contains("Box (1): Eevee/Lv.3"));
        assert!(text.ends_with("</pkm_team_summary>"));
    }
}
