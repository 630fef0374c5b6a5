//! Roster resolution: turns each declared side into a complete trainer.
//!
//! Branches, first match wins:
//!
//! 1. alliance: members are resolved independently, concatenated, and cut
//!    down to capacity by proportional allocation;
//! 2. player with no declared party: the stored party, verbatim;
//! 3. player with a name-only party: stored entries matching those names,
//!    or the whole stored party when nothing matches;
//! 4. fully detailed party: used verbatim;
//! 5. mixed party: detailed entries verbatim, the rest looked up or generated;
//! 6. non-player name-only party: every entry generated.

use crate::config::ResolverConfig;
use crate::declaration::{
    AllianceDecl, BattleDeclaration, CombatantDecl, EntryDecl, PartialEntry, TrainerDecl,
};
use crate::dex::Dex;
use crate::errors::{ResolveError, ResolveResult};
use crate::generator::{GenerationContext, Generator};
use crate::player::StoredPlayer;
use crate::roster::RosterEntry;
use crate::unlocks::{detect_from_roster, merge, PartialUnlocks, UnlockFlags};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerKind {
    #[serde(rename = "player")]
    Player,
    #[serde(rename = "wild")]
    Wild,
    #[serde(rename = "generated_trainer")]
    Generated,
}

/// Which side of the declaration a trainer was declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrainer {
    pub name: String,
    pub id: Option<String>,
    pub kind: TrainerKind,
    pub roster: Vec<RosterEntry>,
    pub unlocks: UnlockFlags,
    pub proficiency: u8,
    pub lines: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBattle {
    pub side_a: ResolvedTrainer,
    pub side_b: ResolvedTrainer,
}

/// Per-request resolution context.
pub struct Resolver<'a> {
    dex: &'a Dex,
    config: &'a ResolverConfig,
    stored: &'a StoredPlayer,
}

impl<'a> Resolver<'a> {
    pub fn new(dex: &'a Dex, config: &'a ResolverConfig, stored: &'a StoredPlayer) -> Self {
        Self {
            dex,
            config,
            stored,
        }
    }

    fn generator(&self) -> Generator<'a> {
        Generator::new(self.dex, self.config)
    }

    /// Resolves both sides. A missing player side resolves to the stored
    /// player; a missing opposing side resolves to a fallback wild creature.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        declaration: &BattleDeclaration,
        rng: &mut R,
    ) -> ResolveResult<ResolvedBattle> {
        let unnamed_player = CombatantDecl::Single(TrainerDecl::default());
        let unnamed_wild = CombatantDecl::Single(TrainerDecl {
            kind_hint: Some("wild".to_string()),
            ..TrainerDecl::default()
        });

        let side_a = self.resolve_combatant(
            declaration.side_a.as_ref().unwrap_or(&unnamed_player),
            Side::A,
            declaration.tier,
            rng,
        )?;
        let side_b = self.resolve_combatant(
            declaration.side_b.as_ref().unwrap_or(&unnamed_wild),
            Side::B,
            declaration.tier,
            rng,
        )?;
        Ok(ResolvedBattle { side_a, side_b })
    }

    pub fn resolve_combatant<R: Rng + ?Sized>(
        &self,
        combatant: &CombatantDecl,
        side: Side,
        tier: Option<u8>,
        rng: &mut R,
    ) -> ResolveResult<ResolvedTrainer> {
        match combatant {
            CombatantDecl::Single(trainer) => Ok(self.resolve_trainer(trainer, side, tier, rng)),
            CombatantDecl::Alliance(alliance) => self.resolve_alliance(alliance, side, tier, rng),
        }
    }

    pub fn classify(&self, trainer: &TrainerDecl, side: Side) -> TrainerKind {
        let identity = &self.config.identity;
        let Some(name) = trainer.name.as_deref() else {
            return match (side, trainer.kind_hint.as_deref()) {
                (_, Some(hint)) if hint.eq_ignore_ascii_case("wild") => TrainerKind::Wild,
                (Side::A, _) => TrainerKind::Player,
                (Side::B, _) => TrainerKind::Generated,
            };
        };

        let lowered = name.to_lowercase();
        let is_player = identity
            .player_keywords
            .iter()
            .any(|kw| lowered.contains(&kw.to_lowercase()))
            || name.contains(&identity.user_macro)
            || self.stored.name.as_deref() == Some(name);
        if is_player {
            return TrainerKind::Player;
        }

        let is_wild = trainer
            .kind_hint
            .as_deref()
            .is_some_and(|hint| hint.eq_ignore_ascii_case("wild"))
            || identity
                .wild_keywords
                .iter()
                .any(|kw| lowered.contains(&kw.to_lowercase()));
        if is_wild {
            TrainerKind::Wild
        } else {
            TrainerKind::Generated
        }
    }

    pub fn resolve_trainer<R: Rng + ?Sized>(
        &self,
        trainer: &TrainerDecl,
        side: Side,
        tier: Option<u8>,
        rng: &mut R,
    ) -> ResolvedTrainer {
        self.build_trainer(trainer, side, tier, Some(self.config.roster.capacity), rng)
    }

    /// An alliance member keeps its whole roster; share allocation decides
    /// what survives.
    fn resolve_member<R: Rng + ?Sized>(
        &self,
        trainer: &TrainerDecl,
        side: Side,
        tier: Option<u8>,
        rng: &mut R,
    ) -> ResolvedTrainer {
        self.build_trainer(trainer, side, tier, None, rng)
    }

    fn build_trainer<R: Rng + ?Sized>(
        &self,
        trainer: &TrainerDecl,
        side: Side,
        tier: Option<u8>,
        capacity: Option<usize>,
        rng: &mut R,
    ) -> ResolvedTrainer {
        let kind = self.classify(trainer, side);
        let tier = trainer.tier.or(tier);
        let mut roster = match kind {
            TrainerKind::Player => self.player_roster(&trainer.party, tier, rng),
            TrainerKind::Wild | TrainerKind::Generated => self.npc_roster(trainer, kind, tier, rng),
        };
        if let Some(capacity) = capacity {
            enforce_capacity(&mut roster, capacity, trainer.name.as_deref().unwrap_or("player"));
        }
        enforce_single_lead(&mut roster);

        let detected = detect_from_roster(&roster);
        let (unlocks, proficiency) = match kind {
            TrainerKind::Player => (
                merge([
                    &trainer.unlocks,
                    &self.stored.unlocks,
                    &self.stored.bonds,
                    &detected,
                ]),
                trainer.proficiency.unwrap_or(self.stored.proficiency),
            ),
            _ => (
                merge([&trainer.unlocks, &detected]),
                trainer.proficiency.unwrap_or(0),
            ),
        };

        let name = trainer
            .name
            .clone()
            .or_else(|| match kind {
                TrainerKind::Player => self.stored.name.clone(),
                _ => None,
            })
            .unwrap_or_else(|| match kind {
                TrainerKind::Player => "Player".to_string(),
                TrainerKind::Wild => "wild".to_string(),
                TrainerKind::Generated => "Trainer".to_string(),
            });

        info!(
            trainer = %name,
            ?kind,
            roster = roster.len(),
            "resolved trainer"
        );

        ResolvedTrainer {
            name,
            id: trainer.id.clone(),
            kind,
            roster,
            unlocks,
            proficiency,
            lines: trainer.lines.clone(),
        }
    }

    fn player_roster<R: Rng + ?Sized>(
        &self,
        party: &[EntryDecl],
        tier: Option<u8>,
        rng: &mut R,
    ) -> Vec<RosterEntry> {
        if party.is_empty() {
            return self.stored_roster_or_fallback();
        }

        if party.iter().all(EntryDecl::is_complete) {
            debug!("player party fully declared");
            return verbatim(party);
        }

        if !party.iter().any(EntryDecl::is_complete) && self.stored.has_party() {
            let mut taken = Vec::new();
            for entry in party {
                match self.stored.find_member(entry.name(), &taken) {
                    Some(i) => taken.push(i),
                    None => warn!(species = entry.name(), "not found in stored party"),
                }
            }
            if taken.is_empty() {
                warn!("no declared names matched; using the whole stored party");
                return self.stored.party.clone();
            }
            return taken.iter().map(|&i| self.stored.party[i].clone()).collect();
        }

        let generator = self.generator();
        let mut taken = Vec::new();
        party
            .iter()
            .map(|entry| match entry {
                EntryDecl::Complete(entry) => (**entry).clone(),
                other => match self.stored.find_member(other.name(), &taken) {
                    Some(i) => {
                        taken.push(i);
                        self.stored.party[i].clone()
                    }
                    None => generator.generate(&other.to_partial(), tier, GenerationContext::Npc, rng),
                },
            })
            .collect()
    }

    fn stored_roster_or_fallback(&self) -> Vec<RosterEntry> {
        if self.stored.has_party() {
            return self.stored.party.clone();
        }
        let roster = &self.config.roster;
        warn!(
            species = %roster.player_fallback_species,
            "stored party is empty; using the fallback creature"
        );
        vec![RosterEntry::new(
            roster.player_fallback_species.clone(),
            roster.player_fallback_level,
        )
        .with_moves(roster.player_fallback_moves.iter().cloned())]
    }

    fn npc_roster<R: Rng + ?Sized>(
        &self,
        trainer: &TrainerDecl,
        kind: TrainerKind,
        tier: Option<u8>,
        rng: &mut R,
    ) -> Vec<RosterEntry> {
        let context = match kind {
            TrainerKind::Wild => GenerationContext::Wild,
            _ => GenerationContext::Npc,
        };
        let generator = self.generator();

        if trainer.party.is_empty() {
            let roster = &self.config.roster;
            let species = trainer
                .name
                .as_deref()
                .filter(|name| self.dex.lookup_species(name).is_some())
                .unwrap_or(&roster.npc_fallback_species);
            debug!(species, "no party declared; generating a single creature");
            let partial = PartialEntry {
                level: Some(roster.npc_fallback_level),
                ..PartialEntry::named(species)
            };
            return vec![generator.generate(&partial, tier, context, rng)];
        }

        trainer
            .party
            .iter()
            .map(|entry| match entry {
                EntryDecl::Complete(entry) => (**entry).clone(),
                other => generator.generate(&other.to_partial(), tier, context, rng),
            })
            .collect()
    }

    fn resolve_alliance<R: Rng + ?Sized>(
        &self,
        alliance: &AllianceDecl,
        side: Side,
        tier: Option<u8>,
        rng: &mut R,
    ) -> ResolveResult<ResolvedTrainer> {
        let tier = alliance.tier.or(tier);
        let members: Vec<ResolvedTrainer> = alliance
            .members
            .iter()
            .map(|member| {
                let member = TrainerDecl {
                    kind_hint: member.kind_hint.clone().or_else(|| alliance.kind_hint.clone()),
                    ..member.clone()
                };
                let mut resolved = self.resolve_member(&member, side, tier, rng);
                for entry in &mut resolved.roster {
                    entry.trainer = Some(resolved.name.clone());
                }
                resolved
            })
            .collect();

        let counts: Vec<usize> = members.iter().map(|m| m.roster.len()).collect();
        let capacity = self.config.roster.capacity;
        let shares = allocate_shares(&counts, capacity).ok_or_else(|| {
            ResolveError::AllianceOverCapacity {
                alliance: alliance.name.clone(),
                members: counts.iter().filter(|&&c| c > 0).count(),
                capacity,
            }
        })?;

        let over_capacity = counts.iter().sum::<usize>() > capacity;
        let mut roster = Vec::with_capacity(capacity);
        for (member, share) in members.iter().zip(&shares) {
            let mut entries = member.roster.clone();
            if over_capacity {
                entries.sort_by(|a, b| b.level.cmp(&a.level));
                debug!(
                    trainer = %member.name,
                    share,
                    declared = member.roster.len(),
                    "allocated alliance share"
                );
            }
            entries.truncate(*share);
            roster.extend(entries);
        }
        enforce_single_lead(&mut roster);

        let member_flags: Vec<PartialUnlocks> =
            members.iter().map(|m| PartialUnlocks::from(&m.unlocks)).collect();
        let unlocks = merge(&member_flags).with_override(&alliance.unlocks);

        let kind = if members.iter().any(|m| m.kind == TrainerKind::Wild) {
            TrainerKind::Wild
        } else if members.iter().any(|m| m.kind == TrainerKind::Player) {
            TrainerKind::Player
        } else {
            TrainerKind::Generated
        };

        info!(
            alliance = %alliance.name,
            members = members.len(),
            roster = roster.len(),
            "resolved alliance"
        );

        Ok(ResolvedTrainer {
            name: alliance.name.clone(),
            id: None,
            kind,
            roster,
            unlocks,
            proficiency: members.iter().map(|m| m.proficiency).max().unwrap_or(0),
            lines: alliance
                .lines
                .clone()
                .or_else(|| members.iter().find_map(|m| m.lines.clone())),
        })
    }
}

fn enforce_capacity(roster: &mut Vec<RosterEntry>, capacity: usize, owner: &str) {
    if roster.len() > capacity {
        warn!(
            trainer = owner,
            declared = roster.len(),
            capacity,
            "roster over capacity; truncating"
        );
        roster.truncate(capacity);
    }
}

fn verbatim(party: &[EntryDecl]) -> Vec<RosterEntry> {
    party
        .iter()
        .filter_map(|entry| match entry {
            EntryDecl::Complete(entry) => Some((**entry).clone()),
            _ => None,
        })
        .collect()
}

/// Keeps the first lead flag and clears the rest.
pub fn enforce_single_lead(roster: &mut [RosterEntry]) {
    let mut seen = false;
    for entry in roster.iter_mut() {
        if entry.is_lead {
            if seen {
                entry.is_lead = false;
            }
            seen = true;
        }
    }
}

/// Splits `capacity` roster slots among alliance members by their declared
/// counts.
///
/// Under capacity every member keeps everything. Over capacity each member
/// with entries gets `round(count / total * capacity)`, at least one; the
/// largest share above one (first seen on ties) gives up slots until the sum
/// fits, and the largest unmet demand (first seen on ties) takes slots back
/// while the sum is short. Returns `None` when more members have entries
/// than there are slots.
pub fn allocate_shares(counts: &[usize], capacity: usize) -> Option<Vec<usize>> {
    let total: usize = counts.iter().sum();
    if total <= capacity {
        return Some(counts.to_vec());
    }
    if counts.iter().filter(|&&c| c > 0).count() > capacity {
        return None;
    }

    let mut shares: Vec<usize> = counts
        .iter()
        .map(|&count| {
            if count == 0 {
                return 0;
            }
            let ideal = (count as f64 / total as f64 * capacity as f64).round() as usize;
            ideal.clamp(1, count)
        })
        .collect();

    while shares.iter().sum::<usize>() > capacity {
        let Some(largest) = first_max_by_key(&shares, |_, &share| (share > 1).then_some(share)) else {
            break;
        };
        shares[largest] -= 1;
    }
    while shares.iter().sum::<usize>() < capacity {
        let Some(hungriest) = first_max_by_key(&shares, |i, &share| {
            let surplus = counts[i] - share;
            (surplus > 0).then_some(surplus)
        }) else {
            break;
        };
        shares[hungriest] += 1;
    }
    Some(shares)
}

/// Index of the first element with the greatest key, skipping `None` keys.
fn first_max_by_key<F>(items: &[usize], mut key: F) -> Option<usize>
where
    F: FnMut(usize, &usize) -> Option<usize>,
{
    let mut best: Option<(usize, usize)> = None;
    for (i, item) in items.iter().enumerate() {
        if let Some(k) = key(i, item) {
            match best {
                Some((_, best_key)) if best_key >= k => {}
                _ => best = Some((i, k)),
            }
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[4, 5], vec![3, 3])]
    #[case(&[2, 3], vec![2, 3])]
    #[case(&[10, 1], vec![5, 1])]
    #[case(&[4, 4, 1], vec![2, 3, 1])]
    #[case(&[7, 7, 7, 7], vec![1, 1, 2, 2])]
    #[case(&[8, 8, 8, 8, 8], vec![2, 1, 1, 1, 1])]
    #[case(&[0, 9], vec![0, 6])]
    #[case(&[1, 1, 1, 1, 1, 2], vec![1, 1, 1, 1, 1, 1])]
    fn test_allocate_shares(#[case] counts: &[usize], #[case] expected: Vec<usize>) {
        assert_eq!(allocate_shares(counts, 6), Some(expected));
    }

    #[test]
    fn test_allocate_shares_rejects_too_many_members() {
        assert_eq!(allocate_shares(&[1, 1, 1, 1, 1, 1, 1], 6), None);
        assert_eq!(allocate_shares(&[1, 1, 1, 1, 1, 1, 0], 6), Some(vec![1, 1, 1, 1, 1, 1, 0]));
    }

    #[test]
    fn test_enforce_single_lead() {
        let mut roster: Vec<RosterEntry> = (0..3)
            .map(|i| {
                let mut entry = RosterEntry::new(format!("Mon{}", i), 10);
                entry.is_lead = i > 0;
                entry
            })
            .collect();
        enforce_single_lead(&mut roster);
        let leads: Vec<bool> = roster.iter().map(|e| e.is_lead).collect();
        assert_eq!(leads, vec![false, true, false]);
    }
}
