//! Folds `*_up` delta fields into their cumulative counters, exactly once.
//!
//! Every change is made to the in-memory [`StoredPlayer`] and mirrored into a
//! [`StorePatch`] that also resets the consumed delta to zero, so applying
//! the patch a second time is a no-op.

use crate::config::ReconcileConfig;
use crate::player::StoredPlayer;
use crate::roster::{IndividualValues, Quality, RosterEntry, MAX_IV};
use crate::store::StorePatch;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info, warn};

const AUTOFILL_WEIGHTS: [(Quality, u32); 4] = [
    (Quality::Low, 30),
    (Quality::Medium, 40),
    (Quality::High, 25),
    (Quality::Perfect, 5),
];

/// How an effort delta was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffortFold {
    Added(u16),
    /// The delta looked like an absolute total and replaced the counter.
    Replaced(u16),
}

impl EffortFold {
    pub fn value(self) -> u16 {
        match self {
            EffortFold::Added(v) | EffortFold::Replaced(v) => v,
        }
    }
}

/// A delta larger than the current value is taken as a mistaken absolute
/// total once the current value has reached the threshold. Otherwise it is
/// added, capped, and never lowers the counter.
pub fn fold_effort(current: u16, delta: i64, config: &ReconcileConfig) -> EffortFold {
    let current_wide = i64::from(current);
    if delta > current_wide && current >= config.effort_replace_threshold {
        return EffortFold::Replaced(u16::try_from(delta).unwrap_or(u16::MAX));
    }
    let added = (current_wide + delta).clamp(0, i64::from(config.effort_cap));
    EffortFold::Added(current.max(added as u16))
}

pub fn fold_bonds(current: u8, delta: i64, cap: u8) -> u8 {
    (i64::from(current) + delta).clamp(i64::from(current), i64::from(cap.max(current))) as u8
}

pub fn fold_proficiency(current: u8, delta: i64, cap: u8) -> u8 {
    (i64::from(current) + delta).clamp(0, i64::from(cap)) as u8
}

/// Individual values summing to the band's target, allocated stat by stat
/// so that every remaining stat can still absorb what is left.
pub fn autofill_ivs<R: Rng + ?Sized>(quality: Quality, rng: &mut R) -> IndividualValues {
    let target: i32 = match quality {
        Quality::Low => 90,
        Quality::Medium => 120,
        Quality::High => 150,
        Quality::Perfect => return IndividualValues::PERFECT,
    };
    let max = i32::from(MAX_IV);
    let mut remaining = target;
    let values: [u8; 6] = std::array::from_fn(|i| {
        let left_after = 5 - i as i32;
        let value = if left_after == 0 {
            remaining.clamp(0, max)
        } else {
            let hi = remaining.min(max);
            let lo = (remaining - left_after * max).max(0);
            rng.random_range(lo..=hi)
        };
        remaining -= value;
        value as u8
    });
    IndividualValues::from_array(values)
}

fn autofill_quality<R: Rng + ?Sized>(declared: Option<Quality>, rng: &mut R) -> Quality {
    declared.unwrap_or_else(|| {
        AUTOFILL_WEIGHTS
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(quality, _)| *quality)
            .unwrap_or(Quality::Medium)
    })
}

pub struct Reconciler<'a> {
    config: &'a ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Self {
        Self { config }
    }

    /// Reconciles the whole player: effort, bonds, proficiency, missing stats
    /// and the ace marker.
    pub fn reconcile<R: Rng + ?Sized>(&self, player: &mut StoredPlayer, rng: &mut R) -> StorePatch {
        let mut patch = StorePatch::new();
        for entry in &mut player.party {
            let Some(base) = entry.store_path() else {
                warn!(species = %entry.name, "stored entry cannot be patched in place; skipping reconciliation");
                continue;
            };
            self.reconcile_effort(entry, &base, &mut patch);
            self.reconcile_bonds(entry, &base, &mut patch);
            self.autofill_stats(entry, &base, &mut patch, rng);
            if !entry.is_ace {
                entry.is_ace = true;
                patch.set(format!("{}.isAce", base), true);
            }
        }
        self.reconcile_proficiency(player, &mut patch);

        if !patch.is_empty() {
            info!(paths = patch.len(), "reconciled stored player");
        }
        patch
    }

    fn reconcile_effort(&self, entry: &mut RosterEntry, base: &str, patch: &mut StorePatch) {
        let delta = entry.stats_meta.ev_up.unwrap_or(0);
        if delta <= 0 {
            return;
        }
        let current = entry.stats_meta.ev_level.unwrap_or(0);
        let folded = fold_effort(current, delta, self.config);
        debug!(
            species = %entry.name,
            current,
            delta,
            ?folded,
            "folded effort delta"
        );
        entry.stats_meta.ev_level = Some(folded.value());
        entry.stats_meta.ev_up = Some(0);
        patch
            .set(format!("{}.stats_meta.ev_level", base), folded.value())
            .set(format!("{}.stats_meta.ev_up", base), 0);
    }

    fn reconcile_bonds(&self, entry: &mut RosterEntry, base: &str, patch: &mut StorePatch) {
        let delta = entry.bonds_up.unwrap_or(0);
        if delta <= 0 {
            return;
        }
        let bonds = fold_bonds(entry.bonds, delta, self.config.bond_cap);
        debug!(species = %entry.name, current = entry.bonds, delta, bonds, "folded bond delta");
        entry.bonds = bonds;
        entry.bonds_up = Some(0);
        patch
            .set(format!("{}.bonds", base), bonds)
            .set(format!("{}.bonds_up", base), 0);
    }

    fn reconcile_proficiency(&self, player: &mut StoredPlayer, patch: &mut StorePatch) {
        if player.proficiency_up == 0 {
            return;
        }
        let proficiency = fold_proficiency(
            player.proficiency,
            player.proficiency_up,
            self.config.proficiency_cap,
        );
        debug!(
            current = player.proficiency,
            delta = player.proficiency_up,
            proficiency,
            "folded proficiency delta"
        );
        player.proficiency = proficiency;
        player.proficiency_up = 0;
        patch
            .set("player.trainerProficiency", proficiency)
            .set("player.proficiency_up", 0);
    }

    /// Fills missing individual values (never touching valid ones) and raises
    /// the effort level to the level-derived floor.
    fn autofill_stats<R: Rng + ?Sized>(
        &self,
        entry: &mut RosterEntry,
        base: &str,
        patch: &mut StorePatch,
        rng: &mut R,
    ) {
        let ivs_valid = entry.stats_meta.ivs.is_some_and(|ivs| ivs.is_valid());
        if ivs_valid && entry.stats_meta.ev_level.is_some() {
            return;
        }

        if !ivs_valid {
            let quality = autofill_quality(entry.quality, rng);
            let ivs = autofill_ivs(quality, rng);
            debug!(species = %entry.name, ?quality, "filled missing individual values");
            entry.stats_meta.ivs = Some(ivs);
            entry.stats_meta.extra.remove("ivs");
            if let Ok(value) = serde_json::to_value(ivs) {
                patch.set(format!("{}.stats_meta.ivs", base), value);
            }
        }

        let floor = (f64::from(entry.level) * self.config.autofill_effort_per_level).floor() as u16;
        let floor = floor.min(self.config.effort_cap);
        let ev_level = entry.stats_meta.ev_level.map_or(floor, |current| current.max(floor));
        if entry.stats_meta.ev_level != Some(ev_level) {
            entry.stats_meta.ev_level = Some(ev_level);
            patch.set(format!("{}.stats_meta.ev_level", base), ev_level);
        }
    }
}
