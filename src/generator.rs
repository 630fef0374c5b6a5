//! Procedural completion of partially declared creatures.

use crate::config::ResolverConfig;
use crate::declaration::PartialEntry;
use crate::dex::Dex;
use crate::names::{normalize_species_name, to_id};
use crate::roster::{Gender, IndividualValues, Nature, Quality, RosterEntry, StatsMeta, MAX_IV, MAX_MOVES};
use rand::seq::{index, IndexedRandom, SliceRandom};
use rand::Rng;
use schema::{PokemonType, SpeciesRecord};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

pub const MAX_EFFORT: u16 = 252;

/// Who the generated creature belongs to. Wild creatures carry no effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationContext {
    Wild,
    Npc,
}

/// Rolls individual values for a quality band.
pub fn roll_ivs<R: Rng + ?Sized>(quality: Quality, max_stats: usize, rng: &mut R) -> IndividualValues {
    match quality {
        Quality::Low => IndividualValues::from_array(std::array::from_fn(|_| rng.random_range(0..=15))),
        Quality::Medium => IndividualValues::from_array(std::array::from_fn(|_| rng.random_range(0..=MAX_IV))),
        Quality::High => {
            let mut values: [u8; 6] = std::array::from_fn(|_| rng.random_range(0..=MAX_IV));
            for stat in index::sample(rng, values.len(), max_stats.min(values.len())) {
                values[stat] = MAX_IV;
            }
            IndividualValues::from_array(values)
        }
        Quality::Perfect => IndividualValues::PERFECT,
    }
}

/// Effort level for generated non-player creatures, as a fraction of level
/// per quality band.
pub fn effort_for(quality: Quality, level: u8, context: GenerationContext) -> u16 {
    if context == GenerationContext::Wild {
        return 0;
    }
    let level = level as f64;
    let effort = match quality {
        Quality::Low => (level * 0.3).floor().min(30.0),
        Quality::Medium => (level * 0.8).floor().min(100.0),
        Quality::High => (level * 1.5).floor().min(200.0),
        Quality::Perfect => MAX_EFFORT as f64,
    };
    (effort as u16).min(MAX_EFFORT)
}

/// Form marker applied to certain species whatever the caller asked for.
pub fn auto_special_form(species_id: &str) -> Option<&'static str> {
    match species_id {
        "kyogre" | "groudon" => Some("primal"),
        "zacian" | "zamazenta" => Some("crowned"),
        _ => None,
    }
}

/// Fills in every attribute a declaration left out.
pub struct Generator<'a> {
    dex: &'a Dex,
    config: &'a ResolverConfig,
}

impl<'a> Generator<'a> {
    pub fn new(dex: &'a Dex, config: &'a ResolverConfig) -> Self {
        Self { dex, config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        partial: &PartialEntry,
        tier: Option<u8>,
        context: GenerationContext,
        rng: &mut R,
    ) -> RosterEntry {
        let generation = &self.config.generation;
        let species = self.dex.lookup_species(&partial.name);
        if species.is_none() {
            warn!(species = %partial.name, "unknown species, generating with defaults");
        }

        let name = species
            .map(|s| s.name.clone())
            .unwrap_or_else(|| normalize_species_name(&partial.name));
        let species_id = species.map(|s| s.id.clone()).unwrap_or_else(|| to_id(&name));
        let level = partial
            .level
            .unwrap_or_else(|| self.config.level_for_tier(partial.tier.or(tier)));

        let is_shiny = partial
            .shiny
            .unwrap_or_else(|| rng.random_ratio(1, generation.shiny_odds.max(1)));
        let quality = partial
            .quality
            .unwrap_or_else(|| self.infer_quality(is_shiny, &species_id, level));

        let ivs = partial
            .stats_meta
            .ivs
            .unwrap_or_else(|| roll_ivs(quality, generation.high_quality_max_stats, rng));
        let ev_level = partial
            .stats_meta
            .ev_level
            .unwrap_or_else(|| effort_for(quality, level, context));

        let nature = partial.nature.or_else(|| {
            let natures: Vec<Nature> = Nature::iter().collect();
            natures.choose(rng).copied()
        });
        let ability = partial
            .ability
            .clone()
            .or_else(|| species.and_then(|s| self.roll_ability(s, rng)));
        let moves = if partial.moves.is_empty() {
            self.roll_moves(species, rng)
        } else {
            partial.moves.clone()
        };
        let gender = partial.gender.or_else(|| {
            Some(if rng.random_bool(0.5) {
                Gender::Male
            } else {
                Gender::Female
            })
        });
        let form_marker = auto_special_form(&species_id)
            .map(str::to_string)
            .or_else(|| partial.form_marker.clone());

        debug!(
            species = %name,
            level,
            ?quality,
            ?context,
            "generated roster entry"
        );

        RosterEntry {
            nickname: partial.nickname.clone(),
            gender,
            quality: Some(quality),
            nature,
            ability,
            is_shiny,
            held_item: partial.held_item.clone(),
            mechanic: partial.mechanic,
            tera_type: partial.tera_type.clone(),
            form_marker,
            is_ace: partial.is_ace,
            is_lead: partial.is_lead,
            stats_meta: StatsMeta {
                ivs: Some(ivs),
                ev_level: Some(ev_level),
                ..StatsMeta::default()
            },
            moves,
            ..RosterEntry::new(name, level)
        }
    }

    fn infer_quality(&self, is_shiny: bool, species_id: &str, level: u8) -> Quality {
        let generation = &self.config.generation;
        if is_shiny || generation.powerful_species.iter().any(|s| s == species_id) {
            Quality::High
        } else if level >= generation.medium_quality_min_level {
            Quality::Medium
        } else {
            Quality::Low
        }
    }

    fn roll_ability<R: Rng + ?Sized>(&self, species: &SpeciesRecord, rng: &mut R) -> Option<String> {
        let mut pool = species.abilities.standard();
        if let Some(hidden) = species.abilities.hidden.as_deref() {
            if rng.random_bool(self.config.generation.hidden_ability_chance.clamp(0.0, 1.0)) {
                pool.push(hidden);
            }
        }
        pool.choose(rng).map(|s| s.to_string())
    }

    /// Damaging moves that share a type with the species (or are Normal),
    /// under the power ceiling, shuffled, first four.
    fn roll_moves<R: Rng + ?Sized>(&self, species: Option<&SpeciesRecord>, rng: &mut R) -> Vec<String> {
        let ceiling = self.config.generation.move_power_ceiling;
        let mut candidates: Vec<&str> = match species {
            Some(species) => self
                .dex
                .moves()
                .iter()
                .filter(|m| m.category.is_damaging())
                .filter(|m| m.base_power > 0 && m.base_power <= ceiling)
                .filter(|m| m.move_type == PokemonType::Normal || species.has_type(m.move_type))
                .map(|m| m.name.as_str())
                .collect(),
            None => Vec::new(),
        };
        if candidates.is_empty() {
            return self.config.generation.default_moves.clone();
        }
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .take(MAX_MOVES)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn generate(partial: PartialEntry, tier: Option<u8>, context: GenerationContext) -> RosterEntry {
        let config = ResolverConfig::default();
        Generator::new(Dex::compiled(), &config).generate(&partial, tier, context, &mut rng())
    }

    #[test]
    fn test_wild_rattata_without_tier() {
        let entry = generate(PartialEntry::named("Rattata"), None, GenerationContext::Wild);

        assert_eq!(entry.name, "Rattata");
        assert_eq!(entry.level, 5);
        assert_eq!(entry.stats_meta.ev_level, Some(0));
        assert!(entry.stats_meta.ivs.unwrap().is_valid());
        assert!(!entry.moves.is_empty() && entry.moves.len() <= 4);
        assert!(entry.nature.is_some());
        assert!(["Run Away", "Guts", "Hustle"].contains(&entry.ability.as_deref().unwrap()));
        assert!(entry.gender.is_some());
    }

    #[rstest]
    #[case(Some(1), 25)]
    #[case(Some(4), 85)]
    #[case(Some(7), 50)]
    #[case(None, 5)]
    fn test_level_from_tier(#[case] tier: Option<u8>, #[case] expected: u8) {
        let entry = generate(PartialEntry::named("Eevee"), tier, GenerationContext::Npc);
        assert_eq!(entry.level, expected);
    }

    #[test]
    fn test_explicit_values_win() {
        let partial = PartialEntry {
            level: Some(33),
            quality: Some(Quality::Perfect),
            nature: Some(Nature::Timid),
            ability: Some("Lightning Rod".to_string()),
            moves: vec!["Thunderbolt".to_string(), "Surf".to_string()],
            gender: Some(Gender::Female),
            shiny: Some(true),
            tier: Some(1),
            ..PartialEntry::named("Raichu Alolan")
        };
        let entry = generate(partial, Some(4), GenerationContext::Npc);

        assert_eq!(entry.name, "Raichu-Alola");
        assert_eq!(entry.level, 33);
        assert_eq!(entry.stats_meta.ivs, Some(IndividualValues::PERFECT));
        assert_eq!(entry.stats_meta.ev_level, Some(252));
        assert_eq!(entry.nature, Some(Nature::Timid));
        assert_eq!(entry.ability.as_deref(), Some("Lightning Rod"));
        assert_eq!(entry.moves, vec!["Thunderbolt", "Surf"]);
        assert_eq!(entry.gender, Some(Gender::Female));
        assert!(entry.is_shiny);
    }

    #[test]
    fn test_entry_tier_beats_side_tier() {
        let partial = PartialEntry {
            tier: Some(1),
            ..PartialEntry::named("Eevee")
        };
        assert_eq!(generate(partial, Some(4), GenerationContext::Npc).level, 25);
    }

    #[test]
    fn test_generated_moves_match_species_types() {
        let dex = Dex::compiled();
        let entry = generate(PartialEntry::named("Pikachu"), Some(2), GenerationContext::Npc);
        assert_eq!(entry.moves.len(), 4);
        for name in &entry.moves {
            let record = dex.lookup_move(name).unwrap();
            assert!(record.category.is_damaging());
            assert!(record.base_power <= 100);
            assert!(matches!(record.move_type, PokemonType::Electric | PokemonType::Normal));
        }
    }

    #[test]
    fn test_unknown_species_degrades_to_defaults() {
        let entry = generate(PartialEntry::named("Missingno"), None, GenerationContext::Wild);
        assert_eq!(entry.name, "Missingno");
        assert_eq!(entry.ability, None);
        assert_eq!(entry.moves, vec!["Tackle", "Scratch", "Growl", "Leer"]);
        assert!(entry.stats_meta.ivs.is_some());
    }

    #[rstest]
    #[case("Kyogre", Some("primal"))]
    #[case("Zamazenta", Some("crowned"))]
    #[case("Snorlax", None)]
    fn test_special_forms(#[case] species: &str, #[case] expected: Option<&str>) {
        let partial = PartialEntry {
            form_marker: Some("caller-form".to_string()),
            ..PartialEntry::named(species)
        };
        let entry = generate(partial, Some(3), GenerationContext::Npc);
        assert_eq!(
            entry.form_marker.as_deref(),
            expected.or(Some("caller-form"))
        );
    }

    #[test]
    fn test_quality_inference() {
        let powerful = generate(PartialEntry::named("Mewtwo"), Some(1), GenerationContext::Npc);
        assert_eq!(powerful.quality, Some(Quality::High));

        let shiny = PartialEntry {
            shiny: Some(true),
            ..PartialEntry::named("Caterpie")
        };
        assert_eq!(generate(shiny, Some(1), GenerationContext::Npc).quality, Some(Quality::High));

        let high_level = generate(PartialEntry::named("Caterpie"), Some(2), GenerationContext::Npc);
        assert_eq!(high_level.quality, Some(Quality::Medium));
        assert_eq!(high_level.stats_meta.ev_level, Some(40));

        let low_level = generate(PartialEntry::named("Caterpie"), Some(1), GenerationContext::Npc);
        assert_eq!(low_level.quality, Some(Quality::Low));
        assert_eq!(low_level.stats_meta.ev_level, Some(7));
    }

    #[rstest]
    #[case(Quality::Low, 15, 0)]
    #[case(Quality::Medium, 31, 0)]
    #[case(Quality::High, 31, 3)]
    #[case(Quality::Perfect, 31, 6)]
    fn test_roll_ivs_bands(#[case] quality: Quality, #[case] max: u8, #[case] min_perfect: usize) {
        let mut rng = rng();
        for _ in 0..50 {
            let ivs = roll_ivs(quality, 3, &mut rng);
            assert!(ivs.to_array().iter().all(|&v| v <= max));
            assert!(ivs.perfect_count() >= min_perfect);
        }
    }

    #[rstest]
    #[case(Quality::Low, 50, 15)]
    #[case(Quality::Low, 200, 30)]
    #[case(Quality::Medium, 50, 40)]
    #[case(Quality::High, 100, 150)]
    #[case(Quality::High, 200, 200)]
    #[case(Quality::Perfect, 5, 252)]
    fn test_effort_bands(#[case] quality: Quality, #[case] level: u8, #[case] expected: u16) {
        assert_eq!(effort_for(quality, level, GenerationContext::Npc), expected);
        assert_eq!(effort_for(quality, level, GenerationContext::Wild), 0);
    }
}
