use crate::{MoveCategory, PokemonType};
use serde::{Deserialize, Serialize};

/// The two standard ability slots plus the optional hidden slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlots {
    pub primary: String,
    pub secondary: Option<String>,
    pub hidden: Option<String>,
}

impl AbilitySlots {
    /// Standard abilities, in slot order.
    pub fn standard(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.secondary.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    /// Lookup id: lowercase ASCII alphanumerics of the display name.
    pub id: String,
    pub name: String,
    pub types: Vec<PokemonType>,
    pub abilities: AbilitySlots,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: String,
    pub name: String,
    pub move_type: PokemonType,
    pub category: MoveCategory,
    /// Zero for moves without a fixed base power.
    pub base_power: u8,
}

impl SpeciesRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    pub fn has_type(&self, move_type: PokemonType) -> bool {
        self.types.contains(&move_type)
    }
}

impl MoveRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_species() -> SpeciesRecord {
        SpeciesRecord {
            id: "rattataalola".to_string(),
            name: "Rattata-Alola".to_string(),
            types: vec![PokemonType::Dark, PokemonType::Normal],
            abilities: AbilitySlots {
                primary: "Gluttony".to_string(),
                secondary: Some("Hustle".to_string()),
                hidden: Some("Thick Fat".to_string()),
            },
        }
    }

    #[test]
    fn test_postcard_encoding_restores_species() {
        let species = sample_species();
        let bytes = species.to_bytes().unwrap();
        assert_eq!(SpeciesRecord::from_bytes(&bytes).unwrap(), species);
    }

    #[test]
    fn test_standard_abilities_skip_missing_secondary() {
        let mut species = sample_species();
        assert_eq!(species.abilities.standard(), vec!["Gluttony", "Hustle"]);
        species.abilities.secondary = None;
        assert_eq!(species.abilities.standard(), vec!["Gluttony"]);
    }
}
