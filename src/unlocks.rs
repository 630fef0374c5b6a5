//! Capability flags and their OR-merge.

use crate::roster::{Mechanic, RosterEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnlockFlag {
    EnableBond,
    EnableStyles,
    EnableInsight,
    EnableMega,
    EnableZMove,
    EnableDynamax,
    EnableTera,
    EnableProficiencyCap,
}

impl UnlockFlag {
    pub fn for_mechanic(mechanic: Mechanic) -> Self {
        match mechanic {
            Mechanic::Mega => UnlockFlag::EnableMega,
            Mechanic::Zmove => UnlockFlag::EnableZMove,
            Mechanic::Dynamax => UnlockFlag::EnableDynamax,
            Mechanic::Tera => UnlockFlag::EnableTera,
        }
    }

    /// Short label used in prompt summaries.
    pub fn label(self) -> &'static str {
        match self {
            UnlockFlag::EnableBond => "Bond",
            UnlockFlag::EnableStyles => "Style",
            UnlockFlag::EnableInsight => "Insight",
            UnlockFlag::EnableMega => "Mega",
            UnlockFlag::EnableZMove => "Z",
            UnlockFlag::EnableDynamax => "Dmax",
            UnlockFlag::EnableTera => "Tera",
            UnlockFlag::EnableProficiencyCap => "ProfCap",
        }
    }
}

/// A flag set as declared or stored: only flags that were actually given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialUnlocks(pub BTreeMap<UnlockFlag, bool>);

impl PartialUnlocks {
    /// Reads known flag names with boolean values; anything else is ignored.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        PartialUnlocks(
            map.iter()
                .filter_map(|(key, value)| {
                    let flag = key.parse::<UnlockFlag>().ok()?;
                    value.as_bool().map(|enabled| (flag, enabled))
                })
                .collect(),
        )
    }

    pub fn enabled(flags: impl IntoIterator<Item = UnlockFlag>) -> Self {
        PartialUnlocks(flags.into_iter().map(|flag| (flag, true)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every known flag with a value. Flags start false and are only switched on
/// by [`merge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockFlags(BTreeMap<UnlockFlag, bool>);

impl Default for UnlockFlags {
    fn default() -> Self {
        UnlockFlags(UnlockFlag::iter().map(|flag| (flag, false)).collect())
    }
}

impl UnlockFlags {
    pub fn get(&self, flag: UnlockFlag) -> bool {
        self.0.get(&flag).copied().unwrap_or(false)
    }

    pub fn enabled(&self) -> impl Iterator<Item = UnlockFlag> + '_ {
        self.0
            .iter()
            .filter(|(_, &enabled)| enabled)
            .map(|(&flag, _)| flag)
    }

    /// Applies an explicit override flag by flag. Unlike [`merge`], this can
    /// switch a flag off.
    pub fn with_override(mut self, overrides: &PartialUnlocks) -> Self {
        for (&flag, &enabled) in &overrides.0 {
            self.0.insert(flag, enabled);
        }
        self
    }
}

/// OR-fold: a flag is on if any input has it on.
pub fn merge<'a, I>(sets: I) -> UnlockFlags
where
    I: IntoIterator<Item = &'a PartialUnlocks>,
{
    let mut merged = UnlockFlags::default();
    for set in sets {
        for (&flag, &enabled) in &set.0 {
            if enabled {
                merged.0.insert(flag, true);
            }
        }
    }
    merged
}

/// Flags implied by mechanics declared on roster entries.
pub fn detect_from_roster(roster: &[RosterEntry]) -> PartialUnlocks {
    PartialUnlocks::enabled(
        roster
            .iter()
            .filter_map(|entry| entry.mechanic)
            .map(UnlockFlag::for_mechanic),
    )
}

impl From<&UnlockFlags> for PartialUnlocks {
    fn from(flags: &UnlockFlags) -> Self {
        PartialUnlocks(flags.0.clone())
    }
}
