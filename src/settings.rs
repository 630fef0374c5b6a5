use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

/// Global presentation/behaviour switches handed to the battle layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr, EnumIter, EnumString,
)]
pub enum SettingFlag {
    #[serde(rename = "enableAVS")]
    #[strum(serialize = "enableAVS")]
    Avs,
    #[serde(rename = "enableCommander")]
    #[strum(serialize = "enableCommander")]
    Commander,
    #[serde(rename = "enableEVO")]
    #[strum(serialize = "enableEVO")]
    Evolution,
    #[serde(rename = "enableBGM")]
    #[strum(serialize = "enableBGM")]
    Music,
    #[serde(rename = "enableSFX")]
    #[strum(serialize = "enableSFX")]
    SoundEffects,
    #[serde(rename = "enableClash")]
    #[strum(serialize = "enableClash")]
    Clash,
    #[serde(rename = "enableEnvironment")]
    #[strum(serialize = "enableEnvironment")]
    Environment,
}

impl SettingFlag {
    pub fn default_value(self) -> bool {
        !matches!(self, SettingFlag::Clash)
    }
}

/// A fully populated settings map.
pub type Settings = BTreeMap<SettingFlag, bool>;

pub fn default_settings() -> Settings {
    SettingFlag::iter()
        .map(|flag| (flag, flag.default_value()))
        .collect()
}

/// Settings read from an untyped source. Only boolean values for known flag
/// names are kept; everything else counts as "not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialSettings(pub BTreeMap<SettingFlag, bool>);

impl PartialSettings {
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        let flags = map
            .iter()
            .filter_map(|(key, value)| {
                let flag = key.parse::<SettingFlag>().ok()?;
                value.as_bool().map(|enabled| (flag, enabled))
            })
            .collect();
        PartialSettings(flags)
    }

    pub fn get(&self, flag: SettingFlag) -> Option<bool> {
        self.0.get(&flag).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-flag priority merge: declared beats stored beats defaults.
pub fn merge_settings(
    declared: &PartialSettings,
    stored: &PartialSettings,
    defaults: &Settings,
) -> Settings {
    SettingFlag::iter()
        .map(|flag| {
            let value = declared
                .get(flag)
                .or_else(|| stored.get(flag))
                .or_else(|| defaults.get(&flag).copied())
                .unwrap_or_else(|| flag.default_value());
            (flag, value)
        })
        .collect()
}
