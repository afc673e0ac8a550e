use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::ConfigError;

/// Overrides the data directory when set.
pub const DATA_ROOT_ENV: &str = "DUES_TRACKER_HOME";

/// Stores user-configurable CLI preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    #[serde(default = "Config::default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "Config::default_subscription_amount_value")]
    pub default_subscription_amount: f64,
    #[serde(default = "Config::default_subscription_type_value")]
    pub default_subscription_type: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for data and backups. Defaults to `~/.dues_tracker`.
    pub data_root: Option<PathBuf>,

    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-IN".into(),
            currency_symbol: Self::default_currency_symbol(),
            theme: Theme::default(),
            default_subscription_amount: Self::default_subscription_amount_value(),
            default_subscription_type: Self::default_subscription_type_value(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            data_root: None,
            backup_retention: Self::default_backup_retention(),
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 8] = [
        "locale",
        "currency_symbol",
        "theme",
        "default_subscription_amount",
        "default_subscription_type",
        "ui_color_enabled",
        "data_root",
        "backup_retention",
    ];

    pub fn default_currency_symbol() -> String {
        "₹".into()
    }

    pub fn default_subscription_amount_value() -> f64 {
        500.0
    }

    pub fn default_subscription_type_value() -> String {
        "Monthly".into()
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Data directory, honoring [`DATA_ROOT_ENV`] first.
    pub fn resolve_data_root(&self) -> PathBuf {
        let from_env = std::env::var_os(DATA_ROOT_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        self.resolve_data_root_with(from_env)
    }

    pub fn resolve_data_root_with(&self, override_root: Option<PathBuf>) -> PathBuf {
        if let Some(path) = override_root {
            return path;
        }
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(".dues_tracker")
    }

    /// Formats an amount with the configured currency symbol.
    pub fn format_amount(&self, amount: f64) -> String {
        if amount < 0.0 {
            format!("-{}{:.2}", self.currency_symbol, amount.abs())
        } else {
            format!("{}{:.2}", self.currency_symbol, amount)
        }
    }

    /// Current value of `key` rendered for display.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "locale" => self.locale.clone(),
            "currency_symbol" => self.currency_symbol.clone(),
            "theme" => self.theme.to_string(),
            "default_subscription_amount" => format!("{:.2}", self.default_subscription_amount),
            "default_subscription_type" => self.default_subscription_type.clone(),
            "ui_color_enabled" => self.ui_color_enabled.to_string(),
            "data_root" => self
                .data_root
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "(default)".into()),
            "backup_retention" => self.backup_retention.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Parses `value` into the setting named `key`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match key {
            "locale" if !value.is_empty() => self.locale = value.to_string(),
            "currency_symbol" if !value.is_empty() => self.currency_symbol = value.to_string(),
            "locale" | "currency_symbol" => return Err(invalid("value cannot be empty")),
            "theme" => self.theme = Theme::from_str(value),
            "default_subscription_amount" => {
                let amount: f64 = value
                    .parse()
                    .map_err(|_| invalid("expected a number"))?;
                if !amount.is_finite() || amount < 0.0 {
                    return Err(invalid("amount must be zero or more"));
                }
                self.default_subscription_amount = amount;
            }
            "default_subscription_type" => {
                let normalized = match value.to_ascii_lowercase().as_str() {
                    "monthly" => "Monthly",
                    "yearly" => "Yearly",
                    "one-time" | "onetime" => "One-Time",
                    _ => return Err(invalid("expected Monthly, Yearly or One-Time")),
                };
                self.default_subscription_type = normalized.to_string();
            }
            "ui_color_enabled" => {
                self.ui_color_enabled = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid("expected on or off")),
                };
            }
            "data_root" => {
                self.data_root = match value {
                    "" | "default" => None,
                    path => Some(PathBuf::from(path)),
                };
            }
            "backup_retention" => {
                let count: usize = value
                    .parse()
                    .map_err(|_| invalid("expected a whole number"))?;
                if count == 0 {
                    return Err(invalid("keep at least one backup"));
                }
                self.backup_retention = count;
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| Theme::from_str(v.trim()))
            .unwrap_or_default()
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Theme::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_themes_fall_back_to_light() {
        let config: Config =
            serde_json::from_str(r#"{"locale": "en-IN", "theme": "solarized"}"#).unwrap();
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.backup_retention, 5);
    }

    #[test]
    fn set_validates_values() {
        let mut config = Config::default();
        config.set("default_subscription_amount", "750").unwrap();
        assert_eq!(config.default_subscription_amount, 750.0);
        assert!(matches!(
            config.set("default_subscription_amount", "-1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("backup_retention", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        config.set("default_subscription_type", "one-time").unwrap();
        assert_eq!(config.get("default_subscription_type").unwrap(), "One-Time");
        assert!(matches!(
            config.set("colour", "on"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn data_root_prefers_override_then_setting() {
        let mut config = Config::default();
        assert!(config.resolve_data_root_with(None).ends_with(".dues_tracker"));
        config.data_root = Some(PathBuf::from("/srv/dues"));
        assert_eq!(config.resolve_data_root_with(None), PathBuf::from("/srv/dues"));
        assert_eq!(
            config.resolve_data_root_with(Some(PathBuf::from("/tmp/x"))),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn formats_amounts_with_symbol() {
        let config = Config::default();
        assert_eq!(config.format_amount(1250.5), "₹1250.50");
        assert_eq!(config.format_amount(-20.0), "-₹20.00");
    }
}
