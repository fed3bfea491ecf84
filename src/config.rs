use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default site domain.
fn default_domain() -> String {
    "kroger.com".to_string()
}

/// Default survey rating (most satisfied).
fn default_rating() -> u8 {
    10
}

/// Account/site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    /// Site domain the automation signs in against.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Account username/email. Prompted for interactively when unset and
    /// not supplied through the environment.
    pub username: Option<String>,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            username: None,
        }
    }
}

/// Browser launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Launch without a visible window.
    ///
    /// Survey completion always opens a visible window regardless; the
    /// feedback site blocks headless sessions too aggressively.
    pub headless: bool,

    /// Path to a Chrome/Chromium executable. Auto-detected when unset.
    pub executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

/// Survey answer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Rating chosen for scale questions, matched against option values.
    /// Falls back to the last option of a group when no value matches.
    #[serde(default = "default_rating")]
    pub rating: u8,

    /// Free-text answer entered into comment boxes.
    pub comment: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            rating: default_rating(),
            comment: String::new(),
        }
    }
}

impl SurveyConfig {
    /// Builds the script evaluated on each survey step to populate answers.
    ///
    /// Covers the question categories the survey renders: scale questions
    /// (radio groups), comment boxes (textareas), dropdowns, and checkbox
    /// lists.
    pub fn injection_js(&self) -> String {
        let comment = serde_json::to_string(&self.comment).expect("string serializes");
        format!(
            r#"(() => {{
    const groups = {{}};
    for (const radio of document.querySelectorAll("input[type='radio']")) {{
        (groups[radio.name] = groups[radio.name] || []).push(radio);
    }}
    for (const name in groups) {{
        const options = groups[name];
        const rated = options.find((r) => r.value === '{rating}');
        (rated || options[options.length - 1]).click();
    }}
    for (const area of document.querySelectorAll('textarea')) {{
        area.value = {comment};
    }}
    for (const select of document.querySelectorAll('select')) {{
        for (const option of select.options) {{
            if (option.value !== '') {{
                select.value = option.value;
                break;
            }}
        }}
    }}
    const box = document.querySelector("input[type='checkbox']");
    if (box && !box.checked) {{
        box.click();
    }}
}})()"#,
            rating = self.rating,
            comment = comment,
        )
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account/site settings.
    #[serde(default)]
    pub main: MainConfig,

    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Survey answer settings.
    #[serde(default)]
    pub survey: SurveyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main: MainConfig::default(),
            browser: BrowserConfig::default(),
            survey: SurveyConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./kroger-cli.toml` if it exists in the current directory
/// 2. `~/.config/kroger-cli/config.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("kroger-cli.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("kroger-cli").join("config.toml");
    }

    // Final fallback to local
    local_config
}
