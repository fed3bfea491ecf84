//! Account credential resolution.
//!
//! The username comes from the `KROGER_USERNAME` environment variable, then
//! the config file, then an interactive prompt. The password comes from
//! `KROGER_PASSWORD` or a prompt; it is never read from the config file.

use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use secrecy::SecretString;

use crate::config::Config;

pub const USERNAME_ENV: &str = "KROGER_USERNAME";
pub const PASSWORD_ENV: &str = "KROGER_PASSWORD";

/// A resolved username/password pair.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Resolve credentials from the environment, the config, or an interactive
/// prompt, in that order.
pub fn resolve(config: &Config) -> Result<Credentials> {
    let username = match username_from(
        std::env::var(USERNAME_ENV).ok(),
        config.main.username.as_deref(),
    ) {
        Some(username) => username,
        None => prompt_username()?,
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(value) if !value.is_empty() => SecretString::from(value),
        _ => prompt_password()?,
    };

    Ok(Credentials { username, password })
}

/// Pick a username from the environment or the config, preferring the
/// environment. Blank values count as unset.
fn username_from(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    match env_value {
        Some(value) if !value.is_empty() => Some(value),
        _ => configured.filter(|name| !name.is_empty()).map(str::to_owned),
    }
}

fn prompt_username() -> Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Kroger username or email")
        .interact_text()
        .context("Failed to prompt for username")
}

fn prompt_password() -> Result<SecretString> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Kroger password")
        .interact()
        .context("Failed to prompt for password")?;
    Ok(SecretString::from(password))
}
