//! Provider configuration, read from the environment.
//!
//! Each `from_env` returns `None` when the provider's credentials are absent. An unconfigured
//! provider simply does not participate in the activation priority loop, so a deployment can run
//! with any subset of providers.
use log::*;
use ucs_common::Secret;

fn optional_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            info!("{var} is not set. The provider will be disabled.");
            None
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct UCodeiumConfig {
    pub url: String,
    pub api_key: Secret<String>,
}

impl UCodeiumConfig {
    pub fn from_env() -> Option<Self> {
        let url = optional_env("UCS_UCODEIUM_URL")?;
        let api_key = Secret::new(optional_env("UCS_UCODEIUM_API_KEY")?);
        Some(Self { url, api_key })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KokosConfig {
    pub url: String,
    pub token: Secret<String>,
}

impl KokosConfig {
    pub fn from_env() -> Option<Self> {
        let url = optional_env("UCS_KOKOS_URL")?;
        let token = Secret::new(optional_env("UCS_KOKOS_TOKEN")?);
        Some(Self { url, token })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FarsConfig {
    pub url: String,
    pub token: Secret<String>,
}

impl FarsConfig {
    pub fn from_env() -> Option<Self> {
        let url = optional_env("UCS_FARS_URL")?;
        let token = Secret::new(optional_env("UCS_FARS_TOKEN")?);
        Some(Self { url, token })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmileOneConfig {
    pub url: String,
    pub uid: String,
    pub email: String,
    pub key: Secret<String>,
}

impl SmileOneConfig {
    pub fn from_env() -> Option<Self> {
        let url = optional_env("UCS_SMILEONE_URL")?;
        let uid = optional_env("UCS_SMILEONE_UID")?;
        let email = optional_env("UCS_SMILEONE_EMAIL")?;
        let key = Secret::new(optional_env("UCS_SMILEONE_KEY")?);
        Some(Self { url, uid, email, key })
    }
}
