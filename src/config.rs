use std::fmt;
use anyhow::{bail, Result};

pub const USERNAME_VAR: &str = "STUDENTVUE_USERNAME";
pub const PASSWORD_VAR: &str = "STUDENTVUE_PASSWORD";
pub const DOMAIN_VAR: &str = "STUDENTVUE_DOMAIN";

// Portal account settings, resolved once and handed to each fetch.
#[derive(Clone, PartialEq)]
pub struct PortalConfig {
    pub username: String,
    pub password: String,
    pub domain: String,
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Resolves all three settings through `lookup`; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut missing = Vec::new();
        let mut read = |key: &'static str| match lookup(key).map(|v| v.trim().to_string()) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing.push(key);
                String::new()
            }
        };
        let username = read(USERNAME_VAR);
        let password = read(PASSWORD_VAR);
        let domain = read(DOMAIN_VAR);

        if !missing.is_empty() {
            bail!("Missing required environment variables: {}", missing.join(", "));
        }
        Ok(PortalConfig { username, password, domain })
    }
}
