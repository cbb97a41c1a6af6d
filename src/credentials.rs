//! API keys, resolved once at startup.
//!
//! Keys come from the process environment, after loading a `.env` file
//! from the working directory if one exists. Providers receive a
//! [`Credentials`] value at construction; nothing reads the environment
//! later.

use anyhow::{bail, Result};

#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Credentials {
    /// Load `.env` (if present) and read the known keys.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
        }

        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
        }
    }

    pub fn openai(&self) -> Result<&str> {
        match self.openai_api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("OPENAI_API_KEY environment variable not set"),
        }
    }

    pub fn gemini(&self) -> Result<&str> {
        match self.gemini_api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("GEMINI_API_KEY environment variable not set"),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_error() {
        let creds = Credentials::default();
        assert!(creds
            .openai()
            .unwrap_err()
            .to_string()
            .contains("OPENAI_API_KEY"));
        assert!(creds
            .gemini()
            .unwrap_err()
            .to_string()
            .contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let creds = Credentials {
            openai_api_key: Some("sk-secret".to_string()),
            gemini_api_key: None,
        };
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("<set>"));
        assert_eq!(creds.openai().unwrap(), "sk-secret");
    }
}
