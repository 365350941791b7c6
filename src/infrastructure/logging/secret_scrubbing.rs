use regex::{Captures, Regex};
use std::fmt;

/// Redacts credentials from text before it is logged.
///
/// Covers bearer tokens, bare JWTs (access tokens are JWTs), and
/// `refresh_token` / `access_token` / `apikey` fields in JSON or query form.
#[derive(Clone)]
pub struct SecretScrubber {
    bearer_pattern: Regex,
    jwt_pattern: Regex,
    field_pattern: Regex,
}

impl SecretScrubber {
    pub fn new() -> Self {
        Self {
            bearer_pattern: Regex::new(r"Bearer\s+[A-Za-z0-9\-_\.=]+").expect("valid bearer pattern"),
            jwt_pattern: Regex::new(r"eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+")
                .expect("valid jwt pattern"),
            field_pattern: Regex::new(
                r#"(?i)(["']?(?:refresh_token|access_token|api_?key|password)["']?\s*[:=]\s*)["']?[^"'\s,&}]+["']?"#,
            )
            .expect("valid field pattern"),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub(&self, message: &str) -> String {
        let scrubbed = self
            .bearer_pattern
            .replace_all(message, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self
            .field_pattern
            .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]));
        self.jwt_pattern
            .replace_all(&scrubbed, "[JWT_REDACTED]")
            .into_owned()
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
