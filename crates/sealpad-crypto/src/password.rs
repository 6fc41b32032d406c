use secrecy::{ExposeSecret, SecretString};

/// A site password held in memory.
///
/// Wraps [`SecretString`] so the backing bytes are zeroized on drop and
/// never appear in `Debug` output. Correctness of a password is only ever
/// established by decrypting the stored envelope; no hash of it exists.
pub struct SitePassword {
    inner: SecretString,
}

impl SitePassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(password.into()),
        }
    }

    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SitePassword {
    fn clone(&self) -> Self {
        SitePassword::new(self.expose().to_owned())
    }
}

impl std::fmt::Debug for SitePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitePassword")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts() {
        let pw = SitePassword::new("hunter2");
        assert!(!format!("{pw:?}").contains("hunter2"));
    }

    #[test]
    fn clone_preserves_value() {
        let pw = SitePassword::new("hunter2");
        assert_eq!(pw.clone().expose(), "hunter2");
    }

    #[test]
    fn emptiness() {
        assert!(SitePassword::new("").is_empty());
        assert!(!SitePassword::new(" ").is_empty());
    }
}
