use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A thin wrapper around configuration values that must never leak into logs.
/// The value is only accessible via an explicit [`Secret::reveal`] call.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// True when the wrapped value is the empty string, i.e. the secret was never configured.
    /// Lets callers warn about a missing secret without revealing anything about a present one.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_never_leak_through_debug_or_display() {
        let secret = Secret::new("whsec_hunter2".to_string());
        assert_eq!(format!("{secret:?}"), "****");
        assert_eq!(format!("{secret}"), "****");
        assert_eq!(secret.reveal(), "whsec_hunter2");
    }

    #[test]
    fn an_unconfigured_secret_is_empty() {
        assert!(Secret::<String>::default().is_empty());
        assert!(!Secret::new("x".to_string()).is_empty());
    }
}
