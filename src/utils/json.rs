use serde::{Deserialize, Deserializer};

/// Patch field that distinguishes an omitted key from an explicit `null`.
///
/// Deserialize inside a struct marked `#[serde(default)]` so a missing key
/// stays [`Nullable::Omitted`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nullable<T> {
    #[default]
    Omitted,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Nullable::Omitted)
    }

    /// Resolves the patch against the stored value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Nullable::Omitted => current,
            Nullable::Null => None,
            Nullable::Value(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Nullable<U> {
        match self {
            Nullable::Omitted => Nullable::Omitted,
            Nullable::Null => Nullable::Null,
            Nullable::Value(value) => Nullable::Value(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Nullable::Value(value),
            None => Nullable::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Nullable::from)
    }
}

/// Trims a patched string, mapping blank input to `Null`.
pub fn trim_nullable(value: Nullable<String>) -> Nullable<String> {
    match value {
        Nullable::Value(text) if text.trim().is_empty() => Nullable::Null,
        other => other.map(|text| text.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default)]
        color: Nullable<String>,
    }

    #[test]
    fn distinguishes_missing_null_and_value() {
        let omitted: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"color":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r##"{"color":"#fff"}"##).unwrap();

        assert_eq!(omitted.color, Nullable::Omitted);
        assert_eq!(cleared.color, Nullable::Null);
        assert_eq!(set.color, Nullable::Value("#fff".to_string()));
    }

    #[test]
    fn apply_resolves_against_current_value() {
        let current = Some("red".to_string());
        assert_eq!(Nullable::Omitted.apply(current.clone()), current);
        assert_eq!(Nullable::<String>::Null.apply(current.clone()), None);
        assert_eq!(
            Nullable::Value("blue".to_string()).apply(current),
            Some("blue".to_string())
        );
    }

    #[test]
    fn blank_strings_clear_the_field() {
        assert_eq!(trim_nullable(Nullable::Value("  ".into())), Nullable::Null);
        assert_eq!(
            trim_nullable(Nullable::Value(" note ".into())),
            Nullable::Value("note".to_string())
        );
    }
}
