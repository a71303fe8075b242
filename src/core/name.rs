//! Markup names
//!
//! Two name forms flow through the tokenizer:
//! - `QName`: the qualified name as written in source, `(prefix, local)`
//! - `DataName`: the resolved name `(local, prefix, namespace_uri)` emitted
//!   on tokens once the scope chain has been consulted

use std::fmt;

/// A qualified name as parsed from source.
///
/// `prefix` is empty when the name carries no `prefix:` part. Equality and
/// hash are structural and byte-wise case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: String,
    pub local: String,
}

impl QName {
    /// Create a qualified name from its parts.
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        QName {
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    /// Create an unprefixed name.
    pub fn local(local: impl Into<String>) -> Self {
        QName::new("", local)
    }

    /// Parse a colon-separated qualified name.
    ///
    /// No colon yields an empty prefix; one colon splits prefix and local
    /// part; anything else (including the empty string) is not a name.
    pub fn parse(s: &str) -> Option<QName> {
        if s.is_empty() {
            return None;
        }
        let pieces: Vec<&str> = s.split(':').collect();
        match pieces.as_slice() {
            [local] => Some(QName::local(*local)),
            [prefix, local] => Some(QName::new(*prefix, *local)),
            _ => None,
        }
    }

    /// True when the name carries a `prefix:` part.
    pub fn has_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}

/// A resolved name: local part, source prefix, and the namespace URI the
/// prefix resolved to when the owning token was emitted.
///
/// An unresolved prefix yields an empty `namespace_uri`. Equality is over
/// all three fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DataName {
    pub local: String,
    pub prefix: String,
    pub namespace_uri: String,
}

impl DataName {
    /// Create a resolved name.
    pub fn new(
        local: impl Into<String>,
        prefix: impl Into<String>,
        namespace_uri: impl Into<String>,
    ) -> Self {
        DataName {
            local: local.into(),
            prefix: prefix.into(),
            namespace_uri: namespace_uri.into(),
        }
    }

    /// Create a name with no prefix and no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        DataName::new(local, "", "")
    }
}

impl fmt::Display for DataName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unprefixed() {
        let name = QName::parse("div").unwrap();
        assert_eq!(name.prefix, "");
        assert_eq!(name.local, "div");
        assert!(!name.has_prefix());
    }

    #[test]
    fn test_parse_prefixed() {
        let name = QName::parse("svg:rect").unwrap();
        assert_eq!(name.prefix, "svg");
        assert_eq!(name.local, "rect");
        assert!(name.has_prefix());
    }

    #[test]
    fn test_parse_failures() {
        assert!(QName::parse("").is_none());
        assert!(QName::parse("a:b:c").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(QName::local("p").to_string(), "p");
        assert_eq!(QName::new("x", "p").to_string(), "x:p");
        assert_eq!(DataName::new("p", "x", "urn:u").to_string(), "x:p");
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(QName::parse("a:b"), Some(QName::new("a", "b")));
        assert_ne!(QName::new("a", "b"), QName::new("A", "b"));
        assert_ne!(
            DataName::new("p", "", "u"),
            DataName::new("p", "", "v"),
        );
    }
}
