//! Identity types.

use serde::Serialize;
use std::fmt;

/// Local surrogate identity.
///
/// Assigned on first insert and never reused. Ids increase with every
/// insert, so ordering by id is ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LocalId(pub u64);

impl LocalId {
    /// Creates a new local id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One component of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    /// Text component.
    Text(String),
    /// Reference to another local record.
    Ref(LocalId),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => f.write_str(s),
            KeyPart::Ref(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Text(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

impl From<LocalId> for KeyPart {
    fn from(id: LocalId) -> Self {
        KeyPart::Ref(id)
    }
}

/// The key a record is reconciled on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NaturalKey {
    /// Identity assigned by the remote system.
    Remote(String),
    /// Business key made of several parts.
    Composite(Vec<KeyPart>),
}

impl NaturalKey {
    /// Creates a remote-identity key.
    pub fn remote(id: impl Into<String>) -> Self {
        NaturalKey::Remote(id.into())
    }

    /// Creates a composite key.
    pub fn composite<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        NaturalKey::Composite(parts.into_iter().map(Into::into).collect())
    }

    /// Returns the remote identity, if this is a remote key.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            NaturalKey::Remote(id) => Some(id),
            NaturalKey::Composite(_) => None,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Remote(id) => f.write_str(id),
            NaturalKey::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_id_ordering() {
        assert!(LocalId::new(1) < LocalId::new(2));
        assert_eq!(LocalId::new(9).to_string(), "#9");
    }

    #[test]
    fn composite_display() {
        let key = NaturalKey::composite([KeyPart::Ref(LocalId::new(3)), KeyPart::from("MK01")]);
        assert_eq!(key.to_string(), "#3/MK01");
        assert_eq!(key.remote_id(), None);
        assert_eq!(NaturalKey::remote("x").remote_id(), Some("x"));
    }
}
