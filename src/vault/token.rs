//! Vault token wire format
//!
//! Tokens are embedded in sanitized text in place of a PHI span:
//!
//! ```text
//! phi:vault:<ENTITY_TYPE>:<24-hex-id>   current form
//! phi:vault:<24-hex-id>                 legacy form, recognized on read only
//! ```

use super::models::EntityType;
use crate::domain::VaultEntryId;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

/// Prefix shared by both token forms
pub const TOKEN_PREFIX: &str = "phi:vault:";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    // The typed form is tried first; the type group is optional for legacy tokens.
    TOKEN_RE.get_or_init(|| {
        Regex::new(r"phi:vault:(?:([A-Z][A-Z0-9_]*):)?([0-9a-f]{24})")
            .expect("vault token pattern is valid")
    })
}

/// A vault token referencing one unstructured entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultToken {
    /// Entity type; `None` for legacy two-segment tokens
    pub entity_type: Option<EntityType>,
    /// Referenced entry
    pub entry_id: VaultEntryId,
}

impl VaultToken {
    /// Token in the current typed form
    pub fn new(entity_type: EntityType, entry_id: VaultEntryId) -> Self {
        Self {
            entity_type: Some(entity_type),
            entry_id,
        }
    }

    /// Parses a whole string as exactly one token
    pub fn parse(s: &str) -> Option<Self> {
        let found = find_tokens(s).next()?;
        (found.range == (0..s.len())).then_some(found.token)
    }

    /// Whether this is the legacy untyped form
    pub fn is_legacy(&self) -> bool {
        self.entity_type.is_none()
    }
}

impl fmt::Display for VaultToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity_type {
            Some(entity_type) => write!(f, "{TOKEN_PREFIX}{entity_type}:{}", self.entry_id),
            None => write!(f, "{TOKEN_PREFIX}{}", self.entry_id),
        }
    }
}

/// A token located inside a larger string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundToken {
    /// Byte range of the token in the scanned text
    pub range: Range<usize>,
    pub token: VaultToken,
}

/// Iterates over all tokens in `text`, left to right, non-overlapping
pub fn find_tokens(text: &str) -> impl Iterator<Item = FoundToken> + '_ {
    token_regex().captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let entry_id = VaultEntryId::new(caps.get(2)?.as_str()).ok()?;
        let entity_type = match caps.get(1) {
            Some(m) => Some(EntityType::new(m.as_str()).ok()?),
            None => None,
        };
        Some(FoundToken {
            range: whole.range(),
            token: VaultToken {
                entity_type,
                entry_id,
            },
        })
    })
}

/// Whether `text` contains at least one vault token
pub fn contains_token(text: &str) -> bool {
    token_regex().is_match(text)
}
