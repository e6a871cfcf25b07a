// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query identity tags.
//!
//! A [`QueryIdentity`] names one logical query lifetime on a façade. Commands
//! and events are stamped with the identity that was current when they were
//! issued, which lets callers tell results of a superseded query apart from
//! the active one.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique query identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryIdentity(Uuid);

impl QueryIdentity {
    /// Terminal sentinel: no query is active (after `finish` or `clear`).
    pub const FINISHED: QueryIdentity = QueryIdentity(Uuid::from_u128(u128::MAX));

    /// Mints a fresh identity. Never equal to [`QueryIdentity::FINISHED`].
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns `true` for the terminal sentinel.
    pub fn is_finished(&self) -> bool {
        *self == Self::FINISHED
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns `true` when `requested` does not address this identity.
    ///
    /// `None` means the caller did not qualify the call and always matches.
    pub fn is_stale(&self, requested: Option<QueryIdentity>) -> bool {
        matches!(requested, Some(id) if id != *self)
    }
}

impl Default for QueryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for QueryIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_finished() {
            write!(f, "finished")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn minted_identities_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| QueryIdentity::new()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&QueryIdentity::FINISHED));
    }

    #[test]
    fn sentinel_displays_as_finished() {
        assert_eq!(QueryIdentity::FINISHED.to_string(), "finished");
        assert!(QueryIdentity::FINISHED.is_finished());
        assert!(!QueryIdentity::new().is_finished());
        assert!(!QueryIdentity::from(Uuid::nil()).is_finished());
    }

    #[test]
    fn unqualified_requests_are_never_stale() {
        let current = QueryIdentity::new();
        assert!(!current.is_stale(None));
        assert!(!current.is_stale(Some(current)));
        assert!(current.is_stale(Some(QueryIdentity::new())));
    }

    proptest! {
        #[test]
        fn stale_iff_different(a in any::<u128>(), b in any::<u128>()) {
            let current = QueryIdentity::from(Uuid::from_u128(a));
            let requested = QueryIdentity::from(Uuid::from_u128(b));
            prop_assert_eq!(current.is_stale(Some(requested)), a != b);
        }
    }
}
