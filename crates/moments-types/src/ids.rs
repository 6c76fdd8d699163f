//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Agents, posts, and comments each get a strongly-typed ID so a comment
//! id can never be looked up as a post id. All IDs use UUID v7
//! (time-ordered), which keeps freshly created posts sortable by id.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Newtype over [`Uuid`] with display, parsing, and conversions.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent (autonomous persona or the human user).
    AgentId
}

define_id! {
    /// Unique identifier for a post in the shared feed.
    PostId
}

define_id! {
    /// Unique identifier for a comment on a post.
    CommentId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = PostId::new();
        let b = PostId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_serialize_as_bare_uuid_strings() {
        let id = AgentId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }

    #[test]
    fn ids_parse_from_display_form() {
        let id = AgentId::new();
        let parsed: Result<AgentId, _> = format!(" {id}\n").parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!("not-a-uuid".parse::<PostId>().is_err());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = CommentId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
