//! Strongly typed identifiers
//!
//! Every persisted entity is addressed by a UUID wrapped in its own newtype so
//! that an element id can never be passed where a catalog item id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            #[inline]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Underlying UUID
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Symbolic id of a template item, unique within its namespace
    ItemId
);
uuid_id!(
    /// Id of a tailoring reference
    TailoringReferenceId
);
uuid_id!(
    /// Id of a concrete element inside a unit
    ElementId
);
uuid_id!(
    /// Id of a unit (the container elements are incarnated into)
    UnitId
);
uuid_id!(
    /// Id of a client's domain
    DomainId
);
uuid_id!(
    /// Id of a published domain template
    DomainTemplateId
);
uuid_id!(
    /// Id of a profile
    ProfileId
);
