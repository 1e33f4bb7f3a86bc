//! Core data model for the harvest engine.
//!
//! Typed records for the rows the engine reads and writes:
//! lands, notifications, farm work assignments, and run summaries.
//! Enumerations are closed Rust enums with a stable snake-case string
//! encoding shared by the database columns and JSON output.

mod land;
mod notification;
mod run;
mod work;

pub use land::{Land, NewLand};
pub use notification::{
    NewNotification, Notification, NotificationKind, NotificationMetadata, NotificationStatus,
    Priority,
};
pub use run::{LandError, RunRecord, RunSummary};
pub use work::{
    CycleKey, FarmWork, HARVEST_NOTIFICATION_SOURCE, NewFarmWork, WorkMetadata, WorkStatus,
    WorkType,
};

/// Error returned when a column or argument holds an unknown enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Implements `as_str`, `Display`, and `FromStr` for a fieldless enum
/// using one string per variant.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stable string encoding of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::model::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| $crate::model::ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

pub(crate) use string_enum;
