//! # iedsim Wire and Data-Model Types
//!
//! Pure data structures shared across the workspace: link-layer addressing,
//! GOOSE/SV protocol data units, timestamps, and trip-logic point values.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → services/emulator
//!     ↑            ↓              ↓
//! Pure Data    Encoding       Publisher/Sniffer
//! Structures   Rules          Runtime
//! ```
//!
//! This crate performs no I/O and keeps no global state. Every type is
//! validated at construction: a `MacAddr` or `VlanTag` that exists is a
//! `MacAddr` or `VlanTag` that is in range. Callers never receive a
//! partially built value.

pub mod ether;
pub mod error;
pub mod goose;
pub mod mac;
pub mod point;
pub mod sv;
pub mod time;
pub mod vlan;

pub use error::TypesError;
pub use ether::EtherType;
pub use goose::{GoosePdu, GooseValue};
pub use mac::MacAddr;
pub use point::PointValue;
pub use sv::{SmpSynch, SvAsdu, SvStreamConfig};
pub use time::UtcTimestamp;
pub use vlan::VlanTag;

/// Result alias for fallible type construction.
pub type TypesResult<T> = std::result::Result<T, TypesError>;
