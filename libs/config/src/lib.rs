//! # iedsim Configuration
//!
//! TOML configuration for the virtual IED: which interface to use, what
//! the SV and GOOSE publishers transmit, which GOOSE streams the sniffer
//! subscribes to, and the trip rules.
//!
//! Loading happens in two stages, raw then validated: the serde structures
//! in [`schema`] mirror the file exactly (MAC addresses as text, modes as
//! strings), and [`runtime`] converts them into construction-validated
//! wire types. Every error names the offending key, so a bad file is
//! diagnosable from the error message alone. Configuration mistakes
//! surface at load time, never as a malformed frame on the wire.

pub mod error;
pub mod runtime;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use runtime::{
    load_config, EmulatorConfig, GoosePublisherConfig, ReplayModeConfig, RuleConfig,
    SubscriptionConfig, SvPublisherConfig, SvSourceConfig,
};
