//! Diameter base protocol library (RFC 6733)
//!
//! This crate implements the core of the Diameter base protocol:
//! - AVP and message encoding/decoding with typed value conversion
//! - Incremental stream framing for byte-oriented transports
//! - Hop-by-Hop / End-to-End identifier generation and Session-Id creation
//! - A per-peer state machine driving Capabilities-Exchange (CER/CEA),
//!   Device-Watchdog (DWR/DWA) and Disconnect-Peer (DPR/DPA) over a single
//!   full-duplex transport
//!
//! Higher layers (dictionaries attaching names and types to AVP codes,
//! multi-peer agents, application session logic, transport dialling and
//! listening) consume this crate but are not part of it.

pub mod common;
pub mod avp;
pub mod message;
pub mod framer;
pub mod sequence;
pub mod entity;
pub mod config;
pub mod error;
pub mod peer;

mod property_tests;

pub use common::*;
pub use avp::*;
pub use message::*;
pub use framer::*;
pub use sequence::*;
pub use entity::*;
pub use config::*;
pub use error::*;
pub use peer::*;

/// Diameter protocol version
pub const DIAMETER_VERSION: u8 = 1;

/// Default Diameter port
pub const DIAMETER_PORT: u16 = 3868;
