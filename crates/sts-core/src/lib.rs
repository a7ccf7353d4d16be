//! # STS Core
//!
//! Core types, events, errors, and collaborator traits for the STS entity
//! layer: the part of the SDN test harness that models switches, hosts,
//! links and controller processes.
//!
//! The OpenFlow codec and the switch forwarding state machine live in an
//! external protocol engine. This crate only states what the entity layer
//! needs from that engine ([`SwitchEngine`]) and from the transport that
//! reaches a controller ([`ConnectionFactory`]).
//!
//! ## Key Types
//!
//! - [`Dpid`], [`MacAddr`], [`PhyPort`]: switch and port identities
//! - [`OfpMessage`]: an opaque control-plane message
//! - [`Event`]: the closed set of observable events
//! - [`EventBus`]: synchronous, non-reentrant publish/subscribe
//! - [`ControllerConfig`], [`ControllerInfo`]: controller configuration and endpoints
//!
//! ## Test Doubles
//!
//! - [`MockEngine`]: in-memory protocol engine
//! - [`MockConnectionFactory`]: endpoint factory with refusable peers

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod mock_engine;
pub mod port;
pub mod tcp;

// Re-export main types
pub use bus::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use message::*;
pub use mock_engine::*;
pub use port::*;
pub use tcp::*;
