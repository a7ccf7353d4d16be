//! # STS Entities
//!
//! The simulated entities of the SDN test harness:
//!
//! - [`FuzzSwitch`]: a switch wrapping an external protocol engine that can
//!   fail and recover, and publishes every control-plane message it sends or
//!   handles
//! - [`Host`] / [`HostInterface`]: data-plane endpoints
//! - [`Link`] / [`AccessLink`]: topology edges
//! - [`ControllerProcess`] / [`ProcessRegistry`]: supervised controller
//!   binaries and the registry used to reap them all on shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sts_core::{ControllerInfo, Dpid, EventBus, MockConnectionFactory, MockEngine};
//! use sts_entities::FuzzSwitch;
//!
//! let bus = EventBus::new();
//! bus.on_control_plane(|event| println!("{} {}", event.direction, event.message));
//!
//! let mut switch = FuzzSwitch::new(MockEngine::new(Dpid(1), 4), Arc::new(MockConnectionFactory::new()), &bus);
//! switch.add_controller_info(ControllerInfo::from("127.0.0.1:6633".parse()?));
//! switch.connect()?;
//! switch.fail();
//! switch.recover()?;
//! ```

pub mod controller;
pub mod host;
pub mod link;
pub mod procutils;
pub mod registry;
pub mod shim;
pub mod snapshot;
pub mod switch;

pub use controller::ControllerProcess;
pub use host::{HOST_EVENTS, Host, HostInterface};
pub use link::{AccessLink, Link};
pub use procutils::{OUTPUT_TARGET, spawn_filtered};
pub use registry::{ProcessRegistry, SupervisedChild};
pub use shim::{HandlerLayer, ShimDispatch, intercept};
pub use snapshot::SwitchSnapshot;
pub use switch::{FuzzSwitch, SWITCH_EVENTS};
