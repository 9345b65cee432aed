//! Client-side workflow for the PowerBAN lottery: draft tickets, player
//! identity and addresses, batch purchase, and the countdown to the next draw.

#[macro_use]
extern crate serde;

pub mod api;
pub mod app;
pub mod backend;
pub mod config;
pub mod draw;
pub mod error;
pub mod identity;
pub mod notify;
pub mod purchase;
pub mod storage;
pub mod tickets;
pub mod types;

pub use crate::api::{ApiRequest, ApiResponse, HttpBackend, Method, Transport};
pub use crate::app::{PowerBan, ViewState};
pub use crate::backend::Backend;
pub use crate::config::{ClientConf, InitArgs};
pub use crate::draw::{Clock, CountdownTask, DrawSynchronizer, SystemClock, Tick, DRAWING_NOW};
pub use crate::error::{
    AddressError, BackendError, ClientError, ConfigError, StorageError, TicketError, TransportError,
};
pub use crate::identity::IdentityStore;
pub use crate::notify::Notifications;
pub use crate::purchase::{BlockReason, PurchaseCoordinator, PurchaseOutcome};
pub use crate::storage::{KeyValueStore, SettingsMemory, StableStore};
pub use crate::tickets::TicketSet;
pub use crate::types::*;
