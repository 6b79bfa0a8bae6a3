//! UC Store Engine
//!
//! The engine contains the core logic for the digital-goods storefront: the code inventory with
//! its reservation rules, the order lifecycle state machine, the activation gateway protocol for
//! redeeming codes against third-party providers, and the fulfillment orchestrator that ties them
//! together. It is transport-agnostic; the accompanying server crate exposes it over HTTP.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). Sqlite is the supported backend. You should
//!    never need to access the database directly; use the public APIs instead. The exception is
//!    the data types used in the database, defined in the public `db_types` module.
//! 2. The engine public API ([`mod@sf_api`]): order flow, code activation and top-up management.
//!    Backends implement the traits in [`mod@traits`] to drive these APIs.
//! 3. A set of events ([`mod@events`]) emitted on order transitions and operator alerts. A simple
//!    actor framework lets you hook into these events and perform custom actions, such as
//!    delivering Telegram notifications.
mod db;

pub mod db_types;
pub mod events;
pub mod recipes;
pub mod sf_api;
pub mod test_utils;
pub mod traits;

pub use db::sqlite::SqliteDatabase;
pub use sf_api::{
    activation_api::ActivationApi,
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    topup_api::TopUpApi,
};
pub use traits::{
    AccountApiError,
    AccountManagement,
    ActivationGateway,
    ActivationGatewayError,
    StorefrontDatabase,
    StorefrontError,
};
