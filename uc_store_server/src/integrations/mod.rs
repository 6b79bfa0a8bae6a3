//! Provider client wiring.
//!
//! The engine speaks to redemption providers through the [`uc_store_engine::ActivationGateway`]
//! trait; this module assembles the concrete HTTP clients from `activator_tools` into one gateway
//! the server hands to the engine APIs.
mod activators;

pub use activators::ActivatorRig;
