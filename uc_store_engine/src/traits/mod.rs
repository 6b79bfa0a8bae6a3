//! Behaviour contracts for the storefront engine.
//!
//! * [`StorefrontDatabase`] defines the highest level of behaviour for backends supporting the
//!   engine: order creation and lifecycle, code reservation, activation bookkeeping and top-ups.
//! * [`AccountManagement`] provides methods for managing customers and their balances.
//! * [`ActivationGateway`] is the seam to the external redemption providers; the engine drives
//!   the priority/fallback protocol and normalizes outcomes, while implementations own the HTTP
//!   transport.
mod account_management;
mod activation_gateway;
mod data_objects;
mod storefront_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use activation_gateway::{
    ActivationGateway,
    ActivationGatewayError,
    ActivationOutcome,
    ActivationRequest,
    ExternalOrderRequest,
};
pub use data_objects::{ActivationResolution, ReservedCodes, TopUpSweepResult};
pub use storefront_database::{StorefrontDatabase, StorefrontError};
