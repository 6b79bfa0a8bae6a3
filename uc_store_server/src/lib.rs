//! UC Store Server
//!
//! The HTTP front-end for the storefront engine. The Telegram bot process is the only intended
//! client of the `/api` scope, which is guarded by a shared secret; the `/webhook` scope is open
//! to the redemption providers that deliver asynchronous activation results.
pub mod catalog;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod integrations;
pub mod routes;
pub mod server;
