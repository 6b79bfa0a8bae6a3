//! HTTP clients for the external code-activation providers.
//!
//! Each provider gets its own thin client that owns the transport and authentication details and
//! normalizes the provider's response into a plain `(success, status)` shape. Anything smarter —
//! priority ordering, fallback, order bookkeeping — lives upstream in the engine; these clients
//! deliberately know nothing about orders or inventory.
mod config;
mod data_objects;
mod error;
mod fars;
mod kokos;
mod smileone;
mod ucodeium;

pub use config::{FarsConfig, KokosConfig, SmileOneConfig, UCodeiumConfig};
pub use data_objects::{FarsAcceptance, FarsRedeemRequest, SmileOneResponse, UCodeiumResponse};
pub use error::ActivatorApiError;
pub use fars::FarsApi;
pub use kokos::KokosApi;
pub use smileone::SmileOneApi;
pub use ucodeium::UCodeiumApi;
