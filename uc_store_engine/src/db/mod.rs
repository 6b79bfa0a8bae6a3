//! Database management and control.
//!
//! The engine persists customers, orders, the three kinds of inventory codes, the activator
//! ranking and top-ups in a relational store. Sqlite is the supported backend; it implements the
//! contracts defined in [`crate::traits`]. All state-changing operations run inside database
//! transactions, and inventory claims are expressed as atomic conditional updates so that a code
//! row can be linked to at most one order even under concurrent reservation.
pub mod sqlite;
