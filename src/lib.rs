//! Read and write Mastervolt device variables over Modbus
//!
//! Mastervolt variables are addressed by four fields (idal, idb, tab, var) and
//! carry a 32-bit float in the firmware's own byte order. This crate packs the
//! address and value into a single Modbus read/write-multiple-registers request
//! (function 0x17) and decodes the value from the reply.
//!
//! The `protocol` module holds the pure encoding rules, `api` the transaction
//! layer, transports, polling and commands, and `core` the host-side entity
//! state. The CLI frontend lives in a separate, hidden module.

pub mod api;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod protocol;
#[doc(hidden)]
pub mod utils;

pub use api::*;
