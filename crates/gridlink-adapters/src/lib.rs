//! Adapter implementations for gridlink.
//!
//! Currently ships [`SimAdapter`], a simulated hardware network used by the
//! daemon's demo mode and by end-to-end tests. Real hardware adapters
//! implement the same [`gridlink_core::Adapter`] contract.

pub mod sim;

pub use sim::{SimAdapter, spawn_traffic};
