//! Core update-consumption engine for the emulator bot.
//!
//! This crate is transport-agnostic. The HTTP client and the webhook server
//! live behind ports (traits) implemented in adapter crates; the core owns
//! the cursor reconciliation, classification and dispatch logic.

pub mod classify;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod keyboard;
pub mod logging;
pub mod poll;
pub mod ports;
pub mod update;

pub use errors::{Error, Result};
