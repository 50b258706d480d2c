//! Common library for the Rookline club applications
//!
//! This crate provides shared functionality used across the Rookline
//! services, including database connectivity, the error taxonomy, club
//! scheduling configuration, and the clock/calendar abstractions.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
