//! Rookline attendance service
//!
//! Core logic for the club's weekly attendance: session resolution,
//! check-in/check-out reconciliation, a live-synced attendance view,
//! the roster seam, and tournament standings, exposed through a thin
//! HTTP layer in `routes`.

pub mod error;
pub mod models;
pub mod realtime;
pub mod reconciler;
pub mod resolver;
pub mod roster;
pub mod routes;
pub mod standings;
pub mod state;
pub mod store;
pub mod view;
