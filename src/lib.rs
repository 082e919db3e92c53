//! Kernelhub Session Registry
//!
//! This library provides the session registry for an interactive compute
//! server: the durable mapping between client-visible sessions and the
//! kernel processes they are bound to, kept consistent with the live
//! kernel registry through reconciliation on every read.

pub mod contents;
pub mod db;
pub mod kernel;
pub mod session;
