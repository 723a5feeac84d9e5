//! HTTP health check surface
//!
//! The protocol itself runs over stdio; this listener only answers `/health`.

pub mod handlers;
