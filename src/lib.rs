//! Personal to-do manager: a task store with relational and file-backed
//! variants, status/period filtering, a month calendar projection, and a
//! JSON/HTML surface served with axum.

pub mod api;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod pages;
pub mod store;
pub mod task;
pub mod telemetry;
pub mod transfer;
pub mod view;
