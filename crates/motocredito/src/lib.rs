//! Back office for a motorcycle dealership network's credit desk: intake
//! migration into normalized application records, client evaluation scoring,
//! authentication sessions, and document storage.

pub mod auth;
pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workflows;
