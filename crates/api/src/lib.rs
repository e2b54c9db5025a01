//! HTTP API: read-only shop catalog endpoints.

pub mod app;
