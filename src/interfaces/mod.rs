//! Inbound adapters: REST API and live-state transports

pub mod http;
pub mod ws;
