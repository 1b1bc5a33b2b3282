//! Data Transfer Objects (DTOs) for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket wire messages
//! - `http`: HTTP API request/response bodies
//! - `export`: CSV / JSON session exports

pub mod conversion;
pub mod export;
pub mod http;
pub mod websocket;
