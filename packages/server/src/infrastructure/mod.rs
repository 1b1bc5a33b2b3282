//! Infrastructure layer: concrete implementations of the domain traits.
//!
//! - `repository`: Session Registry / Message Store
//! - `connection`: Connection Manager backed by WebSocket writer channels
//! - `dto`: wire and HTTP data transfer objects

pub mod connection;
pub mod dto;
pub mod repository;
