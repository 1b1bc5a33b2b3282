//! Request handlers.
//!
//! - `websocket`: participant and viewer endpoints
//! - `http`: session API

mod error;
mod http;
mod websocket;

pub use http::{
    create_session, delete_session, end_session, export_session, get_session_detail,
    get_session_messages, get_session_statistics, health_check, list_sessions,
};
pub use websocket::{participant_handler, viewer_handler};
