//! 接続管理の実装
//!
//! このモジュールは `ConnectionManager` trait の具体的な実装を提供します。
//!
//! - `websocket`: WebSocket の writer タスクへのチャンネルを使った実装

pub mod websocket;

pub use websocket::WebSocketConnectionManager;
