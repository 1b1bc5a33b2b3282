//! Utilities shared by the hiroba relay server and its terminal client.

pub mod logger;
pub mod time;
