//! Domain layer of the relay.
//!
//! Value objects, entities and the error taxonomy, together with the traits the
//! usecase layer depends on (session registry, message store, connection manager)
//! and the pure rules (replay selection, log queries, statistics).

pub mod connection;
pub mod entity;
pub mod error;
pub mod query;
pub mod replay;
pub mod repository;
pub mod statistics;
pub mod value_object;

pub use connection::{
    ConnectionLink, ConnectionManager, ConnectionRequest, EvictedConnection, MessagePushError,
    OutboundFrame, PusherChannel,
};
pub use entity::{
    Author, ChatMessage, Connection, ConnectionRole, ConnectionState, CreateSession,
    MessageDraft, MessageKind, MessageLog, PresenceEvent, Session, SessionMetadata,
    SessionStatus,
};
pub use error::{IDENTITY_CONFLICT_REASON, RelayError};
pub use query::MessageQuery;
pub use repository::{MessageStore, SessionRegistry};
pub use statistics::{SessionStatistics, UserStatistics};
pub use value_object::{
    ClientId, ConnectionId, MessageBody, PasswordHash, SequenceNumber, SessionId, Timestamp,
    ValueObjectError,
};
