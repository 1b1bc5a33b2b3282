//! Replay selection rule.
//!
//! 接続時にどの履歴メッセージを送るかを決める純粋関数群。
//! participant は自分の最初の join 以降のみ、viewer はログ全体を見られる。

use super::{
    entity::ChatMessage,
    value_object::{ClientId, Timestamp},
};

/// Timestamp of the earliest join message of `client_id` in `log`
///
/// `None` means the client has never joined this session.
pub fn earliest_join_time(log: &[ChatMessage], client_id: &ClientId) -> Option<Timestamp> {
    // the log is in sequence order with non-decreasing timestamps
    log.iter()
        .find(|message| message.is_join_of(client_id))
        .map(|message| message.timestamp)
}

/// Messages a returning participant is entitled to see
///
/// `since_join` must be the store's answer for cutoff = `join_time`. Join entries of the
/// same client within `[join_time, join_time + window_ms)` are dropped; everything
/// else is kept in order.
pub fn participant_view(
    since_join: Vec<ChatMessage>,
    client_id: &ClientId,
    join_time: Timestamp,
    window_ms: i64,
) -> Vec<ChatMessage> {
    since_join
        .into_iter()
        .filter(|message| {
            let duplicate_join = message.is_join_of(client_id)
                && message.timestamp.millis_since(join_time) < window_ms;
            !duplicate_join
        })
        .collect()
}

/// Messages a participant sees on connect, given the full log
pub fn participant_replay(
    log: &[ChatMessage],
    client_id: &ClientId,
    window_ms: i64,
) -> Vec<ChatMessage> {
    match earliest_join_time(log, client_id) {
        Some(join_time) => {
            let start = log.partition_point(|message| message.timestamp < join_time);
            participant_view(log[start..].to_vec(), client_id, join_time, window_ms)
        }
        None => Vec::new(),
    }
}

/// Viewers see everything, unconditionally
pub fn viewer_view(log: Vec<ChatMessage>) -> Vec<ChatMessage> {
    log
}
