//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use hiroba_server::domain::IDENTITY_CONFLICT_REASON;

use crate::error::ClientError;

/// WebSocket close code the relay uses for refused connections
pub const POLICY_VIOLATION: u16 = 1008;

/// Which endpoint the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMode {
    Participant {
        client_id: String,
        session_password: Option<String>,
        user_password: Option<String>,
    },
    Viewer,
}

/// Resolved command line options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Base URL of the relay, e.g. `ws://127.0.0.1:8080`
    pub url: String,
    pub session_id: String,
    pub mode: ClientMode,
}

impl ClientOptions {
    pub fn new(
        url: String,
        session_id: String,
        client_id: Option<String>,
        session_password: Option<String>,
        user_password: Option<String>,
        viewer: bool,
    ) -> Result<Self, ClientError> {
        if session_id.trim().is_empty() {
            return Err(ClientError::InvalidArguments(
                "session id must not be empty".to_string(),
            ));
        }
        let mode = if viewer {
            ClientMode::Viewer
        } else {
            let client_id = client_id.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
                ClientError::InvalidArguments(
                    "--client-id is required unless --viewer is given".to_string(),
                )
            })?;
            ClientMode::Participant {
                client_id,
                session_password,
                user_password,
            }
        };
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            session_id,
            mode,
        })
    }

    pub fn client_id(&self) -> Option<&str> {
        match &self.mode {
            ClientMode::Participant { client_id, .. } => Some(client_id),
            ClientMode::Viewer => None,
        }
    }

    /// Full endpoint URL including the query string
    pub fn endpoint_url(&self) -> String {
        let mut params = vec![("session_id", self.session_id.as_str())];
        let path = match &self.mode {
            ClientMode::Participant {
                client_id,
                session_password,
                user_password,
            } => {
                params.push(("client_id", client_id));
                if let Some(password) = session_password {
                    params.push(("session_password", password));
                }
                if let Some(password) = user_password {
                    params.push(("user_password", password));
                }
                "/ws"
            }
            ClientMode::Viewer => "/ws/viewer",
        };
        let query: Vec<String> = params
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, encode_query_value(value)))
            .collect();
        format!("{}{}?{}", self.url, path, query.join("&"))
    }
}

/// Percent-encode everything outside the unreserved set
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Classify a close frame received before the client chose to leave.
pub fn close_error(code: u16, reason: &str, client_id: Option<&str>) -> ClientError {
    if code == POLICY_VIOLATION {
        if reason == IDENTITY_CONFLICT_REASON {
            return ClientError::IdentityConflict(client_id.unwrap_or_default().to_string());
        }
        return ClientError::Refused(reason.to_string());
    }
    ClientError::ConnectionError(format!("closed by server ({}): {}", code, reason))
}

/// Check if the client should exit immediately based on the error type.
///
/// # Returns
///
/// `true` if the error requires immediate exit (identity conflict or a refusal),
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::IdentityConflict(_)
            | ClientError::Refused(_)
            | ClientError::InvalidArguments(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(client_id: &str) -> ClientOptions {
        ClientOptions::new(
            "ws://127.0.0.1:8080/".to_string(),
            "s1".to_string(),
            Some(client_id.to_string()),
            None,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_participant_url_encodes_query() {
        // テスト項目: participant の接続 URL はクエリ値をエンコードして /ws に向く
        // given (前提条件):
        let mut options = participant("alice smith");
        if let ClientMode::Participant {
            session_password, ..
        } = &mut options.mode
        {
            *session_password = Some("p&w".to_string());
        }

        // when (操作):
        let url = options.endpoint_url();

        // then (期待する結果):
        assert_eq!(
            url,
            "ws://127.0.0.1:8080/ws?session_id=s1&client_id=alice%20smith&session_password=p%26w"
        );
    }

    #[test]
    fn test_viewer_url() {
        // テスト項目: viewer は client_id なしで /ws/viewer に接続する
        let options = ClientOptions::new(
            "ws://localhost:8080".to_string(),
            "s1".to_string(),
            None,
            None,
            None,
            true,
        )
        .unwrap();

        assert_eq!(options.endpoint_url(), "ws://localhost:8080/ws/viewer?session_id=s1");
        assert_eq!(options.client_id(), None);
    }

    #[test]
    fn test_participant_requires_client_id() {
        // テスト項目: viewer でなければ client_id は必須
        let result = ClientOptions::new(
            "ws://localhost:8080".to_string(),
            "s1".to_string(),
            None,
            None,
            None,
            false,
        );

        assert!(matches!(result, Err(ClientError::InvalidArguments(_))));
    }

    #[test]
    fn test_close_error_identity_conflict() {
        // テスト項目: 予約済みの理由で閉じられたら IdentityConflict と判定される
        // given (前提条件):
        let reason = "Client ID already in use";

        // when (操作):
        let error = close_error(1008, reason, Some("alice"));

        // then (期待する結果):
        assert_eq!(error, ClientError::IdentityConflict("alice".to_string()));
        assert!(should_exit_immediately(&error));
    }

    #[test]
    fn test_close_error_other_refusal() {
        // テスト項目: 1008 のその他の理由は Refused で、再接続しない
        let error = close_error(1008, "Authentication failed", Some("alice"));

        assert_eq!(error, ClientError::Refused("Authentication failed".to_string()));
        assert!(!should_attempt_reconnect(&error, 0, 5));
    }

    #[test]
    fn test_close_error_unexpected_close_is_retryable() {
        // テスト項目: 1008 以外のクローズは接続エラー扱いで再接続対象
        let error = close_error(1011, "", Some("alice"));

        assert!(matches!(error, ClientError::ConnectionError(_)));
        assert!(should_attempt_reconnect(&error, 0, 5));
    }

    #[test]
    fn test_should_attempt_reconnect_within_limit() {
        // テスト項目: 再接続回数が上限未満の場合、再接続すべきと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 4, 5);

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_should_attempt_reconnect_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 5, 5);

        // then (期待する結果):
        assert!(!result);
    }
}
