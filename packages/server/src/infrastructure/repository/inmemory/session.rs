//! InMemory Session Repository 実装
//!
//! ドメイン層が定義する `SessionRegistry` と `MessageStore` の具体的な実装。
//! セッションごとに `Mutex` を持ち、異なるセッション同士はロックを共有しません。
//!
//! ```text
//! sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionRecord>>>>
//!                                          └─ Session + MessageLog
//! ```
//!
//! 外側の `RwLock` はセッションの追加・削除時にだけ書き込みロックを取ります。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{
    ChatMessage, ClientId, CreateSession, MessageDraft, MessageLog, MessageStore, PasswordHash,
    RelayError, Session, SessionId, SessionRegistry, Timestamp,
};

/// セッション本体とそのメッセージログ
#[derive(Debug)]
struct SessionRecord {
    session: Session,
    log: MessageLog,
}

type SharedRecord = Arc<Mutex<SessionRecord>>;

/// インメモリ Session Repository 実装
///
/// Registry がセッションとメッセージログを排他的に所有するため、
/// 1 つの構造体で `SessionRegistry` と `MessageStore` の両方を実装します。
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, SharedRecord>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, session_id: &SessionId) -> Result<SharedRecord, RelayError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))
    }

    /// `session_YYYYmmdd_HHMMSS`、衝突時は uuid の先頭 8 文字を付ける
    fn generate_session_id(
        sessions: &HashMap<SessionId, SharedRecord>,
        now: Timestamp,
    ) -> Result<SessionId, RelayError> {
        let created = DateTime::<Utc>::from_timestamp_millis(now.value()).unwrap_or_default();
        let base = format!("session_{}", created.format("%Y%m%d_%H%M%S"));
        let candidate = SessionId::new(base.clone())?;
        if !sessions.contains_key(&candidate) {
            return Ok(candidate);
        }
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(SessionId::new(format!("{}_{}", base, &suffix[..8]))?)
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRepository {
    async fn create_or_get(
        &self,
        request: CreateSession,
        now: Timestamp,
    ) -> Result<Session, RelayError> {
        if let Some(session_id) = &request.session_id
            && let Ok(record) = self.record(session_id).await
        {
            let record = record.lock().await;
            record.session.verify_password(request.password.as_deref())?;
            return Ok(record.session.clone());
        }

        let mut sessions = self.sessions.write().await;
        let session_id = match &request.session_id {
            Some(id) => id.clone(),
            None => Self::generate_session_id(&sessions, now)?,
        };

        // 読み取りロックを離している間に他の接続が作成した可能性がある
        if let Some(existing) = sessions.get(&session_id) {
            let record = existing.lock().await;
            record.session.verify_password(request.password.as_deref())?;
            return Ok(record.session.clone());
        }

        let session = Session::new(session_id.clone(), now, &request);
        tracing::info!(
            session_id = %session_id,
            password_protected = session.is_password_protected(),
            "Session created"
        );
        sessions.insert(
            session_id,
            Arc::new(Mutex::new(SessionRecord {
                session: session.clone(),
                log: MessageLog::new(),
            })),
        );
        Ok(session)
    }

    async fn end(&self, session_id: &SessionId, now: Timestamp) -> Result<bool, RelayError> {
        let record = self.record(session_id).await?;
        let mut record = record.lock().await;
        Ok(record.session.end(now))
    }

    async fn get(&self, session_id: &SessionId) -> Result<Session, RelayError> {
        let record = self.record(session_id).await?;
        let record = record.lock().await;
        Ok(record.session.clone())
    }

    async fn list(&self) -> Vec<Session> {
        let records: Vec<SharedRecord> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let mut result = Vec::with_capacity(records.len());
        for record in records {
            result.push(record.lock().await.session.clone());
        }
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        result
    }

    async fn authorize_participant(
        &self,
        session_id: &SessionId,
        client_id: &ClientId,
        user_password: Option<String>,
    ) -> Result<Option<PasswordHash>, RelayError> {
        let record = self.record(session_id).await?;
        let record = record.lock().await;
        record
            .session
            .authorize_user(client_id, user_password.as_deref())
    }

    async fn bind_user_password(
        &self,
        session_id: &SessionId,
        client_id: &ClientId,
        hash: PasswordHash,
    ) -> Result<(), RelayError> {
        let record = self.record(session_id).await?;
        let mut record = record.lock().await;
        record.session.bind_user_password(client_id, hash);
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<Session, RelayError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))?;
        let record = record.lock().await;
        if !record.session.is_ended() {
            return Err(RelayError::SessionActive(session_id.to_string()));
        }
        sessions.remove(session_id);

        tracing::info!(
            session_id = %session_id,
            messages = record.log.len(),
            "Session deleted"
        );
        Ok(record.session.clone())
    }
}

#[async_trait]
impl MessageStore for InMemorySessionRepository {
    async fn append(
        &self,
        session_id: &SessionId,
        draft: MessageDraft,
    ) -> Result<ChatMessage, RelayError> {
        let record = self.record(session_id).await?;
        let mut record = record.lock().await;
        if record.session.is_ended() {
            return Err(RelayError::SessionEnded(session_id.to_string()));
        }
        Ok(record.log.append(session_id, draft))
    }

    async fn since(
        &self,
        session_id: &SessionId,
        cutoff: Timestamp,
    ) -> Result<Vec<ChatMessage>, RelayError> {
        let record = self.record(session_id).await?;
        let record = record.lock().await;
        Ok(record.log.since(cutoff))
    }

    async fn all(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, RelayError> {
        let record = self.record(session_id).await?;
        let record = record.lock().await;
        Ok(record.log.all())
    }

    async fn count(&self, session_id: &SessionId) -> Result<usize, RelayError> {
        let record = self.record(session_id).await?;
        let record = record.lock().await;
        Ok(record.log.len())
    }
}
