//! In-memory fakes of the repository and credential traits, for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use coachline_types::error::{AccountError, RepositoryError};
use coachline_types::message::{HistoryEntry, StoredMessage};
use coachline_types::user::{Identity, ResolvedSession, Role, User, UserCredentials, UserId};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::repository::{IdentityDirectory, MessageStore, SessionStore};
use crate::service::credentials::{IssuedToken, PasswordHasher, TokenIssuer};

// ---------------------------------------------------------------------------
// Identity directory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    accounts: HashMap<Identity, UserCredentials>,
    fail_lookups: bool,
}

#[derive(Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    /// Directory pre-populated with client accounts.
    pub fn with_users(names: &[&str]) -> Self {
        let directory = Self::default();
        {
            let mut state = directory.state.lock().unwrap();
            for name in names {
                let user = User {
                    id: UserId::new(),
                    username: Identity::new(*name),
                    email: format!("{name}@example.com"),
                    role: Role::Client,
                    created_at: Utc::now(),
                };
                state.accounts.insert(
                    user.username.clone(),
                    UserCredentials {
                        user,
                        password_hash: String::new(),
                    },
                );
            }
        }
        directory
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.state.lock().unwrap().fail_lookups = fail;
    }

    pub fn id_of(&self, name: &str) -> Option<UserId> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(&Identity::new(name))
            .map(|c| c.user.id)
    }

    pub fn user_by_id(&self, id: &UserId) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .values()
            .find(|c| c.user.id == *id)
            .map(|c| c.user.clone())
    }

    fn name_of(&self, id: &UserId) -> String {
        self.user_by_id(id)
            .map(|u| u.username.to_string())
            .unwrap_or_default()
    }
}

impl IdentityDirectory for MemoryDirectory {
    async fn lookup_identity(&self, identity: &Identity) -> Result<Option<UserId>, RepositoryError> {
        let state = self.state.lock().unwrap();
        if state.fail_lookups {
            return Err(RepositoryError::Connection);
        }
        Ok(state.accounts.get(identity).map(|c| c.user.id))
    }

    async fn create_user(&self, credentials: &UserCredentials) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let name = credentials.user.username.clone();
        if state.accounts.contains_key(&name) {
            return Err(RepositoryError::Conflict(format!("username '{name}'")));
        }
        state.accounts.insert(name, credentials.clone());
        Ok(credentials.user.clone())
    }

    async fn find_credentials(
        &self,
        identity: &Identity,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        Ok(self.state.lock().unwrap().accounts.get(identity).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<User> = state
            .accounts
            .values()
            .map(|c| c.user.clone())
            .filter(|u| role.is_none_or(|r| u.role == r))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

// ---------------------------------------------------------------------------
// Message store
// ---------------------------------------------------------------------------

/// A stored message with names resolved, for assertions.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub sender: String,
    pub receiver: String,
    pub content: String,
}

#[derive(Clone)]
pub struct MemoryMessageStore {
    directory: MemoryDirectory,
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    fail_appends: Arc<AtomicBool>,
}

impl MemoryMessageStore {
    pub fn new(directory: MemoryDirectory) -> Self {
        Self {
            directory,
            messages: Arc::new(Mutex::new(Vec::new())),
            fail_appends: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Every stored message in append order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| StoredRecord {
                sender: self.directory.name_of(&m.sender_id),
                receiver: self.directory.name_of(&m.receiver_id),
                content: m.content.clone(),
            })
            .collect()
    }
}

impl MessageStore for MemoryMessageStore {
    async fn append(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }
        let stored = StoredMessage {
            id: Uuid::now_v7(),
            sender_id: *sender_id,
            receiver_id: *receiver_id,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        self.messages.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn history(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| {
                (m.sender_id == *user_a && m.receiver_id == *user_b)
                    || (m.sender_id == *user_b && m.receiver_id == *user_a)
            })
            .map(|m| HistoryEntry {
                sender: self.directory.name_of(&m.sender_id),
                content: m.content.clone(),
                timestamp: m.timestamp,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemorySessionStore {
    directory: MemoryDirectory,
    sessions: Arc<Mutex<HashMap<String, (UserId, DateTime<Utc>)>>>,
}

impl MemorySessionStore {
    pub fn new(directory: MemoryDirectory) -> Self {
        Self {
            directory,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn digests(&self) -> Vec<String> {
        self.sessions.lock().unwrap().keys().cloned().collect()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create_session(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(token_hash.to_string(), (*user_id, expires_at));
        Ok(())
    }

    async fn resolve_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<ResolvedSession>, RepositoryError> {
        let entry = self.sessions.lock().unwrap().get(token_hash).copied();
        Ok(entry.and_then(|(user_id, expires_at)| {
            self.directory.user_by_id(&user_id).map(|user| ResolvedSession {
                user_id,
                identity: user.username,
                role: user.role,
                expires_at,
            })
        }))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        Ok(self.sessions.lock().unwrap().remove(token_hash).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Reversible "hash" that keeps tests fast.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash_password(&self, password: &SecretString) -> Result<String, AccountError> {
        Ok(format!("plain${}", password.expose_secret()))
    }

    fn verify_password(&self, password: &SecretString, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password.expose_secret())
    }
}

/// Predictable tokens: `token-1`, `token-2`, ...
#[derive(Default)]
pub struct SequentialTokens {
    next: AtomicU64,
}

impl TokenIssuer for SequentialTokens {
    fn issue(&self) -> IssuedToken {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{n}");
        IssuedToken {
            digest: self.digest(&token),
            token,
        }
    }

    fn digest(&self, token: &str) -> String {
        format!("digest:{token}")
    }
}
