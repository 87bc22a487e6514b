//! In-memory stand-in for the auth + database service, used by the facade's
//! tests.
//!
//! Emulates the service semantics the facade relies on: password checks,
//! optional auto-confirmation, anonymous accounts, SMS codes, token issue,
//! refresh and revocation, and row ownership enforced the way row-level
//! security would.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::Backend;
use crate::error::{AuthError, DataError};
use crate::types::{Identifier, Metadata, NewTodo, Session, SignUpOutcome, Todo, User};

pub(crate) const OTP_CODE: &str = "123456";

struct Account {
    user: User,
    password: Option<String>,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    by_identifier: HashMap<String, Uuid>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    pending_otp: HashMap<String, String>,
    recoveries: Vec<String>,
    todos: Vec<Todo>,
    next_todo_id: i64,
    next_token: u64,
    clock_ticks: i64,
}

pub(crate) struct MemoryBackend {
    state: Mutex<State>,
    auto_confirm: bool,
    session_ttl_secs: i64,
    offline: Mutex<bool>,
    row_security: Mutex<bool>,
    calls: AtomicUsize,
    epoch: OffsetDateTime,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State { next_todo_id: 1, ..State::default() }),
            auto_confirm: true,
            session_ttl_secs: 3600,
            offline: Mutex::new(false),
            row_security: Mutex::new(true),
            calls: AtomicUsize::new(0),
            epoch: OffsetDateTime::now_utc(),
        }
    }

    /// Accounts need confirmation before password sign-in succeeds.
    pub(crate) fn requiring_confirmation() -> Self {
        Self { auto_confirm: false, ..Self::new() }
    }

    /// Issue sessions that are already expired, to exercise refresh.
    pub(crate) fn with_session_ttl(ttl_secs: i64) -> Self {
        Self { session_ttl_secs: ttl_secs, ..Self::new() }
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Number of calls that reached the backend.
    /// With row security off, selects ignore ownership and return every row.
    pub(crate) fn set_row_security(&self, enabled: bool) {
        *self.row_security.lock().unwrap() = enabled;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn recoveries(&self) -> Vec<String> {
        self.state.lock().unwrap().recoveries.clone()
    }

    pub(crate) fn confirm(&self, identifier: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.by_identifier.get(identifier).copied() {
            if let Some(account) = state.accounts.get_mut(&id) {
                account.confirmed = true;
            }
        }
    }

    /// Insert a row for `user_id` directly, bypassing ownership checks.
    pub(crate) fn seed_todo(&self, user_id: Uuid, title: &str) -> Todo {
        let mut state = self.state.lock().unwrap();
        self.push_todo(&mut state, user_id, title)
    }

    pub(crate) fn is_access_token_live(&self, token: &str) -> bool {
        self.state.lock().unwrap().access_tokens.contains_key(token)
    }

    fn enter(&self) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.offline.lock().unwrap() {
            return Err("connection refused".to_owned());
        }
        Ok(())
    }

    fn push_todo(&self, state: &mut State, user_id: Uuid, title: &str) -> Todo {
        state.clock_ticks += 1;
        let todo = Todo {
            id: state.next_todo_id,
            title: title.to_owned(),
            completed: false,
            created_at: self.epoch + Duration::seconds(state.clock_ticks),
            user_id,
        };
        state.next_todo_id += 1;
        state.todos.push(todo.clone());
        todo
    }

    fn issue(&self, state: &mut State, user_id: Uuid) -> Session {
        state.next_token += 1;
        let access_token = format!("access-{}", state.next_token);
        let refresh_token = format!("refresh-{}", state.next_token);
        state.access_tokens.insert(access_token.clone(), user_id);
        state.refresh_tokens.insert(refresh_token.clone(), user_id);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Session {
            access_token,
            refresh_token,
            token_type: "bearer".to_owned(),
            expires_in: self.session_ttl_secs,
            expires_at: now + self.session_ttl_secs,
            user: state.accounts[&user_id].user.clone(),
        }
    }

    fn create_account(state: &mut State, identifier: Option<&Identifier>, password: Option<&str>, metadata: &Metadata, confirmed: bool) -> Uuid {
        let id = Uuid::new_v4();
        let mut user = User {
            id,
            email: None,
            phone: None,
            is_anonymous: identifier.is_none(),
            user_metadata: metadata.clone(),
            email_confirmed_at: None,
            phone_confirmed_at: None,
            created_at: Some(OffsetDateTime::now_utc()),
        };
        match identifier {
            Some(Identifier::Email(email)) => user.email = Some(email.clone()),
            Some(Identifier::Phone(phone)) => user.phone = Some(phone.clone()),
            None => {}
        }
        if let Some(identifier) = identifier {
            state.by_identifier.insert(identifier.as_str().to_owned(), id);
        }
        state.accounts.insert(id, Account { user, password: password.map(str::to_owned), confirmed });
        id
    }

    fn auth_user(state: &State, token: &str) -> Result<Uuid, DataError> {
        state
            .access_tokens
            .get(token)
            .copied()
            .ok_or_else(|| DataError::Misconfiguration("JWT expired".to_owned()))
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(
        &self,
        identifier: &Identifier,
        password: &str,
        metadata: &Metadata,
    ) -> Result<SignUpOutcome, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        if state.by_identifier.contains_key(identifier.as_str()) {
            return Err(AuthError::AlreadyRegistered("User already registered".to_owned()));
        }
        let id = Self::create_account(&mut state, Some(identifier), Some(password), metadata, self.auto_confirm);
        let user = state.accounts[&id].user.clone();
        let session = self.auto_confirm.then(|| self.issue(&mut state, id));
        Ok(SignUpOutcome { user, session })
    }

    async fn sign_up_anonymous(&self, metadata: &Metadata) -> Result<Session, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let id = Self::create_account(&mut state, None, None, metadata, true);
        Ok(self.issue(&mut state, id))
    }

    async fn sign_in_with_password(&self, identifier: &Identifier, password: &str) -> Result<Session, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let invalid = || AuthError::InvalidCredentials("Invalid login credentials".to_owned());
        let id = state.by_identifier.get(identifier.as_str()).copied().ok_or_else(invalid)?;
        let account = &state.accounts[&id];
        if account.password.as_deref() != Some(password) {
            return Err(invalid());
        }
        if !account.confirmed {
            return Err(AuthError::UnconfirmedAccount("Email not confirmed".to_owned()));
        }
        Ok(self.issue(&mut state, id))
    }

    async fn send_otp(&self, phone: &str) -> Result<(), AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        if !state.by_identifier.contains_key(phone) {
            Self::create_account(&mut state, Some(&Identifier::Phone(phone.to_owned())), None, &Metadata::new(), true);
        }
        state.pending_otp.insert(phone.to_owned(), OTP_CODE.to_owned());
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        if state.pending_otp.get(phone).map(String::as_str) != Some(code) {
            return Err(AuthError::InvalidCredentials("Token has expired or is invalid".to_owned()));
        }
        state.pending_otp.remove(phone);
        let id = state.by_identifier[phone];
        Ok(self.issue(&mut state, id))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid Refresh Token: Refresh Token Not Found".to_owned()))?;
        state.access_tokens.retain(|_, owner| *owner != id);
        Ok(self.issue(&mut state, id))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        if let Some(id) = state.access_tokens.remove(access_token) {
            state.refresh_tokens.retain(|_, owner| *owner != id);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let state = self.state.lock().unwrap();
        let id = state
            .access_tokens
            .get(access_token)
            .ok_or_else(|| AuthError::Misconfiguration("invalid JWT".to_owned()))?;
        Ok(state.accounts[id].user.clone())
    }

    async fn recover_password(&self, email: &str, _redirect_to: Option<&str>) -> Result<(), AuthError> {
        self.enter().map_err(AuthError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        if !state.by_identifier.contains_key(email) {
            return Err(AuthError::Rejected { status: 404, code: Some("user_not_found".to_owned()), message: "User not found".to_owned() });
        }
        state.recoveries.push(email.to_owned());
        Ok(())
    }

    async fn select_todos(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Todo>, DataError> {
        self.enter().map_err(DataError::Unavailable)?;
        let state = self.state.lock().unwrap();
        let owner = Self::auth_user(&state, access_token)?;
        let row_security = *self.row_security.lock().unwrap();
        let mut rows: Vec<Todo> = state
            .todos
            .iter()
            .filter(|t| !row_security || (t.user_id == owner && t.user_id == user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_todo(&self, access_token: &str, todo: &NewTodo) -> Result<Todo, DataError> {
        self.enter().map_err(DataError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let owner = Self::auth_user(&state, access_token)?;
        if owner != todo.user_id {
            return Err(DataError::Rejected {
                status: 403,
                code: Some("42501".to_owned()),
                message: "new row violates row-level security policy for table \"todos\"".to_owned(),
            });
        }
        Ok(self.push_todo(&mut state, owner, &todo.title))
    }

    async fn update_todo(
        &self,
        access_token: &str,
        id: i64,
        user_id: Uuid,
        completed: bool,
    ) -> Result<Vec<Todo>, DataError> {
        self.enter().map_err(DataError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let owner = Self::auth_user(&state, access_token)?;
        let mut updated = Vec::new();
        for todo in state.todos.iter_mut().filter(|t| t.id == id && t.user_id == user_id && t.user_id == owner) {
            todo.completed = completed;
            updated.push(todo.clone());
        }
        Ok(updated)
    }

    async fn delete_todo(&self, access_token: &str, id: i64, user_id: Uuid) -> Result<Vec<Todo>, DataError> {
        self.enter().map_err(DataError::Unavailable)?;
        let mut state = self.state.lock().unwrap();
        let owner = Self::auth_user(&state, access_token)?;
        let (deleted, kept): (Vec<Todo>, Vec<Todo>) = std::mem::take(&mut state.todos)
            .into_iter()
            .partition(|t| t.id == id && t.user_id == user_id && t.user_id == owner);
        state.todos = kept;
        Ok(deleted)
    }
}
