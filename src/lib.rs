//! supadash: session and data access for a todo app on a hosted
//! Postgres + auth service.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages and commands get a [`Client`] from a [`ClientProvider`] and call
//! typed operations on it: sign-up, sign-in (password, anonymous, phone
//! code), sign-out, current user, and create/list/update/delete of the
//! signed-in user's todos. The client owns the session and talks to the
//! service through the [`backend::Backend`] seam.

pub mod admin;
pub mod backend;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod navigation;
pub mod provider;
pub mod session;
pub mod types;
pub mod validation;

pub use client::Client;
pub use config::BackendConfig;
pub use error::{AuthError, DataError, ErrorKind};
pub use provider::{ClientProvider, ClientScope};
pub use session::{AuthEvent, FileStore, MemoryStore, SessionStore, Subscription};
pub use types::{Identifier, Metadata, NewTodo, Session, SignUpOutcome, Todo, User};
