//! sealpad-sync: encrypted-state synchronization against a remote store
//!
//! The [`session::SiteSession`] state machine sequences login, reload, save,
//! and delete for one site, keeping the optimistic-concurrency invariants:
//! a write only succeeds when the server's stored token still equals the
//! baseline the client last confirmed, and a conflict is reported to the
//! user rather than auto-merged or retried.

pub mod remote;
pub mod session;

pub use remote::{HttpRemoteStore, RemoteStore};
pub use session::{
    BufferHost, EditorHost, NoopObserver, ReloadOutcome, SaveOutcome, SessionObserver,
    SessionStatus, SiteSession,
};
