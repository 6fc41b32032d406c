//! Site session: the client-side state machine for one encrypted site
//!
//! Lifecycle: `Uninitialized → Loading → {New, Locked, Unlocked}`, with
//! `Saving`/`Deleting` excursions that return to a settled state. All
//! mutating operations take `&mut self`, so two operations can never
//! overlap on the same session; hosts that share a session across tasks
//! must funnel calls through a single owner.
//!
//! The session never talks to a user directly. Flows that need input are
//! split at the point where input is required: `reload` reports
//! [`ReloadOutcome::UnsavedEdits`] until the host confirms the discard,
//! `save` reports [`SaveOutcome::PasswordRequired`] until the host supplies
//! a password, and `delete` takes the re-entered password up front. The
//! host is expected to run its are-you-sure dialog before calling `delete`
//! and to apply any grace delay after it.
//!
//! Observer notifications fire only after the session's own fields are
//! fully updated, never mid-mutation.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use sealpad_core::types::{
    ApiStatus, DeleteSiteRequest, SaveSiteRequest, CONFLICT_MESSAGE_MARKER, EXPECTED_DB_VERSION,
};
use sealpad_core::{SealpadError, SealpadResult};
use sealpad_crypto::envelope::{self, DecryptError, Envelope};
use sealpad_crypto::{compute_token, site_fingerprint, SitePassword, DEFAULT_KDF_ITERATIONS};

use crate::remote::RemoteStore;

/// Capabilities the hosting editor supplies to the session.
///
/// Injected at construction; the session holds no ambient references to
/// its surroundings.
pub trait EditorHost: Send + Sync {
    /// Current editor buffer, joined into the single stored blob.
    fn content(&self) -> String;
    /// Replace the editor buffer after a reload, login, or delete.
    fn set_content(&self, content: &str);
    /// Give the editor focus once content is in place.
    fn focus(&self);
}

/// Host backed by a plain in-memory buffer, for headless clients and tests.
#[derive(Default)]
pub struct BufferHost {
    buffer: Mutex<String>,
}

impl BufferHost {
    pub fn replace(&self, content: &str) {
        *self.buffer.lock().unwrap_or_else(|e| e.into_inner()) = content.to_string();
    }

    pub fn snapshot(&self) -> String {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EditorHost for BufferHost {
    fn content(&self) -> String {
        self.snapshot()
    }

    fn set_content(&self, content: &str) {
        self.replace(content);
    }

    fn focus(&self) {}
}

/// Lifecycle notifications published by the session.
///
/// Each callback runs synchronously on the session's thread of control
/// after the corresponding state change has landed.
pub trait SessionObserver: Send + Sync {
    fn on_dirty_changed(&self, _dirty: bool) {}
    fn on_status_changed(&self, _status: SessionStatus) {}
    fn on_saved(&self, _token: &str) {}
    fn on_login_result(&self, _success: bool) {}
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    /// No content stored remotely; no password required.
    New,
    /// Remote content exists but no supplied password decrypts it yet.
    Locked,
    Unlocked,
    Saving,
    Deleting,
}

/// What a `reload` (or `init`) settled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Local edits are pending; nothing was discarded or fetched. Confirm
    /// with the user, then call `reload(true)`.
    UnsavedEdits,
    /// The site has no remote content; the session is unlocked and empty.
    Empty,
    /// A link-carried or remembered password decrypted the content.
    Unlocked,
    /// Remote content exists; call `login` with a user-supplied password.
    PasswordRequired,
}

/// What a `save` settled into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { token: String },
    /// No non-empty password is established; prompt (twice, matching) and
    /// call `save` again with the override.
    PasswordRequired,
}

/// Local cache of what the client believes the server holds.
///
/// Mutated only after a successful round trip, never speculatively.
#[derive(Debug, Clone, Default)]
struct RemoteMirror {
    is_new: bool,
    envelope: Option<Envelope>,
    current_token: Option<String>,
}

pub struct SiteSession<R: RemoteStore> {
    remote: R,
    host: Arc<dyn EditorHost>,
    observer: Box<dyn SessionObserver>,

    site_id: String,
    fingerprint: String,
    /// Password carried in a share link, tried silently before prompting.
    /// Deliberate tradeoff: anyone holding the full link can read the site.
    link_password: Option<SitePassword>,

    content: String,
    password: Option<SitePassword>,
    /// Token the client last confirmed matches the server; the precondition
    /// for the next conditional write or delete.
    baseline_token: Option<String>,
    dirty: bool,
    status: SessionStatus,

    db_version: u32,
    expected_db_version: u32,
    kdf_iterations: u32,

    mirror: RemoteMirror,
    /// Whether the very first fetch observed a site with no content. Fixed
    /// after `init`, even once the site gains content.
    initially_new: Option<bool>,
}

impl<R: RemoteStore> SiteSession<R> {
    pub fn new(
        remote: R,
        host: Arc<dyn EditorHost>,
        observer: Box<dyn SessionObserver>,
        site_id: impl Into<String>,
        link_password: Option<SitePassword>,
    ) -> Self {
        Self {
            remote,
            host,
            observer,
            site_id: site_id.into(),
            fingerprint: String::new(),
            link_password,
            content: String::new(),
            password: None,
            baseline_token: None,
            dirty: false,
            status: SessionStatus::Uninitialized,
            db_version: EXPECTED_DB_VERSION,
            expected_db_version: EXPECTED_DB_VERSION,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            mirror: RemoteMirror::default(),
            initially_new: None,
        }
    }

    /// Override the KDF iteration count (e.g. from config). Both sides of a
    /// site must use the same count for envelopes to stay decryptable.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the server currently holds no content for this site.
    pub fn is_new(&self) -> bool {
        self.mirror.is_new
    }

    /// Whether the very first fetch observed an empty site.
    pub fn was_initially_new(&self) -> bool {
        self.initially_new.unwrap_or(true)
    }

    pub fn baseline_token(&self) -> Option<&str> {
        self.baseline_token.as_deref()
    }

    /// True when the stored content predates the schema version this client
    /// writes; a re-save migrates it.
    pub fn needs_schema_upgrade(&self) -> bool {
        !self.mirror.is_new && self.db_version != self.expected_db_version
    }

    /// Record that the host's buffer diverged from the last saved state.
    pub fn mark_edited(&mut self) {
        self.set_dirty(true);
    }

    // ── Operations ────────────────────────────────────────────────────────

    /// First load: computes the site fingerprint, fetches server truth, and
    /// records whether the site started out empty.
    pub async fn init(&mut self) -> SealpadResult<ReloadOutcome> {
        self.fingerprint = site_fingerprint(&self.site_id);
        let outcome = self.reload(true).await?;
        if self.initially_new.is_none() {
            self.initially_new = Some(self.mirror.is_new);
        }
        Ok(outcome)
    }

    /// Re-fetch server truth, discarding local edits.
    ///
    /// When edits are pending and `discard_unsaved` is false, returns
    /// [`ReloadOutcome::UnsavedEdits`] without touching anything; the host
    /// confirms with the user and calls again with `true`.
    pub async fn reload(&mut self, discard_unsaved: bool) -> SealpadResult<ReloadOutcome> {
        if self.dirty && !discard_unsaved {
            return Ok(ReloadOutcome::UnsavedEdits);
        }

        let prev = self.status;
        self.set_status(SessionStatus::Loading);

        let resp = match self.remote.fetch_site(&self.site_id).await {
            Ok(resp) => resp,
            Err(e) => {
                self.set_status(prev);
                return Err(e);
            }
        };
        if resp.status != ApiStatus::Success {
            self.set_status(prev);
            return Err(SealpadError::Transport("server reported fetch failure".into()));
        }

        let stored = resp.e_content.as_deref().filter(|s| !s.is_empty());
        let envelope = match stored {
            Some(raw) if !resp.is_new => match raw.parse::<Envelope>() {
                Ok(env) => Some(env),
                Err(e) => {
                    warn!(site = %self.site_id, error = %e, "server returned an unparseable envelope");
                    self.set_status(prev);
                    return Err(SealpadError::MalformedData(e.to_string()));
                }
            },
            _ => None,
        };

        self.db_version = resp.current_db_version;
        self.expected_db_version = resp.expected_db_version;
        self.mirror = RemoteMirror {
            is_new: envelope.is_none(),
            envelope,
            current_token: resp.current_hash_content.clone(),
        };
        self.baseline_token = if self.mirror.is_new {
            None
        } else {
            resp.current_hash_content
        };
        self.set_dirty(false);

        if self.mirror.is_new {
            self.content.clear();
            self.password = None;
            self.host.set_content("");
            self.host.focus();
            self.set_status(SessionStatus::New);
            debug!(site = %self.site_id, "reloaded empty site");
            return Ok(ReloadOutcome::Empty);
        }

        // A link-carried password is tried first, then the remembered one.
        // Both are trusted only insofar as they still decrypt current
        // server content, which handles out-of-band password changes.
        if let Some(link) = self.link_password.clone() {
            if self.try_unlock(link) {
                debug!(site = %self.site_id, "unlocked via link password");
                return Ok(ReloadOutcome::Unlocked);
            }
        }
        if let Some(remembered) = self.password.clone() {
            if self.try_unlock(remembered) {
                debug!(site = %self.site_id, "unlocked via remembered password");
                return Ok(ReloadOutcome::Unlocked);
            }
        }

        self.set_status(SessionStatus::Locked);
        Ok(ReloadOutcome::PasswordRequired)
    }

    /// The sole authentication gate: a candidate password is correct exactly
    /// when it decrypts the stored envelope and the plaintext carries the
    /// site fingerprint as its suffix.
    ///
    /// On success adopts content and password; on failure leaves every field
    /// untouched. Emits `on_login_result` either way.
    pub fn login(&mut self, candidate: SitePassword) -> bool {
        let success = self.try_unlock(candidate);
        self.observer.on_login_result(success);
        success
    }

    /// Encrypt the host's current content and submit it as a conditional
    /// write against the baseline token.
    ///
    /// A conflict means someone else saved since our last reload; the only
    /// remediation is an explicit `reload`, since the client cannot know
    /// which version should win. On
    /// transport failure the in-memory edits are kept, so retrying `save`
    /// later is safe and loses nothing.
    pub async fn save(&mut self, password_override: Option<SitePassword>) -> SealpadResult<SaveOutcome> {
        let password = match password_override.or_else(|| self.password.clone()) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(SaveOutcome::PasswordRequired),
        };

        let prev = self.status;
        self.set_status(SessionStatus::Saving);
        self.content = self.host.content();

        let new_token = compute_token(&self.content, &password, self.expected_db_version);
        let sealed = format!("{}{}", self.content, self.fingerprint);
        let envelope = match envelope::encrypt_with(&sealed, &password, self.kdf_iterations) {
            Ok(env) => env,
            Err(e) => {
                self.set_status(prev);
                return Err(e.into());
            }
        };

        let request = SaveSiteRequest {
            site: self.site_id.clone(),
            init_hash_content: self.baseline_token.clone(),
            current_hash_content: new_token.clone(),
            encrypted_content: envelope.to_string(),
        };
        let resp = match self.remote.save_site(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                // Edits stay in memory; the caller may retry.
                self.set_status(prev);
                return Err(e);
            }
        };

        match resp.status {
            ApiStatus::Success => {
                let token = resp.current_hash_content.unwrap_or(new_token);
                self.password = Some(password);
                self.baseline_token = Some(token.clone());
                self.db_version = self.expected_db_version;
                self.mirror = RemoteMirror {
                    is_new: false,
                    envelope: Some(envelope),
                    current_token: Some(token.clone()),
                };
                self.set_dirty(false);
                self.set_status(SessionStatus::Unlocked);
                self.observer.on_saved(&token);
                info!(site = %self.site_id, "saved");
                Ok(SaveOutcome::Saved { token })
            }
            ApiStatus::Error => {
                self.set_status(prev);
                let message = resp.message.unwrap_or_else(|| "save rejected".into());
                if message.contains(CONFLICT_MESSAGE_MARKER) {
                    warn!(site = %self.site_id, "save conflict: server content changed");
                    Err(SealpadError::Conflict(message))
                } else {
                    Err(SealpadError::Transport(message))
                }
            }
        }
    }

    /// Delete the site after re-verifying the entered password.
    ///
    /// The host runs its are-you-sure confirmation before calling this; the
    /// password check happens here, before any transport call. For a
    /// never-saved site the check is local (nothing remote to authenticate
    /// against) and the reset is local too.
    pub async fn delete(&mut self, entered: SitePassword) -> SealpadResult<()> {
        if !self.delete_password_ok(&entered) {
            return Err(SealpadError::Authentication);
        }

        if self.mirror.is_new {
            self.reset_to_new();
            debug!(site = %self.site_id, "discarded never-saved site");
            return Ok(());
        }

        let prev = self.status;
        self.set_status(SessionStatus::Deleting);
        let request = DeleteSiteRequest {
            site: self.site_id.clone(),
            init_hash_content: self.baseline_token.clone(),
        };
        let resp = match self.remote.delete_site(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                self.set_status(prev);
                return Err(e);
            }
        };

        match resp.status {
            ApiStatus::Success => {
                self.reset_to_new();
                info!(site = %self.site_id, "deleted");
                Ok(())
            }
            ApiStatus::Error => {
                self.set_status(prev);
                let message = resp.message.unwrap_or_else(|| "delete rejected".into());
                if message.contains(CONFLICT_MESSAGE_MARKER) {
                    warn!(site = %self.site_id, "delete conflict: server content changed");
                    Err(SealpadError::Conflict(message))
                } else {
                    Err(SealpadError::Transport(message))
                }
            }
        }
    }

    /// Whether an entered password authorizes deletion. Never touches the
    /// network and never mutates state.
    pub fn delete_password_ok(&self, entered: &SitePassword) -> bool {
        if self.mirror.is_new {
            // Nothing on the server to authenticate against; the entered
            // password only needs to match the locally set one, if any.
            self.password
                .as_ref()
                .map_or(true, |p| p.expose() == entered.expose())
        } else {
            self.decrypt_remote(entered).is_some()
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Decrypt the mirrored envelope and enforce the fingerprint gate.
    ///
    /// Returns the content with the fingerprint stripped, or None on any
    /// failure. The fingerprint must match as an exact suffix; anything
    /// weaker would accept plaintext written for another site.
    fn decrypt_remote(&self, candidate: &SitePassword) -> Option<String> {
        let env = self.mirror.envelope.as_ref()?;
        match envelope::decrypt_with(env, candidate, self.kdf_iterations) {
            Ok(plain) => match plain.strip_suffix(self.fingerprint.as_str()) {
                Some(body) if !self.fingerprint.is_empty() => Some(body.to_string()),
                _ => {
                    warn!(site = %self.site_id, "decrypted payload failed the fingerprint check");
                    None
                }
            },
            Err(DecryptError::Malformed(e)) => {
                warn!(site = %self.site_id, error = %e, "stored envelope is malformed");
                None
            }
            Err(DecryptError::Authentication) => None,
        }
    }

    fn try_unlock(&mut self, candidate: SitePassword) -> bool {
        match self.decrypt_remote(&candidate) {
            Some(body) => {
                self.content = body;
                self.password = Some(candidate);
                self.set_dirty(false);
                self.host.set_content(&self.content);
                self.host.focus();
                self.set_status(SessionStatus::Unlocked);
                true
            }
            None => false,
        }
    }

    /// Reset every local field to the never-saved shape. The initially-new
    /// flag is the one thing that survives.
    fn reset_to_new(&mut self) {
        self.content.clear();
        self.password = None;
        self.link_password = None;
        self.baseline_token = None;
        self.db_version = self.expected_db_version;
        self.mirror = RemoteMirror {
            is_new: true,
            envelope: None,
            current_token: None,
        };
        self.set_dirty(false);
        self.host.set_content("");
        self.set_status(SessionStatus::New);
    }

    fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.observer.on_dirty_changed(dirty);
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            self.status = status;
            self.observer.on_status_changed(status);
        }
    }
}
