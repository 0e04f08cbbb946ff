//! Snapshot source and credential provider seams.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use progress_core::{QueueSnapshot, SessionCredential, SnapshotError};

/// Result type for snapshot fetches.
pub type SnapshotResult = Result<QueueSnapshot, SnapshotError>;

/// Future type for async snapshot fetches.
pub type SnapshotFuture = Pin<Box<dyn Future<Output = SnapshotResult> + Send>>;

/// Produces one point-in-time snapshot of the client's queue session.
///
/// Implement this over the real transport. Failures should be reported as
/// [`SnapshotError::Auth`] when the credential was rejected and
/// [`SnapshotError::Transport`] for everything else.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetch a snapshot on behalf of `credential`.
    fn fetch(&self, credential: &SessionCredential) -> SnapshotFuture;
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for Arc<T> {
    fn fetch(&self, credential: &SessionCredential) -> SnapshotFuture {
        (**self).fetch(credential)
    }
}

/// A simple function-based snapshot source.
pub struct FnSource<F>
where
    F: Fn(&SessionCredential) -> SnapshotFuture + Send + Sync + 'static,
{
    fetcher: F,
}

impl<F> FnSource<F>
where
    F: Fn(&SessionCredential) -> SnapshotFuture + Send + Sync + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F> SnapshotSource for FnSource<F>
where
    F: Fn(&SessionCredential) -> SnapshotFuture + Send + Sync + 'static,
{
    fn fetch(&self, credential: &SessionCredential) -> SnapshotFuture {
        (self.fetcher)(credential)
    }
}

/// Supplies the credential for each fetch attempt. `None` means "not logged in".
pub trait CredentialProvider: Send + Sync + 'static {
    fn credential(&self) -> Option<SessionCredential>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    fn credential(&self) -> Option<SessionCredential> {
        (**self).credential()
    }
}

/// Credential slot that the auth layer can fill and clear at runtime.
#[derive(Debug, Default)]
pub struct SharedCredential {
    current: RwLock<Option<SessionCredential>>,
}

impl SharedCredential {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot holding `credential`.
    pub fn with(credential: SessionCredential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }

    pub fn set(&self, credential: SessionCredential) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialProvider for SharedCredential {
    fn credential(&self) -> Option<SessionCredential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
