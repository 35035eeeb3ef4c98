//! Serialized access to one session from many tasks.

use crate::models::{DiscardResult, ExitResult, ManagedObject, MessageResult, Task, TaskId};
use crate::session::Session;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Cloneable handle that runs every call on the wrapped [`Session`] one at a time.
///
/// The lock is held for the whole call, including the task wait inside
/// [`publish`](Self::publish), so an invoke issued meanwhile only reaches the server after the
/// publish has finished.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    /// Wrap a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// See [`Session::invoke`].
    pub async fn invoke<P, R>(&self, action: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.inner.lock().await.invoke(action, payload).await
    }

    /// See [`Session::publish`].
    pub async fn publish(&self) -> Result<()> {
        self.inner.lock().await.publish().await
    }

    /// See [`Session::discard`].
    pub async fn discard(&self) -> Result<DiscardResult> {
        self.inner.lock().await.discard().await
    }

    /// See [`Session::exit`].
    pub async fn exit(&self) -> Result<ExitResult> {
        self.inner.lock().await.exit().await
    }

    /// See [`Session::await_task`].
    pub async fn await_task(&self, task_id: &str) -> Result<Task> {
        self.inner.lock().await.await_task(task_id).await
    }

    /// See [`Session::await_task_with_cancel`].
    pub async fn await_task_with_cancel(
        &self,
        task_id: &str,
        token: &CancellationToken,
    ) -> Result<Task> {
        self.inner
            .lock()
            .await
            .await_task_with_cancel(task_id, token)
            .await
    }

    /// See [`Session::submit_task`].
    pub async fn submit_task<P>(&self, action: &str, payload: &P) -> Result<TaskId>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.submit_task(action, payload).await
    }

    /// See [`Session::run_task`].
    pub async fn run_task<P>(&self, action: &str, payload: &P) -> Result<Task>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.run_task(action, payload).await
    }

    /// See [`Session::add_object`].
    pub async fn add_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.add_object(kind, payload).await
    }

    /// See [`Session::show_object`].
    pub async fn show_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.show_object(kind, payload).await
    }

    /// See [`Session::set_object`].
    pub async fn set_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.set_object(kind, payload).await
    }

    /// See [`Session::delete_object`].
    pub async fn delete_object<P>(&self, kind: &str, payload: &P) -> Result<MessageResult>
    where
        P: Serialize + ?Sized,
    {
        self.inner.lock().await.delete_object(kind, payload).await
    }

    /// See [`Session::wait`]. Other calls on this handle wait until the delay has passed.
    pub async fn wait(&self) {
        self.inner.lock().await.wait().await;
    }

    /// See [`Session::is_published`].
    pub async fn is_published(&self) -> bool {
        self.inner.lock().await.is_published()
    }

    /// Session token of the wrapped session.
    pub async fn id(&self) -> String {
        self.inner.lock().await.id().to_string()
    }

    /// Unwrap the session when this is the last handle.
    ///
    /// # Errors
    ///
    /// Returns the handle unchanged while other clones are alive.
    pub fn into_inner(self) -> std::result::Result<Session, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
