//! Authenticated, transactional session.
//!
//! Changes made through a [`Session`] stay pending on the server until [`Session::publish`]
//! commits them. A session discarded without a prior publish leaves no persisted effect.
//!
//! # Concurrency
//!
//! [`Session::invoke`] takes `&self`, so independent calls may run concurrently on one
//! session; the server decides how their effects are ordered. Lifecycle calls that change
//! local state take `&mut self`. Wrap the session in a
//! [`SharedSession`](crate::SharedSession) to serialize every call.

use crate::models::{
    DiscardResult, ExitResult, LoginResponse, ManagedObject, MessageResult, Task, TaskCollection,
    TaskId,
};
use crate::task::{Clock, PollSettings};
use crate::transport::Transport;
use crate::Result;
use chkp_core::random::{jitter, DEFAULT_WAIT_MAX_SECS};
use chkp_core::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One logged-in session on a management server.
pub struct Session {
    id: String,
    published: bool,
    info: Option<LoginResponse>,
    transport: Arc<Transport>,
    clock: Arc<dyn Clock>,
    poll: PollSettings,
}

impl Session {
    pub(crate) fn new(
        id: String,
        info: Option<LoginResponse>,
        transport: Arc<Transport>,
        clock: Arc<dyn Clock>,
        poll: PollSettings,
    ) -> Self {
        Self {
            id,
            published: false,
            info,
            transport,
            clock,
            poll,
        }
    }

    /// Session token sent in the session header.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true once [`publish`](Self::publish) has succeeded.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.published
    }

    /// Login metadata, absent for sessions attached with
    /// [`Connection::resume`](crate::Connection::resume).
    #[must_use]
    pub const fn info(&self) -> Option<&LoginResponse> {
        self.info.as_ref()
    }

    /// Task polling settings.
    #[must_use]
    pub const fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    /// Replace the clock used for polling and waiting.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the task polling settings.
    #[must_use]
    pub const fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Run `action` with `payload` in this session and decode the result.
    ///
    /// Nothing is retried; whether the action is idempotent is up to the server.
    pub async fn invoke<P, R>(&self, action: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.transport.execute(action, payload, Some(&self.id)).await
    }

    /// Commit every pending change of this session and wait for the publish task.
    pub async fn publish(&mut self) -> Result<()> {
        let task: TaskId = self.invoke("publish", &json!({})).await?;
        info!(task_id = %task.id, "Publish started");

        self.await_task(&task.id).await?;
        self.published = true;

        info!(task_id = %task.id, "Publish completed");
        Ok(())
    }

    /// Drop every pending change. The session stays valid.
    pub async fn discard(&self) -> Result<DiscardResult> {
        let result: DiscardResult = self.invoke("discard", &json!({})).await?;
        debug!(discarded = result.discarded, "Discarded pending changes");
        Ok(result)
    }

    /// Log out.
    ///
    /// The session must not be used afterwards; the server rejects later calls.
    pub async fn exit(&self) -> Result<ExitResult> {
        self.invoke("logout", &json!({})).await
    }

    /// Sleep for a random delay of up to ten seconds.
    ///
    /// Meant for backing off before retrying, e.g. after [`Error::ObjectLocked`].
    pub async fn wait(&self) {
        let delay = jitter(DEFAULT_WAIT_MAX_SECS);
        debug!(?delay, "Waiting before retry");
        self.clock.sleep(delay).await;
    }

    /// Fetch the task collection for `task_id`.
    ///
    /// An empty collection is reported as [`Error::NoTask`].
    pub async fn show_task(&self, task_id: &str) -> Result<TaskCollection> {
        let tasks: TaskCollection = self
            .invoke("show-task", &json!({ "task-id": task_id }))
            .await?;

        if tasks.tasks.is_empty() {
            return Err(Error::NoTask(task_id.to_string()));
        }

        Ok(tasks)
    }

    /// Poll `task_id` until it leaves the `in progress` state.
    ///
    /// Fails with [`Error::TaskTimeout`] once the polling ceiling has elapsed.
    pub async fn await_task(&self, task_id: &str) -> Result<Task> {
        self.poll_task(task_id, None).await
    }

    /// Like [`await_task`](Self::await_task), also stopping with [`Error::Cancelled`] when
    /// `token` is cancelled. No further poll is sent after that; the server-side task keeps
    /// running.
    pub async fn await_task_with_cancel(
        &self,
        task_id: &str,
        token: &CancellationToken,
    ) -> Result<Task> {
        self.poll_task(task_id, Some(token)).await
    }

    async fn poll_task(&self, task_id: &str, token: Option<&CancellationToken>) -> Result<Task> {
        let cancelled = || token.is_some_and(CancellationToken::is_cancelled);
        let started = self.clock.now();
        let mut task = self.first_task(task_id).await?;

        while !task.is_done() {
            if cancelled() {
                return Err(Error::Cancelled(format!("waiting for task {task_id}")));
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= self.poll.ceiling {
                return Err(Error::TaskTimeout(format!(
                    "task {task_id} still in progress after {elapsed:?}"
                )));
            }

            debug!(task_id = %task_id, progress = task.progress, "Task in progress");

            match token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {}
                        () = self.clock.sleep(self.poll.interval) => {}
                    }
                }
                None => self.clock.sleep(self.poll.interval).await,
            }

            // Cancellation may land while the sleep completes.
            if cancelled() {
                return Err(Error::Cancelled(format!("waiting for task {task_id}")));
            }

            task = self.first_task(task_id).await?;
        }

        Ok(task)
    }

    async fn first_task(&self, task_id: &str) -> Result<Task> {
        self.show_task(task_id)
            .await?
            .tasks
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoTask(task_id.to_string()))
    }

    /// Start a task-producing action and return its task handle.
    pub async fn submit_task<P>(&self, action: &str, payload: &P) -> Result<TaskId>
    where
        P: Serialize + ?Sized,
    {
        self.invoke(action, payload).await
    }

    /// Start a task-producing action, such as `install-policy`, and wait for it.
    pub async fn run_task<P>(&self, action: &str, payload: &P) -> Result<Task>
    where
        P: Serialize + ?Sized,
    {
        let task = self.submit_task(action, payload).await?;
        self.await_task(&task.id).await
    }

    /// Create an object of `kind` through `add-<kind>`.
    pub async fn add_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.invoke(&format!("add-{kind}"), payload).await
    }

    /// Read an object of `kind` through `show-<kind>`.
    pub async fn show_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.invoke(&format!("show-{kind}"), payload).await
    }

    /// Update an object of `kind` through `set-<kind>`.
    pub async fn set_object<P>(&self, kind: &str, payload: &P) -> Result<ManagedObject>
    where
        P: Serialize + ?Sized,
    {
        self.invoke(&format!("set-{kind}"), payload).await
    }

    /// Delete an object of `kind` through `delete-<kind>`.
    pub async fn delete_object<P>(&self, kind: &str, payload: &P) -> Result<MessageResult>
    where
        P: Serialize + ?Sized,
    {
        self.invoke(&format!("delete-{kind}"), payload).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &"<redacted>")
            .field("published", &self.published)
            .field("base_url", &self.transport.base_url().as_str())
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{MockClock, TokioClock};
    use chkp_core::client::ClientConfig;
    use chkp_core::ManagementConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_session(server: &MockServer, clock: MockClock, poll: PollSettings) -> Session {
        let addr = server.address();
        let config = ManagementConfig::new(addr.ip().to_string())
            .with_port(addr.port())
            .with_scheme("http");
        let transport = Transport::new(&config, &ClientConfig::new()).unwrap();
        Session::new(
            "sid-1".into(),
            None,
            Arc::new(transport),
            Arc::new(clock),
            poll,
        )
    }

    fn fixed_clock() -> MockClock {
        let now = Instant::now();
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || now);
        clock
    }

    fn task_body(status: &str) -> serde_json::Value {
        json!({
            "tasks": [{
                "task-name": "Publish operation",
                "task-id": "t1",
                "progress-percentage": if status == "in progress" { 50 } else { 100 },
                "status": status,
                "suppressed": false
            }]
        })
    }

    async fn mount_task_sequence(server: &MockServer, in_progress_polls: u64, final_status: &str) {
        if in_progress_polls > 0 {
            Mock::given(method("POST"))
                .and(path("/web_api/show-task"))
                .and(body_json(json!({"task-id": "t1"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(task_body("in progress")))
                .up_to_n_times(in_progress_polls)
                .mount(server)
                .await;
        }

        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_body(final_status)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn await_task_returns_once_done() {
        let server = MockServer::start().await;
        mount_task_sequence(&server, 3, "succeeded").await;

        let mut clock = fixed_clock();
        clock
            .expect_sleep()
            .withf(|duration| *duration == Duration::from_millis(500))
            .times(3)
            .returning(|_| ());

        let session = test_session(&server, clock, PollSettings::default());
        let task = session.await_task("t1").await.unwrap();
        assert_eq!(task.status, "succeeded");
        assert_eq!(task.progress, 100);
    }

    #[tokio::test]
    async fn await_task_done_on_first_poll_never_sleeps() {
        let server = MockServer::start().await;
        mount_task_sequence(&server, 0, "failed").await;

        let mut clock = fixed_clock();
        clock.expect_sleep().never();

        let session = test_session(&server, clock, PollSettings::default());
        let task = session.await_task("t1").await.unwrap();
        assert!(task.is_done());
    }

    #[tokio::test]
    async fn await_task_times_out_after_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_body("in progress")))
            .mount(&server)
            .await;

        let start = Instant::now();
        let ticks = Arc::new(AtomicU32::new(0));
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || {
            start + Duration::from_millis(100) * ticks.fetch_add(1, Ordering::SeqCst)
        });
        clock.expect_sleep().returning(|_| ());

        let poll = PollSettings::new()
            .with_interval(Duration::from_millis(100))
            .with_ceiling(Duration::from_secs(1));
        let session = test_session(&server, clock, poll);

        let err = session.await_task("t1").await.unwrap_err();
        assert!(matches!(err, Error::TaskTimeout(_)), "unexpected {err:?}");

        let polls = server.received_requests().await.unwrap().len();
        assert!(polls <= 11, "polled {polls} times");
    }

    #[tokio::test]
    async fn await_task_without_tasks_is_no_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": []})))
            .mount(&server)
            .await;

        let mut clock = fixed_clock();
        clock.expect_sleep().never();

        let session = test_session(&server, clock, PollSettings::default());
        let err = session.await_task("t1").await.unwrap_err();
        assert_eq!(err, Error::NoTask("t1".into()));
    }

    #[tokio::test]
    async fn await_task_with_cancel_stops_polling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_body("in progress")))
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let trigger = token.clone();
        let mut clock = fixed_clock();
        clock.expect_sleep().times(1).returning(move |_| trigger.cancel());

        let session = test_session(&server, clock, PollSettings::default());
        let err = session
            .await_task_with_cancel("t1", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn await_task_with_cancelled_token_never_sleeps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_body("in progress")))
            .expect(1)
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        token.cancel();
        let mut clock = fixed_clock();
        clock.expect_sleep().never();

        let session = test_session(&server, clock, PollSettings::default());
        let err = session
            .await_task_with_cancel("t1", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn cancel_interrupts_a_running_sleep() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_body("in progress")))
            .expect(1)
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let poll = PollSettings::new().with_interval(Duration::from_secs(60));
        let session =
            test_session(&server, fixed_clock(), poll).with_clock(Arc::new(TokioClock));
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            session.await_task_with_cancel("t1", &token),
        )
        .await
        .expect("cancel did not interrupt the sleep")
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn publish_marks_session_published() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/publish"))
            .and(header("X-chkp-sid", "sid-1"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task-id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_task_sequence(&server, 2, "succeeded").await;

        let mut clock = fixed_clock();
        clock.expect_sleep().times(2).returning(|_| ());

        let mut session = test_session(&server, clock, PollSettings::default());
        assert!(!session.is_published());
        session.publish().await.unwrap();
        assert!(session.is_published());
    }

    #[tokio::test]
    async fn failed_publish_leaves_flag_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/publish"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "generic_error",
                "message": "Rule 7 is locked by another session."
            })))
            .mount(&server)
            .await;

        let mut session = test_session(&server, fixed_clock(), PollSettings::default());
        let err = session.publish().await.unwrap_err();
        assert!(err.is_lock_contention());
        assert!(!session.is_published());
    }

    #[tokio::test]
    async fn invoke_classifies_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/show-host"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"code": "generic_err_object_not_found"})),
            )
            .mount(&server)
            .await;

        let session = test_session(&server, fixed_clock(), PollSettings::default());
        let err = session
            .show_object("host", &json!({"name": "missing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn invoke_keeps_unrelated_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/add-host"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "generic_err_invalid_parameter",
                "message": "Invalid parameter for [ip-address]"
            })))
            .mount(&server)
            .await;

        let session = test_session(&server, fixed_clock(), PollSettings::default());
        let err = session
            .add_object("host", &json!({"name": "h1", "ip-address": "bogus"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.server_message(),
            Some("Invalid parameter for [ip-address]")
        );
        assert_eq!(err.failure().map(|f| f.status_code), Some(400));
    }

    #[tokio::test]
    async fn discard_and_exit_decode_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/discard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "OK",
                "number-of-discarded-changes": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/web_api/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "OK"})))
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(&server, fixed_clock(), PollSettings::default());
        let discarded = session.discard().await.unwrap();
        assert_eq!(discarded.discarded, 2);
        assert!(!session.is_published());

        let exit = session.exit().await.unwrap();
        assert_eq!(exit.message, "OK");
    }

    #[tokio::test]
    async fn run_task_submits_and_waits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web_api/install-policy"))
            .and(body_json(json!({"policy-package": "standard", "targets": ["gw1"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task-id": "t1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_task_sequence(&server, 1, "succeeded").await;

        let mut clock = fixed_clock();
        clock.expect_sleep().times(1).returning(|_| ());

        let session = test_session(&server, clock, PollSettings::default());
        let task = session
            .run_task(
                "install-policy",
                &json!({"policy-package": "standard", "targets": ["gw1"]}),
            )
            .await
            .unwrap();
        assert_eq!(task.id, "t1");
    }

    #[tokio::test]
    async fn wait_sleeps_a_bounded_delay() {
        let server = MockServer::start().await;
        let mut clock = fixed_clock();
        clock
            .expect_sleep()
            .withf(|duration| *duration <= Duration::from_secs(10))
            .times(1)
            .returning(|_| ());

        let session = test_session(&server, clock, PollSettings::default());
        session.wait().await;
    }

    #[test]
    fn debug_redacts_session_id() {
        let config = ManagementConfig::new("mgmt.example.com");
        let transport = Transport::new(&config, &ClientConfig::new()).unwrap();
        let session = Session::new(
            "secret-sid".into(),
            None,
            Arc::new(transport),
            Arc::new(MockClock::new()),
            PollSettings::default(),
        );
        assert!(!format!("{session:?}").contains("secret-sid"));
    }
}
