//! Session lifecycle.
//!
//! A [`Session`] is one isolated browser, owned by exactly one test case. It is
//! acquired from a [`SessionFactory`] before the case body runs and released
//! with [`Session::close`] afterwards, whatever the body returned.
//! `close` consumes the session, so a released handle cannot be reused.

use crate::driver::BrowserDriver;
use crate::error::FlowResult;
use crate::evidence::{self, EvidenceLog};
use async_trait::async_trait;
use std::future::Future;
use uuid::Uuid;

/// Source of fresh browser drivers
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Driver type produced by this factory
    type Driver: BrowserDriver;

    /// Launch a new isolated browser
    async fn launch(&self) -> FlowResult<Self::Driver>;
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Driver is live
    Open,
    /// Driver has been torn down
    Closed,
}

/// Live browser-control context for one test execution
#[derive(Debug)]
pub struct Session<D: BrowserDriver> {
    id: Uuid,
    driver: D,
    evidence: EvidenceLog,
    state: SessionState,
}

impl<D: BrowserDriver> Session<D> {
    /// Launch a driver from the factory and wrap it
    pub async fn open<F>(factory: &F) -> FlowResult<Self>
    where
        F: SessionFactory<Driver = D> + ?Sized,
    {
        let driver = factory.launch().await?;
        let session = Self::from_driver(driver);
        tracing::debug!(session = %session.id, "session opened");
        Ok(session)
    }

    /// Wrap an already launched driver
    #[must_use]
    pub fn from_driver(driver: D) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver,
            evidence: EvidenceLog::new(),
            state: SessionState::Open,
        }
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Evidence captured so far
    #[must_use]
    pub const fn evidence(&self) -> &EvidenceLog {
        &self.evidence
    }

    /// Mutable evidence log
    pub fn evidence_mut(&mut self) -> &mut EvidenceLog {
        &mut self.evidence
    }

    /// Capture the viewport as evidence; never fails
    pub async fn capture(&mut self, name: &str) -> bool {
        evidence::capture(&self.driver, &mut self.evidence, name).await
    }

    /// Tear down the driver
    pub async fn close(mut self) -> FlowResult<()> {
        self.state = SessionState::Closed;
        let result = self.driver.close().await;
        match &result {
            Ok(()) => tracing::debug!(session = %self.id, "session closed"),
            Err(e) => tracing::warn!(session = %self.id, error = %e, "session teardown failed"),
        }
        result
    }
}

/// Run `body` against a fresh session and close it afterwards
///
/// The body takes the session by value and hands it back with its result, so
/// teardown happens whatever the body returned. A body error wins over a
/// teardown error; a teardown error after a successful body is returned.
pub async fn run_in_session<F, B, Fut, T>(factory: &F, body: B) -> FlowResult<T>
where
    F: SessionFactory + ?Sized,
    B: FnOnce(Session<F::Driver>) -> Fut,
    Fut: Future<Output = (Session<F::Driver>, FlowResult<T>)>,
{
    let session = Session::open(factory).await?;
    let (session, result) = body(session).await;
    let teardown = session.close().await;
    match (result, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), _) => Err(e),
    }
}

impl<D: BrowserDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            tracing::warn!(session = %self.id, "session dropped without close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockFactory};
    use crate::error::FlowError;

    #[tokio::test]
    async fn test_open_and_close_once() {
        let factory = MockFactory::new(MockDriver::new());
        let session = Session::open(&factory).await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
        session.close().await.unwrap();

        let journal = factory.journal();
        assert_eq!(journal.count("launch"), 1);
        assert_eq!(journal.count("close"), 1);
    }

    #[tokio::test]
    async fn test_open_propagates_launch_failure() {
        let factory = MockFactory::new(MockDriver::new()).failing("chromium missing");
        let err = Session::open(&factory).await.unwrap_err();
        assert!(matches!(err, FlowError::BrowserLaunch { .. }));
    }

    #[tokio::test]
    async fn test_capture_goes_to_evidence() {
        let mut session = Session::from_driver(MockDriver::new());
        assert!(session.capture("website_opened").await);
        assert_eq!(session.evidence().attachments().len(), 1);
        assert_eq!(session.evidence_mut().take().len(), 1);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_in_session_closes_after_failure() {
        let factory = MockFactory::new(MockDriver::new());
        let result: FlowResult<()> = run_in_session(&factory, |session| async move {
            (session, Err(FlowError::session("body failed")))
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("body failed"));
        assert_eq!(factory.journal().count("close"), 1);
    }

    #[tokio::test]
    async fn test_run_in_session_reports_teardown_failure() {
        let factory = MockFactory::new(MockDriver::new());
        let result = run_in_session(&factory, |mut session| async move {
            // closing early makes the bracket's own close fail
            let early = session.driver_mut().close().await;
            (session, early.map(|()| 7))
        })
        .await;
        assert!(matches!(result, Err(FlowError::Session { .. })));
        assert_eq!(factory.journal().count("close"), 1);
    }

    #[tokio::test]
    async fn test_run_in_session_returns_value() {
        let factory = MockFactory::new(MockDriver::new().with_title("T"));
        let title = run_in_session(&factory, |session| async move {
            let title = session.driver().title().await;
            (session, title)
        })
        .await
        .unwrap();
        assert_eq!(title, "T");
        assert_eq!(factory.journal().count("launch"), 1);
    }

    #[tokio::test]
    async fn test_distinct_ids() {
        let a = Session::from_driver(MockDriver::new());
        let b = Session::from_driver(MockDriver::new());
        assert_ne!(a.id(), b.id());
        a.close().await.unwrap();
        b.close().await.unwrap();
    }
}
