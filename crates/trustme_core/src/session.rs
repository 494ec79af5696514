//! crates/trustme_core/src/session.rs
//!
//! The analysis session controller: the state machine that drives one
//! submit-to-render cycle.
//!
//! `Idle -> Submitting -> Settling -> Succeeded | Failed`, re-entrant from any
//! terminal state. Every submission takes a new generation number and every
//! transition is applied only while that generation is still the newest one,
//! so a late settle timer can never overwrite a later submission's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::AnalysisRequest;
use crate::normalize::{normalize, Verdict};
use crate::ports::{AnalysisService, CredentialStore, PortResult};

//=========================================================================================
// Settings and State
//=========================================================================================

/// Pacing knobs for the session. None of them affect the fetched data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Artificial wait between the response arriving and it becoming visible.
    pub settle_delay: Duration,
    /// Wait after `Succeeded` before `revealed` flips (entrance animation hint).
    pub reveal_delay: Duration,
    /// Whether failures also wait out the settle delay before surfacing.
    pub settle_failures: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(15_000),
            reveal_delay: Duration::from_millis(100),
            settle_failures: true,
        }
    }
}

/// An enum representing where the current submission is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Submitting,
    Settling,
    Succeeded(Verdict),
    Failed(String),
}

impl SessionState {
    /// True while the submit control should stay disabled.
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Submitting | SessionState::Settling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded(_) | SessionState::Failed(_))
    }
}

/// What presenters observe.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Generation of the submission that produced this state. 0 before any submit.
    pub generation: u64,
    pub submission_id: Option<Uuid>,
    pub state: SessionState,
    pub revealed: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            submission_id: None,
            state: SessionState::Idle,
            revealed: false,
        }
    }
}

/// How a call to `submit` ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This submission produced the final observable state.
    Completed(SessionState),
    /// A newer submission started first; this one's result was dropped.
    Superseded,
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct SessionController {
    analysis: Arc<dyn AnalysisService>,
    credentials: Arc<dyn CredentialStore>,
    settings: SessionSettings,
    last_generation: AtomicU64,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    pub fn new(
        analysis: Arc<dyn AnalysisService>,
        credentials: Arc<dyn CredentialStore>,
        settings: SessionSettings,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            analysis,
            credentials,
            settings,
            last_generation: AtomicU64::new(0),
            state,
        }
    }

    /// The current state, cloned.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Runs one full submit cycle: dispatch, settle, publish.
    ///
    /// Exactly one request is sent per call. The future resolves once the
    /// outcome is visible (and revealed) or once a newer submission has
    /// taken over.
    pub async fn submit(&self, request: AnalysisRequest) -> SubmitOutcome {
        let generation = self.last_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let submission_id = Uuid::new_v4();

        self.state.send_if_modified(|snapshot| {
            if snapshot.generation >= generation {
                return false;
            }
            *snapshot = SessionSnapshot {
                generation,
                submission_id: Some(submission_id),
                state: SessionState::Submitting,
                revealed: false,
            };
            true
        });
        info!(%submission_id, generation, subject = request.subject(), "Submitting analysis.");

        let final_state = match self.dispatch(&request).await {
            Ok(verdict) => {
                debug!(%submission_id, ?verdict, "Analysis response normalized.");
                self.settle(generation).await;
                SessionState::Succeeded(verdict)
            }
            Err(e) => {
                error!(%submission_id, "Analysis failed: {}", e);
                if self.settings.settle_failures {
                    self.settle(generation).await;
                }
                SessionState::Failed(e.to_string())
            }
        };

        if !self.apply(generation, final_state.clone()) {
            warn!(%submission_id, generation, "Discarding result of a superseded submission.");
            return SubmitOutcome::Superseded;
        }
        info!(%submission_id, generation, "Analysis outcome published.");

        if matches!(final_state, SessionState::Succeeded(_)) {
            tokio::time::sleep(self.settings.reveal_delay).await;
            self.state.send_if_modified(|snapshot| {
                if snapshot.generation != generation {
                    return false;
                }
                snapshot.revealed = true;
                true
            });
        }

        SubmitOutcome::Completed(final_state)
    }

    /// Loads the token, calls the service and normalizes the body.
    async fn dispatch(&self, request: &AnalysisRequest) -> PortResult<Verdict> {
        let token = self.credentials.load().await?;
        if token.is_none() {
            debug!("No stored credential; sending the request unauthenticated.");
        }
        let body = self.analysis.analyze(request, token.as_ref()).await?;
        Ok(normalize(&body))
    }

    async fn settle(&self, generation: u64) {
        self.apply(generation, SessionState::Settling);
        tokio::time::sleep(self.settings.settle_delay).await;
    }

    /// Applies `state` if `generation` is still the newest submission.
    fn apply(&self, generation: u64, state: SessionState) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.state = state;
            true
        })
    }
}
