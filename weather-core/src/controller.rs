//! The query controller: single owner of the dashboard state.
//!
//! Views send commands through a [`ControllerHandle`] and observe state via a
//! `watch` channel. All state changes go through [`transition`]; this module
//! only runs the effects it asks for (provider requests and the error
//! dismissal deadline).

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::{self, JoinError, JoinSet},
    time::{Instant, sleep_until},
};
use tracing::{debug, error, warn};

use crate::{
    WeatherSnapshot,
    provider::{ProviderError, WeatherProvider},
};

pub mod state;
pub mod transition;

pub use state::{DashboardState, ErrorInfo, HISTORY_CAPACITY, History};
pub use transition::{Effect, Event, Transition, transition};

/// How long an error stays visible unless superseded.
pub const ERROR_DISPLAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub error_display: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            error_display: ERROR_DISPLAY,
        }
    }
}

#[derive(Debug)]
enum Command {
    Initialize(String),
    Submit(String),
    SelectFromHistory(String),
    DismissError,
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        match command {
            Command::Initialize(query) => Event::Initialize(query),
            Command::Submit(query) => Event::Submit(query),
            Command::SelectFromHistory(entry) => Event::SelectFromHistory(entry),
            Command::DismissError => Event::DismissError,
        }
    }
}

/// Cloneable front door to a running controller.
///
/// The controller stops once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<DashboardState>,
}

impl ControllerHandle {
    /// Submit `default_query` once per session; later calls are ignored.
    pub fn initialize(&self, default_query: impl Into<String>) {
        self.send(Command::Initialize(default_query.into()));
    }

    pub fn submit(&self, query: impl Into<String>) {
        self.send(Command::Submit(query.into()));
    }

    pub fn select_from_history(&self, entry: impl Into<String>) {
        self.send(Command::SelectFromHistory(entry.into()));
    }

    pub fn dismiss_error(&self) {
        self.send(Command::DismissError);
    }

    /// Copy of the latest published state.
    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.clone()
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.commands.send(command) {
            warn!(command = ?err.0, "query controller is no longer running");
        }
    }
}

type RequestOutput = (u64, String, Result<WeatherSnapshot, ProviderError>);

pub struct QueryController {
    provider: Arc<dyn WeatherProvider>,
    settings: ControllerSettings,
    state: DashboardState,
    published: watch::Sender<DashboardState>,
    commands: mpsc::UnboundedReceiver<Command>,
    requests: JoinSet<RequestOutput>,
    /// Request number and query behind each running provider task.
    request_tasks: HashMap<task::Id, (u64, String)>,
    /// Pending auto-dismissal: error id and when it fires.
    dismiss_at: Option<(u64, Instant)>,
}

impl QueryController {
    /// Start a controller on the current tokio runtime.
    pub fn spawn(
        provider: Arc<dyn WeatherProvider>,
        settings: ControllerSettings,
    ) -> ControllerHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DashboardState::default());

        let controller = QueryController {
            provider,
            settings,
            state: DashboardState::default(),
            published: state_tx,
            commands: command_rx,
            requests: JoinSet::new(),
            request_tasks: HashMap::new(),
            dismiss_at: None,
        };
        tokio::spawn(controller.run());

        ControllerHandle {
            commands: command_tx,
            state: state_rx,
        }
    }

    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => Event::from(command),
                    None => break,
                },
                Some(joined) = self.requests.join_next_with_id(), if !self.requests.is_empty() => {
                    match joined {
                        Ok((task, (request, query, outcome))) => {
                            self.request_tasks.remove(&task);
                            Event::FetchCompleted { request, query, outcome }
                        }
                        Err(err) => match self.lost_request(err) {
                            Some(event) => event,
                            None => continue,
                        },
                    }
                }
                Some(error) = wait_for_deadline(self.dismiss_at) => {
                    self.dismiss_at = None;
                    Event::DismissDeadlineElapsed { error }
                }
            };

            self.apply(event);
        }

        debug!("query controller stopped");
    }

    /// A request task panicked or was cancelled. Report it as a failed
    /// request; the reducer drops it if a newer request has been issued.
    fn lost_request(&mut self, err: JoinError) -> Option<Event> {
        error!(error = %err, "weather request task did not complete");

        let (request, query) = self.request_tasks.remove(&err.id())?;
        Some(Event::FetchCompleted {
            request,
            outcome: Err(ProviderError::transport(&query, "request aborted")),
            query,
        })
    }

    fn apply(&mut self, event: Event) {
        let Transition { state, effects } = transition(&self.state, event);
        self.state = state;

        for effect in effects {
            match effect {
                Effect::Fetch { request, query } => {
                    let provider = Arc::clone(&self.provider);
                    let task = self.requests.spawn({
                        let query = query.clone();
                        async move {
                            let outcome = provider.current_conditions(&query).await;
                            (request, query, outcome)
                        }
                    });
                    self.request_tasks.insert(task.id(), (request, query));
                }
                Effect::ScheduleDismiss { error } => {
                    self.dismiss_at = Some((error, Instant::now() + self.settings.error_display));
                }
                Effect::CancelDismiss => self.dismiss_at = None,
            }
        }

        let next = &self.state;
        self.published.send_if_modified(|current| {
            if current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }
}

async fn wait_for_deadline(deadline: Option<(u64, Instant)>) -> Option<u64> {
    let (error, at) = deadline?;
    sleep_until(at).await;
    Some(error)
}
