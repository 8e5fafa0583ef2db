use tracing::{debug, info, warn};

use crate::{WeatherSnapshot, provider::ProviderError};

use super::state::{DashboardState, ErrorInfo};

/// Inputs to the controller, from views and from finished work.
#[derive(Debug, Clone)]
pub enum Event {
    Initialize(String),
    Submit(String),
    SelectFromHistory(String),
    DismissError,
    FetchCompleted {
        request: u64,
        query: String,
        outcome: Result<WeatherSnapshot, ProviderError>,
    },
    DismissDeadlineElapsed {
        error: u64,
    },
}

/// Work the runtime must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch { request: u64, query: String },
    ScheduleDismiss { error: u64 },
    CancelDismiss,
}

#[derive(Debug)]
pub struct Transition {
    pub state: DashboardState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &DashboardState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

pub fn transition(state: &DashboardState, event: Event) -> Transition {
    match event {
        Event::Initialize(default_query) => {
            if state.initialized {
                debug!("controller already initialized");
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            next.initialized = true;
            submit(&next, default_query)
        }
        Event::Submit(query) | Event::SelectFromHistory(query) => submit(state, query),
        Event::DismissError => match state.error {
            Some(_) => {
                let mut next = state.clone();
                next.error = None;
                Transition {
                    state: next,
                    effects: vec![Effect::CancelDismiss],
                }
            }
            None => Transition::unchanged(state),
        },
        Event::FetchCompleted {
            request,
            query,
            outcome,
        } => complete(state, request, query, outcome),
        Event::DismissDeadlineElapsed { error } => match &state.error {
            Some(current) if current.id == error => {
                let mut next = state.clone();
                next.error = None;
                Transition {
                    state: next,
                    effects: vec![Effect::CancelDismiss],
                }
            }
            _ => Transition::unchanged(state),
        },
    }
}

fn submit(state: &DashboardState, query: String) -> Transition {
    if query.trim().is_empty() {
        warn!("ignoring empty query");
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let mut effects = Vec::with_capacity(2);

    next.latest_request += 1;
    next.in_flight = true;
    next.pending_query = Some(query.clone());
    if next.error.take().is_some() {
        effects.push(Effect::CancelDismiss);
    }

    debug!(request = next.latest_request, %query, "issuing weather request");
    effects.push(Effect::Fetch {
        request: next.latest_request,
        query,
    });

    Transition {
        state: next,
        effects,
    }
}

fn complete(
    state: &DashboardState,
    request: u64,
    query: String,
    outcome: Result<WeatherSnapshot, ProviderError>,
) -> Transition {
    if request != state.latest_request {
        debug!(request, latest = state.latest_request, %query, "discarding stale response");
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let mut effects = Vec::new();
    next.in_flight = false;
    next.pending_query = None;

    match outcome {
        Ok(snapshot) => {
            info!(%query, location = %snapshot.location_name, "weather updated");
            next.result = Some(snapshot);
            next.history.record(&query);
            next.query = query;
        }
        Err(err) => {
            warn!(%query, error = %err, "weather request failed");
            next.error = Some(ErrorInfo {
                id: request,
                query,
                message: err.to_string(),
            });
            effects.push(Effect::ScheduleDismiss { error: request });
        }
    }

    Transition {
        state: next,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::snapshot;

    /// Submit `query` and feed back `outcome` for the request it issued.
    fn run(
        state: &DashboardState,
        query: &str,
        outcome: Result<WeatherSnapshot, ProviderError>,
    ) -> Transition {
        let submitted = transition(state, Event::Submit(query.into()));
        let request = submitted.state.latest_request;
        transition(
            &submitted.state,
            Event::FetchCompleted {
                request,
                query: query.into(),
                outcome,
            },
        )
    }

    fn not_found(query: &str) -> Result<WeatherSnapshot, ProviderError> {
        Err(ProviderError::NotFound {
            query: query.into(),
        })
    }

    #[test]
    fn submit_marks_in_flight_and_issues_fetch() {
        let t = transition(&DashboardState::default(), Event::Submit("Colombo".into()));

        assert!(t.state.in_flight);
        assert_eq!(t.state.pending_query.as_deref(), Some("Colombo"));
        assert_eq!(
            t.effects,
            vec![Effect::Fetch {
                request: 1,
                query: "Colombo".into()
            }]
        );
    }

    #[test]
    fn successful_fetch_sets_result_and_history() {
        let t = run(&DashboardState::default(), "Colombo", Ok(snapshot("Colombo")));

        let result = t.state.result.as_ref().expect("result set");
        assert_eq!(result.location_name, "Colombo");
        assert_eq!(t.state.query, "Colombo");
        assert_eq!(t.state.error, None);
        assert!(!t.state.in_flight);
        assert_eq!(t.state.history.to_vec(), vec!["Colombo"]);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn error_is_cancelled_at_submit_not_at_success() {
        let failed = run(&DashboardState::default(), "Atlantis", not_found("Atlantis")).state;

        let submitted = transition(&failed, Event::Submit("Colombo".into()));
        assert_eq!(submitted.state.error, None);
        assert_eq!(submitted.effects[0], Effect::CancelDismiss);

        let done = transition(
            &submitted.state,
            Event::FetchCompleted {
                request: submitted.state.latest_request,
                query: "Colombo".into(),
                outcome: Ok(snapshot("Colombo")),
            },
        );
        assert_eq!(done.state.error, None);
        assert!(done.effects.is_empty());
    }

    #[test]
    fn failed_fetch_keeps_result_and_history() {
        let before = run(&DashboardState::default(), "Colombo", Ok(snapshot("Colombo"))).state;
        let t = run(&before, "Nowhereville", not_found("Nowhereville"));

        assert_eq!(t.state.result, before.result);
        assert_eq!(t.state.history, before.history);
        assert_eq!(t.state.query, "Colombo");
        assert!(!t.state.in_flight);

        let error = t.state.error.as_ref().expect("error set");
        assert_eq!(error.query, "Nowhereville");
        assert_eq!(error.message, "City not found: Nowhereville");
        assert_eq!(t.effects, vec![Effect::ScheduleDismiss { error: error.id }]);
    }

    #[test]
    fn failure_without_prior_result_leaves_result_empty() {
        let t = run(&DashboardState::default(), "Nowhereville", not_found("Nowhereville"));

        assert_eq!(t.state.result, None);
        assert!(t.state.error.is_some());
    }

    #[test]
    fn resubmitted_query_moves_to_front() {
        let mut state = DashboardState::default();
        for city in ["Paris", "London", "Paris"] {
            state = run(&state, city, Ok(snapshot(city))).state;
        }

        assert_eq!(state.history.to_vec(), vec!["Paris", "London"]);
    }

    #[test]
    fn history_keeps_five_most_recent() {
        let mut state = DashboardState::default();
        for city in ["Oslo", "Rome", "Lima", "Kyiv", "Doha", "Baku"] {
            state = run(&state, city, Ok(snapshot(city))).state;
        }

        assert_eq!(
            state.history.to_vec(),
            vec!["Baku", "Doha", "Kyiv", "Lima", "Rome"]
        );
    }

    #[test]
    fn empty_query_is_rejected() {
        let state = DashboardState::default();
        let t = transition(&state, Event::Submit("   ".into()));

        assert_eq!(t.state, state);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn submit_clears_existing_error() {
        let failed = run(&DashboardState::default(), "Nowhereville", not_found("Nowhereville"));
        let t = transition(&failed.state, Event::Submit("Colombo".into()));

        assert_eq!(t.state.error, None);
        assert_eq!(t.effects[0], Effect::CancelDismiss);
    }

    #[test]
    fn stale_response_is_discarded() {
        let state = DashboardState::default();
        let first = transition(&state, Event::Submit("Paris".into()));
        let second = transition(&first.state, Event::Submit("London".into()));

        let london = transition(
            &second.state,
            Event::FetchCompleted {
                request: 2,
                query: "London".into(),
                outcome: Ok(snapshot("London")),
            },
        );
        let paris = transition(
            &london.state,
            Event::FetchCompleted {
                request: 1,
                query: "Paris".into(),
                outcome: Ok(snapshot("Paris")),
            },
        );

        assert_eq!(paris.state, london.state);
        let result = paris.state.result.expect("result set");
        assert_eq!(result.location_name, "London");
        assert_eq!(paris.state.history.to_vec(), vec!["London"]);
    }

    #[test]
    fn stale_response_does_not_end_loading() {
        let first = transition(&DashboardState::default(), Event::Submit("Paris".into()));
        let second = transition(&first.state, Event::Submit("London".into()));

        let t = transition(
            &second.state,
            Event::FetchCompleted {
                request: 1,
                query: "Paris".into(),
                outcome: not_found("Paris"),
            },
        );

        assert!(t.state.in_flight);
        assert_eq!(t.state.error, None);
    }

    #[test]
    fn dismiss_clears_error() {
        let failed = run(&DashboardState::default(), "Nowhereville", not_found("Nowhereville"));
        let t = transition(&failed.state, Event::DismissError);

        assert_eq!(t.state.error, None);
        assert_eq!(t.effects, vec![Effect::CancelDismiss]);

        let again = transition(&t.state, Event::DismissError);
        assert!(again.effects.is_empty());
    }

    #[test]
    fn expired_deadline_only_clears_its_own_error() {
        let first = run(&DashboardState::default(), "Atlantis", not_found("Atlantis"));
        let first_id = first.state.error.as_ref().unwrap().id;
        let second = run(&first.state, "Narnia", not_found("Narnia"));

        let t = transition(
            &second.state,
            Event::DismissDeadlineElapsed { error: first_id },
        );
        assert_eq!(t.state.error.as_ref().unwrap().query, "Narnia");

        let second_id = second.state.error.as_ref().unwrap().id;
        let t = transition(
            &second.state,
            Event::DismissDeadlineElapsed { error: second_id },
        );
        assert_eq!(t.state.error, None);
    }

    #[test]
    fn initialize_runs_once() {
        let first = transition(&DashboardState::default(), Event::Initialize("Colombo".into()));
        assert_eq!(first.effects.len(), 1);
        assert!(first.state.initialized);

        let second = transition(&first.state, Event::Initialize("Kandy".into()));
        assert!(second.effects.is_empty());
        assert_eq!(second.state.pending_query.as_deref(), Some("Colombo"));
    }

    #[test]
    fn history_selection_behaves_like_submit() {
        let state = run(&DashboardState::default(), "Paris", Ok(snapshot("Paris"))).state;
        let t = transition(&state, Event::SelectFromHistory("Paris".into()));

        assert!(t.state.in_flight);
        assert_eq!(
            t.effects,
            vec![Effect::Fetch {
                request: 2,
                query: "Paris".into()
            }]
        );
    }
}
