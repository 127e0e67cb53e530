//! Chat orchestrator
//!
//! Coordinates the session list, the active session's messages and the
//! transport. Views call the async operations below and observe the results
//! through [`ChatOrchestrator::subscribe`] plus [`ChatOrchestrator::snapshot`].
//!
//! Every operation handles its own transport failure: the fixed user-facing
//! message goes into the error slot and the same [`ChatError`] is returned.
//! State is only mutated after a successful round-trip, with one exception:
//! `send_message` inserts an optimistic user message up front and removes it
//! again if the send fails.
//!
//! Responses are matched against the state generation they were issued
//! under. If the active session changed in the meantime, a late reply or
//! history fetch is discarded instead of landing in the wrong conversation.

use std::sync::Arc;

use events::{ChatEvent, EventBus, EventEnvelope};
use tokio::sync::{broadcast, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uibuilder_client::ChatTransport;
use uibuilder_core::{truncate_title, Message, SessionSummary};

use crate::config::{ChatConfig, DEFAULT_TITLE_MAX_CHARS};
use crate::error::{ChatError, Result};
use crate::send_guard::SendGuard;
use crate::state::ChatState;
use crate::state_machine::{SendState, SendStateMachine};

/// Result of a [`ChatOrchestrator::send_message`] call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank content or no active session; nothing happened.
    Skipped,
    /// The reply was appended after the optimistic user message.
    Delivered(Message),
    /// The reply arrived after the active session changed and was dropped.
    Discarded(Message),
}

/// Result of a history fetch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The message list was replaced with `count` messages.
    Applied { count: usize },
    /// The active session changed before the response arrived.
    Discarded,
    /// Nothing to fetch.
    Skipped,
}

pub struct ChatOrchestrator {
    transport: Arc<dyn ChatTransport>,
    state: Arc<RwLock<ChatState>>,
    events: EventBus,
    title_max_chars: usize,
}

impl ChatOrchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(ChatState::default())),
            events: EventBus::new(),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }

    pub fn with_config(mut self, config: &ChatConfig) -> Self {
        self.title_max_chars = config.title_max_chars;
        self
    }

    /// Publish change notifications on an existing bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub async fn snapshot(&self) -> ChatState {
        self.state.read().await.clone()
    }

    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.state.read().await.sessions().to_vec()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages().to_vec()
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.state.read().await.current_session_id.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn follow_up_questions(&self) -> Vec<String> {
        self.state.read().await.follow_up_questions().to_vec()
    }

    /// Fetch the session list and replace the local one.
    ///
    /// If the active session is no longer listed it is deactivated. A list
    /// requested before the active session changed keeps that session listed
    /// and active. Returns the number of sessions.
    pub async fn load_sessions(&self) -> Result<usize> {
        let generation = self.state.read().await.generation;
        let sessions = match self.transport.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Failed to load sessions");
                return Err(self.fail(ChatError::LoadSessions(e)).await);
            }
        };

        let mut events = Vec::new();
        let mut state = self.state.write().await;
        let stale = !state.is_current(generation);
        let active = if stale {
            state.current_session().cloned()
        } else {
            None
        };
        state.sessions.replace_all(sessions);
        if let Some(summary) = active {
            if !state.sessions.contains(&summary.id) {
                debug!(session_id = %summary.id, "Keeping active session missing from an older list");
                state.sessions.prepend(summary);
            }
        }
        let count = state.sessions.len();
        events.push(ChatEvent::SessionsChanged { count });

        let dangling = !stale
            && state
                .current_session_id
                .as_deref()
                .is_some_and(|id| !state.sessions.contains(id));
        if dangling {
            debug!(
                session_id = ?state.current_session_id,
                "Active session no longer listed, deactivating"
            );
            state.activate(None);
            events.push(ChatEvent::ActiveSessionChanged { session_id: None });
            events.push(ChatEvent::MessagesChanged {
                session_id: None,
                count: 0,
            });
        }
        drop(state);

        self.notify(events);
        debug!(count, "Loaded sessions");
        Ok(count)
    }

    /// Create a session, list it first and make it active with an empty history.
    pub async fn create_session(&self) -> Result<SessionSummary> {
        let session = match self.transport.create_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to create session");
                return Err(self.fail(ChatError::CreateSession(e)).await);
            }
        };

        let summary = session.summary();
        let mut state = self.state.write().await;
        state.sessions.prepend(summary.clone());
        state.activate(Some(summary.id.clone()));
        let mut events = vec![
            ChatEvent::SessionsChanged {
                count: state.sessions.len(),
            },
            ChatEvent::ActiveSessionChanged {
                session_id: Some(summary.id.clone()),
            },
            ChatEvent::MessagesChanged {
                session_id: Some(summary.id.clone()),
                count: 0,
            },
        ];
        if state.set_error(None) {
            events.push(ChatEvent::ErrorChanged { error: None });
        }
        drop(state);

        self.notify(events);
        info!(session_id = %summary.id, "Created session");
        Ok(summary)
    }

    /// Make `session_id` active right away, then load its history.
    ///
    /// The switch is not rolled back if the fetch fails; the message list
    /// stays empty and the error slot is set.
    pub async fn select_session(&self, session_id: &str) -> Result<FetchOutcome> {
        let generation = {
            let mut state = self.state.write().await;
            state.activate(Some(session_id.to_string()));
            let mut events = vec![
                ChatEvent::ActiveSessionChanged {
                    session_id: Some(session_id.to_string()),
                },
                ChatEvent::MessagesChanged {
                    session_id: Some(session_id.to_string()),
                    count: 0,
                },
            ];
            if state.set_error(None) {
                events.push(ChatEvent::ErrorChanged { error: None });
            }
            let generation = state.generation;
            drop(state);
            self.notify(events);
            generation
        };

        match self.transport.get_session(session_id).await {
            Ok(session) => {
                let mut state = self.state.write().await;
                if !state.is_current(generation) {
                    debug!(session_id, "Discarding history for a session no longer active");
                    return Ok(FetchOutcome::Discarded);
                }

                let mut events = Vec::new();
                if !state.sessions.contains(&session.id) {
                    state.sessions.prepend(session.summary());
                    events.push(ChatEvent::SessionsChanged {
                        count: state.sessions.len(),
                    });
                }
                state.messages.replace(session.messages);
                let count = state.messages.len();
                events.push(ChatEvent::MessagesChanged {
                    session_id: Some(session_id.to_string()),
                    count,
                });
                drop(state);

                self.notify(events);
                debug!(session_id, count, "Loaded session history");
                Ok(FetchOutcome::Applied { count })
            }
            Err(e) => {
                warn!(session_id, error = %e, "Failed to load session");
                let err = ChatError::LoadMessages(e);
                let state = self.state.write().await;
                if !state.is_current(generation) {
                    return Err(err);
                }
                Err(self.fail_locked(state, err))
            }
        }
    }

    /// Re-fetch the active session's messages, replacing client-generated ids
    /// with the server's. Skipped while a send is in flight.
    pub async fn refresh_messages(&self) -> Result<FetchOutcome> {
        let (session_id, generation) = {
            let state = self.state.read().await;
            match state.current_session_id.clone() {
                Some(id) if !state.is_loading() => (id, state.generation),
                _ => return Ok(FetchOutcome::Skipped),
            }
        };

        match self.transport.list_messages(&session_id).await {
            Ok(messages) => {
                let mut state = self.state.write().await;
                if !state.is_current(generation) || state.is_loading() {
                    debug!(session_id = %session_id, "Discarding stale message refresh");
                    return Ok(FetchOutcome::Discarded);
                }
                state.messages.replace(messages);
                let count = state.messages.len();
                drop(state);

                self.notify(vec![ChatEvent::MessagesChanged {
                    session_id: Some(session_id),
                    count,
                }]);
                Ok(FetchOutcome::Applied { count })
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to refresh messages");
                let err = ChatError::LoadMessages(e);
                let state = self.state.write().await;
                if !state.is_current(generation) {
                    return Err(err);
                }
                Err(self.fail_locked(state, err))
            }
        }
    }

    /// Delete a session. Deleting the active one clears the view.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        if let Err(e) = self.transport.delete_session(session_id).await {
            warn!(session_id, error = %e, "Failed to delete session");
            return Err(self.fail(ChatError::DeleteSession(e)).await);
        }

        let mut state = self.state.write().await;
        let mut events = Vec::new();
        if state.sessions.remove(session_id).is_some() {
            events.push(ChatEvent::SessionsChanged {
                count: state.sessions.len(),
            });
        }
        if state.current_session_id.as_deref() == Some(session_id) {
            state.activate(None);
            events.push(ChatEvent::ActiveSessionChanged { session_id: None });
            events.push(ChatEvent::MessagesChanged {
                session_id: None,
                count: 0,
            });
        }
        drop(state);

        self.notify(events);
        info!(session_id, "Deleted session");
        Ok(())
    }

    /// Send `content` to the active session.
    ///
    /// A user message with a temporary id is appended immediately. On
    /// success the assistant reply follows it and the session title is set
    /// from `content`; on failure the temporary message is removed again.
    /// Blank content or no active session is a no-op, and a second send
    /// while one is in flight is rejected without touching state.
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            debug!("Ignoring blank message");
            return Ok(SendOutcome::Skipped);
        }

        let (session_id, generation, optimistic_id) = {
            let mut state = self.state.write().await;
            let Some(session_id) = state.current_session_id.clone() else {
                debug!("Ignoring message without an active session");
                return Ok(SendOutcome::Skipped);
            };
            SendStateMachine::validate_transition(&state.send_state, &SendState::Sending)?;

            let optimistic = Message::optimistic_user(content);
            let optimistic_id = optimistic.id.clone();
            state.messages.push(optimistic);
            let mut events = vec![ChatEvent::MessagesChanged {
                session_id: Some(session_id.clone()),
                count: state.messages.len(),
            }];
            if state.set_error(None) {
                events.push(ChatEvent::ErrorChanged { error: None });
            }
            state.send_state = SendState::Sending;
            events.push(ChatEvent::LoadingChanged { loading: true });
            let generation = state.generation;
            drop(state);

            self.notify(events);
            (session_id, generation, optimistic_id)
        };

        let mut guard = SendGuard::new(
            self.state.clone(),
            self.events.clone(),
            session_id.clone(),
            optimistic_id.clone(),
        );
        let result = self.transport.send_message(&session_id, content).await;

        let mut state = self.state.write().await;
        guard.mark_completed();
        state.send_state = SendState::Idle;
        let mut events = vec![ChatEvent::LoadingChanged { loading: false }];
        let current = state.is_current(generation);

        let outcome = match result {
            Ok(reply) => {
                // The server accepted the message even if the view moved on.
                if state
                    .sessions
                    .rename(&session_id, truncate_title(content, self.title_max_chars))
                {
                    events.push(ChatEvent::SessionsChanged {
                        count: state.sessions.len(),
                    });
                }

                if current {
                    if !state.messages.push(reply.clone()) {
                        warn!(message_id = %reply.id, "Reply id already present, not appending");
                    }
                    events.push(ChatEvent::MessagesChanged {
                        session_id: Some(session_id.clone()),
                        count: state.messages.len(),
                    });
                    info!(session_id = %session_id, message_id = %reply.id, "Message delivered");
                    Ok(SendOutcome::Delivered(reply))
                } else {
                    debug!(session_id = %session_id, "Discarding reply for a session no longer active");
                    Ok(SendOutcome::Discarded(reply))
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to send message");
                let err = ChatError::SendMessage(e);
                if current {
                    state.messages.remove(&optimistic_id);
                    events.push(ChatEvent::MessagesChanged {
                        session_id: Some(session_id.clone()),
                        count: state.messages.len(),
                    });
                    if state.set_error(Some(err.to_string())) {
                        events.push(ChatEvent::ErrorChanged {
                            error: Some(err.to_string()),
                        });
                    }
                }
                Err(err)
            }
        };
        drop(state);

        self.notify(events);
        outcome
    }

    /// Send the `index`-th follow-up question of the latest assistant message.
    pub async fn answer_question(&self, index: usize) -> Result<SendOutcome> {
        let question = self
            .state
            .read()
            .await
            .follow_up_questions()
            .get(index)
            .cloned()
            .ok_or(ChatError::NoSuchQuestion(index))?;

        self.send_message(&question).await
    }

    async fn fail(&self, err: ChatError) -> ChatError {
        let state = self.state.write().await;
        self.fail_locked(state, err)
    }

    fn fail_locked(&self, mut state: RwLockWriteGuard<'_, ChatState>, err: ChatError) -> ChatError {
        let message = err.to_string();
        let changed = state.set_error(Some(message.clone()));
        drop(state);

        if changed {
            self.notify(vec![ChatEvent::ErrorChanged {
                error: Some(message),
            }]);
        }
        err
    }

    fn notify(&self, events: Vec<ChatEvent>) {
        for event in events {
            self.events.emit(event);
        }
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("events", &self.events)
            .field("title_max_chars", &self.title_max_chars)
            .finish()
    }
}
