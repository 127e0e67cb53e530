use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat::{ChatConfig, ChatError, ChatOrchestrator, FetchOutcome, SendOutcome};
use chrono::Utc;
use events::ChatEvent;
use tokio::sync::Notify;
use uibuilder_client::{ChatTransport, ClientError, Result as ClientResult, StatusCode};
use uibuilder_core::{Message, MessageAction, Role, Session, SessionSummary};

/// In-memory stand-in for the chat API.
#[derive(Default)]
struct FakeTransport {
    sessions: Mutex<Vec<Session>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: Mutex<usize>,
    reply_action: Mutex<Option<(MessageAction, Vec<String>)>>,
    /// When set, `send_message` signals `send_started` and waits for `release_send`.
    hold_sends: Mutex<bool>,
    send_started: Notify,
    release_send: Notify,
    /// When set, `list_sessions` snapshots the list, signals `list_started`
    /// and waits for `release_list` before answering.
    hold_lists: Mutex<bool>,
    list_started: Notify,
    release_list: Notify,
}

impl FakeTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_session(self: Arc<Self>, id: &str, messages: Vec<Message>) -> Arc<Self> {
        self.sessions.lock().unwrap().push(Session {
            id: id.to_string(),
            title: "New Chat".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            messages,
        });
        self
    }

    fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    fn hold_sends(&self) {
        *self.hold_sends.lock().unwrap() = true;
    }

    fn hold_lists(&self) {
        *self.hold_lists.lock().unwrap() = true;
    }

    fn reply_with_questions(&self, questions: &[&str]) {
        *self.reply_action.lock().unwrap() = Some((
            MessageAction::Ask,
            questions.iter().map(|q| q.to_string()).collect(),
        ));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> ClientResult<()> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(ClientError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("{op} failed"),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("{prefix}{}", *next)
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn create_session(&self) -> ClientResult<Session> {
        self.record("create".to_string());
        self.check("create")?;
        let session = Session {
            id: self.next_id("s-new-"),
            title: "New Chat".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            messages: Vec::new(),
        };
        self.sessions.lock().unwrap().insert(0, session.clone());
        Ok(session)
    }

    async fn list_sessions(&self) -> ClientResult<Vec<SessionSummary>> {
        self.record("list".to_string());
        self.check("list")?;
        let summaries: Vec<SessionSummary> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(Session::summary)
            .collect();

        let hold = *self.hold_lists.lock().unwrap();
        if hold {
            self.list_started.notify_one();
            self.release_list.notified().await;
        }
        Ok(summaries)
    }

    async fn get_session(&self, session_id: &str) -> ClientResult<Session> {
        self.record(format!("get:{session_id}"));
        self.check("get")?;
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(session_id.to_string()))
    }

    async fn delete_session(&self, session_id: &str) -> ClientResult<()> {
        self.record(format!("delete:{session_id}"));
        self.check("delete")?;
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != session_id);
        if sessions.len() == before {
            return Err(ClientError::NotFound(session_id.to_string()));
        }
        Ok(())
    }

    async fn send_message(&self, session_id: &str, content: &str) -> ClientResult<Message> {
        self.record(format!("send:{session_id}"));
        let hold = *self.hold_sends.lock().unwrap();
        if hold {
            self.send_started.notify_one();
            self.release_send.notified().await;
        }
        self.check("send")?;

        let (action, questions) = self
            .reply_action
            .lock()
            .unwrap()
            .clone()
            .unwrap_or((MessageAction::Generate, Vec::new()));
        let user = Message {
            id: self.next_id("u-"),
            role: Role::User,
            content: content.to_string(),
            code_blocks: Vec::new(),
            action: MessageAction::Generate,
            questions: Vec::new(),
            created_at: Utc::now(),
        };
        let reply = Message {
            id: self.next_id("a-"),
            role: Role::Assistant,
            content: format!("Reply to: {content}"),
            code_blocks: Vec::new(),
            action,
            questions,
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ClientError::NotFound(session_id.to_string()))?;
        session.messages.push(user);
        session.messages.push(reply.clone());
        Ok(reply)
    }

    async fn list_messages(&self, session_id: &str) -> ClientResult<Vec<Message>> {
        self.record(format!("messages:{session_id}"));
        self.check("messages")?;
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| ClientError::NotFound(session_id.to_string()))
    }
}

fn assistant(id: &str, content: &str) -> Message {
    Message {
        id: id.to_string(),
        role: Role::Assistant,
        content: content.to_string(),
        code_blocks: Vec::new(),
        action: MessageAction::Generate,
        questions: Vec::new(),
        created_at: Utc::now(),
    }
}

fn history(prefix: &str) -> Vec<Message> {
    vec![
        assistant(&format!("{prefix}-1"), "first"),
        assistant(&format!("{prefix}-2"), "second"),
    ]
}

/// Orchestrator with sessions `a` (two messages) and `b` (one message), `a` active.
async fn setup() -> (Arc<ChatOrchestrator>, Arc<FakeTransport>) {
    let transport = FakeTransport::new()
        .with_session("a", history("a"))
        .with_session("b", vec![assistant("b-1", "only")]);
    let chat = Arc::new(ChatOrchestrator::new(transport.clone()));
    chat.load_sessions().await.unwrap();
    chat.select_session("a").await.unwrap();
    (chat, transport)
}

mod send {
    use super::*;

    #[tokio::test]
    async fn test_success_appends_user_then_assistant() {
        let (chat, _transport) = setup().await;
        let before = chat.messages().await;

        let outcome = chat.send_message("Build a navbar").await.unwrap();

        let after = chat.messages().await;
        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(&after[..before.len()], before.as_slice());

        let user = &after[before.len()];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "Build a navbar");
        assert!(user.is_optimistic());
        assert_eq!(user.action, MessageAction::Generate);

        let reply = &after[before.len() + 1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(outcome, SendOutcome::Delivered(reply.clone()));
        assert!(!chat.is_loading().await);
        assert!(chat.error().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_rolls_back_optimistic_message() {
        let (chat, transport) = setup().await;
        let before = chat.messages().await;
        transport.fail("send");

        let err = chat.send_message("x").await.unwrap_err();

        assert!(matches!(err, ChatError::SendMessage(_)));
        assert_eq!(chat.messages().await, before);
        assert_eq!(
            chat.error().await.as_deref(),
            Some("Something went wrong. Please try again.")
        );
        assert!(!chat.is_loading().await);
    }

    #[tokio::test]
    async fn test_long_content_sets_truncated_title() {
        let (chat, _transport) = setup().await;
        let content = "Create a responsive pricing table with three tiers and a toggle for yearly billing";
        assert!(content.chars().count() > 60);

        chat.send_message(content).await.unwrap();

        let state = chat.snapshot().await;
        let title = &state.current_session().unwrap().title;
        assert_eq!(title.chars().count(), 60);
        assert_eq!(title, &content.chars().take(60).collect::<String>());
    }

    #[tokio::test]
    async fn test_title_length_follows_config() {
        let transport = FakeTransport::new().with_session("a", Vec::new());
        let config = ChatConfig {
            title_max_chars: 10,
            ..Default::default()
        };
        let chat = ChatOrchestrator::new(transport).with_config(&config);
        chat.load_sessions().await.unwrap();
        chat.select_session("a").await.unwrap();

        chat.send_message("A landing page hero").await.unwrap();

        assert_eq!(chat.sessions().await[0].title, "A landing ");
    }

    #[tokio::test]
    async fn test_blank_content_is_ignored() {
        let (chat, transport) = setup().await;
        let before = chat.snapshot().await;

        let outcome = chat.send_message("   ").await.unwrap();

        assert_eq!(outcome, SendOutcome::Skipped);
        assert_eq!(transport.call_count("send"), 0);
        assert_eq!(chat.messages().await, before.messages());
        assert_eq!(chat.sessions().await, before.sessions());
    }

    #[tokio::test]
    async fn test_no_active_session_is_ignored() {
        let transport = FakeTransport::new().with_session("a", Vec::new());
        let chat = ChatOrchestrator::new(transport.clone());
        chat.load_sessions().await.unwrap();

        let outcome = chat.send_message("hello").await.unwrap();

        assert_eq!(outcome, SendOutcome::Skipped);
        assert_eq!(transport.call_count("send"), 0);
        assert!(chat.messages().await.is_empty());
        assert!(!chat.is_loading().await);
    }

    #[tokio::test]
    async fn test_send_clears_previous_error() {
        let (chat, transport) = setup().await;
        transport.fail("send");
        chat.send_message("first").await.unwrap_err();
        assert!(chat.error().await.is_some());

        transport.recover("send");
        chat.send_message("second").await.unwrap();
        assert!(chat.error().await.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_question_is_sent_as_message() {
        let (chat, transport) = setup().await;
        transport.reply_with_questions(&["Dark mode?", "Mobile first?"]);

        chat.send_message("Build a dashboard").await.unwrap();
        assert_eq!(
            chat.follow_up_questions().await,
            vec!["Dark mode?".to_string(), "Mobile first?".to_string()]
        );

        chat.answer_question(1).await.unwrap();
        let messages = chat.messages().await;
        assert_eq!(messages[messages.len() - 2].content, "Mobile first?");

        assert!(matches!(
            chat.answer_question(7).await,
            Err(ChatError::NoSuchQuestion(7))
        ));
    }
}

mod in_flight {
    use super::*;

    #[tokio::test]
    async fn test_loading_brackets_the_request() {
        let (chat, transport) = setup().await;
        transport.hold_sends();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("hello").await })
        };
        transport.send_started.notified().await;

        let during = chat.snapshot().await;
        assert!(during.is_loading());
        assert!(during.messages().last().unwrap().is_optimistic());

        transport.release_send.notify_one();
        task.await.unwrap().unwrap();
        assert!(!chat.is_loading().await);
    }

    #[tokio::test]
    async fn test_second_send_while_sending_is_rejected() {
        let (chat, transport) = setup().await;
        transport.hold_sends();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("first").await })
        };
        transport.send_started.notified().await;
        let during = chat.messages().await;

        let err = chat.send_message("second").await.unwrap_err();
        assert!(matches!(err, ChatError::SendInProgress));
        assert_eq!(chat.messages().await, during);
        assert_eq!(transport.call_count("send"), 1);
        assert!(chat.error().await.is_none());

        transport.release_send.notify_one();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reply_after_switch_is_discarded() {
        let (chat, transport) = setup().await;
        transport.hold_sends();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("Make it blue").await })
        };
        transport.send_started.notified().await;

        chat.select_session("b").await.unwrap();
        transport.release_send.notify_one();
        let outcome = task.await.unwrap().unwrap();

        assert!(matches!(outcome, SendOutcome::Discarded(_)));
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "b-1");
        assert_eq!(chat.current_session_id().await.as_deref(), Some("b"));
        assert!(!chat.is_loading().await);

        // the server still took the message, so the originating title moves
        let sessions = chat.sessions().await;
        let a = sessions.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.title, "Make it blue");
    }

    #[tokio::test]
    async fn test_failure_after_switch_leaves_new_view_alone() {
        let (chat, transport) = setup().await;
        transport.hold_sends();
        transport.fail("send");

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("Make it blue").await })
        };
        transport.send_started.notified().await;

        chat.create_session().await.unwrap();
        transport.release_send.notify_one();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(ChatError::SendMessage(_))));
        assert!(chat.messages().await.is_empty());
        assert!(chat.error().await.is_none());
        assert!(!chat.is_loading().await);
    }

    #[tokio::test]
    async fn test_dropped_send_releases_the_busy_flag() {
        let (chat, transport) = setup().await;
        transport.hold_sends();
        let before = chat.messages().await;

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            chat.send_message("hello"),
        )
        .await;
        assert!(timed_out.is_err());

        assert!(!chat.is_loading().await);
        assert_eq!(chat.messages().await, before);
        assert!(chat.error().await.is_none());

        *transport.hold_sends.lock().unwrap() = false;
        let outcome = chat.send_message("hello again").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Delivered(_)));
        assert_eq!(chat.messages().await.len(), before.len() + 2);
    }

    #[tokio::test]
    async fn test_aborted_send_task_rolls_back() {
        let (chat, transport) = setup().await;
        transport.hold_sends();
        let mut rx = chat.subscribe();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("hello").await })
        };
        transport.send_started.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!chat.is_loading().await);
        assert!(chat.messages().await.iter().all(|m| !m.is_optimistic()));

        let mut last = None;
        while let Ok(envelope) = rx.try_recv() {
            last = Some(envelope.event);
        }
        assert_eq!(last, Some(ChatEvent::LoadingChanged { loading: false }));
    }

    #[tokio::test]
    async fn test_older_list_keeps_newly_created_session() {
        let (chat, transport) = setup().await;
        transport.hold_lists();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.load_sessions().await })
        };
        transport.list_started.notified().await;

        let created = chat.create_session().await.unwrap();
        transport.release_list.notify_one();
        task.await.unwrap().unwrap();

        assert_eq!(chat.current_session_id().await, Some(created.id.clone()));
        let ids: Vec<String> = chat.sessions().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![created.id, "a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_is_skipped_while_sending() {
        let (chat, transport) = setup().await;
        transport.hold_sends();

        let task = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("hello").await })
        };
        transport.send_started.notified().await;

        assert_eq!(chat.refresh_messages().await.unwrap(), FetchOutcome::Skipped);
        assert_eq!(transport.call_count("messages"), 0);

        transport.release_send.notify_one();
        task.await.unwrap().unwrap();
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn test_switch_replaces_messages() {
        let (chat, _transport) = setup().await;
        assert_eq!(chat.messages().await.len(), 2);

        let outcome = chat.select_session("b").await.unwrap();

        assert_eq!(outcome, FetchOutcome::Applied { count: 1 });
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "b-1");
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_new_id_with_empty_list() {
        let (chat, transport) = setup().await;
        transport.fail("get");

        let err = chat.select_session("b").await.unwrap_err();

        assert!(matches!(err, ChatError::LoadMessages(_)));
        assert_eq!(chat.current_session_id().await.as_deref(), Some("b"));
        assert!(chat.messages().await.is_empty());
        assert_eq!(chat.error().await.as_deref(), Some("Failed to load messages."));
    }

    #[tokio::test]
    async fn test_new_chat_hides_but_keeps_previous_history() {
        let (chat, _transport) = setup().await;

        let created = chat.create_session().await.unwrap();

        let state = chat.snapshot().await;
        assert_eq!(state.current_session_id(), Some(created.id.as_str()));
        assert!(state.messages().is_empty());
        assert_eq!(state.sessions()[0].id, created.id);
        assert_eq!(state.sessions().len(), 3);

        chat.select_session("a").await.unwrap();
        let ids: Vec<String> = chat.messages().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a-1", "a-2"]);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_state_untouched() {
        let (chat, transport) = setup().await;
        transport.fail("create");
        let before = chat.snapshot().await;

        let err = chat.create_session().await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to create session.");
        let after = chat.snapshot().await;
        assert_eq!(after.sessions(), before.sessions());
        assert_eq!(after.messages(), before.messages());
        assert_eq!(after.current_session_id(), Some("a"));
        assert_eq!(after.error(), Some("Failed to create session."));
    }

    #[tokio::test]
    async fn test_create_success_clears_error() {
        let (chat, transport) = setup().await;
        transport.fail("list");
        chat.load_sessions().await.unwrap_err();
        assert!(chat.error().await.is_some());

        chat.create_session().await.unwrap();
        assert!(chat.error().await.is_none());
    }

    #[tokio::test]
    async fn test_delete_active_clears_view() {
        let (chat, transport) = setup().await;

        chat.delete_session("a").await.unwrap();

        let state = chat.snapshot().await;
        assert!(state.current_session_id().is_none());
        assert!(state.messages().is_empty());
        assert!(state.sessions().iter().all(|s| s.id != "a"));
        assert_eq!(transport.call_count("delete:a"), 1);
    }

    #[tokio::test]
    async fn test_delete_other_session_keeps_view() {
        let (chat, _transport) = setup().await;
        let before = chat.messages().await;

        chat.delete_session("b").await.unwrap();

        assert_eq!(chat.current_session_id().await.as_deref(), Some("a"));
        assert_eq!(chat.messages().await, before);
        assert_eq!(chat.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_mutates_nothing() {
        let (chat, transport) = setup().await;
        transport.fail("delete");

        let err = chat.delete_session("a").await.unwrap_err();

        assert!(matches!(err, ChatError::DeleteSession(_)));
        assert_eq!(chat.current_session_id().await.as_deref(), Some("a"));
        assert_eq!(chat.messages().await.len(), 2);
        assert_eq!(chat.sessions().await.len(), 2);
        assert_eq!(chat.error().await.as_deref(), Some("Failed to delete session."));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_list() {
        let (chat, transport) = setup().await;
        let before = chat.sessions().await;
        transport.fail("list");

        let err = chat.load_sessions().await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to load sessions.");
        assert_eq!(chat.sessions().await, before);
        assert_eq!(chat.current_session_id().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_unrelated_success_does_not_clear_error() {
        let (chat, transport) = setup().await;
        transport.fail("delete");
        chat.delete_session("b").await.unwrap_err();

        chat.load_sessions().await.unwrap();

        assert_eq!(chat.error().await.as_deref(), Some("Failed to delete session."));
    }

    #[tokio::test]
    async fn test_reload_clears_dangling_active_session() {
        let (chat, transport) = setup().await;
        // removed behind our back, e.g. from another client
        transport.sessions.lock().unwrap().retain(|s| s.id != "a");

        chat.load_sessions().await.unwrap();

        let state = chat.snapshot().await;
        assert!(state.current_session_id().is_none());
        assert!(state.messages().is_empty());
        assert_eq!(state.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_select_unlisted_session_adds_it() {
        let transport = FakeTransport::new().with_session("a", history("a"));
        let chat = ChatOrchestrator::new(transport);

        chat.select_session("a").await.unwrap();

        let state = chat.snapshot().await;
        assert_eq!(state.sessions().len(), 1);
        assert_eq!(state.current_session().map(|s| s.id.as_str()), Some("a"));
    }

    #[tokio::test]
    async fn test_refresh_replaces_temporary_ids() {
        let (chat, _transport) = setup().await;
        chat.send_message("Build a footer").await.unwrap();
        assert!(chat.messages().await.iter().any(Message::is_optimistic));

        let outcome = chat.refresh_messages().await.unwrap();

        assert_eq!(outcome, FetchOutcome::Applied { count: 4 });
        assert!(!chat.messages().await.iter().any(Message::is_optimistic));
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn test_send_publishes_loading_transitions() {
        let (chat, _transport) = setup().await;
        let mut rx = chat.subscribe();

        chat.send_message("hello").await.unwrap();

        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope.event);
        }

        let loading: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::LoadingChanged { loading } => Some(*loading),
                _ => None,
            })
            .collect();
        assert_eq!(loading, vec![true, false]);
        assert!(events.contains(&ChatEvent::MessagesChanged {
            session_id: Some("a".to_string()),
            count: 4,
        }));
    }

    #[tokio::test]
    async fn test_failure_publishes_error() {
        let (chat, transport) = setup().await;
        let mut rx = chat.subscribe();
        transport.fail("list");

        chat.load_sessions().await.unwrap_err();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(
            envelope.event,
            ChatEvent::ErrorChanged {
                error: Some("Failed to load sessions.".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_skipped_send_is_silent() {
        let (chat, _transport) = setup().await;
        let mut rx = chat.subscribe();

        chat.send_message("\n\t ").await.unwrap();

        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_call_log_shape() {
    let (chat, transport) = setup().await;
    chat.send_message("hi").await.unwrap();

    assert_eq!(transport.calls(), vec!["list", "get:a", "send:a"]);
}
