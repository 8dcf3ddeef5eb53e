//! Chat session controller.
//!
//! Owns the transcript, the pending input and the busy flag for one session
//! and runs one webhook exchange per submitted message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ai::{ChatBackend, ChatError, WebhookRequest};
use crate::session::Session;
use crate::types::{ChatMessage, Role};

/// Assistant text shown whenever the exchange fails to produce a reply.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

// ============================================
// Transcript
// ============================================

/// Append-only list of exchanged messages, in display order.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

// ============================================
// Busy Flag
// ============================================

/// Read-only view of the controller's busy state.
#[derive(Clone, Debug, Default)]
pub struct BusyHandle(Arc<AtomicBool>);

impl BusyHandle {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) -> BusyGuard {
        self.0.store(true, Ordering::Release);
        BusyGuard(Arc::clone(&self.0))
    }
}

/// Clears the busy flag when dropped, whichever way the exchange ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================
// Controller
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Input was empty or whitespace; nothing was appended or sent.
    Ignored,
    /// The webhook answered and its output was appended.
    Replied,
    /// The exchange failed and the fallback reply was appended.
    Fallback(ChatError),
}

pub struct ChatController<B> {
    session: Session,
    backend: B,
    transcript: Transcript,
    input: String,
    busy: BusyHandle,
}

impl<B: ChatBackend> ChatController<B> {
    pub fn new(session: Session, backend: B) -> Self {
        Self {
            session,
            backend,
            transcript: Transcript::default(),
            input: String::new(),
            busy: BusyHandle::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_handle(&self) -> BusyHandle {
        self.busy.clone()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submit whatever is in the input buffer.
    pub async fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.input.clone();
        self.submit(&text).await
    }

    /// Send one user message and append exactly one assistant reply.
    ///
    /// Blank input is ignored. Every failure past that point ends in
    /// [`FALLBACK_REPLY`]; nothing is returned as an error.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.transcript.push(ChatMessage::user(text));
        self.input.clear();

        let _busy = self.busy.acquire();
        let request = WebhookRequest::new(text, self.session.id());

        match self.backend.send(&request).await {
            Ok(output) => {
                self.transcript.push(ChatMessage::assistant(output));
                SubmitOutcome::Replied
            }
            Err(err) => {
                if err.is_transport() {
                    tracing::warn!(session = %self.session.id(), error = %err, "webhook request failed");
                } else {
                    tracing::warn!(session = %self.session.id(), error = %err, "webhook reply unusable");
                }
                self.transcript.push(ChatMessage::assistant(FALLBACK_REPLY));
                SubmitOutcome::Fallback(err)
            }
        }
    }

    /// Messages appended from `from` onwards, for incremental rendering.
    pub fn messages_since(&self, from: usize) -> &[ChatMessage] {
        self.transcript.messages().get(from..).unwrap_or_default()
    }

    /// Number of replies the assistant has produced so far, fallbacks included.
    pub fn reply_count(&self) -> usize {
        self.transcript
            .iter()
            .filter(|msg| msg.role == Role::Assistant)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatResult;
    use crate::session::SessionId;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted backend that records every request and the busy state seen
    /// while it was called.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<ChatResult<String>>>,
        requests: Mutex<Vec<WebhookRequest>>,
        busy_seen: Mutex<Vec<bool>>,
        busy: Mutex<Option<BusyHandle>>,
    }

    impl ScriptedBackend {
        fn with_replies(replies: Vec<ChatResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::from(replies)),
                ..Self::default()
            })
        }

        fn watch(&self, handle: BusyHandle) {
            *self.busy.lock().unwrap() = Some(handle);
        }

        fn requests(&self) -> Vec<WebhookRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, request: &WebhookRequest) -> ChatResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(handle) = self.busy.lock().unwrap().as_ref() {
                self.busy_seen.lock().unwrap().push(handle.is_busy());
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ChatError::Transport("no scripted reply".into())))
        }
    }

    fn controller(backend: &Arc<ScriptedBackend>) -> ChatController<Arc<ScriptedBackend>> {
        let session = Session::with_id(SessionId::from("1718000000000123".to_string()));
        let controller = ChatController::new(session, Arc::clone(backend));
        backend.watch(controller.busy_handle());
        controller
    }

    fn roles_and_text(controller: &ChatController<Arc<ScriptedBackend>>) -> Vec<(Role, String)> {
        controller
            .transcript()
            .iter()
            .map(|msg| (msg.role, msg.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn successful_reply_is_appended_verbatim() {
        let backend = ScriptedBackend::with_replies(vec![Ok(
            "Start with **top-down** sizing.".to_string()
        )]);
        let mut chat = controller(&backend);

        let outcome = chat
            .submit("What frameworks should I use for a market-sizing case?")
            .await;

        assert_eq!(outcome, SubmitOutcome::Replied);
        assert_eq!(
            roles_and_text(&chat),
            vec![
                (
                    Role::User,
                    "What frameworks should I use for a market-sizing case?".to_string()
                ),
                (Role::Assistant, "Start with **top-down** sizing.".to_string()),
            ]
        );
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let backend = ScriptedBackend::with_replies(vec![Ok("unused".to_string())]);
        let mut chat = controller(&backend);

        for blank in ["", "   ", "\n\t "] {
            assert_eq!(chat.submit(blank).await, SubmitOutcome::Ignored);
        }

        assert!(chat.transcript().is_empty());
        assert!(backend.requests().is_empty());
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn decode_failure_appends_fallback() {
        let backend =
            ScriptedBackend::with_replies(vec![Err(ChatError::Decode("expected value".into()))]);
        let mut chat = controller(&backend);

        let outcome = chat.submit("hello").await;

        assert!(matches!(outcome, SubmitOutcome::Fallback(ChatError::Decode(_))));
        assert_eq!(
            roles_and_text(&chat),
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, FALLBACK_REPLY.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn transport_failure_appends_fallback_and_clears_busy() {
        let backend = ScriptedBackend::with_replies(vec![Err(ChatError::Transport(
            "connection refused".into(),
        ))]);
        let mut chat = controller(&backend);

        chat.submit("hello").await;

        assert_eq!(
            roles_and_text(&chat),
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, FALLBACK_REPLY.to_string()),
            ]
        );
        assert!(!chat.is_busy());
        assert_eq!(*backend.busy_seen.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn missing_output_appends_fallback() {
        let backend = ScriptedBackend::with_replies(vec![Err(ChatError::MissingOutput)]);
        let mut chat = controller(&backend);

        assert_eq!(
            chat.submit("hello").await,
            SubmitOutcome::Fallback(ChatError::MissingOutput)
        );
        assert_eq!(chat.transcript().last().unwrap().content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn session_id_is_stable_across_submissions() {
        let backend =
            ScriptedBackend::with_replies(vec![Ok("one".to_string()), Ok("two".to_string())]);
        let mut chat = controller(&backend);

        chat.submit("first").await;
        chat.submit("second").await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].sessionid, "1718000000000123");
        assert_eq!(requests[1].sessionid, "1718000000000123");
        assert_eq!(requests[0].message, "first");
        assert_eq!(requests[1].message, "second");
        assert_eq!(chat.transcript().len(), 4);
        assert_eq!(chat.reply_count(), 2);
    }

    #[tokio::test]
    async fn user_text_is_sent_untrimmed() {
        let backend = ScriptedBackend::with_replies(vec![Ok("ok".to_string())]);
        let mut chat = controller(&backend);

        chat.submit("  spaced out  ").await;

        assert_eq!(backend.requests()[0].message, "  spaced out  ");
        assert_eq!(chat.transcript().messages()[0].content, "  spaced out  ");
    }

    #[tokio::test]
    async fn submit_input_clears_buffer() {
        let backend = ScriptedBackend::with_replies(vec![Ok("ok".to_string())]);
        let mut chat = controller(&backend);

        chat.set_input("guesstimate practice");
        assert_eq!(chat.submit_input().await, SubmitOutcome::Replied);

        assert_eq!(chat.input(), "");
        assert_eq!(backend.requests()[0].message, "guesstimate practice");
    }

    #[tokio::test]
    async fn blank_submit_keeps_buffer() {
        let backend = ScriptedBackend::with_replies(vec![]);
        let mut chat = controller(&backend);

        chat.set_input("  ");
        assert_eq!(chat.submit_input().await, SubmitOutcome::Ignored);
        assert_eq!(chat.input(), "  ");
    }

    #[tokio::test]
    async fn messages_since_returns_new_tail() {
        let backend = ScriptedBackend::with_replies(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let mut chat = controller(&backend);

        chat.submit("q1").await;
        let seen = chat.transcript().len();
        chat.submit("q2").await;

        let tail: Vec<_> = chat
            .messages_since(seen)
            .iter()
            .map(|msg| msg.content.as_str())
            .collect();
        assert_eq!(tail, vec!["q2", "b"]);
        assert!(chat.messages_since(10).is_empty());
    }

    /// Backend that never answers, so the submit future can be dropped
    /// mid-flight.
    struct StalledBackend;

    #[async_trait]
    impl ChatBackend for StalledBackend {
        async fn send(&self, _request: &WebhookRequest) -> ChatResult<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn dropping_in_flight_submit_clears_busy() {
        let mut chat = ChatController::new(Session::start(), StalledBackend);
        let busy = chat.busy_handle();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            chat.submit("anyone there?"),
        )
        .await;

        assert!(result.is_err());
        assert!(!busy.is_busy());
        assert_eq!(chat.transcript().len(), 1);
    }
}
