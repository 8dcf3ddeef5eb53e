/// Remote assistant access for the consulting prep chat
///
/// This module owns the wire format of the automation webhook and the
/// `ChatBackend` seam the chat controller talks through.
///
/// # Architecture
///
/// - `client` - error taxonomy, request body and the `ChatBackend` trait
/// - `webhook` - reqwest implementation posting JSON to the webhook
///
/// # Usage
///
/// ```rust,no_run
/// use consulting_prep::ai::{ChatBackend, WebhookBackend, WebhookRequest};
/// use consulting_prep::session::Session;
///
/// # async fn example() -> anyhow::Result<()> {
/// let session = Session::start();
/// let backend = WebhookBackend::new("https://example.com/webhook/prep")?;
/// let reply = backend
///     .send(&WebhookRequest::new("Hello!", session.id()))
///     .await?;
/// # Ok(())
/// # }
/// ```
mod client;
mod webhook;

pub use client::{ChatBackend, ChatError, ChatResult, WebhookRequest};
pub use webhook::{WebhookBackend, decode_reply};
