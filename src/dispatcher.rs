//! Dispatcher / event loop
//!
//! Pulls updates off the transport and spawns one task per event. Tasks share
//! nothing in process; each re-reads the session from the store, so the store
//! stays the single source of truth and two near-simultaneous events for the
//! same user resolve last-writer-wins.

use crate::engine::event::{CallbackAction, Command};
use crate::engine::render::Reply;
use crate::engine::{Engine, EngineError};
use crate::gateway::AnalysisGateway;
use crate::i18n::{text, Language, Msg};
use crate::store::SessionStore;
use crate::transport::{ChatId, Incoming, OutgoingMessage, Transport, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(2);

pub struct Dispatcher<S, G, T> {
    engine: Arc<Engine<S, G>>,
    transport: Arc<T>,
    shutdown: CancellationToken,
}

impl<S, G, T> Dispatcher<S, G, T>
where
    S: SessionStore + 'static,
    G: AnalysisGateway + 'static,
    T: Transport + 'static,
{
    pub fn new(engine: Engine<S, G>, transport: T, shutdown: CancellationToken) -> Self {
        Self {
            engine: Arc::new(engine),
            transport: Arc::new(transport),
            shutdown,
        }
    }

    /// Run until the shutdown token fires. In-flight event tasks are not
    /// interrupted; the loop just stops accepting new updates.
    pub async fn run(self) {
        tracing::info!("dispatcher started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                polled = self.transport.poll() => match polled {
                    Ok(updates) => {
                        for update in updates {
                            let engine = Arc::clone(&self.engine);
                            let transport = Arc::clone(&self.transport);
                            tokio::spawn(handle_update(engine, transport, update));
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "poll failed, backing off");
                        tokio::time::sleep(POLL_BACKOFF).await;
                    }
                },
            }
        }
        tracing::info!("dispatcher stopped");
    }
}

async fn handle_update<S, G, T>(engine: Arc<Engine<S, G>>, transport: Arc<T>, update: Update)
where
    S: SessionStore,
    G: AnalysisGateway,
    T: Transport,
{
    match update {
        Update::Message(incoming) => {
            let lang = engine.language(&incoming.user).await;
            let chat = incoming.chat;
            let outcome = route_message(&engine, &transport, &incoming, lang).await;
            finish(&*transport, chat, lang, outcome).await;
        }
        Update::Callback(query) => match CallbackAction::parse(&query.data) {
            Some(action) => {
                let lang = engine.language(&query.user).await;
                let chat = query.message.chat;
                let outcome = engine
                    .callback(&query.user, lang, &query.id, query.message, action)
                    .await;
                finish(&*transport, chat, lang, outcome).await;
            }
            None => {
                // Unknown payload tag: no state mutation, no visible effect.
                tracing::debug!(data = %query.data, "dropping unrecognized callback");
                if let Err(error) = transport.answer_callback(&query.id, None).await {
                    tracing::debug!(%error, "failed to answer dropped callback");
                }
            }
        },
        Update::Other => {}
    }
}

/// Classify a plain message: command, free text, or media. Messages with
/// none of those are dropped without a reply.
async fn route_message<S, G, T>(
    engine: &Engine<S, G>,
    transport: &T,
    incoming: &Incoming,
    lang: Language,
) -> Result<Vec<Reply>, EngineError>
where
    S: SessionStore,
    G: AnalysisGateway,
    T: Transport,
{
    if let Some(body) = &incoming.text {
        return match Command::parse(body) {
            Some(command) => engine.command(&incoming.user, lang, command).await,
            None => engine.free_text(&incoming.user, lang, body).await,
        };
    }

    if let Some(media) = &incoming.media {
        return match transport.download(media).await {
            Ok(bytes) => engine.media(&incoming.user, lang, bytes).await,
            Err(error) => {
                tracing::warn!(%error, "media download failed");
                Ok(vec![Reply::send(text(lang, Msg::ErrGeneric))])
            }
        };
    }

    Ok(vec![])
}

async fn finish<T: Transport + ?Sized>(
    transport: &T,
    chat: ChatId,
    lang: Language,
    outcome: Result<Vec<Reply>, EngineError>,
) {
    match outcome {
        Ok(replies) => deliver(transport, chat, replies).await,
        Err(error) => {
            // Store trouble aborted the transition; tell the user to retry.
            tracing::error!(%error, "event handling failed");
            let message = OutgoingMessage::text(text(lang, Msg::ErrGeneric));
            if let Err(error) = transport.send(chat, message).await {
                tracing::warn!(%error, "failed to deliver error message");
            }
        }
    }
}

async fn deliver<T: Transport + ?Sized>(transport: &T, chat: ChatId, replies: Vec<Reply>) {
    for reply in replies {
        let result = match reply {
            Reply::Send { text, keyboard } => transport
                .send(chat, OutgoingMessage { text, keyboard })
                .await
                .map(|_| ()),
            Reply::Edit {
                target,
                text,
                keyboard,
            } => transport.edit(target, OutgoingMessage { text, keyboard }).await,
            Reply::Answer { callback_id, alert } => {
                transport.answer_callback(&callback_id, alert.as_deref()).await
            }
        };
        if let Err(error) = result {
            tracing::warn!(%error, "transport delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{MemorySessionStore, StubGateway};
    use crate::transport::{CallbackQuery, MediaRef, MessageRef, TransportError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTransport {
        batches: Mutex<VecDeque<Vec<Update>>>,
        sent: Mutex<Vec<(ChatId, String)>>,
        edited: Mutex<Vec<(MessageRef, String)>>,
        answered: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn poll(&self) -> Result<Vec<Update>, TransportError> {
            if let Some(batch) = self.batches.lock().unwrap().pop_front() {
                return Ok(batch);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![])
        }

        async fn send(
            &self,
            chat: ChatId,
            message: OutgoingMessage,
        ) -> Result<MessageRef, TransportError> {
            self.sent.lock().unwrap().push((chat, message.text));
            Ok(MessageRef {
                chat,
                message_id: 1,
            })
        }

        async fn edit(
            &self,
            target: MessageRef,
            message: OutgoingMessage,
        ) -> Result<(), TransportError> {
            self.edited.lock().unwrap().push((target, message.text));
            Ok(())
        }

        async fn answer_callback(
            &self,
            callback_id: &str,
            alert: Option<&str>,
        ) -> Result<(), TransportError> {
            self.answered
                .lock()
                .unwrap()
                .push((callback_id.to_string(), alert.map(String::from)));
            Ok(())
        }

        async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>, TransportError> {
            Ok(vec![0xff])
        }
    }

    fn engine() -> Arc<Engine<MemorySessionStore, StubGateway>> {
        Arc::new(Engine::new(
            MemorySessionStore::new(),
            StubGateway::new(),
            Language::En,
        ))
    }

    fn message(user: &str, body: Option<&str>, media: Option<&str>) -> Update {
        Update::Message(Incoming {
            user: user.to_string(),
            chat: ChatId(1),
            text: body.map(String::from),
            media: media.map(|id| MediaRef {
                file_id: id.to_string(),
            }),
        })
    }

    fn callback(user: &str, data: &str) -> Update {
        Update::Callback(CallbackQuery {
            id: "cb-1".to_string(),
            user: user.to_string(),
            message: MessageRef {
                chat: ChatId(1),
                message_id: 9,
            },
            data: data.to_string(),
        })
    }

    #[tokio::test]
    async fn command_message_is_routed_and_replied() {
        let engine = engine();
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            message("u1", Some("/help"), None),
        )
        .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("/auto"));
    }

    #[tokio::test]
    async fn recognized_callback_reaches_the_engine() {
        let engine = engine();
        engine
            .callback(
                "u1",
                Language::En,
                "seed",
                MessageRef {
                    chat: ChatId(1),
                    message_id: 9,
                },
                CallbackAction::Passage(1),
            )
            .await
            .unwrap();
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            callback("u1", "digit:3"),
        )
        .await;

        // The press was acknowledged and the keypad re-rendered.
        assert_eq!(transport.answered.lock().unwrap().len(), 1);
        let edited = transport.edited.lock().unwrap();
        assert_eq!(edited.len(), 1);
        assert!(edited[0].1.contains("📝 3"));
    }

    #[tokio::test]
    async fn unrecognized_callback_is_answered_silently() {
        let engine = engine();
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            callback("u1", "explode:now"),
        )
        .await;

        assert_eq!(
            transport.answered.lock().unwrap().as_slice(),
            &[("cb-1".to_string(), None)]
        );
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(transport.edited.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unclassifiable_message_is_dropped() {
        let engine = engine();
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            message("u1", None, None),
        )
        .await;

        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn media_is_downloaded_and_routed() {
        let engine = engine();
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            message("u1", None, Some("file-1")),
        )
        .await;

        // Fresh session is in Start, so the sample is rejected politely.
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, text(Language::En, Msg::ErrUnexpectedSample));
    }

    #[tokio::test]
    async fn store_outage_produces_generic_retry_message() {
        let store = MemorySessionStore::new();
        store.set_failing(true);
        let engine = Arc::new(Engine::new(store, StubGateway::new(), Language::En));
        let transport = Arc::new(MockTransport::default());

        handle_update(
            Arc::clone(&engine),
            Arc::clone(&transport),
            message("u1", Some("/start"), None),
        )
        .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, text(Language::En, Msg::ErrGeneric));
    }

    #[tokio::test]
    async fn run_drains_updates_and_stops_on_shutdown() {
        let engine = Engine::new(MemorySessionStore::new(), StubGateway::new(), Language::En);
        let transport = MockTransport::default();
        transport
            .batches
            .lock()
            .unwrap()
            .push_back(vec![message("u1", Some("/help"), None)]);

        let shutdown = CancellationToken::new();
        let dispatcher = Dispatcher::new(engine, transport, shutdown.clone());
        let transport_view = Arc::clone(&dispatcher.transport);

        let runner = tokio::spawn(dispatcher.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .expect("dispatcher should stop promptly")
            .unwrap();

        assert_eq!(transport_view.sent.lock().unwrap().len(), 1);
    }
}
