use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::ChatError;
use crate::llm_client::SharedLlmClient;
use crate::store::SharedDocumentStore;

use super::context::{Category, CollectionSnapshot, ContextBuilder};
use super::prompt::{self, ChatMessage};

pub type SharedChatPipeline = Arc<ChatPipeline>;

/// The per-request read -> format -> assemble -> complete pipeline behind
/// the chatbot endpoint. Holds no request state; every answer is rebuilt
/// from the current store contents.
pub struct ChatPipeline {
    store: SharedDocumentStore,
    llm: SharedLlmClient,
    context: ContextBuilder,
}

impl ChatPipeline {
    pub fn new(store: SharedDocumentStore, llm: SharedLlmClient, context: ContextBuilder) -> Self {
        Self {
            store,
            llm,
            context,
        }
    }

    /// Fetch all three collections concurrently. A single failed read fails
    /// the whole snapshot; there is no partial-context mode.
    pub async fn snapshot(&self) -> Result<CollectionSnapshot, ChatError> {
        let (events, fundraising, internships) = tokio::try_join!(
            self.store.list_all(Category::Events.collection()),
            self.store.list_all(Category::Fundraising.collection()),
            self.store.list_all(Category::Internships.collection()),
        )
        .map_err(ChatError::StoreUnavailable)?;

        Ok(CollectionSnapshot {
            events,
            fundraising,
            internships,
        })
    }

    pub fn context_block(&self, snapshot: &CollectionSnapshot) -> String {
        self.context.build(snapshot)
    }

    /// Build the exact message sequence a request would send, without
    /// calling the completion service.
    pub async fn assemble(&self, user_message: &str) -> Result<Vec<ChatMessage>, ChatError> {
        let snapshot = self.snapshot().await?;
        let block = self.context_block(&snapshot);
        Ok(prompt::assemble(&block, user_message))
    }

    #[instrument(skip_all, fields(message_len = user_message.len()))]
    pub async fn answer(&self, user_message: &str) -> Result<String, ChatError> {
        let messages = self.assemble(user_message).await?;
        let reply = self
            .llm
            .complete(&messages)
            .await
            .map_err(ChatError::CompletionFailed)?;

        info!(reply_len = reply.len(), "Completion returned");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use crate::chat::context::PREAMBLE;
    use crate::chat::prompt::{ChatMessage, Role, ASSISTANT_DIRECTIVE};
    use crate::llm_client::LlmClient;
    use crate::store::MockDocumentStore;

    use super::*;

    /// Captures every call so tests can inspect the assembled sequences.
    #[derive(Default)]
    struct RecordingLlmClient {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
        reply: String,
    }

    impl RecordingLlmClient {
        fn with_reply(reply: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().expect("calls lock poisoned").clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingLlmClient {
        async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            self.calls
                .lock()
                .expect("calls lock poisoned")
                .push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn pipeline_with(
        store: Arc<MockDocumentStore>,
        llm: Arc<RecordingLlmClient>,
    ) -> ChatPipeline {
        ChatPipeline::new(store, llm, ContextBuilder::default())
    }

    #[tokio::test]
    async fn single_event_round_trip() {
        let store = Arc::new(MockDocumentStore::default());
        store.insert(
            "events",
            json!({
                "title": "Reunion 2024",
                "date": "2024-12-01",
                "location": "Campus Hall",
            }),
        );
        let llm = Arc::new(RecordingLlmClient::with_reply("It is on 2024-12-01."));
        let pipeline = pipeline_with(store, llm.clone());

        let reply = pipeline
            .answer("When is the reunion?")
            .await
            .expect("pipeline answer");
        assert_eq!(reply, "It is on 2024-12-01.");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, ASSISTANT_DIRECTIVE);

        let context = &messages[1].content;
        assert_eq!(
            context.lines().filter(|line| line.starts_with("- ")).count(),
            1
        );
        assert!(context.contains("Events:"));
        assert!(context.contains("Reunion 2024"));
        assert!(context.contains("2024-12-01"));
        assert!(context.contains("Campus Hall"));
        assert!(!context.contains("Fundraising Campaigns:"));
        assert!(!context.contains("Internships:"));

        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, "When is the reunion?");
    }

    #[tokio::test]
    async fn empty_store_still_reaches_completion() {
        let store = Arc::new(MockDocumentStore::default());
        let llm = Arc::new(RecordingLlmClient::with_reply("Nothing scheduled."));
        let pipeline = pipeline_with(store, llm.clone());

        pipeline.answer("Anything going on?").await.expect("answer");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][1].content, PREAMBLE);
    }

    #[tokio::test]
    async fn one_failed_read_fails_the_whole_request() {
        let store = Arc::new(MockDocumentStore::default());
        store.insert("events", json!({ "title": "Meetup" }));
        store.insert("internships", json!({ "title": "Intern", "company": "Acme" }));
        store.set_unavailable("fundraising");

        let llm = Arc::new(RecordingLlmClient::with_reply("unused"));
        let pipeline = pipeline_with(store, llm.clone());

        let err = pipeline
            .answer("What campaigns are running?")
            .await
            .expect_err("fundraising read fails the request");
        assert!(matches!(err, ChatError::StoreUnavailable(_)));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn assembly_is_idempotent_for_unchanged_store() {
        let store = Arc::new(MockDocumentStore::default());
        store.insert("events", json!({ "title": "Meetup", "date": "2025-01-15" }));
        let llm = Arc::new(RecordingLlmClient::default());
        let pipeline = pipeline_with(store, llm);

        let first = pipeline.assemble("hello").await.expect("first assembly");
        let second = pipeline.assemble("hello").await.expect("second assembly");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn completion_failure_maps_to_taxonomy() {
        struct FailingLlmClient;

        #[async_trait::async_trait]
        impl LlmClient for FailingLlmClient {
            async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
                anyhow::bail!("boom")
            }
        }

        let store = Arc::new(MockDocumentStore::default());
        let pipeline =
            ChatPipeline::new(store, Arc::new(FailingLlmClient), ContextBuilder::default());

        let err = pipeline.answer("hi").await.expect_err("completion fails");
        assert!(matches!(err, ChatError::CompletionFailed(_)));
    }
}
