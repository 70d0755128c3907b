//! Per-conversation engines and the registry that owns them.
//!
//! Each independent tool-invocation stream gets its own stack. Within one
//! conversation requests are serialized by a `tokio::sync::Mutex`, which
//! grants the lock in FIFO order, so concurrent requests resolve in arrival
//! order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::diary::{DiaryObserver, NullDiary};
use crate::engine::{Decision, EngineSnapshot, EnforcementEngine, GuardError};
use crate::operation::Operation;
use crate::session::SessionId;

/// Opaque identifier of one top-level conversation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One conversation's engine behind a fair mutex.
#[derive(Debug)]
pub struct ConversationEngine {
    id: ConversationId,
    engine: Mutex<EnforcementEngine>,
}

impl ConversationEngine {
    pub fn new(id: ConversationId, engine: EnforcementEngine) -> Self {
        Self {
            id,
            engine: Mutex::new(engine),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub async fn handle(&self, operation: Operation) -> Decision {
        self.engine.lock().await.handle(operation)
    }

    pub async fn handle_in(&self, session: &SessionId, operation: Operation) -> Decision {
        self.engine.lock().await.handle_in(session, operation)
    }

    /// Guarded call: the lock is held across `run`, so no other request can
    /// interleave between the decision and the commit.
    pub async fn handle_with<F, Fut, T, E>(
        &self,
        operation: Operation,
        run: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut engine = self.engine.lock().await;
        engine.begin(&operation).map_err(GuardError::Denied)?;
        match run().await {
            Ok(value) => engine
                .complete(&operation)
                .map(|()| value)
                .map_err(GuardError::Denied),
            Err(err) => {
                engine.abandon(&operation);
                Err(GuardError::Failed(err))
            }
        }
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn depth(&self) -> usize {
        self.engine.lock().await.depth()
    }

    /// Run `f` with exclusive access, e.g. to read the decision history.
    pub async fn inspect<R>(&self, f: impl FnOnce(&EnforcementEngine) -> R) -> R {
        let engine = self.engine.lock().await;
        f(&engine)
    }
}

/// Maps conversations to their engines. Stacks are never shared.
#[derive(Debug)]
pub struct ConversationRegistry {
    config: EngineConfig,
    diary: Arc<dyn DiaryObserver>,
    conversations: Mutex<HashMap<ConversationId, Arc<ConversationEngine>>>,
}

impl ConversationRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            diary: Arc::new(NullDiary),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: diary observer shared by every conversation
    pub fn with_diary(mut self, diary: Arc<dyn DiaryObserver>) -> Self {
        self.diary = diary;
        self
    }

    pub async fn get_or_create(&self, id: &ConversationId) -> Arc<ConversationEngine> {
        let mut conversations = self.conversations.lock().await;
        if let Some(existing) = conversations.get(id) {
            return Arc::clone(existing);
        }

        let engine =
            EnforcementEngine::from_config(&self.config).with_diary(Arc::clone(&self.diary));
        let conversation = Arc::new(ConversationEngine::new(id.clone(), engine));
        conversations.insert(id.clone(), Arc::clone(&conversation));
        tracing::debug!(conversation = %id, "Conversation engine created");
        conversation
    }

    pub async fn get(&self, id: &ConversationId) -> Option<Arc<ConversationEngine>> {
        self.conversations.lock().await.get(id).cloned()
    }

    /// Drop a finished conversation. In-flight handles stay usable.
    pub async fn remove(&self, id: &ConversationId) -> Option<Arc<ConversationEngine>> {
        self.conversations.lock().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.conversations.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.lock().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<ConversationId> {
        let conversations = self.conversations.lock().await;
        let mut ids: Vec<ConversationId> = conversations.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
