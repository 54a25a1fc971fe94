use std::sync::Arc;

use ractor::ActorRef;

use crate::actors::KnowledgeMsg;
use crate::completion::CompletionProvider;

/// Shared handle to the service's long-lived collaborators: the knowledge
/// actor and the completion provider.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    knowledge: ActorRef<KnowledgeMsg>,
    completion: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(knowledge: ActorRef<KnowledgeMsg>, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                knowledge,
                completion,
            }),
        }
    }

    pub fn knowledge(&self) -> ActorRef<KnowledgeMsg> {
        self.inner.knowledge.clone()
    }

    pub fn completion(&self) -> Arc<dyn CompletionProvider> {
        self.inner.completion.clone()
    }
}
