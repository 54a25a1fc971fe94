//! KnowledgeActor — the advisor's knowledge refresh and retrieval service.
//!
//! Wraps a [`KnowledgePipeline`] behind an actor mailbox. Messages are
//! handled to completion in arrival order: a turn sends `MaybeRefresh`
//! followed by `RetrieveContext`, so the retrieval is processed only after
//! any triggered refresh has finished. Concurrent turns remain safe —
//! upserts are idempotent by content hash — and the mailbox bounds
//! duplicate refresh work without any locking.

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};

use shared_types::{RefreshOutcome, RefreshReport};

use crate::knowledge::KnowledgePipeline;

#[derive(Debug, Default)]
pub struct KnowledgeActor;

/// Collaborators are injected here so tests can spawn the actor over
/// deterministic fakes.
pub struct KnowledgeArguments {
    pub pipeline: KnowledgePipeline,
}

pub struct KnowledgeState {
    pipeline: KnowledgePipeline,
}

#[derive(Debug)]
pub enum KnowledgeMsg {
    /// Gate-check an utterance and, when triggered, refresh to completion.
    MaybeRefresh {
        utterance: String,
        reply: RpcReplyPort<RefreshOutcome>,
    },

    /// Unconditionally run one refresh cycle.
    Refresh {
        reply: Option<RpcReplyPort<RefreshReport>>,
    },

    /// Build the newline-joined answer context for an utterance.
    RetrieveContext {
        utterance: String,
        reply: RpcReplyPort<String>,
    },
}

#[async_trait]
impl Actor for KnowledgeActor {
    type Msg = KnowledgeMsg;
    type State = KnowledgeState;
    type Arguments = KnowledgeArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("KnowledgeActor started");
        Ok(KnowledgeState {
            pipeline: args.pipeline,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            KnowledgeMsg::MaybeRefresh { utterance, reply } => {
                let outcome = state.pipeline.maybe_refresh(&utterance).await;
                let _ = reply.send(outcome);
            }

            KnowledgeMsg::Refresh { reply } => {
                let report = state.pipeline.refresh().await;
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }

            KnowledgeMsg::RetrieveContext { utterance, reply } => {
                let context = state.pipeline.retrieve_context(&utterance).await;
                let _ = reply.send(context);
            }
        }

        Ok(())
    }
}
