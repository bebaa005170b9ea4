//! Reconcile Worker - Single Writer for Generated Assets
//!
//! 所有生成完成的资源都经这个队列写入。Worker 一次只处理一条消息，
//! 每条消息都基于最新持久化的故事，同一故事不同章节的并发完成不会互相覆盖。

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::application::commands::handlers::ApplyGeneratedAssetHandler;
use crate::application::error::ApplicationError;
use crate::application::ports::{ApplyGeneratedAsset, AssetApplied, AssetWriterPort, StoryRepositoryPort};

type Reply = oneshot::Sender<Result<AssetApplied, ApplicationError>>;

struct ReconcileMessage {
    command: ApplyGeneratedAsset,
    reply: Reply,
}

/// 写入队列的发送端，可随意克隆
#[derive(Clone)]
pub struct ReconcileHandle {
    sender: mpsc::Sender<ReconcileMessage>,
}

#[async_trait]
impl AssetWriterPort for ReconcileHandle {
    async fn apply(&self, command: ApplyGeneratedAsset) -> Result<AssetApplied, ApplicationError> {
        let (reply, response) = oneshot::channel();

        self.sender
            .send(ReconcileMessage { command, reply })
            .await
            .map_err(|_| ApplicationError::internal("reconcile worker stopped"))?;

        response
            .await
            .map_err(|_| ApplicationError::internal("reconcile worker dropped the reply"))?
    }
}

/// 单写者 Worker
pub struct ReconcileWorker {
    receiver: mpsc::Receiver<ReconcileMessage>,
    handler: ApplyGeneratedAssetHandler,
}

impl ReconcileWorker {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>, capacity: usize) -> (Self, ReconcileHandle) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = Self {
            receiver,
            handler: ApplyGeneratedAssetHandler::new(story_repo),
        };
        (worker, ReconcileHandle { sender })
    }

    /// 启动 Worker，所有 Handle 被丢弃后退出
    pub async fn run(mut self) {
        tracing::info!("ReconcileWorker started");

        while let Some(message) = self.receiver.recv().await {
            let story_id = message.command.story_id;
            let chapter_id = message.command.chapter_id;

            let result = self.handler.handle(message.command).await;
            if let Err(e) = &result {
                tracing::warn!(
                    story_id = %story_id,
                    chapter_id = %chapter_id,
                    error = %e,
                    "Failed to apply generated asset"
                );
            }

            // 调用方可能已放弃等待
            if message.reply.send(result).is_err() {
                tracing::debug!(story_id = %story_id, "Reconcile reply receiver dropped");
            }
        }

        tracing::info!("ReconcileWorker stopped");
    }
}
