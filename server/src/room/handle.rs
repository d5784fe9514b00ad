use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{JoinRole, MoveOutcome, RoomCommand, RoomError};
use super::events::RoomEvent;
use super::snapshot::{ChatEntry, RoomSnapshot};

/// Cheap, cloneable handle to a room actor. All methods enqueue a command
/// and await its reply; a closed channel means the room has been torn down.
#[derive(Clone)]
pub struct RoomHandle {
    id: String,
    cmd_tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<RoomCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn join(
        &self,
        user_id: &str,
        name: &str,
        role: JoinRole,
    ) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            user_id: user_id.to_string(),
            name: name.to_string(),
            role,
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn start(&self) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Start { reply: tx }).await?;
        self.recv(rx).await?
    }

    pub async fn make_move(&self, user_id: &str, text: &str) -> Result<MoveOutcome, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Move {
            user_id: user_id.to_string(),
            text: text.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn resign(&self, user_id: &str) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Resign {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn offer_draw(&self, user_id: &str) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::OfferDraw {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn accept_draw(
        &self,
        user_id: &str,
        offer_id: &str,
    ) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::AcceptDraw {
            user_id: user_id.to_string(),
            offer_id: offer_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn request_rematch(&self, user_id: &str) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::RequestRematch {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn accept_rematch(
        &self,
        user_id: &str,
        request_id: &str,
    ) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::AcceptRematch {
            user_id: user_id.to_string(),
            request_id: request_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn leave(&self, user_id: &str) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn chat(&self, user_id: &str, text: &str) -> Result<ChatEntry, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Chat {
            user_id: user_id.to_string(),
            text: text.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn add_ai_opponent(&self, level: u8) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::AddAiOpponent { level, reply: tx })
            .await?;
        self.recv(rx).await?
    }

    pub async fn heartbeat(&self, user_id: &str) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Heartbeat {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        self.recv(rx).await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot { reply: tx }).await?;
        self.recv(rx).await
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(RoomSnapshot, broadcast::Receiver<RoomEvent>), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Subscribe { reply: tx }).await?;
        self.recv(rx).await
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RoomCommand::Shutdown).await;
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| RoomError::NotFound(format!("room {}", self.id)))
    }

    async fn recv<T>(&self, rx: oneshot::Receiver<T>) -> Result<T, RoomError> {
        rx.await
            .map_err(|_| RoomError::Internal("room actor dropped the reply".to_string()))
    }
}
