use super::events::RoomEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Realtime channel carrying one room's events.
///
/// A seam over the pub/sub fabric so room logic can be driven by a loopback
/// fake in tests; production uses [`NatsRoomChannel`].
#[async_trait]
pub trait RoomChannel: Send + Sync {
    async fn publish(&self, event: &RoomEvent) -> Result<()>;

    /// Attach to the room's event stream. Parse failures are logged and
    /// skipped, never surfaced to the consumer.
    async fn subscribe(&self) -> Result<mpsc::Receiver<RoomEvent>>;
}

/// NATS-backed room channel: one subject per room.
pub struct NatsRoomChannel {
    client: async_nats::Client,
    room_id: String,
}

impl NatsRoomChannel {
    /// Connect to NATS and bind to a room subject
    pub async fn connect(url: &str, room_id: String) -> Result<Self> {
        info!("Connecting to channel server at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to channel server")?;

        info!("Connected to channel server");
        Ok(Self::with_client(client, room_id))
    }

    /// Bind an existing connection to a room subject
    pub fn with_client(client: async_nats::Client, room_id: String) -> Self {
        Self { client, room_id }
    }

    pub fn client(&self) -> async_nats::Client {
        self.client.clone()
    }

    fn subject(&self) -> String {
        format!("room.{}.events", self.room_id)
    }
}

#[async_trait]
impl RoomChannel for NatsRoomChannel {
    async fn publish(&self, event: &RoomEvent) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(self.subject(), payload.into())
            .await
            .context("Failed to publish room event")?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<RoomEvent>> {
        let subject = self.subject();
        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to room events")?;

        info!("Subscribed to {}", subject);

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<RoomEvent>(&msg.payload) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse room event: {}", e);
                    }
                }
            }
        });

        Ok(rx)
    }
}
