use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted after a successful commit.
///
/// Events never participate in the transaction that produced them; a lost
/// event is logged and the request still succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SaleCreated(Uuid),
    SaleVoided(Uuid),
    PaymentRegistered {
        sale_id: Uuid,
        payment_id: Uuid,
        amount: Decimal,
    },
    CustomerCreated(Uuid),
    ProductCreated(Uuid),
    ExpenseRecorded(Uuid),
    UserRegistered(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a connected sender/receiver pair with the standard buffer size.
pub fn channel() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    (EventSender::new(tx), rx)
}

/// Background consumer for domain events. Currently logs each event; this is
/// the seam where webhooks or an outbox would attach.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = ?event, "domain event");
    }
    info!("event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let (sender, mut rx) = channel();
        let id = Uuid::new_v4();
        sender.send(Event::SaleCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::SaleCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
