use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Domain events emitted by the services. Consumed by a single background
/// loop; delivery is best-effort and never blocks the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    BookCreated(Uuid),
    BookUpdated(Uuid),
    BookDeleted(Uuid),

    // Campaign events
    CampaignCreated(Uuid),
    CampaignTargetsAdded {
        campaign_id: Uuid,
        books_added: usize,
    },
    CampaignDeleted {
        campaign_id: Uuid,
        books_recomputed: usize,
    },
    DiscountRaised {
        book_id: Uuid,
        discount: i16,
    },

    // Storefront events
    ReviewPosted {
        book_id: Uuid,
        score: i16,
    },
    FavoriteToggled {
        customer_id: Uuid,
        book_id: Uuid,
        favorited: bool,
    },
    CartItemToggled {
        order_id: Uuid,
        book_id: Uuid,
        in_cart: bool,
    },
    CheckoutStarted {
        order_id: Uuid,
        amount: i64,
    },
    OrderPaid(Uuid),
    PaymentAbandoned(Uuid),
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

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Dropping event: {}", e);
        }
    }
}

/// Background consumer for domain events.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPaid(order_id) => {
                info!(%order_id, "order paid");
            }
            Event::CampaignDeleted {
                campaign_id,
                books_recomputed,
            } => {
                info!(%campaign_id, books_recomputed, "campaign removed, discounts recomputed");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed, stopping event loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::BookCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::BookCreated(_))));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or return an error to the caller.
        sender.send_or_log(Event::OrderPaid(Uuid::new_v4())).await;
    }
}
