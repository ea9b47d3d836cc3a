use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(i64),
    OrderCancelled(i64),
    OrderStatusChanged {
        order_id: i64,
        old_status: String,
        new_status: String,
    },

    // Checkout events
    CheckoutCompleted {
        order_id: i64,
        payment_id: String,
    },

    // Payment events
    PaymentApproved {
        payment_id: String,
        order_id: i64,
    },
    PaymentRejected {
        payment_id: String,
        order_id: i64,
    },

    // Catalog events
    ProductCreated(i64),
}

// Processes incoming events. Downstream consumers (notification fan-out,
// kitchen display, analytics) subscribe here; today they are log lines.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id, "order created");
            }
            Event::OrderCancelled(order_id) => {
                info!(order_id, "order cancelled");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id, %old_status, %new_status, "order status changed");
            }
            Event::CheckoutCompleted {
                order_id,
                payment_id,
            } => {
                info!(order_id, %payment_id, "checkout completed");
            }
            Event::PaymentApproved {
                payment_id,
                order_id,
            } => {
                info!(%payment_id, order_id, "payment approved");
            }
            Event::PaymentRejected {
                payment_id,
                order_id,
            } => {
                info!(%payment_id, order_id, "payment rejected");
            }
            Event::ProductCreated(product_id) => {
                info!(product_id, "product created");
            }
        }
    }

    info!("Event processing loop stopped");
}
