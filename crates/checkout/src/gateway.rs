//! Payment gateway trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::IdempotencyKey;
use domain::Money;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::error::PaymentError;

/// A successful capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCapture {
    /// The reference assigned by the gateway.
    pub reference: String,
    pub amount: Money,
}

/// Trait for the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment for `amount` and captures it.
    ///
    /// The key identifies the checkout attempt. A repeated call with the same
    /// key returns the original capture instead of charging again.
    async fn create_and_capture(
        &self,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<PaymentCapture, PaymentError>;

    /// Releases a previous capture.
    async fn refund(&self, reference: &str) -> Result<(), PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    captures: HashMap<IdempotencyKey, PaymentCapture>,
    refunded: HashSet<String>,
    next_id: u32,
    capture_calls: usize,
    fail_next: Option<PaymentError>,
    hold_next: bool,
}

/// In-memory payment gateway for tests and local runs.
///
/// A capture can be held in flight with [`InMemoryPaymentGateway::hold_next_capture`]
/// to exercise cancellation and concurrent attempts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next capture fail with `error`.
    pub async fn fail_next_capture(&self, error: PaymentError) {
        self.state.lock().await.fail_next = Some(error);
    }

    /// Makes the next capture wait until [`Self::release_capture`] is called.
    pub async fn hold_next_capture(&self) {
        self.state.lock().await.hold_next = true;
    }

    /// Waits until a held capture has started.
    pub async fn wait_for_held_capture(&self) {
        self.entered.notified().await;
    }

    /// Lets a held capture continue.
    pub fn release_capture(&self) {
        self.release.notify_one();
    }

    /// Returns the number of distinct captures, refunded or not.
    pub async fn capture_count(&self) -> usize {
        self.state.lock().await.captures.len()
    }

    /// Returns the number of capture calls received, including failed and repeated ones.
    pub async fn capture_calls(&self) -> usize {
        self.state.lock().await.capture_calls
    }

    /// Returns true if the capture with this reference was refunded.
    pub async fn is_refunded(&self, reference: &str) -> bool {
        self.state.lock().await.refunded.contains(reference)
    }

    /// Returns the number of refunds issued.
    pub async fn refund_count(&self) -> usize {
        self.state.lock().await.refunded.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_and_capture(
        &self,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<PaymentCapture, PaymentError> {
        let held = {
            let mut state = self.state.lock().await;
            state.capture_calls += 1;
            std::mem::take(&mut state.hold_next)
        };

        if held {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let mut state = self.state.lock().await;

        if let Some(existing) = state.captures.get(&key) {
            return Ok(existing.clone());
        }

        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        state.next_id += 1;
        let capture = PaymentCapture {
            reference: format!("PAY-{:04}", state.next_id),
            amount,
        };
        state.captures.insert(key, capture.clone());

        Ok(capture)
    }

    async fn refund(&self, reference: &str) -> Result<(), PaymentError> {
        let mut state = self.state.lock().await;

        if !state.captures.values().any(|c| c.reference == reference) {
            return Err(PaymentError::Gateway(format!(
                "unknown payment {reference}"
            )));
        }

        state.refunded.insert(reference.to_string());
        Ok(())
    }
}
