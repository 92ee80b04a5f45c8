//! Checkout coordinator for one shopping session.

use std::time::Instant;

use chrono::Utc;
use common::{IdempotencyKey, OrderId};
use domain::{Cart, CartSnapshot, Order, OwnerId};
use order_store::OrderStore;
use tokio::sync::Mutex;

use crate::attempt::{CheckoutStatus, PendingCommit};
use crate::error::{CheckoutError, CommitError, PaymentError, PreconditionError, Result};
use crate::gateway::{PaymentCapture, PaymentGateway};
use crate::state::CheckoutState;

#[derive(Debug, Default)]
struct Session {
    state: CheckoutState,
    idempotency_key: Option<IdempotencyKey>,
    cancel_requested: bool,
    pending: Option<PendingCommit>,
    last_order: Option<OrderId>,
    last_error: Option<String>,
}

/// Drives a session's cart through payment capture and order commit.
///
/// The coordinator owns the session's cart. At most one attempt is in flight
/// at a time. Neither the cart lock nor the session lock is held across a
/// call to the gateway or the store.
pub struct CheckoutCoordinator<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    store: S,
    gateway: G,
    cart: Mutex<Cart>,
    session: Mutex<Session>,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    /// Creates a coordinator with an empty cart.
    pub fn new(store: S, gateway: G) -> Self {
        Self::with_cart(store, gateway, Cart::new())
    }

    pub fn with_cart(store: S, gateway: G, cart: Cart) -> Self {
        Self {
            store,
            gateway,
            cart: Mutex::new(cart),
            session: Mutex::new(Session::default()),
        }
    }

    /// Runs `f` against the session's cart.
    pub async fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut cart = self.cart.lock().await;
        f(&mut cart)
    }

    /// Returns a copy of the cart's current rows.
    pub async fn cart_snapshot(&self) -> CartSnapshot {
        self.cart.lock().await.snapshot()
    }

    pub async fn state(&self) -> CheckoutState {
        self.session.lock().await.state
    }

    pub async fn status(&self) -> CheckoutStatus {
        let session = self.session.lock().await;
        CheckoutStatus {
            state: session.state,
            idempotency_key: session.idempotency_key,
            order_id: session.last_order,
            pending_reference: session.pending.as_ref().map(|p| p.reference().to_string()),
            last_error: session.last_error.clone(),
        }
    }

    /// The captured payment still waiting for its order, if any.
    pub async fn pending_commit(&self) -> Option<PendingCommit> {
        self.session.lock().await.pending.clone()
    }

    /// Checks out the cart for `owner_id`.
    ///
    /// Captures the cart total, then records the order under a key minted for
    /// this attempt. On success the charged units leave the cart and the
    /// stored order is returned.
    #[tracing::instrument(skip(self, owner_id), fields(owner_id = tracing::field::Empty))]
    pub async fn checkout(&self, owner_id: Option<OwnerId>) -> Result<Order> {
        let started = Instant::now();

        let (owner_id, snapshot, key) = match self.begin(owner_id).await {
            Ok(begun) => begun,
            Err(e) => {
                metrics::counter!("checkout_failed_total", "reason" => e.reason()).increment(1);
                tracing::warn!(error = %e, "Checkout rejected");
                return Err(e);
            }
        };
        tracing::Span::current().record("owner_id", owner_id.as_str());
        metrics::counter!("checkout_attempts_total").increment(1);

        let amount = snapshot.total();
        tracing::info!(%key, %amount, items = snapshot.len(), "Checkout started");

        let result = match self.gateway.create_and_capture(amount, key).await {
            Ok(capture) => self.after_capture(key, owner_id, snapshot, capture).await,
            Err(e) => {
                self.fail(e.to_string()).await;
                tracing::warn!(%key, error = %e, "Payment failed");
                Err(e.into())
            }
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(order_id = %order.id(), total = %order.total(), "Checkout completed");
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total", "reason" => e.reason()).increment(1);
            }
        }
        result
    }

    /// Cancels the attempt awaiting payment.
    ///
    /// The attempt fails with [`PaymentError::Cancelled`] once the gateway
    /// answers. A capture that still succeeds is refunded and no order is
    /// recorded.
    pub async fn cancel(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if !session.state.can_cancel() {
            return Err(CheckoutError::NotCancellable {
                state: session.state,
            });
        }
        session.cancel_requested = true;
        tracing::info!(key = ?session.idempotency_key, "Checkout cancel requested");
        Ok(())
    }

    /// Retries the commit for the payment this session captured but failed
    /// to record. Never contacts the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn retry_commit(&self) -> Result<Order> {
        let pending = {
            let mut session = self.session.lock().await;
            if session.state.is_in_flight() {
                return Err(CheckoutError::InProgress {
                    state: session.state,
                });
            }
            let pending = session
                .pending
                .clone()
                .ok_or(CheckoutError::NothingToRetry)?;
            session.state = CheckoutState::Committing;
            pending
        };

        tracing::info!(key = %pending.idempotency_key(), reference = pending.reference(), "Retrying commit");
        self.commit(pending).await
    }

    /// Commits a pending capture the caller kept, e.g. from a `CommitError`
    /// returned before a restart.
    ///
    /// Rejected with [`CheckoutError::CommitPending`] while this session holds
    /// a different captured payment. A capture from another attempt is
    /// recorded without touching this session's cart or state.
    #[tracing::instrument(skip(self, pending), fields(key = %pending.idempotency_key()))]
    pub async fn commit_pending(&self, pending: PendingCommit) -> Result<Order> {
        let own = {
            let mut session = self.session.lock().await;
            if session.state.is_in_flight() {
                return Err(CheckoutError::InProgress {
                    state: session.state,
                });
            }
            if let Some(held) = session
                .pending
                .as_ref()
                .filter(|held| held.idempotency_key() != pending.idempotency_key())
            {
                return Err(CheckoutError::CommitPending {
                    reference: held.reference().to_string(),
                });
            }

            let own = session.idempotency_key == Some(pending.idempotency_key());
            if own {
                session.state = CheckoutState::Committing;
            }
            own
        };

        if own {
            self.commit(pending).await
        } else {
            self.commit_foreign(pending).await
        }
    }

    /// Checks preconditions and moves to `AwaitingPayment`.
    async fn begin(
        &self,
        owner_id: Option<OwnerId>,
    ) -> Result<(OwnerId, CartSnapshot, IdempotencyKey)> {
        let mut session = self.session.lock().await;
        if !session.state.can_begin() {
            return Err(CheckoutError::InProgress {
                state: session.state,
            });
        }
        if let Some(ref pending) = session.pending {
            return Err(CheckoutError::CommitPending {
                reference: pending.reference().to_string(),
            });
        }

        let owner_id = owner_id.ok_or(PreconditionError::MissingIdentity)?;
        let snapshot = self.cart.lock().await.snapshot();
        if snapshot.is_empty() {
            return Err(PreconditionError::EmptyCart.into());
        }

        let key = IdempotencyKey::new();
        session.state = CheckoutState::AwaitingPayment;
        session.idempotency_key = Some(key);
        session.cancel_requested = false;
        session.last_error = None;

        Ok((owner_id, snapshot, key))
    }

    async fn after_capture(
        &self,
        key: IdempotencyKey,
        owner_id: OwnerId,
        snapshot: CartSnapshot,
        capture: PaymentCapture,
    ) -> Result<Order> {
        let cancelled = {
            let mut session = self.session.lock().await;
            if !session.cancel_requested {
                session.state = CheckoutState::Committing;
            }
            session.cancel_requested
        };

        if cancelled {
            tracing::info!(%key, reference = %capture.reference, "Refunding capture of cancelled checkout");
            if let Err(e) = self.gateway.refund(&capture.reference).await {
                metrics::counter!("checkout_refund_failures_total").increment(1);
                tracing::error!(%key, reference = %capture.reference, error = %e, "Refund failed");
            }
            self.fail(PaymentError::Cancelled.to_string()).await;
            return Err(PaymentError::Cancelled.into());
        }

        let pending = PendingCommit::new(key, owner_id, snapshot, capture, Utc::now());
        self.commit(pending).await
    }

    /// Writes the order for this session's own capture. Expects `Committing`.
    async fn commit(&self, pending: PendingCommit) -> Result<Order> {
        let new_order = match pending.to_new_order() {
            Ok(order) => order,
            Err(e) => {
                self.fail_commit(pending, e.to_string()).await;
                return Err(e.into());
            }
        };

        match self.store.create(new_order).await {
            Ok(outcome) => {
                metrics::counter!("order_commits_total", "outcome" => outcome.as_str())
                    .increment(1);
                let order = outcome.into_order();

                self.cart
                    .lock()
                    .await
                    .remove_snapshot(pending.snapshot());

                let mut session = self.session.lock().await;
                session.state = CheckoutState::Completed;
                session.pending = None;
                session.last_order = Some(order.id());
                session.last_error = None;

                tracing::info!(order_id = %order.id(), key = %pending.idempotency_key(), "Order committed");
                Ok(order)
            }
            Err(source) => {
                metrics::counter!("order_commits_total", "outcome" => "failed").increment(1);
                tracing::error!(
                    key = %pending.idempotency_key(),
                    reference = pending.reference(),
                    error = %source,
                    transient = source.is_transient(),
                    "Payment captured but order commit failed"
                );
                self.fail_commit(pending.clone(), source.to_string()).await;
                Err(CommitError::new(pending, source).into())
            }
        }
    }

    /// Writes the order for a capture from another attempt. The session is
    /// left as it was, whatever the outcome.
    async fn commit_foreign(&self, pending: PendingCommit) -> Result<Order> {
        let new_order = pending.to_new_order()?;

        match self.store.create(new_order).await {
            Ok(outcome) => {
                metrics::counter!("order_commits_total", "outcome" => outcome.as_str())
                    .increment(1);
                let order = outcome.into_order();
                tracing::info!(order_id = %order.id(), key = %pending.idempotency_key(), "Order committed for carried-over capture");
                Ok(order)
            }
            Err(source) => {
                metrics::counter!("order_commits_total", "outcome" => "failed").increment(1);
                tracing::error!(
                    key = %pending.idempotency_key(),
                    reference = pending.reference(),
                    error = %source,
                    "Carried-over capture could not be recorded"
                );
                Err(CommitError::new(pending, source).into())
            }
        }
    }

    async fn fail(&self, error: String) {
        let mut session = self.session.lock().await;
        session.state = CheckoutState::Failed;
        session.last_error = Some(error);
    }

    async fn fail_commit(&self, pending: PendingCommit, error: String) {
        let mut session = self.session.lock().await;
        session.state = CheckoutState::Failed;
        session.pending = Some(pending);
        session.last_error = Some(error);
    }
}
