//! Cart state: normalization, optimistic mutation, reconciliation.
//!
//! The remote cart resource is the source of truth, but waiting on it for
//! every keypress makes the UI feel dead. [`CartController`] owns one view's
//! in-memory item list and mediates every mutation:
//!
//! - quantity changes apply locally first, then reconcile against an
//!   authoritative re-fetch, rolling back to the pre-mutation snapshot when
//!   the server says no
//! - removals poll the server a bounded number of times because the clear
//!   endpoint is not read-after-write consistent; if the budget runs out the
//!   line is forced out locally and the divergence is logged
//! - every successful change fans out through [`CartEvents`] so other views
//!   re-fetch their own projection
//!
//! One controller instance belongs to one view at a time. `&mut self`
//! sequences mutations within an instance; across instances the last
//! authoritative response wins, which is an accepted race at UI scale.

pub mod events;
pub mod normalize;

pub use events::{CartEvent, CartEvents};
pub use normalize::{CartItem, parse_cart_payload, subtotal};

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use velora_core::{BearerToken, CartLineId, Price, ProductId};

use crate::client::ApiClient;
use crate::error::ApiError;

// =============================================================================
// Cart endpoints
// =============================================================================

#[derive(Serialize)]
struct QuantityBody {
    quantity: u32,
}

#[derive(Serialize)]
struct RemoveBody<'a> {
    #[serde(rename = "productId")]
    product_id: &'a ProductId,
}

impl ApiClient {
    /// Fetch and normalize the signed-in shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload matches none of
    /// the known cart shapes.
    #[instrument(skip(self, token))]
    pub async fn fetch_cart_items(&self, token: &BearerToken) -> Result<Vec<CartItem>, ApiError> {
        let body = self.get_text("/api/carts", Some(token)).await?;
        parse_cart_payload(&body)
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the addition.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.post_ack(
            &format!("/api/carts/add/{product_id}"),
            Some(token),
            &QuantityBody { quantity },
        )
        .await
    }

    /// Set the quantity of a cart line, addressed by product id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the update.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn update_cart_quantity(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.put_ack(
            &format!("/api/carts/update/{product_id}"),
            Some(token),
            &QuantityBody { quantity },
        )
        .await
    }

    /// Remove a single product from the cart.
    ///
    /// The clear endpoint doubles as single-line removal when given a body.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the removal.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        self.delete_ack(
            "/api/carts/clear",
            Some(token),
            Some(&RemoveBody { product_id }),
        )
        .await
    }

    /// Empty the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &BearerToken) -> Result<(), ApiError> {
        self.delete_ack::<()>("/api/carts/clear", Some(token), None)
            .await
    }
}

// =============================================================================
// Reconciliation policy
// =============================================================================

/// Bounded backoff for post-removal reconciliation.
///
/// The clear endpoint acknowledges removals before reads reflect them, so
/// the controller re-polls on a schedule instead of trusting one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Maximum number of polling fetches after a removal.
    pub max_polls: u32,
    /// Pause between the removal call and the first poll.
    pub initial_delay: Duration,
    /// Pause between subsequent polls.
    pub retry_delay: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_polls: 3,
            initial_delay: Duration::from_millis(500),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl ReconcilePolicy {
    /// The default poll budget with no pauses. Suited to tests and to
    /// batch tooling where wall-clock pauses only waste time.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            max_polls: 3,
            initial_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }
}

// =============================================================================
// Line states and outcomes
// =============================================================================

/// Mutation state of a single cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    /// No mutation in flight.
    #[default]
    Idle,
    /// Optimistically mutated locally; the server has not confirmed yet.
    Pending,
    /// The last mutation took effect locally, confirmed or forced.
    Committed,
    /// The last mutation failed and local state was restored.
    RolledBack,
}

/// Result of [`CartController::set_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// The requested quantity was below 1; nothing happened, locally or
    /// remotely.
    Rejected,
    /// The update was accepted and local state reconciled.
    Updated,
}

/// Result of [`CartController::remove_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// A poll confirmed the line is gone server-side.
    Confirmed {
        /// Number of polling fetches it took.
        polls: u32,
    },
    /// The poll budget ran out with the line still present; it was forced
    /// out of local state anyway. The divergence is warn-logged.
    Forced,
}

/// Errors from cart mutations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No cart line matched the given identity.
    #[error("no cart line matches identity: {0}")]
    UnknownLine(String),

    /// The line exists but carries no product id, so the API cannot address
    /// it. Display-only lines cannot be mutated.
    #[error("cart line {0} has no product id and cannot be modified")]
    MissingProductId(CartLineId),
}

impl CartError {
    /// Whether the underlying failure was a 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }
}

// =============================================================================
// CartController
// =============================================================================

/// Owns one view's in-memory cart and mediates mutations against the server.
#[derive(Debug)]
pub struct CartController {
    client: ApiClient,
    token: BearerToken,
    events: CartEvents,
    policy: ReconcilePolicy,
    items: Vec<CartItem>,
    line_states: HashMap<CartLineId, LineState>,
}

impl CartController {
    /// Fetch the cart and build a controller that owns the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the payload shape is unknown.
    pub async fn load(
        client: ApiClient,
        token: BearerToken,
        events: CartEvents,
    ) -> Result<Self, ApiError> {
        Self::load_with_policy(client, token, events, ReconcilePolicy::default()).await
    }

    /// [`Self::load`] with an explicit reconciliation policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails or the payload shape is unknown.
    pub async fn load_with_policy(
        client: ApiClient,
        token: BearerToken,
        events: CartEvents,
        policy: ReconcilePolicy,
    ) -> Result<Self, ApiError> {
        let items = client.fetch_cart_items(&token).await?;
        Ok(Self::from_items(client, token, events, policy, items))
    }

    /// Resume a controller over an already-fetched snapshot.
    #[must_use]
    pub fn from_items(
        client: ApiClient,
        token: BearerToken,
        events: CartEvents,
        policy: ReconcilePolicy,
        items: Vec<CartItem>,
    ) -> Self {
        Self {
            client,
            token,
            events,
            policy,
            items,
            line_states: HashMap::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current item list, optimistic edits included.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        subtotal(&self.items)
    }

    /// Sum of quantities across lines, for the navbar badge.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Mutation state of the line addressed by `identity`.
    #[must_use]
    pub fn line_state(&self, identity: &str) -> LineState {
        self.items
            .iter()
            .find(|item| item.matches(identity))
            .and_then(|item| self.line_states.get(&item.line_id).copied())
            .unwrap_or_default()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set a line's quantity, optimistically.
    ///
    /// Quantities below 1 are rejected locally without a server call. On
    /// server success the whole list is replaced by an authoritative
    /// re-fetch - an overwrite, not a merge, so server-side caps and price
    /// changes win. On failure the pre-mutation snapshot is restored
    /// exactly.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownLine`] or [`CartError::MissingProductId`] before
    /// any network traffic; [`CartError::Api`] when the update itself fails
    /// (local state is rolled back first).
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn set_quantity(
        &mut self,
        identity: &str,
        quantity: i64,
    ) -> Result<QuantityOutcome, CartError> {
        if quantity < 1 {
            debug!(quantity, "rejecting quantity below 1");
            return Ok(QuantityOutcome::Rejected);
        }

        let index = self
            .items
            .iter()
            .position(|item| item.matches(identity))
            .ok_or_else(|| CartError::UnknownLine(identity.to_string()))?;
        let (product_id, line_id) = self.mutation_identity(index)?;
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let snapshot = self.items.clone();
        if let Some(item) = self.items.get_mut(index) {
            item.quantity = quantity;
        }
        self.line_states.insert(line_id.clone(), LineState::Pending);

        match self
            .client
            .update_cart_quantity(&self.token, &product_id, quantity)
            .await
        {
            Ok(()) => {
                // The server accepted the mutation; a failed re-fetch only
                // means we keep showing the optimistic list until the next
                // refresh.
                match self.client.fetch_cart_items(&self.token).await {
                    Ok(fresh) => self.items = fresh,
                    Err(error) => {
                        warn!(%error, "re-fetch after quantity update failed; keeping optimistic state");
                    }
                }
                self.line_states.insert(line_id, LineState::Committed);
                self.events.notify();
                Ok(QuantityOutcome::Updated)
            }
            Err(error) => {
                self.items = snapshot;
                self.line_states.insert(line_id, LineState::RolledBack);
                Err(error.into())
            }
        }
    }

    /// Remove a line, then reconcile until the server agrees it is gone.
    ///
    /// The caller is responsible for having confirmed the removal with the
    /// user; this method goes straight to the server. Polls follow
    /// [`ReconcilePolicy`]: one pause after the removal call, then a longer
    /// pause between retries. Local state only changes on a converged fetch
    /// - or, when the budget runs out, by forcing the line out in
    /// disagreement with the server. That override masks the backend's
    /// missing read-after-write consistency; it is logged as a
    /// reconciliation failure every time it happens.
    ///
    /// # Errors
    ///
    /// [`CartError::UnknownLine`] or [`CartError::MissingProductId`] before
    /// any network traffic; [`CartError::Api`] when the removal call or a
    /// reconciliation fetch fails. A fetch failure mid-reconciliation leaves
    /// the line `Pending` and the local list untouched.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn remove_item(&mut self, identity: &str) -> Result<RemovalOutcome, CartError> {
        let index = self
            .items
            .iter()
            .position(|item| item.matches(identity))
            .ok_or_else(|| CartError::UnknownLine(identity.to_string()))?;
        let (product_id, line_id) = self.mutation_identity(index)?;

        self.line_states.insert(line_id.clone(), LineState::Pending);

        if let Err(error) = self.client.remove_cart_item(&self.token, &product_id).await {
            self.line_states.insert(line_id, LineState::RolledBack);
            return Err(error.into());
        }

        let mut polls: u32 = 0;
        tokio::time::sleep(self.policy.initial_delay).await;
        loop {
            polls += 1;
            let fresh = self.client.fetch_cart_items(&self.token).await?;
            if !fresh.iter().any(|item| item.matches(identity)) {
                self.items = fresh;
                self.line_states.insert(line_id, LineState::Committed);
                self.events.notify();
                return Ok(RemovalOutcome::Confirmed { polls });
            }
            if polls >= self.policy.max_polls {
                break;
            }
            tokio::time::sleep(self.policy.retry_delay).await;
        }

        warn!(
            identity = %identity,
            polls,
            "cart line still present after removal; forcing it out of local state"
        );
        self.items.retain(|item| !item.matches(identity));
        self.line_states.insert(line_id, LineState::Committed);
        self.events.notify();
        Ok(RemovalOutcome::Forced)
    }

    /// Empty the cart remotely and locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; local state is untouched
    /// in that case.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.client.clear_cart(&self.token).await?;
        self.items.clear();
        self.line_states.clear();
        self.events.notify();
        Ok(())
    }

    /// Unconditionally re-fetch, replace local state, and notify - whether
    /// or not anything actually differs.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails; local state is untouched.
    #[instrument(skip(self))]
    pub async fn force_refresh(&mut self) -> Result<(), CartError> {
        self.items = self.client.fetch_cart_items(&self.token).await?;
        self.line_states.clear();
        self.events.notify();
        Ok(())
    }

    /// Mutation identity for the line at `index`: its product id (required
    /// by every mutation endpoint) and its line id (the state-machine key).
    fn mutation_identity(&self, index: usize) -> Result<(ProductId, CartLineId), CartError> {
        let item = self
            .items
            .get(index)
            .ok_or_else(|| CartError::UnknownLine(format!("line index {index}")))?;
        let product_id = item
            .product_id
            .clone()
            .ok_or_else(|| CartError::MissingProductId(item.line_id.clone()))?;
        Ok((product_id, item.line_id.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use url::Url;

    fn offline_controller(items: Vec<CartItem>) -> CartController {
        // Points at a closed port; tests below never reach the network.
        let url = Url::parse("http://127.0.0.1:9").unwrap();
        CartController::from_items(
            ApiClient::new(&url),
            BearerToken::new("test-token"),
            CartEvents::new(),
            ReconcilePolicy::immediate(),
            items,
        )
    }

    fn two_lines() -> Vec<CartItem> {
        parse_cart_payload(
            r#"[
                {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 10, "quantity": 2},
                {"_id": "line2", "name": "Display Only", "price": 5, "quantity": 1}
            ]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn quantity_below_one_is_a_local_no_op() {
        let mut cart = offline_controller(two_lines());
        let before = cart.items().to_vec();

        assert_eq!(cart.set_quantity("p1", 0).await.unwrap(), QuantityOutcome::Rejected);
        assert_eq!(cart.set_quantity("p1", -3).await.unwrap(), QuantityOutcome::Rejected);

        assert_eq!(cart.items(), before.as_slice());
        assert_eq!(cart.line_state("p1"), LineState::Idle);
    }

    #[tokio::test]
    async fn unknown_identity_fails_before_any_request() {
        let mut cart = offline_controller(two_lines());
        let err = cart.set_quantity("nope", 2).await.unwrap_err();
        assert!(matches!(err, CartError::UnknownLine(_)));
    }

    #[tokio::test]
    async fn display_only_lines_cannot_be_mutated() {
        let mut cart = offline_controller(two_lines());

        let err = cart.set_quantity("line2", 2).await.unwrap_err();
        assert!(matches!(err, CartError::MissingProductId(_)));

        let err = cart.remove_item("line2").await.unwrap_err();
        assert!(matches!(err, CartError::MissingProductId(_)));
    }

    #[test]
    fn totals_and_states() {
        let cart = offline_controller(two_lines());
        assert_eq!(cart.subtotal().to_string(), "25.00");
        assert_eq!(cart.total_quantity(), 3);
        assert!(!cart.is_empty());
        assert_eq!(cart.line_state("line1"), LineState::Idle);
        assert_eq!(cart.line_state("missing"), LineState::Idle);
    }

    #[test]
    fn default_policy_matches_the_observed_backend() {
        let policy = ReconcilePolicy::default();
        assert_eq!(policy.max_polls, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.retry_delay, Duration::from_millis(1000));
    }

    #[test]
    fn immediate_policy_keeps_the_budget() {
        let policy = ReconcilePolicy::immediate();
        assert_eq!(policy.max_polls, 3);
        assert_eq!(policy.initial_delay, Duration::ZERO);
        assert_eq!(policy.retry_delay, Duration::ZERO);
    }
}
