//! Cart session model

use serde::{Deserialize, Serialize};

use super::ClientEventId;

/// Events closer together than this with the same type and cart value are
/// treated as one delivery.
pub const CART_EVENT_DEDUP_WINDOW_MS: i64 = 30_000;

/// A cart with no checkout and no activity for this long counts as abandoned.
pub const CART_ABANDONMENT_WINDOW_MS: i64 = 30 * 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventType {
    Add,
    Remove,
    CheckoutStart,
    CheckoutComplete,
    CartView,
}

impl CartEventType {
    pub const fn is_checkout(self) -> bool {
        matches!(self, Self::CheckoutStart | Self::CheckoutComplete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEvent {
    pub client_event_id: ClientEventId,
    #[serde(rename = "type")]
    pub event_type: CartEventType,
    /// Event timestamp (Unix ms)
    pub timestamp: i64,
    #[serde(default)]
    pub cart_value: Option<f64>,
    #[serde(default)]
    pub items: Option<Vec<CartItem>>,
}

/// Caller-supplied cart event before canonicalization and dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEventInput {
    pub event_type: CartEventType,
    pub cart_url: String,
    pub cart_value: Option<f64>,
    pub items: Option<Vec<CartItem>>,
    /// Defaults to the store clock when `None`
    pub timestamp: Option<i64>,
}

impl CartEventInput {
    pub fn new(event_type: CartEventType, cart_url: impl Into<String>) -> Self {
        Self {
            event_type,
            cart_url: cart_url.into(),
            cart_value: None,
            items: None,
            timestamp: None,
        }
    }

    #[must_use]
    pub const fn with_value(mut self, cart_value: f64) -> Self {
        self.cart_value = Some(cart_value);
        self
    }

    #[must_use]
    pub const fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Timeline of cart activity for one cart page. Keyed by `cart_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSession {
    pub cart_url: String,
    /// Ordered by timestamp
    #[serde(default)]
    pub events: Vec<CartEvent>,
    #[serde(default)]
    pub abandoned: bool,
    /// First `add` to first checkout event, in ms
    #[serde(default)]
    pub time_to_checkout: Option<i64>,
}

impl CartSession {
    pub const fn new(cart_url: String) -> Self {
        Self {
            cart_url,
            events: Vec::new(),
            abandoned: false,
            time_to_checkout: None,
        }
    }

    /// Whether `event` repeats an existing event inside the dedup window.
    #[allow(clippy::float_cmp)]
    pub fn is_duplicate(&self, event_type: CartEventType, cart_value: Option<f64>, at: i64) -> bool {
        self.events.iter().any(|existing| {
            existing.event_type == event_type
                && existing.cart_value == cart_value
                && (existing.timestamp - at).abs() <= CART_EVENT_DEDUP_WINDOW_MS
        })
    }

    /// Insert an event in timestamp order and refresh derived fields.
    pub fn push(&mut self, event: CartEvent) {
        let index = self
            .events
            .partition_point(|existing| existing.timestamp <= event.timestamp);
        self.events.insert(index, event);
        self.refresh_derived();
    }

    /// Mark the session abandoned when it never completed and has been idle
    /// past the abandonment window. Returns `true` when the flag flipped.
    pub fn mark_abandoned_if_idle(&mut self, now: i64) -> bool {
        if self.abandoned || self.has_completed() {
            return false;
        }
        let Some(last) = self.events.last() else {
            return false;
        };
        if now - last.timestamp > CART_ABANDONMENT_WINDOW_MS {
            self.abandoned = true;
            return true;
        }
        false
    }

    fn has_completed(&self) -> bool {
        self.events
            .iter()
            .any(|event| event.event_type == CartEventType::CheckoutComplete)
    }

    fn refresh_derived(&mut self) {
        let first_add = self
            .events
            .iter()
            .find(|event| event.event_type == CartEventType::Add)
            .map(|event| event.timestamp);
        let first_checkout = first_add.and_then(|added| {
            self.events
                .iter()
                .find(|event| event.event_type.is_checkout() && event.timestamp >= added)
                .map(|event| event.timestamp - added)
        });
        self.time_to_checkout = first_checkout;
        if self.has_completed() {
            self.abandoned = false;
        }
    }
}
