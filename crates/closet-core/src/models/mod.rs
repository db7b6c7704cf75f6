//! Data models for Closet

mod analytics;
mod bookmark;
mod cart;
mod collection;
mod consent;
mod event_id;
mod history;
mod tab;

pub use analytics::{ActionKind, InteractionInput, InteractionKind, ProductInteraction, TimeToAction};
pub use bookmark::{Bookmark, BookmarkDraft, PricePoint};
pub use cart::{
    CartEvent, CartEventInput, CartEventType, CartItem, CartSession, CART_ABANDONMENT_WINDOW_MS,
    CART_EVENT_DEDUP_WINDOW_MS,
};
pub use collection::{Collection, CollectionPatch};
pub use consent::{ConsentChoice, ConsentGate, ConsentStatus};
pub use event_id::{new_event_id, ClientEventId};
pub use history::HistoryEntry;
pub use tab::Tab;
