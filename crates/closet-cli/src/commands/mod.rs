pub mod analytics;
pub mod bookmark;
pub mod collection;
pub mod common;
pub mod completions;
pub mod consent;
pub mod history;
pub mod status;
pub mod sync;
