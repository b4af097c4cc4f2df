pub mod catalog;
pub mod error;
pub mod filter;
pub mod gate;
pub mod notify;
pub mod playback;
pub mod popup;
pub mod store;
pub mod types;
