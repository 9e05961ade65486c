//! Restores paywalled album reviews.
//!
//! Pipeline: [`watcher::Watcher`] waits for the paywall barrier, then
//! [`detect`] confirms the paywall, [`fetch`] pulls the structured review,
//! [`markup`] rebuilds the body markup and [`patch`] writes body and score
//! back into the [`dom::Page`].

pub mod config;
pub mod detect;
pub mod dom;
pub mod fetch;
pub mod markup;
pub mod page;
pub mod patch;
pub mod score;
pub mod watcher;

pub use config::{Anchors, Settings};
pub use dom::{Document, HostCapabilities, Page};
pub use fetch::{FetchError, ReviewFetcher, ReviewPayload};
pub use watcher::{Outcome, RunState, Watcher};
