pub mod config;
pub mod controller;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod html;
pub mod logger;
pub mod meta;
pub mod models;
pub mod render;
pub mod store;
pub mod viewport;

pub use config::{PortalConfig, SectionConfig};
pub use controller::{Commit, FeedController, FetchTicket, Notice, Phase, ScrollOutcome};
pub use dedup::{DedupGuard, Verdict};
pub use error::{FeedError, Result};
pub use feed::{Fetcher, HttpFetcher};
pub use meta::{HeadModel, MetaKey, MetaSynchronizer, PageMetadataSink};
pub use models::{Entry, FeedEntry, Fetched, Media};
pub use store::{AppendOutcome, FeedStore};
pub use viewport::{ElementBox, Layout, Viewport, ViewportTracker};
