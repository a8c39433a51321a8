//! Programme card feed
//!
//! Fetches the remote XML card feed and turns every `Card` element into a
//! [`CardRecord`]. Missing pieces of a card degrade to empty strings; only a
//! transport failure or a malformed document fails the whole fetch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libradiocast::feed::FeedClient;
//! use libradiocast::fetch::mock::MockFetcher;
//!
//! # async fn example() -> libradiocast::Result<()> {
//! let fetcher = MockFetcher::new().with_page(
//!     "https://feed.example.com/cards",
//!     "<Cards><Card><View><InternalName>Drive</InternalName></View></Card></Cards>",
//! );
//! let client = FeedClient::new(Arc::new(fetcher), "https://feed.example.com/cards");
//! let cards = client.fetch_cards().await?;
//! assert_eq!(cards[0].title, "Drive");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::fetch::{fetch_text, Fetcher};
use crate::types::CardRecord;

pub mod target;
pub mod xml;

pub use target::resolve_target_url;

const CARD: &str = "Card";
const VIEW: &str = "View";
const INTERNAL_NAME: &str = "InternalName";
const IMAGE_URL: &str = "ImageURL";
const URL: &str = "URL";

/// Parse a feed document into card records, in document order
pub fn parse_cards(document: &str) -> Result<Vec<CardRecord>> {
    let root = xml::parse_document(document)?;

    let mut cards = Vec::new();
    if root.name == CARD {
        cards.push(card_from_element(&root));
    }
    cards.extend(root.descendants_named(CARD).into_iter().map(card_from_element));
    Ok(cards)
}

fn card_from_element(card: &xml::XmlElement) -> CardRecord {
    let Some(view) = card.first_descendant(VIEW) else {
        return CardRecord::default();
    };

    let field = |name: &str| {
        view.first_descendant(name)
            .map(|el| el.text_content().trim().to_string())
            .unwrap_or_default()
    };

    CardRecord {
        title: field(INTERNAL_NAME),
        image_url: field(IMAGE_URL),
        target_url: resolve_target_url(&field(URL)),
    }
}

/// Fetches programme cards from a fixed feed endpoint
pub struct FeedClient {
    fetcher: Arc<dyn Fetcher>,
    url: String,
}

impl FeedClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the feed
    ///
    /// # Errors
    ///
    /// - `FetchError` if the request fails or answers a non-success status
    /// - `FeedError::Malformed` if the body is not a well-formed XML document
    pub async fn fetch_cards(&self) -> Result<Vec<CardRecord>> {
        let body = fetch_text(self.fetcher.as_ref(), &self.url).await?;
        let cards = parse_cards(&body)?;
        tracing::debug!(url = %self.url, count = cards.len(), "Feed parsed");
        Ok(cards)
    }
}
