//! Card renderer
//!
//! Turns card records into `div.programme-item` elements inside a container.
//! Each card carries its target URL in `data-url` and a
//! [`Listener::ProgrammeCard`]; the shell decides what a click does.

use crate::document::{attrs, Document, ElementId, Listener};
use crate::error::Result;
use crate::types::CardRecord;

pub struct CardRenderer;

impl CardRenderer {
    /// Replace the container's children with one element per card
    ///
    /// Rendering is idempotent: prior content is cleared first, so rendering
    /// the same list twice yields the same number of cards.
    ///
    /// Returns the number of cards rendered.
    pub fn render(
        document: &dyn Document,
        cards: &[CardRecord],
        container: ElementId,
    ) -> Result<usize> {
        document.clear_children(container)?;

        for card in cards {
            let item = Self::card_element(document, card)?;
            document.append_child(container, item)?;
        }

        tracing::debug!(count = cards.len(), "Rendered programme cards");
        Ok(cards.len())
    }

    fn card_element(document: &dyn Document, card: &CardRecord) -> Result<ElementId> {
        let item = document.create_element("div");
        document.add_class(item, attrs::PROGRAMME_ITEM_CLASS)?;
        document.set_attribute(item, attrs::DATA_URL, &card.target_url)?;

        let image = document.create_element("img");
        document.set_attribute(image, "src", &card.image_url)?;
        document.set_attribute(image, "alt", &card.title)?;
        document.append_child(item, image)?;

        let heading = document.create_element("h3");
        document.set_text(heading, &card.title)?;
        document.append_child(item, heading)?;

        document.add_listener(item, Listener::ProgrammeCard)?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ids, HeadlessDocument, Query};

    fn grid_document() -> (HeadlessDocument, ElementId) {
        let doc = HeadlessDocument::from_markup(r#"<div id="programme-grid"><p>Loading...</p></div>"#)
            .unwrap();
        let grid = doc.get_element_by_id(ids::PROGRAMME_GRID).unwrap();
        (doc, grid)
    }

    fn cards() -> Vec<CardRecord> {
        vec![
            CardRecord {
                title: "Breakfast".to_string(),
                image_url: "https://img.example.com/b.png".to_string(),
                target_url: "https://t.example.com/b".to_string(),
            },
            CardRecord {
                title: "Late <Night>".to_string(),
                image_url: "https://img.example.com/l.png".to_string(),
                target_url: String::new(),
            },
        ]
    }

    #[test]
    fn test_render_builds_card_elements() {
        let (doc, grid) = grid_document();

        let count = CardRenderer::render(&doc, &cards(), grid).unwrap();
        assert_eq!(count, 2);

        let items = doc.children(grid).unwrap();
        assert_eq!(items.len(), 2);

        let first = items[0];
        assert_eq!(doc.tag_name(first).as_deref(), Some("div"));
        assert!(doc.has_class(first, attrs::PROGRAMME_ITEM_CLASS));
        assert_eq!(
            doc.attribute(first, attrs::DATA_URL).as_deref(),
            Some("https://t.example.com/b")
        );
        assert_eq!(doc.listeners(first), vec![Listener::ProgrammeCard]);

        let parts = doc.children(first).unwrap();
        assert_eq!(doc.tag_name(parts[0]).as_deref(), Some("img"));
        assert_eq!(
            doc.attribute(parts[0], "src").as_deref(),
            Some("https://img.example.com/b.png")
        );
        assert_eq!(doc.attribute(parts[0], "alt").as_deref(), Some("Breakfast"));
        assert_eq!(doc.tag_name(parts[1]).as_deref(), Some("h3"));
        assert_eq!(doc.text_content(parts[1]).unwrap(), "Breakfast");
    }

    #[test]
    fn test_title_is_text_not_markup() {
        let (doc, grid) = grid_document();
        CardRenderer::render(&doc, &cards(), grid).unwrap();

        let second = doc.children(grid).unwrap()[1];
        let heading = doc.children(second).unwrap()[1];
        assert_eq!(doc.text_content(heading).unwrap(), "Late <Night>");
        assert!(doc.children(heading).unwrap().is_empty());
    }

    #[test]
    fn test_inert_card_still_renders() {
        let (doc, grid) = grid_document();
        CardRenderer::render(&doc, &cards(), grid).unwrap();

        let second = doc.children(grid).unwrap()[1];
        assert_eq!(doc.attribute(second, attrs::DATA_URL).as_deref(), Some(""));
    }

    #[test]
    fn test_render_twice_does_not_duplicate() {
        let (doc, grid) = grid_document();

        CardRenderer::render(&doc, &cards(), grid).unwrap();
        CardRenderer::render(&doc, &cards(), grid).unwrap();

        let query = Query::class(attrs::PROGRAMME_ITEM_CLASS);
        assert_eq!(doc.query_all(Some(grid), &query).len(), 2);
        assert_eq!(doc.children(grid).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_list_clears_container() {
        let (doc, grid) = grid_document();
        CardRenderer::render(&doc, &cards(), grid).unwrap();

        CardRenderer::render(&doc, &[], grid).unwrap();
        assert!(doc.children(grid).unwrap().is_empty());
        assert_eq!(doc.text_content(grid).unwrap(), "");
    }
}
