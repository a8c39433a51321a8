//! Section initializer
//!
//! One-time setup for a freshly injected fragment. Dispatch is an exhaustive
//! match over [`KnownSection`]; any other section id is a valid section with
//! no special behavior.
//!
//! The initializer only touches the document synchronously. Work that must
//! not block (loading the programme feed) is returned as an [`Effect`] for
//! the caller to spawn.

use crate::document::{attrs, ids, Document, ElementId, Listener, Query};
use crate::types::{KnownSection, SectionId};

/// Deferred work requested by an initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the programme feed and render it into `grid`
    RenderProgrammes { grid: ElementId },
}

/// What an initializer run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub section: SectionId,
    /// Number of listeners attached
    pub wired: usize,
    pub effects: Vec<Effect>,
}

impl InitReport {
    fn empty(section: &SectionId) -> Self {
        Self {
            section: section.clone(),
            wired: 0,
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SectionInitializer;

impl SectionInitializer {
    pub fn new() -> Self {
        Self
    }

    /// Run the setup for `section` against the current document
    ///
    /// Never fails: a missing element means the feature is absent from this
    /// fragment and is skipped; a listener that cannot be attached is logged.
    pub fn run(&self, section: &SectionId, document: &dyn Document) -> InitReport {
        let mut report = InitReport::empty(section);

        match KnownSection::from_id(section) {
            Some(KnownSection::Radio) => self.init_radio(document, &mut report),
            Some(KnownSection::Programmes) => self.init_programmes(document, &mut report),
            Some(KnownSection::ProgrammeViewer) => self.init_viewer(document, &mut report),
            Some(KnownSection::Home) | None => {}
        }

        tracing::debug!(
            section = %section,
            wired = report.wired,
            effects = report.effects.len(),
            "Section initialized"
        );
        report
    }

    fn init_radio(&self, document: &dyn Document, report: &mut InitReport) {
        let Some(player) = document.get_element_by_id(ids::RADIO_PLAYER) else {
            tracing::debug!("No radio player in fragment, play controls left unwired");
            return;
        };

        for button in document.query_all(None, &Query::class(attrs::PLAY_BUTTON_CLASS)) {
            wire(document, button, Listener::PlayStream { player }, report);
        }
    }

    fn init_programmes(&self, document: &dyn Document, report: &mut InitReport) {
        match document.get_element_by_id(ids::PROGRAMME_GRID) {
            Some(grid) => report.effects.push(Effect::RenderProgrammes { grid }),
            None => tracing::debug!("No programme grid in fragment"),
        }
    }

    fn init_viewer(&self, document: &dyn Document, report: &mut InitReport) {
        if let Some(back) = document.get_element_by_id(ids::PROGRAMME_BACK) {
            let listener = Listener::Navigate {
                section: SectionId::programmes(),
            };
            wire(document, back, listener, report);
        }
    }
}

fn wire(document: &dyn Document, element: ElementId, listener: Listener, report: &mut InitReport) {
    match document.add_listener(element, listener) {
        Ok(()) => report.wired += 1,
        Err(e) => tracing::warn!(element = %element, error = %e, "Failed to attach listener"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadlessDocument;

    fn run(section: SectionId, markup: &str) -> (HeadlessDocument, InitReport) {
        let doc = HeadlessDocument::from_markup(markup).unwrap();
        let report = SectionInitializer::new().run(&section, &doc);
        (doc, report)
    }

    #[test]
    fn test_radio_wires_every_play_button() {
        let (doc, report) = run(
            SectionId::radio(),
            r#"<audio id="radio-player"></audio>
               <button class="play-button" data-stream="https://s/one.m3u8">One</button>
               <button class="play-button big" data-stream="https://s/two.m3u8">Two</button>
               <button class="other">Skip</button>"#,
        );

        let player = doc.get_element_by_id(ids::RADIO_PLAYER).unwrap();
        assert_eq!(report.wired, 2);
        assert!(report.effects.is_empty());
        for button in doc.query_all(None, &Query::class(attrs::PLAY_BUTTON_CLASS)) {
            assert_eq!(doc.listeners(button), vec![Listener::PlayStream { player }]);
        }
    }

    #[test]
    fn test_radio_without_player_is_skipped() {
        let (doc, report) = run(
            SectionId::radio(),
            r#"<button class="play-button" data-stream="x">One</button>"#,
        );
        assert_eq!(report.wired, 0);
        let button = doc.query_all(None, &Query::class(attrs::PLAY_BUTTON_CLASS))[0];
        assert!(doc.listeners(button).is_empty());
    }

    #[test]
    fn test_programmes_requests_feed_render() {
        let (doc, report) = run(
            SectionId::programmes(),
            r#"<div id="programme-grid"></div>"#,
        );
        let grid = doc.get_element_by_id(ids::PROGRAMME_GRID).unwrap();
        assert_eq!(report.effects, vec![Effect::RenderProgrammes { grid }]);
    }

    #[test]
    fn test_programmes_without_grid_has_no_effect() {
        let (_, report) = run(SectionId::programmes(), "<p>Nothing here</p>");
        assert!(report.effects.is_empty());
    }

    #[test]
    fn test_viewer_wires_back_control() {
        let (doc, report) = run(
            SectionId::programme_viewer(),
            r#"<button id="programme-back">Back</button><iframe id="programme-frame"></iframe>"#,
        );
        let back = doc.get_element_by_id(ids::PROGRAMME_BACK).unwrap();
        assert_eq!(report.wired, 1);
        assert_eq!(
            doc.listeners(back),
            vec![Listener::Navigate {
                section: SectionId::programmes()
            }]
        );
    }

    #[test]
    fn test_viewer_without_back_control_is_noop() {
        let (_, report) = run(SectionId::programme_viewer(), r#"<iframe id="programme-frame"></iframe>"#);
        assert_eq!(report.wired, 0);
    }

    #[test]
    fn test_home_and_unknown_sections_are_noops() {
        let markup = r#"<button class="play-button">x</button><div id="programme-grid"></div>"#;

        let (_, home) = run(SectionId::home(), markup);
        assert_eq!(home.wired, 0);
        assert!(home.effects.is_empty());

        let (_, other) = run(SectionId::new("section-about").unwrap(), markup);
        assert_eq!(other.wired, 0);
        assert!(other.effects.is_empty());
        assert_eq!(other.section.as_str(), "section-about");
    }
}
