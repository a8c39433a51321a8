//! Click actions
//!
//! A click produces one [`Action`] per listener on the event path. Listeners
//! are resolved against the element that carries them, so attribute values
//! (`data-section`, `data-stream`, `data-url`) are read at click time.

use crate::document::{attrs, Document, ElementId, Listener, Modifiers};
use crate::types::SectionId;

/// Something the shell should do in response to a click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Flip the active class on menu and overlay
    ToggleMenu { menu: ElementId, overlay: ElementId },

    /// Remove the active class from menu and overlay
    CloseMenu { menu: ElementId, overlay: ElementId },

    /// Load a section with no continuation
    LoadSection(SectionId),

    /// Start a stream on the media element
    PlayStream { player: ElementId, url: String },

    /// Show a programme in the viewer section
    ViewProgramme { target_url: String },

    /// Open a programme outside the shell
    OpenExternal { target_url: String },
}

impl Action {
    /// Resolve the actions for one listener found on the click path
    ///
    /// Returns nothing when the listener is inert for this click: a menu link
    /// without a usable `data-section`, a play control without a stream, or
    /// a card whose target URL is empty.
    pub fn resolve(
        document: &dyn Document,
        source: ElementId,
        listener: &Listener,
        modifiers: Modifiers,
    ) -> Vec<Action> {
        match listener {
            Listener::ToggleMenu { menu, overlay } => vec![Action::ToggleMenu {
                menu: *menu,
                overlay: *overlay,
            }],
            Listener::CloseMenu { menu, overlay } => vec![Action::CloseMenu {
                menu: *menu,
                overlay: *overlay,
            }],
            Listener::MenuLink { menu, overlay } => {
                let Some(raw) = document.attribute(source, attrs::DATA_SECTION) else {
                    return Vec::new();
                };
                match SectionId::new(raw.as_str()) {
                    Ok(section) => vec![
                        Action::LoadSection(section),
                        Action::CloseMenu {
                            menu: *menu,
                            overlay: *overlay,
                        },
                    ],
                    Err(e) => {
                        tracing::warn!(section = %raw, error = %e, "Ignoring menu link");
                        Vec::new()
                    }
                }
            }
            Listener::PlayStream { player } => match document.attribute(source, attrs::DATA_STREAM) {
                Some(url) if !url.trim().is_empty() => vec![Action::PlayStream {
                    player: *player,
                    url: url.trim().to_string(),
                }],
                _ => Vec::new(),
            },
            Listener::ProgrammeCard => {
                let target_url = document
                    .attribute(source, attrs::DATA_URL)
                    .unwrap_or_default();
                if target_url.is_empty() {
                    Vec::new()
                } else if modifiers.opens_new_context() {
                    vec![Action::OpenExternal { target_url }]
                } else {
                    vec![Action::ViewProgramme { target_url }]
                }
            }
            Listener::Navigate { section } => vec![Action::LoadSection(section.clone())],
        }
    }
}
