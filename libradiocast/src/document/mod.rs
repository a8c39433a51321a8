//! Host surface abstraction
//!
//! The shell never talks to a browser directly. Everything it needs from the
//! hosting page (element lookup by id, injecting markup, creating card
//! elements, wiring listeners, driving the media element, opening a new
//! browsing context) goes through the [`Document`] trait. [`HeadlessDocument`]
//! implements it in memory so the whole lifecycle runs and tests without a
//! real document tree.

use std::fmt;

use crate::error::Result;
use crate::types::SectionId;

pub mod headless;
pub mod markup;

pub use headless::HeadlessDocument;

/// Element ids the shell relies on
pub mod ids {
    pub const BURGER: &str = "burger";
    pub const MENU: &str = "menu";
    pub const OVERLAY: &str = "overlay";
    pub const CONTENT: &str = "content";
    pub const RADIO_PLAYER: &str = "radio-player";
    pub const PROGRAMME_GRID: &str = "programme-grid";
    pub const PROGRAMME_FRAME: &str = "programme-frame";
    pub const PROGRAMME_BACK: &str = "programme-back";
}

/// Attribute and class names the shell reads or writes
pub mod attrs {
    pub const DATA_STREAM: &str = "data-stream";
    pub const DATA_SECTION: &str = "data-section";
    pub const DATA_URL: &str = "data-url";
    pub const PLAY_BUTTON_CLASS: &str = "play-button";
    pub const PROGRAMME_ITEM_CLASS: &str = "programme-item";
    pub const ACTIVE_CLASS: &str = "active";
}

/// Opaque handle to one element of a [`Document`]
///
/// Handles outlive the elements they point to: once an element is removed
/// (for example because the container content was replaced) every operation
/// on its handle fails with `DocumentError::Detached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Element selection used by `query_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Elements carrying the class (`.play-button`)
    Class(String),
    /// Elements with the tag name and attribute present (`a[data-section]`)
    TagWithAttribute { tag: String, attribute: String },
}

impl Query {
    pub fn class(name: &str) -> Self {
        Query::Class(name.to_string())
    }

    pub fn tag_with_attribute(tag: &str, attribute: &str) -> Self {
        Query::TagWithAttribute {
            tag: tag.to_ascii_lowercase(),
            attribute: attribute.to_string(),
        }
    }
}

/// Keyboard modifiers held during a click
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            meta: false,
        }
    }

    pub fn meta() -> Self {
        Self {
            ctrl: false,
            meta: true,
        }
    }

    /// Ctrl or Command: the "open in a new tab" gesture
    pub fn opens_new_context(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Behavior bound to an element, resolved when the element is clicked
///
/// Listeners are data rather than closures; the shell turns them into actions
/// at click time, reading whatever attributes they need from the element
/// that carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listener {
    /// Burger: toggle the active class on menu and overlay
    ToggleMenu { menu: ElementId, overlay: ElementId },
    /// Overlay: remove the active class from menu and overlay
    CloseMenu { menu: ElementId, overlay: ElementId },
    /// Menu link: load the section named by `data-section`, then close the menu
    MenuLink { menu: ElementId, overlay: ElementId },
    /// Play control: start the stream named by `data-stream` on the player
    PlayStream { player: ElementId },
    /// Programme card: open the destination stored in `data-url`
    ProgrammeCard,
    /// Load a fixed section with no continuation
    Navigate { section: SectionId },
}

/// The DOM surface consumed by the shell
///
/// All methods are synchronous; implementations provide their own interior
/// synchronization so a document can be shared behind an `Arc`.
pub trait Document: Send + Sync {
    /// First attached element with the given `id` attribute, in document order
    fn get_element_by_id(&self, id: &str) -> Option<ElementId>;

    /// Attached elements matching `query` below `root` (or the whole
    /// document), in document order
    fn query_all(&self, root: Option<ElementId>, query: &Query) -> Vec<ElementId>;

    fn tag_name(&self, element: ElementId) -> Option<String>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<()>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    fn add_class(&self, element: ElementId, class: &str) -> Result<()>;

    fn remove_class(&self, element: ElementId, class: &str) -> Result<()>;

    /// Flip a class; returns whether the class is present afterwards
    fn toggle_class(&self, element: ElementId, class: &str) -> Result<bool>;

    /// Replace the element's children with the parsed markup
    ///
    /// The previous children (and any listeners on them) are discarded.
    fn set_inner_markup(&self, element: ElementId, markup: &str) -> Result<()>;

    /// Markup of the element's children
    ///
    /// Returns the source passed to `set_inner_markup` verbatim while the
    /// children are untouched since, and a serialization otherwise.
    fn inner_markup(&self, element: ElementId) -> Result<String>;

    fn text_content(&self, element: ElementId) -> Result<String>;

    fn set_text(&self, element: ElementId, text: &str) -> Result<()>;

    fn children(&self, element: ElementId) -> Result<Vec<ElementId>>;

    fn clear_children(&self, element: ElementId) -> Result<()>;

    /// Create a detached element
    fn create_element(&self, tag: &str) -> ElementId;

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()>;

    fn add_listener(&self, element: ElementId, listener: Listener) -> Result<()>;

    /// Listeners a click on `element` reaches, target first, then ancestors
    fn listeners_on_path(&self, element: ElementId) -> Vec<(ElementId, Listener)>;

    fn can_play_type(&self, media: ElementId, mime_type: &str) -> bool;

    fn play(&self, media: ElementId) -> Result<()>;

    /// Open a URL outside the shell (`window.open(url, "_blank")`)
    fn open_in_new_context(&self, url: &str);
}

/// Look up a required element
pub fn require_element(document: &dyn Document, id: &str) -> Result<ElementId> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| crate::error::DocumentError::MissingElement(id.to_string()).into())
}
