//! Core data types for Radiocast

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RadiocastError, Result};

/// Identifier naming one fragment resource
///
/// Section identifiers become a path segment of the fragment URL, so they are
/// validated on construction: non-empty, no path separators, no query or
/// fragment delimiters and no parent-directory references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(String);

impl SectionId {
    pub const HOME: &'static str = "section-home";
    pub const RADIO: &'static str = "section-radio";
    pub const PROGRAMMES: &'static str = "section-programmes";
    pub const PROGRAMME_VIEWER: &'static str = "section-programme-viewer";

    /// Create a validated section identifier
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err(RadiocastError::InvalidInput(
                "Section identifier cannot be empty".to_string(),
            ));
        }

        if trimmed.contains(['/', '\\', '?', '#', '%', ':']) || trimmed.contains("..") {
            return Err(RadiocastError::InvalidInput(format!(
                "Section identifier '{}' contains reserved characters",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn home() -> Self {
        Self(Self::HOME.to_string())
    }

    pub fn radio() -> Self {
        Self(Self::RADIO.to_string())
    }

    pub fn programmes() -> Self {
        Self(Self::PROGRAMMES.to_string())
    }

    pub fn programme_viewer() -> Self {
        Self(Self::PROGRAMME_VIEWER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SectionId {
    type Err = RadiocastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SectionId {
    type Error = RadiocastError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SectionId> for String {
    fn from(id: SectionId) -> Self {
        id.0
    }
}

/// Sections with dedicated initialization behavior
///
/// Any other `SectionId` is a plain section: valid, displayed, never initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownSection {
    Home,
    Radio,
    Programmes,
    ProgrammeViewer,
}

impl KnownSection {
    pub const ALL: [KnownSection; 4] = [
        KnownSection::Home,
        KnownSection::Radio,
        KnownSection::Programmes,
        KnownSection::ProgrammeViewer,
    ];

    pub fn from_id(id: &SectionId) -> Option<Self> {
        match id.as_str() {
            SectionId::HOME => Some(KnownSection::Home),
            SectionId::RADIO => Some(KnownSection::Radio),
            SectionId::PROGRAMMES => Some(KnownSection::Programmes),
            SectionId::PROGRAMME_VIEWER => Some(KnownSection::ProgrammeViewer),
            _ => None,
        }
    }

    pub fn id(self) -> SectionId {
        match self {
            KnownSection::Home => SectionId::home(),
            KnownSection::Radio => SectionId::radio(),
            KnownSection::Programmes => SectionId::programmes(),
            KnownSection::ProgrammeViewer => SectionId::programme_viewer(),
        }
    }
}

/// Raw markup for one section, as fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub section: SectionId,
    pub markup: String,
}

/// One programme card extracted from the remote feed
///
/// `target_url` is the empty string when the wrapped destination could not be
/// resolved; such a card renders but does nothing when clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub title: String,
    pub image_url: String,
    pub target_url: String,
}

impl CardRecord {
    pub fn is_actionable(&self) -> bool {
        !self.target_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_id_accepts_known_sections() {
        for section in KnownSection::ALL {
            let id = SectionId::new(section.id().as_str()).unwrap();
            assert_eq!(KnownSection::from_id(&id), Some(section));
        }
    }

    #[test]
    fn test_section_id_trims_whitespace() {
        let id = SectionId::new("  section-about ").unwrap();
        assert_eq!(id.as_str(), "section-about");
        assert_eq!(KnownSection::from_id(&id), None);
    }

    #[test]
    fn test_section_id_rejects_empty() {
        assert!(SectionId::new("").is_err());
        assert!(SectionId::new("   ").is_err());
    }

    #[test]
    fn test_section_id_rejects_path_traversal() {
        assert!(SectionId::new("../secret").is_err());
        assert!(SectionId::new("a/b").is_err());
        assert!(SectionId::new("home?x=1").is_err());
        assert!(SectionId::new("home#top").is_err());
        assert!(SectionId::new("http:evil").is_err());
        assert!(SectionId::new("javascript:x").is_err());
        assert!(SectionId::new("//evil.example.com").is_err());
    }

    #[test]
    fn test_section_id_serde_validates() {
        let ok: SectionId = serde_json::from_str("\"section-radio\"").unwrap();
        assert_eq!(ok, SectionId::radio());

        let bad = serde_json::from_str::<SectionId>("\"../etc\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_card_record_actionable() {
        let inert = CardRecord::default();
        assert!(!inert.is_actionable());

        let card = CardRecord {
            title: "Breakfast".to_string(),
            image_url: "https://img.example.com/b.png".to_string(),
            target_url: "https://target.example.com/b".to_string(),
        };
        assert!(card.is_actionable());
    }
}
