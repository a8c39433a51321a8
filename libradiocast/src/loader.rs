//! Fragment loader
//!
//! Orchestrates one section load as a sequential pipeline:
//! fetch, inject into the container, run the section initializer, then run
//! the caller's continuation. The loader owns [`DisplayedSection`], the only
//! record of what the container currently shows.
//!
//! Overlapping loads are resolved by generation: every call takes a
//! [`LoadToken`] and only the most recent token may touch the document once
//! its fetch resolves. Older loads finish as [`LoadOutcome::Superseded`]
//! without side effects. Superseded fetches are not aborted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info};
use url::Url;

use crate::config::FragmentsConfig;
use crate::document::{require_element, Document};
use crate::error::{FetchError, Result};
use crate::fetch::{fetch_text, Fetcher};
use crate::initializer::{InitReport, SectionInitializer};
use crate::types::{Fragment, SectionId};

/// Caller-supplied work to run after a successful load and its initializer
///
/// Being `FnOnce`, a continuation can run at most once.
pub type Continuation = Box<dyn FnOnce(&dyn Document) + Send>;

/// Generation number of one `load` call; higher is newer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// The section shown in the container
///
/// Replaced as a whole on each successful load; left untouched by failed or
/// superseded loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayedSection {
    pub section: Option<SectionId>,
    pub initialized: bool,
    pub token: Option<LoadToken>,
}

/// Result of a load that reached the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub token: LoadToken,
    pub section: SectionId,
    pub init: InitReport,
    /// Whether a continuation was supplied and ran
    pub continued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Displayed(LoadReport),
    /// A newer load started before this one resolved; nothing was changed
    Superseded { token: LoadToken, latest: LoadToken },
}

impl LoadOutcome {
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            LoadOutcome::Displayed(report) => Some(report),
            LoadOutcome::Superseded { .. } => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, LoadOutcome::Superseded { .. })
    }
}

pub struct FragmentLoader {
    fetcher: Arc<dyn Fetcher>,
    document: Arc<dyn Document>,
    initializer: SectionInitializer,
    base_url: Url,
    directory: String,
    extension: String,
    container_id: String,
    error_markup: String,
    generation: AtomicU64,
    state: Mutex<DisplayedSection>,
}

impl FragmentLoader {
    /// Create a loader injecting into the element with id `container_id`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if the fragments base URL does not parse.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        document: Arc<dyn Document>,
        fragments: &FragmentsConfig,
        container_id: impl Into<String>,
        error_markup: impl Into<String>,
    ) -> Result<Self> {
        let mut base = fragments.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", fragments.base_url, e)))?;

        Ok(Self {
            fetcher,
            document,
            initializer: SectionInitializer::new(),
            base_url,
            directory: fragments.directory.trim_matches('/').to_string(),
            extension: fragments.extension.trim_start_matches('.').to_string(),
            container_id: container_id.into(),
            error_markup: error_markup.into(),
            generation: AtomicU64::new(0),
            state: Mutex::new(DisplayedSection::default()),
        })
    }

    /// URL of the fragment resource for `section`
    pub fn fragment_url(&self, section: &SectionId) -> Result<Url> {
        let file = format!("{}.{}", section, self.extension);
        let relative = if self.directory.is_empty() {
            file
        } else {
            format!("{}/{}", self.directory, file)
        };
        self.base_url
            .join(&relative)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", relative, e)).into())
    }

    /// Snapshot of the displayed section
    pub fn displayed(&self) -> DisplayedSection {
        self.lock_state().clone()
    }

    /// Token of the most recent `load` call, if any
    pub fn latest_token(&self) -> Option<LoadToken> {
        match self.generation.load(Ordering::SeqCst) {
            0 => None,
            n => Some(LoadToken(n)),
        }
    }

    /// Load `section` into the container
    ///
    /// On success the fetched markup replaces the container content, the
    /// section initializer runs, then `continuation` runs. On failure the
    /// container shows the error markup, the failure is logged, neither the
    /// initializer nor the continuation runs, and the error is returned.
    /// A load overtaken by a newer one returns [`LoadOutcome::Superseded`]
    /// and changes nothing, whether its fetch succeeded or not.
    pub async fn load(
        &self,
        section: SectionId,
        continuation: Option<Continuation>,
    ) -> Result<LoadOutcome> {
        let token = LoadToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        let url = self.fragment_url(&section)?;
        debug!(section = %section, url = %url, token = %token, "Loading section");

        let fetched = fetch_text(self.fetcher.as_ref(), url.as_str()).await;

        // Held until the initializer has run; released before the continuation
        let mut state = self.lock_state();
        let latest = LoadToken(self.generation.load(Ordering::SeqCst));
        if latest != token {
            debug!(section = %section, token = %token, latest = %latest, "Discarding superseded load");
            return Ok(LoadOutcome::Superseded { token, latest });
        }

        let fragment = match fetched {
            Ok(markup) => Fragment {
                section: section.clone(),
                markup,
            },
            Err(e) => {
                self.show_error();
                error!(section = %section, url = %url, error = %e, "Error loading section");
                return Err(e);
            }
        };

        if let Err(e) = self.inject(&fragment) {
            self.show_error();
            error!(section = %section, url = %url, error = %e, "Error injecting section");
            return Err(e);
        }

        *state = DisplayedSection {
            section: Some(section.clone()),
            initialized: false,
            token: Some(token),
        };

        let init = self.initializer.run(&section, self.document.as_ref());
        state.initialized = true;
        drop(state);

        let continued = match continuation {
            Some(next) => {
                next(self.document.as_ref());
                true
            }
            None => false,
        };

        info!(section = %section, token = %token, "Section displayed");
        Ok(LoadOutcome::Displayed(LoadReport {
            token,
            section,
            init,
            continued,
        }))
    }

    fn inject(&self, fragment: &Fragment) -> Result<()> {
        let container = require_element(self.document.as_ref(), &self.container_id)?;
        self.document.set_inner_markup(container, &fragment.markup)
    }

    fn show_error(&self) {
        let shown = require_element(self.document.as_ref(), &self.container_id)
            .and_then(|container| self.document.set_inner_markup(container, &self.error_markup));
        if let Err(e) = shown {
            error!(error = %e, "Unable to show error message");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DisplayedSection> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
