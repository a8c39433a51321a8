//! Application shell
//!
//! Ties the pieces together the way the hosting page does: wires the
//! navigation menu, loads the default section, turns clicks into actions
//! and runs the deferred work the initializers ask for.
//!
//! Every entry point that a user gesture reaches (`click`, spawned loads,
//! playback, feed rendering) logs its failures and swallows them.
//! Background work is tracked so callers can wait for it with
//! [`Shell::settle`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libradiocast::config::Config;
//! use libradiocast::document::HeadlessDocument;
//! use libradiocast::fetch::HttpFetcher;
//! use libradiocast::media::HeadlessStreamEngine;
//! use libradiocast::shell::{Shell, DEFAULT_HOST_PAGE};
//!
//! # async fn example() -> libradiocast::Result<()> {
//! let config = Config::load_or_default()?;
//! let document = Arc::new(HeadlessDocument::from_markup(DEFAULT_HOST_PAGE)?);
//! let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
//! let engine = Arc::new(HeadlessStreamEngine::unsupported());
//!
//! let shell = Shell::new(&config, document, fetcher, engine)?;
//! shell.boot().await?;
//! shell.settle().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::document::{attrs, ids, require_element, Document, ElementId, Listener, Modifiers, Query};
use crate::error::Result;
use crate::feed::FeedClient;
use crate::fetch::Fetcher;
use crate::initializer::Effect;
use crate::loader::{Continuation, DisplayedSection, FragmentLoader, LoadOutcome};
use crate::media::{RadioPlayer, StreamEngine};
use crate::render::CardRenderer;
use crate::types::SectionId;

pub mod actions;

pub use actions::Action;

/// Host page used when no page markup is supplied
pub const DEFAULT_HOST_PAGE: &str = r##"<header>
  <button id="burger" aria-label="Menu">&#9776;</button>
</header>
<nav id="menu">
  <a href="#" data-section="section-home">Home</a>
  <a href="#" data-section="section-radio">Radio</a>
  <a href="#" data-section="section-programmes">Programmes</a>
</nav>
<div id="overlay"></div>
<main id="content"></main>"##;

struct Inner {
    document: Arc<dyn Document>,
    loader: FragmentLoader,
    feed: FeedClient,
    player: RadioPlayer,
    default_section: SectionId,
    background: Mutex<Vec<JoinHandle<()>>>,
}

/// Cheaply clonable handle to the running shell
#[derive(Clone)]
pub struct Shell {
    inner: Arc<Inner>,
}

impl Shell {
    pub fn new(
        config: &Config,
        document: Arc<dyn Document>,
        fetcher: Arc<dyn Fetcher>,
        engine: Arc<dyn StreamEngine>,
    ) -> Result<Self> {
        let loader = FragmentLoader::new(
            Arc::clone(&fetcher),
            Arc::clone(&document),
            &config.fragments,
            config.shell.container_id.clone(),
            config.shell.error_markup.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(Inner {
                document,
                loader,
                feed: FeedClient::new(fetcher, config.feed.url.clone()),
                player: RadioPlayer::new(engine, config.player.native_mime_type.clone()),
                default_section: config.shell.default_section.clone(),
                background: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn document(&self) -> &dyn Document {
        self.inner.document.as_ref()
    }

    pub fn player(&self) -> &RadioPlayer {
        &self.inner.player
    }

    pub fn displayed(&self) -> DisplayedSection {
        self.inner.loader.displayed()
    }

    /// Wire the navigation menu, then load the default section
    ///
    /// Missing menu elements are skipped with a warning; the default section
    /// is loaded regardless.
    pub async fn boot(&self) -> Result<LoadOutcome> {
        let wired = self.wire_menu();
        info!(wired, section = %self.inner.default_section, "Booting shell");
        self.load(self.inner.default_section.clone(), None).await
    }

    fn wire_menu(&self) -> usize {
        let document = self.document();
        let (Some(burger), Some(menu), Some(overlay)) = (
            document.get_element_by_id(ids::BURGER),
            document.get_element_by_id(ids::MENU),
            document.get_element_by_id(ids::OVERLAY),
        ) else {
            warn!("Navigation menu elements missing, menu left unwired");
            return 0;
        };

        let mut bindings = vec![
            (burger, Listener::ToggleMenu { menu, overlay }),
            (overlay, Listener::CloseMenu { menu, overlay }),
        ];
        bindings.extend(
            document
                .query_all(Some(menu), &Query::tag_with_attribute("a", attrs::DATA_SECTION))
                .into_iter()
                .map(|link| (link, Listener::MenuLink { menu, overlay })),
        );

        let mut wired = 0;
        for (element, listener) in bindings {
            match document.add_listener(element, listener) {
                Ok(()) => wired += 1,
                Err(e) => warn!(element = %element, error = %e, "Failed to wire menu"),
            }
        }
        wired
    }

    /// Load a section and start the work its initializer deferred
    pub async fn load(
        &self,
        section: SectionId,
        continuation: Option<Continuation>,
    ) -> Result<LoadOutcome> {
        let outcome = self.inner.loader.load(section, continuation).await?;
        if let Some(report) = outcome.report() {
            for effect in &report.init.effects {
                self.spawn_effect(effect.clone());
            }
        }
        Ok(outcome)
    }

    /// Start a load in the background
    ///
    /// Failures are already reported by the loader and go no further.
    pub fn spawn_load(&self, section: SectionId, continuation: Option<Continuation>) {
        let shell = self.clone();
        self.track(tokio::spawn(async move {
            if let Err(e) = shell.load(section.clone(), continuation).await {
                debug!(section = %section, error = %e, "Background load failed");
            }
        }));
    }

    fn spawn_effect(&self, effect: Effect) {
        let shell = self.clone();
        match effect {
            Effect::RenderProgrammes { grid } => {
                self.track(tokio::spawn(async move { shell.render_programmes(grid).await }));
            }
        }
    }

    async fn render_programmes(&self, grid: ElementId) {
        let cards = match self.inner.feed.fetch_cards().await {
            Ok(cards) => cards,
            Err(e) => {
                error!(url = %self.inner.feed.url(), error = %e, "Error fetching programmes");
                Vec::new()
            }
        };

        if let Err(e) = CardRenderer::render(self.document(), &cards, grid) {
            // The grid is gone when another section replaced it meanwhile
            debug!(error = %e, "Programme grid no longer available");
        }
    }

    /// Dispatch a click on `element`
    ///
    /// Listeners on the element and its ancestors fire, target first.
    /// Returns the number of actions performed.
    pub fn click(&self, element: ElementId, modifiers: Modifiers) -> usize {
        let document = self.document();
        let actions: Vec<Action> = document
            .listeners_on_path(element)
            .iter()
            .flat_map(|(source, listener)| Action::resolve(document, *source, listener, modifiers))
            .collect();

        let count = actions.len();
        for action in actions {
            self.perform(action);
        }
        count
    }

    /// Click the element with the given id
    pub fn click_by_id(&self, id: &str, modifiers: Modifiers) -> Result<usize> {
        let element = require_element(self.document(), id)?;
        Ok(self.click(element, modifiers))
    }

    /// Run one action; asynchronous work goes to the background
    pub fn perform(&self, action: Action) {
        debug!(?action, "Performing action");
        let document = self.document();

        match action {
            Action::ToggleMenu { menu, overlay } => {
                for element in [menu, overlay] {
                    if let Err(e) = document.toggle_class(element, attrs::ACTIVE_CLASS) {
                        warn!(error = %e, "Failed to toggle menu");
                    }
                }
            }
            Action::CloseMenu { menu, overlay } => {
                for element in [menu, overlay] {
                    if let Err(e) = document.remove_class(element, attrs::ACTIVE_CLASS) {
                        warn!(error = %e, "Failed to close menu");
                    }
                }
            }
            Action::LoadSection(section) => self.spawn_load(section, None),
            Action::PlayStream { player, url } => {
                let shell = self.clone();
                self.track(tokio::spawn(async move {
                    if let Err(e) = shell.inner.player.play(shell.document(), player, &url).await {
                        error!(url = %url, error = %e, "Playback failed");
                    }
                }));
            }
            Action::ViewProgramme { target_url } => {
                self.spawn_load(SectionId::programme_viewer(), Some(show_in_frame(target_url)));
            }
            Action::OpenExternal { target_url } => {
                info!(url = %target_url, "Opening programme in new context");
                document.open_in_new_context(&target_url);
            }
        }
    }

    /// Wait until all background work, including work it started, is done
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.lock_background());
            if pending.is_empty() {
                break;
            }
            for result in join_all(pending).await {
                if let Err(e) = result {
                    warn!(error = %e, "Background task failed");
                }
            }
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut background = self.lock_background();
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    fn lock_background(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .background
            .lock()
            .unwrap_or_else(|p| p.into_inner())
    }
}

/// Continuation pointing the viewer frame at `target_url`
fn show_in_frame(target_url: String) -> Continuation {
    Box::new(move |document: &dyn Document| {
        match document.get_element_by_id(ids::PROGRAMME_FRAME) {
            Some(frame) => {
                if let Err(e) = document.set_attribute(frame, "src", &target_url) {
                    error!(url = %target_url, error = %e, "Failed to set programme frame source");
                }
            }
            None => error!(url = %target_url, "No iframe found in programme viewer"),
        }
    })
}
