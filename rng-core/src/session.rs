//! PromptSession - the primary public API for the sampling engine.
//!
//! Wraps the catalog, draw state, sampler, output configs and persistence
//! into a single facade. Construction degrades gracefully: any fetch error
//! falls back to the configured default dataset and the session stays fully
//! interactive.

use crate::bag::ShuffleBags;
use crate::output;
use crate::persist::{PersistError, SavedSession};
use crate::roll::{self, LimitBound, PoolState, Sampler};
use crate::storage::{self, JsonFileStore, KeyValueStore, MemoryStore};
use crate::testing::sample_catalog;
use content_api::{Category, ContentApi, GroupLimit, ItemKey, OutputBlock, OutputConfig, PromptItem};
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from session operations.
///
/// Sampling itself never fails; only the network and snapshot paths do.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Content API error: {0}")]
    Api(#[from] content_api::Error),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Configuration for creating a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Content API base URL; `None` reads `RNG_PROMPT_API_BASE`.
    pub base_url: Option<String>,

    /// Dataset used when the initial fetch fails.
    pub fallback: Vec<Category>,

    /// Draw through persisted shuffle bags instead of fresh uniform picks.
    pub cycled_sampling: bool,

    /// File backing the key-value store; `None` keeps state in memory only.
    pub store_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            base_url: None,
            fallback: sample_catalog(),
            cycled_sampling: false,
            store_path: None,
        }
    }

    /// Set the content API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the fallback dataset for failed fetches.
    pub fn with_fallback(mut self, fallback: Vec<Category>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sample without replacement through persisted shuffle bags.
    pub fn with_cycled_sampling(mut self) -> Self {
        self.cycled_sampling = true;
        self
    }

    /// Persist group limits and shuffle bags to a file.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A sampling session.
///
/// All mutating operations come in pairs: the plain form draws from the
/// thread RNG, the `_with_rng` form takes a caller-supplied source so tests
/// can assert exact outcomes.
pub struct PromptSession {
    api: ContentApi,
    catalog: Vec<Category>,
    output_configs: Vec<OutputConfig>,
    active_output_config_id: Option<String>,
    state: PoolState,
    sampler: Sampler,
    store: Box<dyn KeyValueStore>,
    used_fallback: bool,
}

impl PromptSession {
    /// Create a session, fetching the catalog and output configs.
    ///
    /// Never fails: fetch errors degrade to the fallback dataset (visible
    /// via [`used_fallback`](Self::used_fallback)) and an empty config list.
    pub async fn new(config: SessionConfig) -> Self {
        let api = match &config.base_url {
            Some(base) => ContentApi::new(base.clone()),
            None => ContentApi::from_env(),
        };

        let store: Box<dyn KeyValueStore> = match &config.store_path {
            Some(path) => Box::new(JsonFileStore::open(path)),
            None => Box::new(MemoryStore::new()),
        };

        let (catalog, used_fallback) = match api.fetch_categories().await {
            Ok(catalog) => (catalog, false),
            Err(error) => {
                warn!(%error, "category fetch failed, using fallback dataset");
                (config.fallback, true)
            }
        };

        let output_configs = match api.fetch_output_configs().await {
            Ok(configs) => configs,
            Err(error) => {
                warn!(%error, "output config fetch failed, starting empty");
                Vec::new()
            }
        };

        Self::assemble(api, catalog, output_configs, store, config.cycled_sampling, used_fallback)
    }

    /// Create a session offline, without touching the network.
    pub fn with_catalog(catalog: Vec<Category>) -> Self {
        Self::assemble(
            ContentApi::from_env(),
            catalog,
            Vec::new(),
            Box::new(MemoryStore::new()),
            false,
            false,
        )
    }

    /// Offline construction honoring sampling mode and store path.
    pub fn with_catalog_and_config(catalog: Vec<Category>, config: SessionConfig) -> Self {
        let api = match &config.base_url {
            Some(base) => ContentApi::new(base.clone()),
            None => ContentApi::from_env(),
        };
        let store: Box<dyn KeyValueStore> = match &config.store_path {
            Some(path) => Box::new(JsonFileStore::open(path)),
            None => Box::new(MemoryStore::new()),
        };
        Self::assemble(api, catalog, Vec::new(), store, config.cycled_sampling, false)
    }

    fn assemble(
        api: ContentApi,
        catalog: Vec<Category>,
        output_configs: Vec<OutputConfig>,
        store: Box<dyn KeyValueStore>,
        cycled: bool,
        used_fallback: bool,
    ) -> Self {
        let sampler = if cycled {
            Sampler::cycled(storage::read_shuffle_bags(store.as_ref()))
        } else {
            Sampler::Uniform
        };

        let active_output_config_id = output_configs
            .iter()
            .find(|config| config.is_active)
            .map(|config| config.id.clone());

        let stored_limits = storage::read_group_limits(store.as_ref());
        let mut state = PoolState::default();
        state.init_from_catalog(&catalog, &stored_limits);

        Self {
            api,
            catalog,
            output_configs,
            active_output_config_id,
            state,
            sampler,
            store,
            used_fallback,
        }
    }

    /// Refetch the catalog and re-derive state for new categories.
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        let catalog = self.api.fetch_categories().await?;
        self.catalog = catalog;
        self.used_fallback = false;
        let stored_limits = storage::read_group_limits(self.store.as_ref());
        self.state.init_from_catalog(&self.catalog, &stored_limits);
        Ok(())
    }

    // ========================================================================
    // Rerolls
    // ========================================================================

    /// Reroll the whole pool.
    pub fn roll_all(&mut self) {
        self.roll_all_with_rng(&mut rand::thread_rng());
    }

    pub fn roll_all_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug!("rolling all groups");
        roll::roll_all(&self.catalog, &mut self.state, &mut self.sampler, rng);
        self.sync_bags();
    }

    /// Reroll one category from its card refresh control.
    pub fn refresh_category(&mut self, slug: &str) {
        self.refresh_category_with_rng(slug, &mut rand::thread_rng());
    }

    pub fn refresh_category_with_rng<R: Rng + ?Sized>(&mut self, slug: &str, rng: &mut R) {
        roll::refresh_category(&self.catalog, &mut self.state, slug, &mut self.sampler, rng);
        self.sync_bags();
    }

    /// Reroll one group (named or the general bucket).
    pub fn refresh_group(&mut self, group_id: &str) {
        self.refresh_group_with_rng(group_id, &mut rand::thread_rng());
    }

    pub fn refresh_group_with_rng<R: Rng + ?Sized>(&mut self, group_id: &str, rng: &mut R) {
        roll::refresh_group(&self.catalog, &mut self.state, group_id, &mut self.sampler, rng);
        self.sync_bags();
    }

    // ========================================================================
    // Checks, locks, quantities, limits
    // ========================================================================

    pub fn toggle_checked(&mut self, slug: &str, checked: bool) {
        self.toggle_checked_with_rng(slug, checked, &mut rand::thread_rng());
    }

    pub fn toggle_checked_with_rng<R: Rng + ?Sized>(
        &mut self,
        slug: &str,
        checked: bool,
        rng: &mut R,
    ) {
        roll::toggle_checked(&self.catalog, &mut self.state, slug, checked, &mut self.sampler, rng);
        self.sync_bags();
    }

    pub fn toggle_group_checked(&mut self, group_id: &str, checked: bool) {
        self.toggle_group_checked_with_rng(group_id, checked, &mut rand::thread_rng());
    }

    pub fn toggle_group_checked_with_rng<R: Rng + ?Sized>(
        &mut self,
        group_id: &str,
        checked: bool,
        rng: &mut R,
    ) {
        roll::toggle_group_checked(
            &self.catalog,
            &mut self.state,
            group_id,
            checked,
            &mut self.sampler,
            rng,
        );
        self.sync_bags();
    }

    pub fn toggle_all_optional(&mut self, checked: bool) {
        self.toggle_all_optional_with_rng(checked, &mut rand::thread_rng());
    }

    pub fn toggle_all_optional_with_rng<R: Rng + ?Sized>(&mut self, checked: bool, rng: &mut R) {
        roll::toggle_all_optional(&self.catalog, &mut self.state, checked, &mut self.sampler, rng);
        self.sync_bags();
    }

    /// Freeze or unfreeze one category's current draw.
    pub fn toggle_card_lock(&mut self, slug: &str) {
        roll::toggle_card_lock(&mut self.state, slug);
    }

    pub fn toggle_tag_lock(&mut self, slug: &str, key: ItemKey) {
        self.toggle_tag_lock_with_rng(slug, key, &mut rand::thread_rng());
    }

    pub fn toggle_tag_lock_with_rng<R: Rng + ?Sized>(
        &mut self,
        slug: &str,
        key: ItemKey,
        rng: &mut R,
    ) {
        roll::toggle_tag_lock(&self.catalog, &mut self.state, slug, key, &mut self.sampler, rng);
        self.sync_bags();
    }

    /// Release every card lock and tag lock.
    pub fn unlock_all(&mut self) {
        roll::unlock_all(&mut self.state);
    }

    pub fn set_qty(&mut self, slug: &str, qty: u32) {
        roll::set_qty(&mut self.state, slug, qty);
    }

    pub fn change_qty(&mut self, slug: &str, delta: i32) {
        roll::change_qty(&mut self.state, slug, delta);
    }

    pub fn set_group_limit(&mut self, group_id: &str, limit: GroupLimit) {
        roll::set_group_limit(&mut self.state, group_id, limit);
        storage::write_group_limits(self.store.as_mut(), &self.state.group_limits);
    }

    pub fn change_group_limit(&mut self, group_id: &str, bound: LimitBound, delta: i32) {
        roll::change_group_limit(&mut self.state, group_id, bound, delta);
        storage::write_group_limits(self.store.as_mut(), &self.state.group_limits);
    }

    /// The effective limit for a group (configured or derived default).
    pub fn group_limit(&self, group_id: &str) -> GroupLimit {
        match self.state.group_limits.get(group_id) {
            Some(limit) => *limit,
            None => {
                let members = self
                    .catalog
                    .iter()
                    .filter(|cat| crate::catalog::group_id(cat) == group_id)
                    .count();
                roll::default_group_limit(members as u32)
            }
        }
    }

    // ========================================================================
    // Output configs and rendering
    // ========================================================================

    /// Render the current draws into the final output text.
    pub fn output_text(&self) -> String {
        output::render(
            &self.catalog,
            &self.state,
            &self.output_configs,
            self.active_output_config_id.as_deref(),
        )
    }

    /// Replace the known output configs; the active one follows the flags.
    pub fn apply_output_configs(&mut self, configs: Vec<OutputConfig>) {
        self.active_output_config_id = configs
            .iter()
            .find(|config| config.is_active)
            .map(|config| config.id.clone());
        self.output_configs = configs;
    }

    /// Create a config on the server and refresh the local list.
    pub async fn create_output_config(
        &mut self,
        name: &str,
        blocks: &[OutputBlock],
    ) -> Result<Option<String>, SessionError> {
        let id = self.api.create_output_config(name, blocks).await?;
        let configs = self.api.fetch_output_configs().await?;
        self.apply_output_configs(configs);
        Ok(id)
    }

    /// Update a config on the server and refresh the local list.
    pub async fn update_output_config(
        &mut self,
        id: &str,
        name: &str,
        blocks: &[OutputBlock],
    ) -> Result<(), SessionError> {
        self.api.update_output_config(id, name, blocks).await?;
        let configs = self.api.fetch_output_configs().await?;
        self.apply_output_configs(configs);
        Ok(())
    }

    /// Delete a config on the server and refresh the local list.
    pub async fn delete_output_config(&mut self, id: &str) -> Result<(), SessionError> {
        self.api.delete_output_config(id).await?;
        let configs = self.api.fetch_output_configs().await?;
        self.apply_output_configs(configs);
        Ok(())
    }

    /// Activate a config on the server and refresh the local list.
    pub async fn activate_output_config(&mut self, id: &str) -> Result<(), SessionError> {
        self.api.activate_output_config(id).await?;
        let configs = self.api.fetch_output_configs().await?;
        self.apply_output_configs(configs);
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save a full session snapshot.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let saved = SavedSession::new(
            self.catalog.clone(),
            self.output_configs.clone(),
            self.active_output_config_id.clone(),
            self.state.clone(),
            self.sampler.bags().cloned().unwrap_or_default(),
            matches!(self.sampler, Sampler::Cycled { .. }),
        );
        saved.save_json(path).await?;
        Ok(())
    }

    /// Restore a session from a snapshot.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let saved = SavedSession::load_json(path).await?;
        let sampler = if saved.cycled {
            Sampler::cycled(saved.bags)
        } else {
            Sampler::Uniform
        };

        Ok(Self {
            api: ContentApi::from_env(),
            catalog: saved.catalog,
            output_configs: saved.output_configs,
            active_output_config_id: saved.active_output_config,
            state: saved.state,
            sampler,
            store: Box::new(MemoryStore::new()),
            used_fallback: false,
        })
    }

    fn sync_bags(&mut self) {
        if !self.sampler.take_dirty() {
            return;
        }
        if let Sampler::Cycled { bags, .. } = &self.sampler {
            storage::write_shuffle_bags(self.store.as_mut(), bags);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The catalog this session samples from.
    pub fn catalog(&self) -> &[Category] {
        &self.catalog
    }

    /// The current sampling state.
    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// Mutable sampling state.
    ///
    /// Use with caution - direct modifications bypass the orchestrator.
    pub fn state_mut(&mut self) -> &mut PoolState {
        &mut self.state
    }

    /// The current draw for a category.
    pub fn draw(&self, slug: &str) -> &[PromptItem] {
        self.state.draw(slug)
    }

    /// Whether the session is running on the fallback dataset.
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// Known output configs.
    pub fn output_configs(&self) -> &[OutputConfig] {
        &self.output_configs
    }

    /// Id of the active output config, if any.
    pub fn active_output_config_id(&self) -> Option<&str> {
        self.active_output_config_id.as_deref()
    }

    /// Persisted shuffle bags, when sampling in cycled mode.
    pub fn shuffle_bags(&self) -> Option<&ShuffleBags> {
        self.sampler.bags()
    }
}
