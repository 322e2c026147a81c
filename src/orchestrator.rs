use crate::{
    encode_key, LinkExtractor, Metadata, MetadataFetcher, PendingFetchTracker, PreviewCache,
    PreviewError,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Query parameter that carries the encoded link unless configured otherwise.
pub const DEFAULT_QUERY_PARAM: &str = "url";

/// Inputs for one orchestration trigger: explicit links to preview plus free
/// text to scan for more.
#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    pub links: Vec<String>,
    pub parse_for_links: Option<String>,
}

impl PreviewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_links<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with_links(links)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parse_for_links = Some(text.into());
        self
    }
}

/// Presentation flags handed through to whatever renders the preview cards.
/// The orchestration core stores them and consumes none of them.
#[derive(Debug, Clone, Copy)]
pub struct DisplayOptions {
    pub show_image: bool,
    pub show_site_name: bool,
    pub show_title: bool,
    pub show_description: bool,
    pub show_link_url: bool,
    pub show_loading_indicator: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_image: true,
            show_site_name: true,
            show_title: true,
            show_description: true,
            show_link_url: true,
            show_loading_indicator: true,
        }
    }
}

/// Configuration for [`PreviewOrchestrator`].
///
/// `api_route` and a fetcher are required by the time a run is triggered;
/// everything else has defaults. Cache and tracker default to the
/// process-wide shared instances, so distinct orchestrators deduplicate
/// against each other unless a test injects its own.
pub struct OrchestratorConfig {
    pub api_route: Option<String>,
    pub query_param_name: String,
    pub use_cache: bool,
    pub cache: Option<PreviewCache>,
    pub tracker: Option<PendingFetchTracker>,
    pub fetcher: Option<Arc<dyn MetadataFetcher>>,
    pub display: DisplayOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_route: None,
            query_param_name: DEFAULT_QUERY_PARAM.to_string(),
            use_cache: true,
            cache: None,
            tracker: None,
            fetcher: None,
            display: DisplayOptions::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new(api_route: impl Into<String>) -> Self {
        Self {
            api_route: Some(api_route.into()),
            ..Self::default()
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_query_param_name(mut self, name: impl Into<String>) -> Self {
        self.query_param_name = name.into();
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_cache(mut self, cache: PreviewCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_tracker(mut self, tracker: PendingFetchTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

/// The reactive core. Each [`run`](Self::run) call is one trigger: it
/// rebuilds the candidate link list, resolves every candidate from cache or
/// through the injected fetcher, and assembles the visible preview list,
/// keeping the shared cache and pending tracker current along the way.
///
/// A fetch is dispatched for a key only when it is neither cached nor
/// already pending, so one fetch per key is in flight no matter how many
/// runs overlap. Outstanding fetches are never cancelled by a newer run and
/// carry no imposed timeout: a hung fetcher keeps its key pending and the
/// busy signal high until it settles.
#[derive(Clone)]
pub struct PreviewOrchestrator {
    api_route: Option<String>,
    query_param_name: String,
    use_cache: bool,
    cache: PreviewCache,
    tracker: PendingFetchTracker,
    fetcher: Option<Arc<dyn MetadataFetcher>>,
    extractor: LinkExtractor,
    display: DisplayOptions,
}

struct RunOutcome {
    /// Number of candidate links this run considered.
    candidates: usize,
    /// Resolved previews in completion order, tagged with candidate index.
    resolved: Vec<(usize, Metadata)>,
}

impl PreviewOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            // An empty route is as unusable as a missing one.
            api_route: config.api_route.filter(|route| !route.trim().is_empty()),
            query_param_name: config.query_param_name,
            use_cache: config.use_cache,
            cache: config.cache.unwrap_or_else(PreviewCache::shared),
            tracker: config.tracker.unwrap_or_else(PendingFetchTracker::shared),
            fetcher: config.fetcher,
            extractor: LinkExtractor::new(),
            display: config.display,
        }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn tracker(&self) -> &PendingFetchTracker {
        &self.tracker
    }

    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    /// Runs one trigger and returns the visible preview list.
    ///
    /// Synchronous cache hits enter the list as the candidates are walked;
    /// cache misses follow in fetch-completion order. The list therefore
    /// does not track input order. Use [`run_ordered`](Self::run_ordered)
    /// when that matters. A failed or skipped link is simply absent.
    pub async fn run(&self, request: &PreviewRequest) -> Result<Vec<Metadata>, PreviewError> {
        let outcome = self.resolve_all(request).await?;
        Ok(outcome
            .resolved
            .into_iter()
            .map(|(_, metadata)| metadata)
            .collect())
    }

    /// Like [`run`](Self::run), but assembles the list in input order: one
    /// slot per candidate, each filled on its own resolution, materialized
    /// once every slot has settled with failed/skipped slots omitted.
    pub async fn run_ordered(
        &self,
        request: &PreviewRequest,
    ) -> Result<Vec<Metadata>, PreviewError> {
        let outcome = self.resolve_all(request).await?;
        let mut slots: Vec<Option<Metadata>> = vec![None; outcome.candidates];
        for (slot, metadata) in outcome.resolved {
            slots[slot] = Some(metadata);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    async fn resolve_all(&self, request: &PreviewRequest) -> Result<RunOutcome, PreviewError> {
        let api_route = self.api_route.as_deref().ok_or_else(|| {
            PreviewError::Configuration("an api_route must be configured".into())
        })?;
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            PreviewError::Configuration("a metadata fetcher must be configured".into())
        })?;

        let candidates = self.collect_candidates(request);
        debug!(candidates = candidates.len(), "Preview run triggered");

        let mut resolved: Vec<(usize, Metadata)> = Vec::with_capacity(candidates.len());
        let mut inflight = FuturesUnordered::new();

        for (slot, link) in candidates.iter().enumerate() {
            let key = match encode_key(link) {
                Ok(key) => key,
                Err(e) => {
                    warn!(link = %link, error = %e, "Skipping link that cannot be keyed");
                    continue;
                }
            };
            let target = self.request_target(api_route, &key);

            if self.use_cache {
                if let Some(hit) = self.cache.get(&key) {
                    debug!(link = %link, "Cache hit");
                    resolved.push((slot, hit));
                    continue;
                }
            }

            // add_task doubles as the dispatch guard: a false return means
            // another run already has this key's fetch in flight.
            if !self.tracker.add_task(&key) {
                debug!(link = %link, "Fetch already in flight; not dispatching again");
                continue;
            }

            let fetcher = Arc::clone(fetcher);
            let link = link.clone();
            inflight.push(async move {
                let outcome = fetcher.fetch_metadata(&target).await;
                (slot, link, key, outcome)
            });
        }

        while let Some((slot, link, key, outcome)) = inflight.next().await {
            match outcome {
                Ok(metadata) => {
                    // Cache before clearing the pending mark so concurrent
                    // runs never see the key as neither cached nor pending.
                    self.cache.put(key.clone(), metadata.clone());
                    self.tracker.remove_task(&key);
                    resolved.push((slot, metadata));
                }
                Err(e) => {
                    self.tracker.remove_task(&key);
                    warn!(link = %link, error = %e, "Dropping preview after fetch failure");
                }
            }
        }

        Ok(RunOutcome {
            candidates: candidates.len(),
            resolved,
        })
    }

    /// Builds the candidate list: links extracted from the free text first,
    /// then the explicit list, discovery order preserved and the first
    /// occurrence of a duplicate winning.
    fn collect_candidates(&self, request: &PreviewRequest) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        if let Some(text) = request.parse_for_links.as_deref() {
            for link in self.extractor.extract(text) {
                if seen.insert(link.clone()) {
                    candidates.push(link);
                }
            }
        }
        for link in &request.links {
            if seen.insert(link.clone()) {
                candidates.push(link.clone());
            }
        }
        candidates
    }

    fn request_target(&self, api_route: &str, key: &str) -> String {
        let separator = if api_route.contains('?') { '&' } else { '?' };
        format!("{api_route}{separator}{}={key}", self.query_param_name)
    }
}
