//! Shared server state: the store plus one coordinator per provider.

use std::sync::Arc;

use linkmeta_client::{EmbedlyConfig, EmbedlyProvider, MozillaConfig, MozillaProvider, PocketConfig, PocketSource};
use linkmeta_core::ratelimit::DOMAIN_LIMIT_ACTION;
use linkmeta_core::{
    AppConfig, CacheDb, DomainRateLimiter, Error, MetadataCoordinator, MetricsSink, ProviderKind, RecommendationCache,
    RecommendationSource, RemoteProvider,
};

/// Everything the tools and the worker need.
///
/// Providers without credentials are left unset; tools for them answer
/// with `PROVIDER_NOT_CONFIGURED`.
pub struct AppState {
    pub db: CacheDb,
    pub metrics: Arc<dyn MetricsSink>,
    pub max_request_urls: usize,
    embedly: Option<Arc<MetadataCoordinator>>,
    mozilla: Option<Arc<MetadataCoordinator>>,
    recommendations: Option<Arc<RecommendationCache>>,
}

impl AppState {
    /// Build providers from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProviderNotConfigured` if a provider with credentials
    /// has an unusable endpoint.
    pub fn from_config(config: &AppConfig, db: CacheDb, metrics: Arc<dyn MetricsSink>) -> Result<Self, Error> {
        let mut state = Self::empty(config, db, metrics);

        match config.require_embedly_key() {
            Ok(_) => {
                let embedly = EmbedlyProvider::new(EmbedlyConfig::from_app(config))?;
                state.embedly = Some(state.coordinator_for(config, Arc::new(embedly)));
            }
            Err(e) => tracing::warn!(error = %e, "embedly provider disabled"),
        }

        let mozilla = MozillaProvider::new(MozillaConfig::from_app(config))?;
        state.mozilla = Some(state.coordinator_for(config, Arc::new(mozilla)));

        match config.require_pocket_key() {
            Ok(_) => {
                let pocket = PocketSource::new(PocketConfig::from_app(config))?;
                state.recommendations = Some(state.recommendations_for(config, Arc::new(pocket)));
            }
            Err(e) => tracing::warn!(error = %e, "recommendations disabled"),
        }

        Ok(state)
    }

    /// State with no providers attached.
    pub fn empty(config: &AppConfig, db: CacheDb, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            db,
            metrics,
            max_request_urls: config.max_request_urls,
            embedly: None,
            mozilla: None,
            recommendations: None,
        }
    }

    /// Attach a provider, replacing any previous one of the same kind.
    pub fn with_provider(mut self, config: &AppConfig, provider: Arc<dyn RemoteProvider>) -> Self {
        let kind = provider.kind();
        let coordinator = Some(self.coordinator_for(config, provider));
        match kind {
            ProviderKind::Embedly => self.embedly = coordinator,
            ProviderKind::Mozilla => self.mozilla = coordinator,
        }
        self
    }

    pub fn with_recommendations(mut self, config: &AppConfig, source: Arc<dyn RecommendationSource>) -> Self {
        self.recommendations = Some(self.recommendations_for(config, source));
        self
    }

    pub fn coordinator(&self, kind: ProviderKind) -> Result<&Arc<MetadataCoordinator>, Error> {
        let coordinator = match kind {
            ProviderKind::Embedly => self.embedly.as_ref(),
            ProviderKind::Mozilla => self.mozilla.as_ref(),
        };
        coordinator.ok_or_else(|| Error::ProviderNotConfigured(format!("{kind} provider is not configured")))
    }

    pub fn recommendations(&self) -> Result<&Arc<RecommendationCache>, Error> {
        self.recommendations
            .as_ref()
            .ok_or_else(|| Error::ProviderNotConfigured("recommendation source is not configured".into()))
    }

    fn coordinator_for(&self, config: &AppConfig, provider: Arc<dyn RemoteProvider>) -> Arc<MetadataCoordinator> {
        let limiter = DomainRateLimiter::new(
            Arc::new(self.db.clone()),
            DOMAIN_LIMIT_ACTION,
            config.domain_rate_limit,
            config.domain_rate_period(),
        );

        Arc::new(MetadataCoordinator::new(
            config.coordinator_settings(provider.kind()),
            Arc::new(self.db.clone()),
            Arc::new(self.db.clone()),
            provider,
            limiter,
            self.metrics.clone(),
        ))
    }

    fn recommendations_for(&self, config: &AppConfig, source: Arc<dyn RecommendationSource>) -> Arc<RecommendationCache> {
        Arc::new(RecommendationCache::new(
            config.recommendation_settings(),
            Arc::new(self.db.clone()),
            Arc::new(self.db.clone()),
            source,
            self.metrics.clone(),
        ))
    }
}
