//! Shared application state.

use crate::cache::{segment_cache_key, MemoryCache, SegmentCache};
use crate::config::Config;
use crate::persistence::Database;
use dashmap::DashMap;
use searoute_core::segment::SegmentRecord;
use searoute_core::synthesizer::{RouteSynthesizer, SynthesizerConfig};
use searoute_core::reference_landmasses;
use std::sync::Arc;
use std::time::Duration;

/// Application state: storage, segment cache, and the route synthesizer.
pub struct AppState {
    database: Database,
    cache: Arc<dyn SegmentCache>,
    synthesizer: RouteSynthesizer,
    config: Config,
    /// Invalidations seen per segment id. Reads capture it before going to
    /// the database and only fill the cache if it has not moved since.
    generations: DashMap<String, u64>,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Self {
        let cache = Arc::new(MemoryCache::new(
            Duration::from_secs(config.cache_ttl_s),
            config.cache_max_entries,
        ));
        Self::with_cache(database, config, cache)
    }

    pub fn with_cache(database: Database, config: Config, cache: Arc<dyn SegmentCache>) -> Self {
        let synthesizer = RouteSynthesizer::new(
            reference_landmasses(),
            SynthesizerConfig {
                detour_offset_km: config.detour_offset_km,
                ..SynthesizerConfig::default()
            },
        );
        Self {
            database,
            cache,
            synthesizer,
            config,
            generations: DashMap::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn synthesizer(&self) -> &RouteSynthesizer {
        &self.synthesizer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn SegmentCache> {
        &self.cache
    }

    /// Cached current version, or `None` on a miss or cache failure.
    pub fn cached_segment(&self, segment_id: &str) -> Option<SegmentRecord> {
        match self.cache.get(&segment_cache_key(segment_id)) {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!("Cache read for {} failed: {}", segment_id, err);
                None
            }
        }
    }

    /// Token to pass to [`AppState::remember_segment`]; take it before the
    /// database read.
    pub fn cache_generation(&self, segment_id: &str) -> u64 {
        self.generations.get(segment_id).map(|g| *g).unwrap_or(0)
    }

    /// Cache a record read from the database, unless a save invalidated the
    /// segment after `generation` was taken.
    pub fn remember_segment(&self, record: &SegmentRecord, generation: u64) {
        // The entry guard is held across the put so an invalidation either
        // lands before the check or removes what was just written.
        let current = self.generations.entry(record.segment_id.clone()).or_insert(0);
        if *current != generation {
            tracing::debug!(
                "Skipping cache fill for {}: invalidated during read",
                record.segment_id
            );
            return;
        }
        if let Err(err) = self.cache.put(&segment_cache_key(&record.segment_id), record.clone()) {
            tracing::warn!("Cache write for {} failed: {}", record.segment_id, err);
        }
    }

    /// Drop the cached read after a save. Failure is logged and ignored.
    pub fn invalidate_segment(&self, segment_id: &str) {
        *self.generations.entry(segment_id.to_string()).or_insert(0) += 1;
        if let Err(err) = self.cache.invalidate(&segment_cache_key(segment_id)) {
            tracing::warn!("Cache invalidation for {} failed: {}", segment_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{init_database, load_active_segment, save_segment};
    use searoute_core::models::Port;
    use searoute_core::segment::{RouteType, SegmentMetadata, SegmentSaveRequest};

    async fn state() -> AppState {
        let path = std::env::temp_dir()
            .join(format!("searoute-state-{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string();
        let db = init_database(&path, 1).await.expect("init db");
        AppState::new(db, Config::from_env())
    }

    fn request(coords: Vec<[f64; 2]>) -> SegmentSaveRequest {
        SegmentSaveRequest {
            origin_port: Port::new("miami", "Miami", 25.7617, -80.1918),
            destination_port: Port::new("nassau", "Nassau", 25.0343, -77.3554),
            route_coordinates: coords,
            route_type: RouteType::Edited,
            distance_nautical_miles: None,
            distance_km: None,
            created_by: None,
            metadata: SegmentMetadata::default(),
        }
    }

    #[tokio::test]
    async fn save_during_read_keeps_stale_record_out_of_cache() {
        let state = state().await;
        let pool = state.database().pool().clone();
        let v1 = request(vec![[25.7617, -80.1918], [25.0343, -77.3554]]).validate().unwrap();
        save_segment(&pool, &v1).await.unwrap();

        // reader takes its token and reads v1
        let generation = state.cache_generation("miami-nassau");
        let stale = load_active_segment(&pool, "miami-nassau").await.unwrap().unwrap();
        assert_eq!(stale.version, 1);

        // a save commits and invalidates before the reader fills the cache
        let v2 = request(vec![[25.7617, -80.1918], [25.4, -78.8], [25.0343, -77.3554]])
            .validate()
            .unwrap();
        save_segment(&pool, &v2).await.unwrap();
        state.invalidate_segment("miami-nassau");

        state.remember_segment(&stale, generation);
        assert!(state.cached_segment("miami-nassau").is_none());

        // the next read fills the cache with the new version
        let generation = state.cache_generation("miami-nassau");
        let fresh = load_active_segment(&pool, "miami-nassau").await.unwrap().unwrap();
        state.remember_segment(&fresh, generation);
        assert_eq!(state.cached_segment("miami-nassau").unwrap().version, 2);
    }

    #[tokio::test]
    async fn unchanged_generation_fills_cache() {
        let state = state().await;
        let pool = state.database().pool().clone();
        let c = request(vec![[25.7617, -80.1918], [25.0343, -77.3554]]).validate().unwrap();
        save_segment(&pool, &c).await.unwrap();

        assert_eq!(state.cache_generation("miami-nassau"), 0);
        let record = load_active_segment(&pool, "miami-nassau").await.unwrap().unwrap();
        state.remember_segment(&record, 0);
        assert_eq!(state.cached_segment("miami-nassau").unwrap().version, 1);
    }
}
