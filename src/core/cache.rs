use crate::domain::model::Clinic;
use serde::Serialize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Key of a cached clinic listing: the city and the query it was fetched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingKey {
    pub city_id: i64,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CachedListing {
    pub key: ListingKey,
    pub clinics: Vec<Clinic>,
    pub fetched_at: Instant,
}

impl CachedListing {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub slug: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Markers for every clinic that has coordinates.
pub fn markers_from(clinics: &[Clinic]) -> Vec<MapMarker> {
    clinics
        .iter()
        .filter_map(|clinic| match (clinic.latitude, clinic.longitude) {
            (Some(latitude), Some(longitude)) => Some(MapMarker {
                slug: clinic.slug.clone(),
                name: clinic.name.clone(),
                latitude,
                longitude,
            }),
            _ => None,
        })
        .collect()
}

/// Last successful clinic listing. May be stale or absent; readers use it
/// only to skip a refetch.
#[derive(Debug, Default)]
pub struct ListingCache {
    last: RwLock<Option<CachedListing>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: ListingKey, clinics: Vec<Clinic>) {
        let mut last = self.last.write().unwrap_or_else(|e| e.into_inner());
        *last = Some(CachedListing {
            key,
            clinics,
            fetched_at: Instant::now(),
        });
    }

    pub fn last(&self) -> Option<CachedListing> {
        self.last.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The last listing if it was fetched for `city_id`.
    pub fn listing_for_city(&self, city_id: i64) -> Option<CachedListing> {
        self.last
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|cached| cached.key.city_id == city_id)
            .cloned()
    }

    pub fn clear(&self) {
        *self.last.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clinic(slug: &str, coords: Option<(f64, f64)>) -> Clinic {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "slug": slug,
            "name": slug.to_uppercase(),
            "latitude": coords.map(|c| c.0),
            "longitude": coords.map(|c| c.1)
        }))
        .unwrap()
    }

    #[test]
    fn test_markers_skip_clinics_without_coordinates() {
        let clinics = vec![clinic("a", Some((43.2, 76.9))), clinic("b", None)];
        let markers = markers_from(&clinics);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].slug, "a");
        assert_eq!(markers[0].latitude, 43.2);
    }

    #[test]
    fn test_cache_is_keyed_by_city() {
        let cache = ListingCache::new();
        assert!(cache.listing_for_city(1).is_none());

        cache.store(
            ListingKey {
                city_id: 1,
                query: vec![],
            },
            vec![clinic("a", None)],
        );
        let cached = cache.listing_for_city(1).unwrap();
        assert_eq!(cached.clinics.len(), 1);
        assert!(cached.age() < Duration::from_secs(60));
        assert!(cache.listing_for_city(2).is_none());

        cache.clear();
        assert!(cache.last().is_none());
    }
}
