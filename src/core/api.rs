//! API wrappers over the shared HTTP client.

use crate::core::cache::{markers_from, ListingCache, ListingKey, MapMarker};
use crate::core::filters::{ClinicFilters, DoctorFilters, ReviewOrdering};
use crate::core::http::{ApiRequest, AuthHttpClient};
use crate::core::pagination::PageRequest;
use crate::domain::model::{
    Amenity, City, Clinic, Credentials, Doctor, NewVisit, Page, Procedure, Review,
    ScheduleResponse, Speciality, TokenPair, UserProfile, Visit,
};
use crate::domain::ports::SessionStore;
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_required_field, validate_slug};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Page size used when the map needs clinics that are not cached.
const MAP_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewTarget {
    Doctor(String),
    Clinic(String),
}

impl ReviewTarget {
    fn path(&self) -> Result<String> {
        let (kind, slug) = match self {
            ReviewTarget::Doctor(slug) => ("doctors", slug),
            ReviewTarget::Clinic(slug) => ("clinics", slug),
        };
        validate_slug(slug)?;
        Ok(format!("/{}/{}/reviews/", kind, slug))
    }
}

/// Read side of the directory. Pages depend on this rather than on the
/// concrete client.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn cities(&self) -> Result<Vec<City>>;
    async fn doctors(
        &self,
        city_id: i64,
        filters: &DoctorFilters,
        page: PageRequest,
    ) -> Result<Page<Doctor>>;
    async fn doctor(&self, slug: &str) -> Result<Doctor>;
    async fn clinics(
        &self,
        city_id: i64,
        filters: &ClinicFilters,
        page: PageRequest,
    ) -> Result<Page<Clinic>>;
    async fn clinic(&self, slug: &str) -> Result<Clinic>;
    async fn clinic_amenities(&self, slug: &str) -> Result<Vec<Amenity>>;
    async fn procedures(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Procedure>>;
    async fn procedure(&self, slug: &str) -> Result<Procedure>;
    async fn specialities(&self) -> Result<Vec<Speciality>>;
    async fn speciality(&self, slug: &str) -> Result<Speciality>;
    async fn reviews(
        &self,
        target: &ReviewTarget,
        page: PageRequest,
        ordering: ReviewOrdering,
    ) -> Result<Page<Review>>;
    async fn doctor_schedule(&self, slug: &str) -> Result<ScheduleResponse>;
    async fn clinic_markers(&self, city_id: i64) -> Result<Vec<MapMarker>>;
}

pub struct DirectoryApi<S: SessionStore> {
    http: AuthHttpClient<S>,
    listings: ListingCache,
}

impl<S: SessionStore> DirectoryApi<S> {
    pub fn new(http: AuthHttpClient<S>) -> Self {
        Self {
            http,
            listings: ListingCache::new(),
        }
    }

    pub fn http(&self) -> &AuthHttpClient<S> {
        &self.http
    }

    pub fn session(&self) -> &Arc<S> {
        self.http.session()
    }

    pub fn listings(&self) -> &ListingCache {
        &self.listings
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().access_token().is_some()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        validate_non_empty_string("username", &credentials.username)?;
        let pair: TokenPair = self
            .http
            .send_json(ApiRequest::post("/auth/token/", credentials)?)
            .await
            .map_err(|e| match e {
                ClientError::Unauthorized { .. } => {
                    ClientError::validation("invalid username or password")
                }
                other => other,
            })?;
        self.session().set_tokens(&pair)?;
        info!("Logged in as {}", credentials.username);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.session().clear_tokens()?;
        info!("Session tokens cleared");
        Ok(())
    }

    pub fn select_city(&self, city_id: i64) -> Result<()> {
        self.session().set_city_id(city_id)?;
        self.listings.clear();
        Ok(())
    }

    pub fn selected_city(&self) -> Option<i64> {
        self.session().city_id()
    }

    /// City passed explicitly, or the persisted selection.
    pub fn resolve_city(&self, explicit: Option<i64>) -> Result<i64> {
        let city = explicit.or_else(|| self.selected_city());
        validate_required_field("city", &city).copied()
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        self.http.send_json(ApiRequest::get("/profile/")).await
    }

    pub async fn visits(&self, page: PageRequest) -> Result<Page<Visit>> {
        self.http
            .send_json(ApiRequest::get("/visits/").with_params(page.to_query()))
            .await
    }

    pub async fn book_visit(&self, visit: &NewVisit) -> Result<Visit> {
        validate_slug(&visit.doctor_slug)?;
        validate_slug(&visit.clinic_slug)?;
        let booked: Visit = self
            .http
            .send_json(ApiRequest::post("/visits/", visit)?)
            .await?;
        info!("Booked visit {} with {}", booked.id, booked.doctor_name);
        Ok(booked)
    }
}

#[async_trait]
impl<S: SessionStore> Directory for DirectoryApi<S> {
    async fn cities(&self) -> Result<Vec<City>> {
        self.http.send_json(ApiRequest::get("/cities/")).await
    }

    async fn doctors(
        &self,
        city_id: i64,
        filters: &DoctorFilters,
        page: PageRequest,
    ) -> Result<Page<Doctor>> {
        let request = ApiRequest::get(format!("/cities/{}/doctors/", city_id))
            .with_params(filters.to_query())
            .with_params(page.to_query());
        let doctors: Page<Doctor> = self.http.send_json(request).await?;
        debug!("Fetched {} of {} doctors", doctors.results.len(), doctors.count);
        Ok(doctors)
    }

    async fn doctor(&self, slug: &str) -> Result<Doctor> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/doctors/{}/", slug)))
            .await
    }

    async fn clinics(
        &self,
        city_id: i64,
        filters: &ClinicFilters,
        page: PageRequest,
    ) -> Result<Page<Clinic>> {
        let query = filters.to_query();
        let request = ApiRequest::get(format!("/cities/{}/clinics/", city_id))
            .with_params(query.clone())
            .with_params(page.to_query());
        let clinics: Page<Clinic> = self.http.send_json(request).await?;

        self.listings
            .store(ListingKey { city_id, query }, clinics.results.clone());
        debug!("Fetched {} of {} clinics", clinics.results.len(), clinics.count);
        Ok(clinics)
    }

    async fn clinic(&self, slug: &str) -> Result<Clinic> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/clinics/{}/", slug)))
            .await
    }

    async fn clinic_amenities(&self, slug: &str) -> Result<Vec<Amenity>> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/clinics/{}/amenities/", slug)))
            .await
    }

    async fn procedures(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Procedure>> {
        let mut request = ApiRequest::get("/procedures/").with_params(page.to_query());
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            request = request.with_query("search", search);
        }
        self.http.send_json(request).await
    }

    async fn procedure(&self, slug: &str) -> Result<Procedure> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/procedures/{}/", slug)))
            .await
    }

    async fn specialities(&self) -> Result<Vec<Speciality>> {
        self.http.send_json(ApiRequest::get("/specialities/")).await
    }

    async fn speciality(&self, slug: &str) -> Result<Speciality> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/specialities/{}/", slug)))
            .await
    }

    async fn reviews(
        &self,
        target: &ReviewTarget,
        page: PageRequest,
        ordering: ReviewOrdering,
    ) -> Result<Page<Review>> {
        let request = ApiRequest::get(target.path()?)
            .with_params(page.to_query())
            .with_query("ordering", ordering.as_query());
        self.http.send_json(request).await
    }

    async fn doctor_schedule(&self, slug: &str) -> Result<ScheduleResponse> {
        validate_slug(slug)?;
        self.http
            .send_json(ApiRequest::get(format!("/doctors/{}/schedule/", slug)))
            .await
    }

    async fn clinic_markers(&self, city_id: i64) -> Result<Vec<MapMarker>> {
        if let Some(cached) = self.listings.listing_for_city(city_id) {
            debug!(
                "Using clinic listing for city {} fetched {:?} ago",
                city_id,
                cached.age()
            );
            return Ok(markers_from(&cached.clinics));
        }

        let page = PageRequest::first(MAP_PAGE_SIZE)?;
        let clinics = self.clinics(city_id, &ClinicFilters::default(), page).await?;
        Ok(markers_from(&clinics.results))
    }
}
