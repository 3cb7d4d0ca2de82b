//! Page composition: each page fetches what it shows and decides which
//! failures block it and which only degrade a section.

use crate::core::api::{Directory, ReviewTarget};
use crate::core::filters::{ClinicFilters, DoctorFilters, ReviewOrdering};
use crate::core::pagination::{page_window, PageItem, PageRequest, Pagination};
use crate::core::schedule::{adapt_schedule, nearest_slot, ClinicSchedule, NearestSlot, ScheduleOptions};
use crate::domain::model::{Amenity, Clinic, Doctor, Page, Review};
use crate::utils::error::{ClientError, Result};
use serde::Serialize;
use std::future::Future;
use tracing::warn;

const WINDOW_WIDTH: usize = 2;

/// Inline error message shown in place of a section that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub message: String,
    pub suggestion: String,
    pub login_required: bool,
}

impl From<&ClientError> for ErrorBanner {
    fn from(error: &ClientError) -> Self {
        Self {
            message: error.user_friendly_message(),
            suggestion: error.recovery_suggestion().to_string(),
            login_required: error.is_session_expired(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Loaded(T),
    Failed(ErrorBanner),
}

impl<T> Section<T> {
    fn from_result(result: Result<T>, what: &str) -> Self {
        match result {
            Ok(value) => Section::Loaded(value),
            Err(e) => {
                warn!("Failed to load {}: {}", what, e);
                Section::Failed(ErrorBanner::from(&e))
            }
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Section::Loaded(value) => Some(value),
            Section::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub window: Vec<PageItem>,
}

impl<T> Listing<T> {
    fn new(page: Page<T>, pagination: Pagination) -> Self {
        Self {
            window: page_window(pagination.current_page, pagination.total_pages, WINDOW_WIDTH),
            items: page.results,
            pagination,
        }
    }
}

/// Fetches `request`, falling back to the last valid page when the
/// backend rejects a page number beyond the end of the result set.
pub async fn fetch_clamped<T, F, Fut>(request: PageRequest, fetch: F) -> Result<Listing<T>>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let first = match fetch(request).await {
        Ok(page) => {
            let pagination = Pagination::new(page.count as usize, request.page_size, request.page)?;
            return Ok(Listing::new(page, pagination));
        }
        Err(ClientError::NotFound { .. }) if request.page > 1 => {
            fetch(PageRequest { page: 1, ..request }).await?
        }
        Err(e) => return Err(e),
    };

    let pagination = Pagination::new(first.count as usize, request.page_size, request.page)?;
    if pagination.current_page == 1 {
        return Ok(Listing::new(first, pagination));
    }

    let last = fetch(PageRequest {
        page: pagination.current_page,
        ..request
    })
    .await?;
    Ok(Listing::new(last, pagination))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage<T> {
    pub city_id: i64,
    pub active_filters: usize,
    pub listing: Listing<T>,
}

pub async fn doctor_search<D: Directory + ?Sized>(
    directory: &D,
    city_id: i64,
    filters: &DoctorFilters,
    page: PageRequest,
) -> Result<SearchPage<Doctor>> {
    let listing = fetch_clamped(page, |p| directory.doctors(city_id, filters, p)).await?;
    Ok(SearchPage {
        city_id,
        active_filters: filters.active_count(),
        listing,
    })
}

pub async fn clinic_search<D: Directory + ?Sized>(
    directory: &D,
    city_id: i64,
    filters: &ClinicFilters,
    page: PageRequest,
) -> Result<SearchPage<Clinic>> {
    let listing = fetch_clamped(page, |p| directory.clinics(city_id, filters, p)).await?;
    Ok(SearchPage {
        city_id,
        active_filters: filters.active_count(),
        listing,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct DetailOptions {
    pub reviews: PageRequest,
    pub review_ordering: ReviewOrdering,
    pub schedule: ScheduleOptions,
}

impl DetailOptions {
    pub fn new(schedule: ScheduleOptions) -> Self {
        Self {
            reviews: PageRequest::default(),
            review_ordering: ReviewOrdering::default(),
            schedule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorPage {
    pub doctor: Doctor,
    pub reviews: Section<Listing<Review>>,
    pub schedule: Section<Vec<ClinicSchedule>>,
    pub nearest_slot: Option<NearestSlot>,
}

/// Loads a doctor profile. The doctor itself is required; reviews and
/// schedule degrade to an inline banner.
pub async fn doctor_page<D: Directory + ?Sized>(
    directory: &D,
    slug: &str,
    options: &DetailOptions,
) -> Result<DoctorPage> {
    let doctor = directory.doctor(slug).await?;
    let target = ReviewTarget::Doctor(doctor.slug.clone());

    let (reviews, schedule) = tokio::join!(
        fetch_clamped(options.reviews, |p| directory.reviews(&target, p, options.review_ordering)),
        directory.doctor_schedule(&doctor.slug),
    );

    let schedule = schedule.map(|raw| adapt_schedule(&raw, &options.schedule));
    let nearest = schedule.as_ref().ok().and_then(|s| nearest_slot(s));

    Ok(DoctorPage {
        doctor,
        reviews: Section::from_result(reviews, "reviews"),
        schedule: Section::from_result(schedule, "schedule"),
        nearest_slot: nearest,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicPage {
    pub clinic: Clinic,
    pub amenities: Vec<Amenity>,
    pub reviews: Section<Listing<Review>>,
}

/// Loads a clinic profile. Amenities are auxiliary: a failure there is
/// logged and the section is left empty.
pub async fn clinic_page<D: Directory + ?Sized>(
    directory: &D,
    slug: &str,
    options: &DetailOptions,
) -> Result<ClinicPage> {
    let clinic = directory.clinic(slug).await?;
    let target = ReviewTarget::Clinic(clinic.slug.clone());

    let (amenities, reviews) = tokio::join!(
        directory.clinic_amenities(&clinic.slug),
        fetch_clamped(options.reviews, |p| directory.reviews(&target, p, options.review_ordering)),
    );

    let amenities = amenities.unwrap_or_else(|e| {
        warn!("Amenities for {} unavailable: {}", clinic.slug, e);
        Vec::new()
    });

    Ok(ClinicPage {
        clinic,
        amenities,
        reviews: Section::from_result(reviews, "reviews"),
    })
}

pub async fn review_page<D: Directory + ?Sized>(
    directory: &D,
    target: &ReviewTarget,
    page: PageRequest,
    ordering: ReviewOrdering,
) -> Result<Listing<Review>> {
    fetch_clamped(page, |p| directory.reviews(target, p, ordering)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn page_of(count: u64, results: Vec<u32>) -> Page<u32> {
        Page {
            count,
            next: None,
            previous: None,
            results,
        }
    }

    #[tokio::test]
    async fn test_fetch_clamped_passes_through_valid_page() {
        let listing = fetch_clamped(PageRequest::new(2, 10).unwrap(), |p| async move {
            assert_eq!(p.page, 2);
            Ok(page_of(25, vec![11, 12]))
        })
        .await
        .unwrap();

        assert_eq!(listing.pagination.total_pages, 3);
        assert_eq!(listing.pagination.current_page, 2);
        assert_eq!(listing.items, vec![11, 12]);
    }

    #[tokio::test]
    async fn test_fetch_clamped_falls_back_to_last_page() {
        let requested = Mutex::new(Vec::new());
        let listing = fetch_clamped(PageRequest::new(9, 10).unwrap(), |p| {
            requested.lock().unwrap().push(p.page);
            async move {
                match p.page {
                    9 => Err(ClientError::NotFound {
                        path: "/cities/1/doctors/".to_string(),
                    }),
                    1 => Ok(page_of(25, vec![1])),
                    _ => Ok(page_of(25, vec![21, 22, 23, 24, 25])),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(*requested.lock().unwrap(), vec![9, 1, 3]);
        assert_eq!(listing.pagination.current_page, 3);
        assert_eq!(listing.items.len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_clamped_keeps_other_errors() {
        let result = fetch_clamped(PageRequest::new(1, 10).unwrap(), |_| async {
            Err::<Page<u32>, _>(ClientError::Status {
                status: 500,
                body: String::new(),
            })
        })
        .await;

        assert!(matches!(result, Err(ClientError::Status { status: 500, .. })));
    }

    #[test]
    fn test_banner_for_session_error() {
        let error = ClientError::Unauthorized {
            path: "/visits/".to_string(),
        };
        let banner = ErrorBanner::from(&error);
        assert!(banner.login_required);
        assert_eq!(banner.message, "Your session has expired. Please log in again.");
    }
}
