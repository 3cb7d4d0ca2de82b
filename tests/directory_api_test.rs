use anyhow::Result;
use chrono::NaiveDate;
use docfinder::app::pages::{self, DetailOptions, Section};
use docfinder::core::api::{Directory, DirectoryApi};
use docfinder::core::filters::{ClinicFilters, DoctorFilters, DoctorOrdering};
use docfinder::core::http::{AuthHttpClient, HttpClientConfig};
use docfinder::core::pagination::PageRequest;
use docfinder::core::schedule::ScheduleOptions;
use docfinder::domain::model::{Credentials, NewVisit};
use docfinder::domain::ports::SessionStore;
use docfinder::{ClientError, MemorySessionStore};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn api_for(server: &MockServer) -> DirectoryApi<MemorySessionStore> {
    let config = HttpClientConfig::new(&server.url("/api")).with_retry(0, 0);
    let http = AuthHttpClient::new(config, Arc::new(MemorySessionStore::new())).unwrap();
    DirectoryApi::new(http)
}

fn doctor_json(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "full_name": format!("Doctor {}", id),
        "specialities": [{"id": 1, "slug": "cardiology", "name": "Cardiology"}],
        "rating": 4.5,
        "reviews_count": 12,
        "price": 15000,
        "online_booking": true
    })
}

fn clinic_json(id: i64, slug: &str, coords: Option<(f64, f64)>) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "name": format!("Clinic {}", id),
        "address": "Abay ave 1",
        "latitude": coords.map(|c| c.0),
        "longitude": coords.map(|c| c.1)
    })
}

fn page_json(count: u64, results: Vec<Value>) -> Value {
    json!({"count": count, "next": null, "previous": null, "results": results})
}

#[tokio::test]
async fn test_login_stores_token_pair() -> Result<()> {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/auth/token/")
            .json_body(json!({"username": "aliya", "password": "secret"}));
        then.status(200)
            .json_body(json!({"access": "access-1", "refresh": "refresh-1"}));
    });

    let api = api_for(&server);
    assert!(!api.is_logged_in());

    api.login(&Credentials {
        username: "aliya".to_string(),
        password: "secret".to_string(),
    })
    .await?;

    login.assert();
    assert!(api.is_logged_in());
    assert_eq!(api.session().refresh_token().as_deref(), Some("refresh-1"));

    assert_ok!(api.logout());
    assert!(!api.is_logged_in());
    Ok(())
}

#[tokio::test]
async fn test_login_with_wrong_password() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/auth/token/");
        then.status(401)
            .json_body(json!({"detail": "No active account found"}));
    });

    let api = api_for(&server);
    let result = api
        .login(&Credentials {
            username: "aliya".to_string(),
            password: "wrong".to_string(),
        })
        .await;

    assert!(matches!(result, Err(ClientError::ValidationError { .. })));
    assert!(!api.is_logged_in());
    Ok(())
}

#[tokio::test]
async fn test_doctor_search_sends_filters_and_paging() -> Result<()> {
    let server = MockServer::start();
    let doctors = server.mock(|when, then| {
        when.method(GET)
            .path("/api/cities/1/doctors/")
            .query_param("speciality", "cardiology")
            .query_param("online_booking", "true")
            .query_param("ordering", "-rating")
            .query_param("page", "2")
            .query_param("page_size", "2");
        then.status(200).json_body(page_json(
            5,
            vec![doctor_json(3, "doctor-3"), doctor_json(4, "doctor-4")],
        ));
    });

    let api = api_for(&server);
    let mut filters = DoctorFilters::new()
        .speciality("cardiology")
        .ordering(DoctorOrdering::Rating);
    filters.toggle_online_booking();

    let page = pages::doctor_search(&api, 1, &filters, PageRequest::new(2, 2)?).await?;

    doctors.assert();
    assert_eq!(page.active_filters, 2);
    assert_eq!(page.listing.items.len(), 2);
    assert_eq!(page.listing.pagination.total_pages, 3);
    assert_eq!(page.listing.pagination.current_page, 2);
    assert_eq!(page.listing.items[0].slug, "doctor-3");
    Ok(())
}

#[tokio::test]
async fn test_page_beyond_the_end_falls_back_to_last_page() -> Result<()> {
    let server = MockServer::start();
    let beyond = server.mock(|when, then| {
        when.method(GET)
            .path("/api/cities/1/clinics/")
            .query_param("page", "9");
        then.status(404).json_body(json!({"detail": "Invalid page."}));
    });
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/api/cities/1/clinics/")
            .query_param("page", "1");
        then.status(200)
            .json_body(page_json(12, vec![clinic_json(1, "clinic-1", None)]));
    });
    let last = server.mock(|when, then| {
        when.method(GET)
            .path("/api/cities/1/clinics/")
            .query_param("page", "2");
        then.status(200)
            .json_body(page_json(12, vec![clinic_json(11, "clinic-11", None)]));
    });

    let api = api_for(&server);
    let page =
        pages::clinic_search(&api, 1, &ClinicFilters::new(), PageRequest::new(9, 10)?).await?;

    beyond.assert();
    first.assert();
    last.assert();
    assert_eq!(page.listing.pagination.current_page, 2);
    assert_eq!(page.listing.items[0].slug, "clinic-11");
    Ok(())
}

#[tokio::test]
async fn test_map_markers_reuse_the_last_listing() -> Result<()> {
    let server = MockServer::start();
    let clinics = server.mock(|when, then| {
        when.method(GET).path("/api/cities/4/clinics/");
        then.status(200).json_body(page_json(
            2,
            vec![
                clinic_json(1, "with-coords", Some((43.238, 76.945))),
                clinic_json(2, "no-coords", None),
            ],
        ));
    });

    let api = api_for(&server);
    api.clinics(4, &ClinicFilters::new(), PageRequest::default())
        .await?;
    let markers = api.clinic_markers(4).await?;

    clinics.assert_hits(1);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].slug, "with-coords");
    Ok(())
}

#[tokio::test]
async fn test_selecting_a_city_drops_cached_listing() -> Result<()> {
    let server = MockServer::start();
    let clinics = server.mock(|when, then| {
        when.method(GET).path("/api/cities/4/clinics/");
        then.status(200).json_body(page_json(
            1,
            vec![clinic_json(1, "with-coords", Some((43.238, 76.945)))],
        ));
    });

    let api = api_for(&server);
    api.clinic_markers(4).await?;
    api.select_city(4)?;
    api.clinic_markers(4).await?;

    clinics.assert_hits(2);
    assert_eq!(api.resolve_city(None)?, 4);
    assert_eq!(api.resolve_city(Some(9))?, 9);
    Ok(())
}

#[tokio::test]
async fn test_clinic_page_survives_missing_amenities() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/clinics/central/");
        then.status(200)
            .json_body(clinic_json(1, "central", Some((43.2, 76.9))));
    });
    let amenities = server.mock(|when, then| {
        when.method(GET).path("/api/clinics/central/amenities/");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/clinics/central/reviews/")
            .query_param("ordering", "-created_at");
        then.status(200).json_body(page_json(
            1,
            vec![json!({
                "id": 1,
                "author_name": "Dana",
                "rating": 5,
                "text": "Clean and quick",
                "created_at": "2026-10-01T09:30:00Z"
            })],
        ));
    });

    let api = api_for(&server);
    let options = DetailOptions::new(ScheduleOptions::starting(
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    ));
    let page = pages::clinic_page(&api, "central", &options).await?;

    amenities.assert();
    assert!(page.amenities.is_empty());
    let reviews = page.reviews.loaded().unwrap();
    assert_eq!(reviews.items[0].author_name, "Dana");
    Ok(())
}

#[tokio::test]
async fn test_doctor_page_degrades_failed_schedule() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/");
        then.status(200).json_body(doctor_json(1, "doctor-1"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/reviews/");
        then.status(200).json_body(page_json(0, vec![]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/schedule/");
        then.status(503);
    });

    let api = api_for(&server);
    let options = DetailOptions::new(ScheduleOptions::starting(
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    ));
    let page = pages::doctor_page(&api, "doctor-1", &options).await?;

    assert_eq!(page.doctor.full_name, "Doctor 1");
    assert!(page.reviews.loaded().is_some());
    assert!(matches!(page.schedule, Section::Failed(ref banner) if !banner.login_required));
    assert!(page.nearest_slot.is_none());
    Ok(())
}

#[tokio::test]
async fn test_doctor_page_picks_nearest_slot() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/");
        then.status(200).json_body(doctor_json(1, "doctor-1"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/reviews/");
        then.status(200).json_body(page_json(0, vec![]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/doctor-1/schedule/");
        then.status(200).json_body(json!({
            "clinics": [
                {
                    "clinic_slug": "north",
                    "clinic_name": "North",
                    "days": [
                        {"date": "2026-10-20", "slots": [{"time": "09:00", "is_available": true}]}
                    ]
                },
                {
                    "clinic_slug": "south",
                    "clinic_name": "South",
                    "days": [
                        {"date": "2026-10-19", "slots": [
                            {"time": "08:00", "is_available": false},
                            {"time": "15:30", "is_available": true}
                        ]}
                    ]
                }
            ]
        }));
    });

    let api = api_for(&server);
    let options = DetailOptions::new(ScheduleOptions::starting(
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    ));
    let page = pages::doctor_page(&api, "doctor-1", &options).await?;

    let nearest = page.nearest_slot.unwrap();
    assert_eq!(nearest.clinic_slug, "south");
    assert_eq!(nearest.at.format("%Y-%m-%d %H:%M").to_string(), "2026-10-19 15:30");
    Ok(())
}

#[tokio::test]
async fn test_book_visit_sends_bearer_token() -> Result<()> {
    let server = MockServer::start();
    let booking = server.mock(|when, then| {
        when.method(POST)
            .path("/api/visits/")
            .header("Authorization", "Bearer access-1")
            .json_body(json!({
                "doctor_slug": "doctor-1",
                "clinic_slug": "north",
                "date": "2026-10-20",
                "time": "09:00"
            }));
        then.status(201).json_body(json!({
            "id": 31,
            "doctor_slug": "doctor-1",
            "doctor_name": "Doctor 1",
            "clinic_slug": "north",
            "clinic_name": "North",
            "scheduled_at": "2026-10-20T09:00:00",
            "status": "pending"
        }));
    });

    let api = api_for(&server);
    api.session().set_access_token("access-1")?;

    let visit = api
        .book_visit(&NewVisit {
            doctor_slug: "doctor-1".to_string(),
            clinic_slug: "north".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            comment: None,
        })
        .await?;

    booking.assert();
    assert_eq!(visit.id, 31);
    Ok(())
}

#[tokio::test]
async fn test_missing_doctor_is_not_found() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/doctors/nobody/");
        then.status(404);
    });

    let api = api_for(&server);
    let err = assert_err!(api.doctor("nobody").await);

    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(!err.is_session_expired());
    Ok(())
}
