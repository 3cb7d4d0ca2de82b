use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Paged envelope returned by every listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialityRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Speciality {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub doctors_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub slug: String,
    pub full_name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub specialities: Vec<SpecialityRef>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub reviews_count: u32,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub online_booking: bool,
    #[serde(default)]
    pub children_reception: bool,
    #[serde(default)]
    pub clinics: Vec<ClinicRef>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub reviews_count: u32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub working_hours: Option<String>,
    #[serde(default)]
    pub specialities: Vec<SpecialityRef>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Amenity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Procedure {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub price_from: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub speciality: Option<SpecialityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub author_name: String,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reply: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: i64,
    pub doctor_slug: String,
    pub doctor_name: String,
    pub clinic_slug: String,
    pub clinic_name: String,
    pub scheduled_at: NaiveDateTime,
    pub status: VisitStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of a visit booking request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewVisit {
    pub doctor_slug: String,
    pub clinic_slug: String,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Everything the client persists between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub city_id: Option<i64>,
}

/// Raw schedule payload as the backend sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub clinics: Vec<ClinicScheduleDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicScheduleDto {
    pub clinic_slug: String,
    pub clinic_name: String,
    #[serde(default)]
    pub days: Vec<ScheduleDayDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDayDto {
    pub date: NaiveDate,
    #[serde(default)]
    pub slots: Vec<ScheduleSlotDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSlotDto {
    pub time: String,
    #[serde(default)]
    pub is_available: bool,
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_tolerates_missing_optional_fields() {
        let doctor: Doctor = serde_json::from_value(serde_json::json!({
            "id": 7,
            "slug": "petrov-ivan",
            "full_name": "Ivan Petrov"
        }))
        .unwrap();

        assert_eq!(doctor.slug, "petrov-ivan");
        assert!(doctor.specialities.is_empty());
        assert_eq!(doctor.reviews_count, 0);
        assert!(!doctor.online_booking);
        assert_eq!(doctor.gender, None);
    }

    #[test]
    fn test_page_envelope() {
        let page: Page<City> = serde_json::from_value(serde_json::json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [
                {"id": 1, "slug": "almaty", "name": "Almaty"},
                {"id": 2, "slug": "astana", "name": "Astana"}
            ]
        }))
        .unwrap();

        assert_eq!(page.count, 2);
        assert_eq!(page.results[1].slug, "astana");
    }

    #[test]
    fn test_new_visit_time_is_hours_and_minutes() {
        let visit = NewVisit {
            doctor_slug: "petrov-ivan".to_string(),
            clinic_slug: "city-clinic".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            comment: None,
        };

        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["time"], "09:30");
        assert_eq!(json["date"], "2026-10-20");
        assert!(json.get("comment").is_none());
    }
}
