//! Filter state for the doctor and clinic listings.
//!
//! Each filter set turns into API query parameters and can also be applied
//! client-side to an already fetched array.

use crate::domain::model::{Clinic, Doctor, Gender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoctorOrdering {
    Rating,
    Experience,
    PriceAsc,
    PriceDesc,
    ReviewsCount,
}

impl DoctorOrdering {
    pub fn as_query(&self) -> &'static str {
        match self {
            DoctorOrdering::Rating => "-rating",
            DoctorOrdering::Experience => "-experience_years",
            DoctorOrdering::PriceAsc => "price",
            DoctorOrdering::PriceDesc => "-price",
            DoctorOrdering::ReviewsCount => "-reviews_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClinicOrdering {
    Rating,
    ReviewsCount,
    Name,
}

impl ClinicOrdering {
    pub fn as_query(&self) -> &'static str {
        match self {
            ClinicOrdering::Rating => "-rating",
            ClinicOrdering::ReviewsCount => "-reviews_count",
            ClinicOrdering::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOrdering {
    #[default]
    Newest,
    Oldest,
    HighestRated,
    LowestRated,
}

impl ReviewOrdering {
    pub fn as_query(&self) -> &'static str {
        match self {
            ReviewOrdering::Newest => "-created_at",
            ReviewOrdering::Oldest => "created_at",
            ReviewOrdering::HighestRated => "-rating",
            ReviewOrdering::LowestRated => "rating",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorFilters {
    pub search: Option<String>,
    pub speciality: Option<String>,
    pub procedure: Option<String>,
    pub gender: Option<Gender>,
    pub online_booking: bool,
    pub children_reception: bool,
    pub max_price: Option<u32>,
    pub min_rating: Option<f32>,
    pub ordering: Option<DoctorOrdering>,
}

impl DoctorFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: &str) -> Self {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self
    }

    pub fn speciality(mut self, slug: &str) -> Self {
        self.speciality = Some(slug.to_string());
        self
    }

    pub fn procedure(mut self, slug: &str) -> Self {
        self.procedure = Some(slug.to_string());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn max_price(mut self, price: u32) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn min_rating(mut self, rating: f32) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn ordering(mut self, ordering: DoctorOrdering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn toggle_online_booking(&mut self) {
        self.online_booking = !self.online_booking;
    }

    pub fn toggle_children_reception(&mut self) {
        self.children_reception = !self.children_reception;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of filters that narrow the result set. Ordering does not count.
    pub fn active_count(&self) -> usize {
        [
            self.search.is_some(),
            self.speciality.is_some(),
            self.procedure.is_some(),
            self.gender.is_some(),
            self.online_booking,
            self.children_reception,
            self.max_price.is_some(),
            self.min_rating.is_some(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(search) = &self.search {
            query.push(("search".to_string(), search.clone()));
        }
        if let Some(speciality) = &self.speciality {
            query.push(("speciality".to_string(), speciality.clone()));
        }
        if let Some(procedure) = &self.procedure {
            query.push(("procedure".to_string(), procedure.clone()));
        }
        if let Some(gender) = self.gender {
            let value = match gender {
                Gender::Male => "male",
                Gender::Female => "female",
            };
            query.push(("gender".to_string(), value.to_string()));
        }
        if self.online_booking {
            query.push(("online_booking".to_string(), "true".to_string()));
        }
        if self.children_reception {
            query.push(("children_reception".to_string(), "true".to_string()));
        }
        if let Some(price) = self.max_price {
            query.push(("price_max".to_string(), price.to_string()));
        }
        if let Some(rating) = self.min_rating {
            query.push(("rating_min".to_string(), rating.to_string()));
        }
        if let Some(ordering) = self.ordering {
            query.push(("ordering".to_string(), ordering.as_query().to_string()));
        }
        query
    }

    pub fn matches(&self, doctor: &Doctor) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = doctor.full_name.to_lowercase().contains(&needle);
            let in_speciality = doctor
                .specialities
                .iter()
                .any(|s| s.name.to_lowercase().contains(&needle));
            if !in_name && !in_speciality {
                return false;
            }
        }
        if let Some(slug) = &self.speciality {
            if !doctor.specialities.iter().any(|s| &s.slug == slug) {
                return false;
            }
        }
        if self.gender.is_some() && doctor.gender != self.gender {
            return false;
        }
        if self.online_booking && !doctor.online_booking {
            return false;
        }
        if self.children_reception && !doctor.children_reception {
            return false;
        }
        if let Some(max) = self.max_price {
            if doctor.price.map_or(true, |price| price > max) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if doctor.rating.map_or(true, |rating| rating < min) {
                return false;
            }
        }
        // Procedures are not part of the doctor payload; the server applies them.
        true
    }

    pub fn apply<'a>(&self, doctors: &'a [Doctor]) -> Vec<&'a Doctor> {
        doctors.iter().filter(|d| self.matches(d)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicFilters {
    pub search: Option<String>,
    pub speciality: Option<String>,
    pub min_rating: Option<f32>,
    pub ordering: Option<ClinicOrdering>,
}

impl ClinicFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: &str) -> Self {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self
    }

    pub fn speciality(mut self, slug: &str) -> Self {
        self.speciality = Some(slug.to_string());
        self
    }

    pub fn min_rating(mut self, rating: f32) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn ordering(mut self, ordering: ClinicOrdering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn active_count(&self) -> usize {
        [
            self.search.is_some(),
            self.speciality.is_some(),
            self.min_rating.is_some(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(search) = &self.search {
            query.push(("search".to_string(), search.clone()));
        }
        if let Some(speciality) = &self.speciality {
            query.push(("speciality".to_string(), speciality.clone()));
        }
        if let Some(rating) = self.min_rating {
            query.push(("rating_min".to_string(), rating.to_string()));
        }
        if let Some(ordering) = self.ordering {
            query.push(("ordering".to_string(), ordering.as_query().to_string()));
        }
        query
    }

    pub fn matches(&self, clinic: &Clinic) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = clinic.name.to_lowercase().contains(&needle);
            let in_address = clinic
                .address
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&needle));
            if !in_name && !in_address {
                return false;
            }
        }
        if let Some(slug) = &self.speciality {
            if !clinic.specialities.iter().any(|s| &s.slug == slug) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if clinic.rating.map_or(true, |rating| rating < min) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, clinics: &'a [Clinic]) -> Vec<&'a Clinic> {
        clinics.iter().filter(|c| self.matches(c)).collect()
    }
}
