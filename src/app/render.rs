//! Output of listings and pages as a text table, JSON or CSV.

use crate::app::pages::{ClinicPage, DoctorPage, ErrorBanner, Listing, Section};
use crate::core::cache::MapMarker;
use crate::core::pagination::PageItem;
use crate::core::schedule::ClinicSchedule;
use crate::domain::model::{
    Amenity, City, Clinic, Doctor, Procedure, Review, Speciality, UserProfile, Visit,
};
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// A record that can be shown as one table or CSV row.
pub trait Tabular {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn rating(value: Option<f32>) -> String {
    value.map(|r| format!("{:.1}", r)).unwrap_or_default()
}

impl Tabular for City {
    fn headers() -> Vec<&'static str> {
        vec!["id", "slug", "name"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.slug.clone(), self.name.clone()]
    }
}

impl Tabular for Doctor {
    fn headers() -> Vec<&'static str> {
        vec!["slug", "name", "specialities", "experience", "rating", "reviews", "price"]
    }

    fn row(&self) -> Vec<String> {
        let specialities: Vec<&str> = self.specialities.iter().map(|s| s.name.as_str()).collect();
        vec![
            self.slug.clone(),
            self.full_name.clone(),
            specialities.join(", "),
            opt(&self.experience_years),
            rating(self.rating),
            self.reviews_count.to_string(),
            opt(&self.price),
        ]
    }
}

impl Tabular for Clinic {
    fn headers() -> Vec<&'static str> {
        vec!["slug", "name", "address", "phone", "rating", "reviews", "hours"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.slug.clone(),
            self.name.clone(),
            opt(&self.address),
            opt(&self.phone),
            rating(self.rating),
            self.reviews_count.to_string(),
            opt(&self.working_hours),
        ]
    }
}

impl Tabular for Amenity {
    fn headers() -> Vec<&'static str> {
        vec!["name"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

impl Tabular for Procedure {
    fn headers() -> Vec<&'static str> {
        vec!["slug", "name", "speciality", "price_from"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.slug.clone(),
            self.name.clone(),
            self.speciality.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            opt(&self.price_from),
        ]
    }
}

impl Tabular for Speciality {
    fn headers() -> Vec<&'static str> {
        vec!["slug", "name", "doctors"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.slug.clone(), self.name.clone(), opt(&self.doctors_count)]
    }
}

impl Tabular for Review {
    fn headers() -> Vec<&'static str> {
        vec!["date", "author", "rating", "text"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.created_at.format("%Y-%m-%d").to_string(),
            self.author_name.clone(),
            format!("{}/5", self.rating),
            self.text.clone(),
        ]
    }
}

impl Tabular for Visit {
    fn headers() -> Vec<&'static str> {
        vec!["id", "when", "doctor", "clinic", "status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
            self.doctor_name.clone(),
            self.clinic_name.clone(),
            format!("{:?}", self.status).to_lowercase(),
        ]
    }
}

impl Tabular for MapMarker {
    fn headers() -> Vec<&'static str> {
        vec!["slug", "name", "latitude", "longitude"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.slug.clone(),
            self.name.clone(),
            format!("{:.6}", self.latitude),
            format!("{:.6}", self.longitude),
        ]
    }
}

impl Tabular for UserProfile {
    fn headers() -> Vec<&'static str> {
        vec!["id", "email", "first_name", "last_name", "phone"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.email.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            opt(&self.phone),
        ]
    }
}

pub fn write_table<T: Tabular, W: Write>(items: &[T], out: &mut W) -> Result<()> {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(Tabular::row).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(headers.iter().map(|h| h.to_uppercase()).collect()))?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

pub fn write_csv<T: Tabular, W: Write>(items: &[T], out: &mut W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(T::headers())?;
    for item in items {
        writer.write_record(item.row())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Renders a flat list of records.
pub fn render_items<T, W>(items: &[T], format: OutputFormat, out: &mut W) -> Result<()>
where
    T: Tabular + Serialize,
    W: Write,
{
    match format {
        OutputFormat::Table => write_table(items, out),
        OutputFormat::Json => write_json(items, out),
        OutputFormat::Csv => write_csv(items, out),
    }
}

pub fn pager_line(listing_window: &[PageItem], current: usize) -> String {
    listing_window
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == current => format!("[{}]", n),
            PageItem::Page(n) => n.to_string(),
            PageItem::Gap => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders one page of a listing. JSON keeps the pagination summary; CSV
/// carries only the rows.
pub fn render_listing<T, W>(listing: &Listing<T>, format: OutputFormat, out: &mut W) -> Result<()>
where
    T: Tabular + Serialize,
    W: Write,
{
    match format {
        OutputFormat::Json => write_json(listing, out),
        OutputFormat::Csv => write_csv(&listing.items, out),
        OutputFormat::Table => {
            if listing.items.is_empty() {
                writeln!(out, "Nothing found.")?;
                return Ok(());
            }
            write_table(&listing.items, out)?;
            let p = &listing.pagination;
            if let Some((first, last)) = p.item_range() {
                writeln!(out)?;
                writeln!(
                    out,
                    "{}-{} of {}   page {}",
                    first,
                    last,
                    p.total_count,
                    pager_line(&listing.window, p.current_page)
                )?;
            }
            Ok(())
        }
    }
}

pub fn render_banner<W: Write>(banner: &ErrorBanner, out: &mut W) -> Result<()> {
    writeln!(out, "! {}", banner.message)?;
    writeln!(out, "  {}", banner.suggestion)?;
    Ok(())
}

fn render_section<T, W, F>(title: &str, section: &Section<T>, out: &mut W, body: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&T, &mut W) -> Result<()>,
{
    writeln!(out)?;
    writeln!(out, "== {} ==", title)?;
    match section {
        Section::Loaded(value) => body(value, out),
        Section::Failed(banner) => render_banner(banner, out),
    }
}

pub fn render_schedule<W: Write>(schedules: &[ClinicSchedule], out: &mut W) -> Result<()> {
    if schedules.is_empty() {
        writeln!(out, "No schedule published.")?;
    }
    for clinic in schedules {
        writeln!(out, "{}", clinic.clinic_name)?;
        for day in &clinic.days {
            let times: Vec<String> = day.times.iter().map(|t| t.format("%H:%M").to_string()).collect();
            let shown = if times.is_empty() {
                "no free slots".to_string()
            } else {
                times.join(" ")
            };
            writeln!(out, "  {:<10} {}", day.label, shown)?;
        }
    }
    Ok(())
}

pub fn render_doctor_page<W: Write>(page: &DoctorPage, format: OutputFormat, out: &mut W) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(page, out);
    }
    if format == OutputFormat::Csv {
        return write_csv(std::slice::from_ref(&page.doctor), out);
    }

    let doctor = &page.doctor;
    writeln!(out, "{}", doctor.full_name)?;
    let specialities: Vec<&str> = doctor.specialities.iter().map(|s| s.name.as_str()).collect();
    if !specialities.is_empty() {
        writeln!(out, "{}", specialities.join(", "))?;
    }
    if let Some(years) = doctor.experience_years {
        writeln!(out, "Experience: {} years", years)?;
    }
    if let Some(value) = doctor.rating {
        writeln!(out, "Rating: {:.1} ({} reviews)", value, doctor.reviews_count)?;
    }
    if let Some(price) = doctor.price {
        writeln!(out, "Price: {}", price)?;
    }
    for clinic in &doctor.clinics {
        writeln!(out, "Clinic: {} {}", clinic.name, opt(&clinic.address))?;
    }
    if let Some(slot) = &page.nearest_slot {
        writeln!(
            out,
            "Nearest visit: {} at {}",
            slot.at.format("%Y-%m-%d %H:%M"),
            slot.clinic_name
        )?;
    }
    if let Some(description) = &doctor.description {
        writeln!(out)?;
        writeln!(out, "{}", description)?;
    }

    render_section("Schedule", &page.schedule, out, |s, out| render_schedule(s, out))?;
    render_section("Reviews", &page.reviews, out, |r, out| {
        render_listing(r, OutputFormat::Table, out)
    })
}

pub fn render_clinic_page<W: Write>(page: &ClinicPage, format: OutputFormat, out: &mut W) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(page, out);
    }
    if format == OutputFormat::Csv {
        return write_csv(std::slice::from_ref(&page.clinic), out);
    }

    let clinic = &page.clinic;
    writeln!(out, "{}", clinic.name)?;
    if let Some(address) = &clinic.address {
        writeln!(out, "{}", address)?;
    }
    if let Some(phone) = &clinic.phone {
        writeln!(out, "Phone: {}", phone)?;
    }
    if let Some(hours) = &clinic.working_hours {
        writeln!(out, "Hours: {}", hours)?;
    }
    if let Some(value) = clinic.rating {
        writeln!(out, "Rating: {:.1} ({} reviews)", value, clinic.reviews_count)?;
    }
    if !page.amenities.is_empty() {
        let names: Vec<&str> = page.amenities.iter().map(|a| a.name.as_str()).collect();
        writeln!(out, "Amenities: {}", names.join(", "))?;
    }

    render_section("Reviews", &page.reviews, out, |r, out| {
        render_listing(r, OutputFormat::Table, out)
    })
}
