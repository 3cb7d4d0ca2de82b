use crate::app::render::OutputFormat;
use crate::core::filters::{
    ClinicFilters, ClinicOrdering, DoctorFilters, DoctorOrdering, ReviewOrdering,
};
use crate::domain::model::Gender;
use crate::utils::error::{ClientError, Result};
use chrono::NaiveTime;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "docfinder")]
#[command(about = "Find doctors, clinics and procedures")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Override the API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Override the session file location")]
    pub session: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and store the token pair
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "DOCFINDER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored tokens
    Logout,
    /// List available cities
    Cities,
    /// Select the city used by listings
    City { id: i64 },
    /// Search doctors in a city
    Doctors(DoctorArgs),
    /// Show a doctor profile
    Doctor {
        slug: String,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Search clinics in a city
    Clinics(ClinicArgs),
    /// Show a clinic profile
    Clinic { slug: String },
    /// Clinic coordinates for a map
    Map {
        #[arg(long)]
        city: Option<i64>,
    },
    /// List procedures
    Procedures {
        #[arg(long)]
        search: Option<String>,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// List specialities
    Specialities,
    /// Reviews of a doctor or a clinic
    Reviews(ReviewArgs),
    /// Available visit times of a doctor
    Schedule {
        slug: String,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show the logged-in user
    Profile,
    /// List booked visits
    Visits {
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Book a visit
    Book {
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        clinic: String,
        #[arg(long, help = "YYYY-MM-DD")]
        date: chrono::NaiveDate,
        #[arg(long, help = "HH:MM")]
        time: String,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PagingArgs {
    #[arg(long, default_value = "1")]
    pub page: usize,

    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DoctorSort {
    Rating,
    Experience,
    Price,
    #[value(name = "price-desc")]
    PriceDesc,
    Reviews,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ClinicSort {
    Rating,
    Reviews,
    Name,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReviewSort {
    Newest,
    Oldest,
    Best,
    Worst,
}

impl From<ReviewSort> for ReviewOrdering {
    fn from(sort: ReviewSort) -> Self {
        match sort {
            ReviewSort::Newest => ReviewOrdering::Newest,
            ReviewSort::Oldest => ReviewOrdering::Oldest,
            ReviewSort::Best => ReviewOrdering::HighestRated,
            ReviewSort::Worst => ReviewOrdering::LowestRated,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DoctorArgs {
    #[arg(long)]
    pub city: Option<i64>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub speciality: Option<String>,
    #[arg(long)]
    pub procedure: Option<String>,
    #[arg(long, value_enum)]
    pub gender: Option<GenderArg>,
    #[arg(long, help = "Only doctors with online booking")]
    pub online: bool,
    #[arg(long, help = "Only doctors who see children")]
    pub children: bool,
    #[arg(long)]
    pub max_price: Option<u32>,
    #[arg(long)]
    pub min_rating: Option<f32>,
    #[arg(long, value_enum)]
    pub sort: Option<DoctorSort>,
    #[command(flatten)]
    pub paging: PagingArgs,
}

impl DoctorArgs {
    pub fn filters(&self) -> DoctorFilters {
        let mut filters = DoctorFilters::new();
        if let Some(search) = &self.search {
            filters = filters.search(search);
        }
        if let Some(speciality) = &self.speciality {
            filters = filters.speciality(speciality);
        }
        if let Some(procedure) = &self.procedure {
            filters = filters.procedure(procedure);
        }
        if let Some(gender) = self.gender {
            filters = filters.gender(match gender {
                GenderArg::Male => Gender::Male,
                GenderArg::Female => Gender::Female,
            });
        }
        if self.online {
            filters.toggle_online_booking();
        }
        if self.children {
            filters.toggle_children_reception();
        }
        if let Some(price) = self.max_price {
            filters = filters.max_price(price);
        }
        if let Some(rating) = self.min_rating {
            filters = filters.min_rating(rating);
        }
        if let Some(sort) = self.sort {
            filters = filters.ordering(match sort {
                DoctorSort::Rating => DoctorOrdering::Rating,
                DoctorSort::Experience => DoctorOrdering::Experience,
                DoctorSort::Price => DoctorOrdering::PriceAsc,
                DoctorSort::PriceDesc => DoctorOrdering::PriceDesc,
                DoctorSort::Reviews => DoctorOrdering::ReviewsCount,
            });
        }
        filters
    }
}

#[derive(Debug, Clone, Args)]
pub struct ClinicArgs {
    #[arg(long)]
    pub city: Option<i64>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub speciality: Option<String>,
    #[arg(long)]
    pub min_rating: Option<f32>,
    #[arg(long, value_enum)]
    pub sort: Option<ClinicSort>,
    #[command(flatten)]
    pub paging: PagingArgs,
}

impl ClinicArgs {
    pub fn filters(&self) -> ClinicFilters {
        let mut filters = ClinicFilters::new();
        if let Some(search) = &self.search {
            filters = filters.search(search);
        }
        if let Some(speciality) = &self.speciality {
            filters = filters.speciality(speciality);
        }
        if let Some(rating) = self.min_rating {
            filters = filters.min_rating(rating);
        }
        if let Some(sort) = self.sort {
            filters = filters.ordering(match sort {
                ClinicSort::Rating => ClinicOrdering::Rating,
                ClinicSort::Reviews => ClinicOrdering::ReviewsCount,
                ClinicSort::Name => ClinicOrdering::Name,
            });
        }
        filters
    }
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false, id = "target")]
pub struct ReviewTargetArgs {
    #[arg(long)]
    pub doctor: Option<String>,
    #[arg(long)]
    pub clinic: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub target: ReviewTargetArgs,
    #[arg(long, value_enum, default_value = "newest")]
    pub sort: ReviewSort,
    #[command(flatten)]
    pub paging: PagingArgs,
}

/// Parses a `--time` value given as `HH:MM`.
pub fn parse_visit_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
        ClientError::validation(format!("invalid visit time '{}': {}, expected HH:MM", raw, e))
    })
}
