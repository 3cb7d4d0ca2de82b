use chrono::Local;
use clap::Parser;
use docfinder::app::pages::{self, DetailOptions};
use docfinder::app::render::{self, OutputFormat};
use docfinder::config::cli::{parse_visit_time, Command, PagingArgs, ReviewArgs};
use docfinder::core::api::{Directory, DirectoryApi, ReviewTarget};
use docfinder::core::pagination::PageRequest;
use docfinder::core::schedule::{adapt_schedule, ScheduleOptions};
use docfinder::domain::model::{Credentials, NewVisit};
use docfinder::utils::error::{ClientError, ErrorSeverity, Result};
use docfinder::utils::{logger, validation::Validate};
use docfinder::{AppConfig, AuthHttpClient, CliConfig, FileSessionStore};
use std::io::Write;
use std::sync::Arc;

type Api = DirectoryApi<FileSessionStore>;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting docfinder CLI");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            eprintln!("{}", e.user_friendly_message());
            eprintln!("{}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("{}", e.user_friendly_message());
        eprintln!("{}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_config(cli: &CliConfig) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    }
    .with_base_url(cli.base_url.clone())
    .with_session_path(cli.session.clone());

    config.validate()?;
    tracing::debug!("Using API at {}", config.api.base_url);
    Ok(config)
}

async fn run(cli: &CliConfig, config: &AppConfig) -> Result<()> {
    let session = Arc::new(FileSessionStore::open(&config.session.path)?);
    let http = AuthHttpClient::new(config.http_config(), session)?;
    let api = DirectoryApi::new(http);

    let result = dispatch(&api, cli, config).await;
    if let Err(e) = &result {
        if e.clears_session() {
            tracing::warn!("Session rejected, clearing stored tokens");
            if let Err(logout_error) = api.logout() {
                tracing::warn!("Could not clear stored tokens: {}", logout_error);
            }
        }
    }
    result
}

fn page_request(paging: &PagingArgs, config: &AppConfig) -> Result<PageRequest> {
    PageRequest::new(
        paging.page,
        paging.page_size.unwrap_or(config.display.page_size),
    )
}

fn schedule_options(days: Option<u32>, config: &AppConfig) -> ScheduleOptions {
    ScheduleOptions::starting(Local::now().date_naive())
        .days_ahead(days.unwrap_or(config.display.schedule_days))
}

fn review_target(args: &ReviewArgs) -> Result<ReviewTarget> {
    match (&args.target.doctor, &args.target.clinic) {
        (Some(slug), None) => Ok(ReviewTarget::Doctor(slug.clone())),
        (None, Some(slug)) => Ok(ReviewTarget::Clinic(slug.clone())),
        _ => Err(ClientError::validation(
            "pass exactly one of --doctor or --clinic",
        )),
    }
}

async fn dispatch(api: &Api, cli: &CliConfig, config: &AppConfig) -> Result<()> {
    let format = cli.format;
    let mut out = std::io::stdout().lock();

    match &cli.command {
        Command::Login { username, password } => {
            let credentials = Credentials {
                username: username.clone(),
                password: password.clone(),
            };
            api.login(&credentials).await?;
            writeln!(out, "Logged in as {}.", username)?;
        }
        Command::Logout => {
            api.logout()?;
            writeln!(out, "Logged out.")?;
        }
        Command::Cities => {
            let cities = api.cities().await?;
            render::render_items(&cities, format, &mut out)?;
        }
        Command::City { id } => {
            let cities = api.cities().await?;
            let city = cities
                .iter()
                .find(|c| c.id == *id)
                .ok_or_else(|| ClientError::NotFound {
                    path: format!("/cities/{}/", id),
                })?;
            api.select_city(city.id)?;
            writeln!(out, "Selected {}.", city.name)?;
        }
        Command::Doctors(args) => {
            let city_id = api.resolve_city(args.city)?;
            let page = page_request(&args.paging, config)?;
            let search = pages::doctor_search(api, city_id, &args.filters(), page).await?;
            if search.active_filters > 0 {
                tracing::debug!("{} filters active", search.active_filters);
            }
            render::render_listing(&search.listing, format, &mut out)?;
        }
        Command::Doctor { slug, days } => {
            let options = DetailOptions::new(schedule_options(*days, config));
            let page = pages::doctor_page(api, slug, &options).await?;
            render::render_doctor_page(&page, format, &mut out)?;
        }
        Command::Clinics(args) => {
            let city_id = api.resolve_city(args.city)?;
            let page = page_request(&args.paging, config)?;
            let search = pages::clinic_search(api, city_id, &args.filters(), page).await?;
            render::render_listing(&search.listing, format, &mut out)?;
        }
        Command::Clinic { slug } => {
            let options = DetailOptions::new(schedule_options(None, config));
            let page = pages::clinic_page(api, slug, &options).await?;
            render::render_clinic_page(&page, format, &mut out)?;
        }
        Command::Map { city } => {
            let city_id = api.resolve_city(*city)?;
            let markers = api.clinic_markers(city_id).await?;
            render::render_items(&markers, format, &mut out)?;
        }
        Command::Procedures { search, paging } => {
            let page = page_request(paging, config)?;
            let search = search.as_deref();
            let listing = pages::fetch_clamped(page, |p| api.procedures(search, p)).await?;
            render::render_listing(&listing, format, &mut out)?;
        }
        Command::Specialities => {
            let specialities = api.specialities().await?;
            render::render_items(&specialities, format, &mut out)?;
        }
        Command::Reviews(args) => {
            let target = review_target(args)?;
            let page = page_request(&args.paging, config)?;
            let listing = pages::review_page(api, &target, page, args.sort.into()).await?;
            render::render_listing(&listing, format, &mut out)?;
        }
        Command::Schedule { slug, days } => {
            let raw = api.doctor_schedule(slug).await?;
            let schedules = adapt_schedule(&raw, &schedule_options(*days, config));
            match format {
                OutputFormat::Table => render::render_schedule(&schedules, &mut out)?,
                _ => render::write_json(&schedules, &mut out)?,
            }
        }
        Command::Profile => {
            let profile = api.profile().await?;
            render::render_items(std::slice::from_ref(&profile), format, &mut out)?;
        }
        Command::Visits { paging } => {
            let page = page_request(paging, config)?;
            let listing = pages::fetch_clamped(page, |p| api.visits(p)).await?;
            render::render_listing(&listing, format, &mut out)?;
        }
        Command::Book {
            doctor,
            clinic,
            date,
            time,
            comment,
        } => {
            let time = parse_visit_time(time)?;
            let visit = NewVisit {
                doctor_slug: doctor.clone(),
                clinic_slug: clinic.clone(),
                date: *date,
                time,
                comment: comment.clone(),
            };
            let booked = api.book_visit(&visit).await?;
            render::render_items(std::slice::from_ref(&booked), format, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
