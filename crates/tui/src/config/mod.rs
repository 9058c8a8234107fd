use chrono::Weekday;
use chrono_tz::Tz;
use clap::Parser;
use engine::{Collection, ExpenseSettings, ListOrder, SyncMode};
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/spendlog.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote API root, e.g. `https://cloud.example.com/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    /// Prefills the email field of the auth screen.
    pub email: String,
    /// IANA name; decides where "this month" and "this week" start.
    pub timezone: String,
    pub currency: String,
    pub week_start: String,
    pub confirm_delete: bool,
    pub owner_permissions: bool,
    pub order: ListOrder,
    pub sync: SyncMode,
    pub log_level: String,
    pub log_file: String,
    pub state_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/v1".to_string(),
            project_id: String::new(),
            database_id: "main".to_string(),
            collection_id: "expenses".to_string(),
            email: String::new(),
            timezone: "UTC".to_string(),
            currency: "$".to_string(),
            week_start: "monday".to_string(),
            confirm_delete: true,
            owner_permissions: true,
            order: ListOrder::default(),
            sync: SyncMode::default(),
            log_level: "info".to_string(),
            log_file: "spendlog.log".to_string(),
            state_file: "config/spendlog_state.json".to_string(),
        }
    }
}

impl AppConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|err| AppError::Setting {
            key: "timezone",
            message: err.to_string(),
        })
    }

    pub fn week_start(&self) -> Result<Weekday> {
        match self.week_start.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Weekday::Mon),
            "sunday" | "sun" => Ok(Weekday::Sun),
            "saturday" | "sat" => Ok(Weekday::Sat),
            other => Err(AppError::Setting {
                key: "week_start",
                message: format!("expected monday, sunday or saturday, got {other:?}"),
            }),
        }
    }

    pub fn expense_settings(&self) -> ExpenseSettings {
        let mut settings =
            ExpenseSettings::new(Collection::new(&self.database_id, &self.collection_id));
        settings.order = self.order;
        settings.sync = self.sync;
        settings.owner_permissions = self.owner_permissions;
        settings
    }
}

#[derive(Debug, Parser)]
#[command(name = "spendlog", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the API endpoint (e.g. http://localhost/v1).
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    project_id: Option<String>,
    #[arg(long)]
    database_id: Option<String>,
    #[arg(long)]
    collection_id: Option<String>,
    /// Prefill the email (password is never read from CLI).
    #[arg(long)]
    email: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("SPENDLOG"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(project_id) = args.project_id {
        settings.project_id = project_id;
    }
    if let Some(database_id) = args.database_id {
        settings.database_id = database_id;
    }
    if let Some(collection_id) = args.collection_id {
        settings.collection_id = collection_id;
    }
    if let Some(email) = args.email {
        settings.email = email;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    settings.timezone()?;
    settings.week_start()?;

    Ok(settings)
}
