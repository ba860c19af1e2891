use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{SettingsUpdateInput, UserSettings};
use crate::services::metrics::DEFAULT_AWAKE_HOURS_PER_DAY;
use crate::utils::dates::{parse_timezone, today_in};

const DEFAULT_REMINDER_TIME: &str = "20:00";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_THEME: &str = "auto";
const THEME_OPTIONS: [&str; 3] = ["light", "dark", "auto"];
const MIN_AWAKE_HOURS: f64 = 1.0;
const MAX_AWAKE_HOURS: f64 = 24.0;

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<HashMap<String, UserSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: &str) -> AppResult<UserSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.get(user_id) {
                return Ok(settings.clone());
            }
        }

        let settings = self
            .db
            .with_connection(|conn| load_or_default(conn, user_id))?;
        debug!(target: "app::settings", user_id, "settings loaded");

        if let Ok(mut guard) = self.cache.write() {
            guard.insert(user_id.to_string(), settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, user_id: &str, input: SettingsUpdateInput) -> AppResult<UserSettings> {
        let mut current = self.get(user_id)?;

        if let Some(hours) = input.awake_hours_per_day {
            if !hours.is_finite() || !(MIN_AWAKE_HOURS..=MAX_AWAKE_HOURS).contains(&hours) {
                return Err(AppError::validation(
                    "awake hours per day must be between 1 and 24",
                ));
            }
            current.awake_hours_per_day = hours;
        }

        if let Some(reminder) = input.check_in_reminder_time {
            current.check_in_reminder_time = normalize_reminder_time(&reminder)?;
        }

        if let Some(timezone) = input.timezone {
            let tz = parse_timezone(&timezone)?;
            current.timezone = tz.name().to_string();
        }

        if let Some(theme) = input.theme {
            let normalized = theme.trim().to_lowercase();
            if !THEME_OPTIONS.contains(&normalized.as_str()) {
                return Err(AppError::validation("theme must be light, dark or auto"));
            }
            current.theme = normalized;
        }

        current.updated_at = Utc::now().to_rfc3339();
        self.db
            .with_connection(|conn| SettingsRepository::upsert(conn, &current))?;
        info!(target: "app::settings", user_id, "settings updated");

        if let Ok(mut guard) = self.cache.write() {
            guard.insert(user_id.to_string(), current.clone());
        }

        Ok(current)
    }

    pub fn timezone(&self, user_id: &str) -> AppResult<Tz> {
        let settings = self.get(user_id)?;
        Ok(timezone_or_utc(&settings))
    }

    pub fn today(&self, user_id: &str) -> AppResult<NaiveDate> {
        Ok(today_in(self.timezone(user_id)?))
    }
}

pub fn default_settings(user_id: &str) -> UserSettings {
    UserSettings {
        user_id: user_id.to_string(),
        awake_hours_per_day: DEFAULT_AWAKE_HOURS_PER_DAY,
        check_in_reminder_time: DEFAULT_REMINDER_TIME.to_string(),
        timezone: DEFAULT_TIMEZONE.to_string(),
        theme: DEFAULT_THEME.to_string(),
        updated_at: Utc::now().to_rfc3339(),
    }
}

/// Stored settings for `user_id`, or defaults when none were saved.
pub fn load_or_default(conn: &Connection, user_id: &str) -> AppResult<UserSettings> {
    Ok(SettingsRepository::get(conn, user_id)?.unwrap_or_else(|| default_settings(user_id)))
}

/// The user's calendar date right now.
pub fn user_today(conn: &Connection, user_id: &str) -> AppResult<NaiveDate> {
    let settings = load_or_default(conn, user_id)?;
    Ok(today_in(timezone_or_utc(&settings)))
}

fn timezone_or_utc(settings: &UserSettings) -> Tz {
    settings.timezone.parse::<Tz>().unwrap_or_else(|_| {
        warn!(
            target: "app::settings",
            timezone = %settings.timezone,
            "stored timezone is invalid, falling back to UTC"
        );
        Tz::UTC
    })
}

fn normalize_reminder_time(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| AppError::validation("reminder time must use HH:MM"))?;
    Ok(time.format("%H:%M").to_string())
}
