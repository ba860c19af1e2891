use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::settings::UserSettings;

impl TryFrom<&Row<'_>> for UserSettings {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            awake_hours_per_day: row.get("awake_hours_per_day")?,
            check_in_reminder_time: row.get("check_in_reminder_time")?,
            timezone: row.get("timezone")?,
            theme: row.get("theme")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn get(conn: &Connection, user_id: &str) -> AppResult<Option<UserSettings>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, awake_hours_per_day, check_in_reminder_time, timezone, theme, updated_at
                FROM user_settings
                WHERE user_id = ?1
            "#,
        )?;

        let row = stmt
            .query_row([user_id], |row| UserSettings::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn upsert(conn: &Connection, settings: &UserSettings) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO user_settings (
                    user_id, awake_hours_per_day, check_in_reminder_time, timezone, theme, updated_at
                )
                VALUES (:user_id, :awake_hours_per_day, :check_in_reminder_time, :timezone, :theme, :updated_at)
                ON CONFLICT(user_id) DO UPDATE SET
                    awake_hours_per_day = excluded.awake_hours_per_day,
                    check_in_reminder_time = excluded.check_in_reminder_time,
                    timezone = excluded.timezone,
                    theme = excluded.theme,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":user_id": &settings.user_id,
                ":awake_hours_per_day": settings.awake_hours_per_day,
                ":check_in_reminder_time": &settings.check_in_reminder_time,
                ":timezone": &settings.timezone,
                ":theme": &settings.theme,
                ":updated_at": &settings.updated_at,
            },
        )?;

        Ok(())
    }
}
