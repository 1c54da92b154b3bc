use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// UI theme preference stored per user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("invalid theme value {other:?}")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub theme: Theme,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Row as stored in `users`; `theme` is TEXT constrained by a CHECK.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub theme: String,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            full_name: r.full_name,
            email: r.email,
            password_hash: r.password_hash,
            theme: r.theme.parse().unwrap_or_default(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_only_known_values() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("system".parse::<Theme>(), Ok(Theme::System));
        assert!("Dark".parse::<Theme>().is_err());
        assert!("blue".parse::<Theme>().is_err());
    }

    #[test]
    fn user_json_never_contains_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            theme: Theme::Dark,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["fullName"], "Ada Lovelace");
        assert_eq!(json["theme"], "dark");
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }
}
