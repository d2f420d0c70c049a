use std::env;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which appointment statuses block a brand new booking.
///
/// Updates and conflict checks always treat every non-cancelled appointment
/// as blocking; only creation is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateConflictPolicy {
    /// Only `scheduled` appointments block creation.
    #[default]
    Scheduled,
    /// `scheduled` and `completed` appointments block creation.
    Active,
}

impl CreateConflictPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub server_port: u16,
    pub cors_allowed_origin: String,
    pub create_conflict_policy: CreateConflictPolicy,
}

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            server_port: DEFAULT_SERVER_PORT,
            cors_allowed_origin: DEFAULT_CORS_ORIGIN.to_string(),
            create_conflict_policy: CreateConflictPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, appointments will be kept in memory");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("SERVER_PORT '{}' is not a valid port, using default", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_SERVER_PORT),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| {
                    warn!("CORS_ALLOWED_ORIGIN not set, using default");
                    DEFAULT_CORS_ORIGIN.to_string()
                }),
            create_conflict_policy: env::var("CREATE_CONFLICT_POLICY")
                .ok()
                .and_then(|raw| {
                    let parsed = CreateConflictPolicy::parse(&raw);
                    if parsed.is_none() {
                        warn!("Unknown CREATE_CONFLICT_POLICY '{}', using default", raw);
                    }
                    parsed
                })
                .unwrap_or_default(),
        };

        if !config.is_database_configured() {
            warn!("Supabase not configured - falling back to in-memory appointment storage");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}
