use std::env;

use chrono::NaiveTime;
use tracing::warn;

/// Where appointment records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub business_hours_start: NaiveTime,
    pub business_hours_end: NaiveTime,
    pub appointment_store: StoreBackend,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            business_hours_start: default_business_start(),
            business_hours_end: default_business_end(),
            appointment_store: StoreBackend::Supabase,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let (business_hours_start, business_hours_end) = business_hours_from_env();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            business_hours_start,
            business_hours_end,
            appointment_store: match env::var("APPOINTMENT_STORE").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                Ok("supabase") | Err(_) => StoreBackend::Supabase,
                Ok(other) => {
                    warn!("Unknown APPOINTMENT_STORE '{}', using supabase", other);
                    StoreBackend::Supabase
                }
            },
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        };

        if config.appointment_store == StoreBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn default_business_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_business_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default()
}

fn parse_clock(var: &str) -> Option<NaiveTime> {
    let raw = env::var(var).ok()?;
    match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
        Ok(time) => Some(time),
        Err(e) => {
            warn!("{} '{}' is not HH:MM ({}), using default", var, raw, e);
            None
        }
    }
}

fn business_hours_from_env() -> (NaiveTime, NaiveTime) {
    let start = parse_clock("BUSINESS_HOURS_START").unwrap_or_else(default_business_start);
    let end = parse_clock("BUSINESS_HOURS_END").unwrap_or_else(default_business_end);

    if start >= end {
        warn!("Business hours {} - {} are inverted, using 09:00 - 17:00", start, end);
        return (default_business_start(), default_business_end());
    }

    (start, end)
}
