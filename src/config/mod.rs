use serde::Deserialize;
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Правила бронирования и фоновые задачи
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub cancellation_cutoff_hours: i64,
    pub seat_hold_ttl_secs: i64,
    pub cleanup_interval_secs: u64,
    pub availability_cache_ttl_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            cancellation_cutoff_hours: 2,
            seat_hold_ttl_secs: 900,
            cleanup_interval_secs: 60,
            availability_cache_ttl_secs: 30,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn or_default(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = or_default(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

/// Как `parsed`, но значение должно лежать в `range`.
fn bounded<T>(name: &'static str, default: &str, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd,
{
    parse_bounded(name, or_default(name, default), range)
}

fn parse_bounded<T>(name: &'static str, value: String, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd,
{
    match value.parse::<T>() {
        Ok(parsed) if range.contains(&parsed) => Ok(parsed),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

const DAY_SECS: u64 = 86_400;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "showtime_booking=debug,tower_http=debug"),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            booking: BookingConfig {
                cancellation_cutoff_hours: bounded("CANCELLATION_CUTOFF_HOURS", "2", 0..=24 * 30)?,
                seat_hold_ttl_secs: bounded("SEAT_HOLD_TTL_SECS", "900", 1..=DAY_SECS as i64)?,
                cleanup_interval_secs: bounded("CLEANUP_INTERVAL_SECS", "60", 1..=DAY_SECS)?,
                availability_cache_ttl_secs: bounded("AVAILABILITY_CACHE_TTL_SECS", "30", 1..=DAY_SECS)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_defaults() {
        let config = BookingConfig::default();
        assert_eq!(config.cancellation_cutoff_hours, 2);
        assert_eq!(config.seat_hold_ttl_secs, 900);
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = parse_bounded::<u16>("PORT", "abc".to_string(), 1..=u16::MAX).unwrap_err();
        assert_eq!(err.to_string(), "PORT has invalid value \"abc\"");
    }

    #[test]
    fn hold_ttl_outside_bounds_is_rejected() {
        let range = 1..=DAY_SECS as i64;
        assert_eq!(parse_bounded("SEAT_HOLD_TTL_SECS", "900".to_string(), range.clone()).unwrap(), 900);
        for raw in ["0", "-5", "86401", "18446744073709551615"] {
            assert!(matches!(
                parse_bounded("SEAT_HOLD_TTL_SECS", raw.to_string(), range.clone()),
                Err(ConfigError::Invalid { name: "SEAT_HOLD_TTL_SECS", .. })
            ));
        }
    }
}
