use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment};

/// Local dev servers of the quiz client.
const DEFAULT_CORS_ORIGINS: [&str; 3] =
    ["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_number<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    parse_number(field, value)
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    parse_number(field, value)
}

pub(super) fn parse_positive_i64(field: &'static str, value: String) -> Result<i64, ConfigError> {
    let parsed: i64 = parse_number(field, value.clone())?;
    if parsed <= 0 {
        return Err(ConfigError::InvalidValue { field, value });
    }
    Ok(parsed)
}

/// Accepts a JSON array or a comma separated list. Blank input keeps the defaults.
pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let raw = raw.trim();

    let origins: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|_| ConfigError::InvalidCors(raw.to_string()))?
    } else {
        raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
    };

    if origins.is_empty() {
        Ok(DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect())
    } else {
        Ok(origins)
    }
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    let value = value.unwrap_or_default().to_ascii_lowercase();
    match value.as_str() {
        "production" | "prod" => Environment::Production,
        "staging" => Environment::Staging,
        "test" | "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_json_and_csv() {
        let from_json =
            parse_cors_origins(Some(r#"["https://quiz.example", "https://admin.example"]"#.into()))
                .expect("json origins");
        let from_csv = parse_cors_origins(Some("https://quiz.example ,https://admin.example,".into()))
            .expect("csv origins");
        assert_eq!(from_json, from_csv);
        assert_eq!(from_csv.len(), 2);
    }

    #[test]
    fn cors_falls_back_to_dev_origins() {
        assert_eq!(parse_cors_origins(None).expect("none").len(), DEFAULT_CORS_ORIGINS.len());
        assert_eq!(parse_cors_origins(Some("[]".into())).expect("empty json").len(), 3);
        assert!(parse_cors_origins(Some("[\"https://quiz.example\"".into())).is_err());
    }

    #[test]
    fn bool_flags_are_case_insensitive() {
        for truthy in ["1", "true", "Yes", "ON"] {
            assert!(parse_bool(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "off", ""] {
            assert!(!parse_bool(falsy), "{falsy}");
        }
    }

    #[test]
    fn question_limits_must_be_positive() {
        assert_eq!(parse_positive_i64("QUIZ_MAX_QUESTION_COUNT", "50".into()).expect("50"), 50);
        assert!(parse_positive_i64("QUIZ_MAX_QUESTION_COUNT", "0".into()).is_err());
        assert!(parse_positive_i64("QUIZ_MAX_QUESTION_COUNT", "ten".into()).is_err());
        assert!(parse_u16("POSTGRES_PORT", "70000".into()).is_err());
    }

    #[test]
    fn environment_aliases() {
        assert_eq!(parse_environment(Some("PROD".into())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".into())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".into())), Environment::Test);
        assert_eq!(parse_environment(Some("local".into())), Environment::Development);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
