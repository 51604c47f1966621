//! Semantic validation for generator settings.

use anyhow::{bail, Result};

use crate::activity::split_name_ver;
use crate::config::settings::{
    GeneratorSettings, ENV_ACCESS_KEY_ID, ENV_BATCH_IMAGE, ENV_BUCKET, ENV_MONGO_URL,
    ENV_REDSHIFT_DB, ENV_REDSHIFT_HOST, ENV_REDSHIFT_PASSWORD, ENV_REDSHIFT_PORT,
    ENV_REDSHIFT_SCHEMA, ENV_REDSHIFT_USER,
};

/// Validate generator settings.
/// Returns `Ok(())` if generation can proceed, Err with all problems if not.
///
/// # Errors
///
/// Returns an error listing every fatal problem found in the settings.
pub fn validate_settings(settings: &GeneratorSettings) -> Result<()> {
    let mut errors = Vec::new();

    if settings.store.url.trim().is_empty() {
        errors.push(format!("store.url must be set ({ENV_MONGO_URL})"));
    }

    if settings.batch_image.trim().is_empty() {
        errors.push(format!("batch_image must be set ({ENV_BATCH_IMAGE})"));
    } else {
        if settings.batch_image.trim() != settings.batch_image {
            errors.push(format!(
                "batch_image '{}' has surrounding whitespace",
                settings.batch_image
            ));
        }
        let (name, version) = split_name_ver(&settings.batch_image);
        if name.is_empty() {
            errors.push(format!(
                "batch_image '{}' has an empty image name",
                settings.batch_image
            ));
        }
        if version.is_empty() {
            errors.push(format!(
                "batch_image '{}' has an empty version after ':'",
                settings.batch_image
            ));
        }
    }

    if let Some(pool) = &settings.pool {
        if pool.trim().is_empty() {
            errors.push("pool must not be empty when set".to_string());
        }
    }

    if settings.object_store.prefix.trim_matches('/').trim().is_empty() {
        errors.push("object_store.prefix must not be empty".to_string());
    }

    let sensors = &settings.sensors;
    for (field, value) in [
        ("sensors.poke_interval_secs", sensors.poke_interval_secs),
        ("sensors.timeout_secs", sensors.timeout_secs),
        ("sensors.table_poke_interval_secs", sensors.table_poke_interval_secs),
        ("sensors.table_timeout_secs", sensors.table_timeout_secs),
    ] {
        if value == 0 {
            errors.push(format!("{field} must be > 0"));
        }
    }
    if sensors.delayed_offset == 0 {
        errors.push("sensors.delayed_offset must be > 0".to_string());
    }

    if settings.defaults.schedule_interval.trim().is_empty() {
        errors.push("defaults.schedule_interval must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Settings validation failed:\n  - {}", errors.join("\n  - "));
    }
}

/// Non-fatal gaps: values the generated jobs will receive as nulls.
#[must_use]
pub fn settings_warnings(settings: &GeneratorSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.object_store.bucket.is_none() {
        warnings.push(format!("object_store.bucket is not set ({ENV_BUCKET})"));
    }
    if settings.object_store.access_key_id.is_empty() {
        warnings.push(format!(
            "object_store.access_key_id is not set ({ENV_ACCESS_KEY_ID})"
        ));
    }

    let wh = &settings.warehouse;
    for (field, env, value) in [
        ("host", ENV_REDSHIFT_HOST, &wh.host),
        ("port", ENV_REDSHIFT_PORT, &wh.port),
        ("db", ENV_REDSHIFT_DB, &wh.db),
        ("user", ENV_REDSHIFT_USER, &wh.user),
        ("password", ENV_REDSHIFT_PASSWORD, &wh.password),
        ("schema", ENV_REDSHIFT_SCHEMA, &wh.schema),
    ] {
        if value.is_none() {
            warnings.push(format!("warehouse.{field} is not set ({env})"));
        }
    }

    if settings.store.allow_invalid_certificates {
        warnings.push("store TLS certificate verification is disabled".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_settings_str;
    use crate::config::settings::WarehouseSettings;

    fn valid() -> GeneratorSettings {
        GeneratorSettings::new("mongodb://mongo:27017/astro", "batch-job:2.1")
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid()).is_ok());
    }

    #[test]
    fn test_image_without_version_passes() {
        let mut s = valid();
        s.batch_image = "batch-job".into();
        assert!(validate_settings(&s).is_ok());
    }

    #[test]
    fn test_missing_required_values_all_reported() {
        let s = GeneratorSettings::new("", "");
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("MONGO_URL"));
        assert!(err.contains("CLICKSTREAM_BATCH_IMAGE"));
    }

    #[test]
    fn test_malformed_image_fails() {
        let mut s = valid();
        s.batch_image = ":2.1".into();
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("empty image name"));

        s.batch_image = "batch-job:".into();
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("empty version"));
    }

    #[test]
    fn test_padded_image_fails() {
        let mut s = valid();
        s.batch_image = "batch-job:2.1 ".into();
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("surrounding whitespace"), "got: {err}");
    }

    #[test]
    fn test_zero_sensor_values_fail() {
        let yaml = r#"
store:
  url: mongodb://mongo/astro
batch_image: batch-job:2.1
sensors:
  timeout_secs: 0
  delayed_offset: 0
"#;
        let s = parse_settings_str(yaml).unwrap();
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("sensors.timeout_secs"));
        assert!(err.contains("sensors.delayed_offset"));
        assert!(!err.contains("sensors.poke_interval_secs"));
    }

    #[test]
    fn test_empty_prefix_and_pool_fail() {
        let mut s = valid();
        s.object_store.prefix = "/".into();
        s.pool = Some(String::new());
        let err = validate_settings(&s).unwrap_err().to_string();
        assert!(err.contains("object_store.prefix"));
        assert!(err.contains("pool must not be empty"));
    }

    #[test]
    fn test_warnings_list_unset_warehouse_fields() {
        let warnings = settings_warnings(&valid());
        assert!(warnings.iter().any(|w| w.contains("REDSHIFT_PASSWORD")));
        assert!(warnings.iter().any(|w| w.contains("AWS_S3_CLICKSTREAM_BUCKET")));
    }

    #[test]
    fn test_no_warnings_when_complete() {
        let mut s = valid();
        s.object_store.bucket = Some("clicks".into());
        s.object_store.access_key_id = "AKIA".into();
        s.warehouse = WarehouseSettings {
            host: Some("h".into()),
            port: Some("5439".into()),
            db: Some("d".into()),
            user: Some("u".into()),
            password: Some("p".into()),
            schema: Some("s".into()),
            encrypted: false,
        };
        assert!(settings_warnings(&s).is_empty());
    }

    #[test]
    fn test_insecure_tls_is_warned() {
        let mut s = valid();
        s.store.allow_invalid_certificates = true;
        assert!(settings_warnings(&s)
            .iter()
            .any(|w| w.contains("certificate verification")));
    }
}
