//! Option maps handed in by the host

use gcodescope_core::ConfigError;
use gcodescope_settings::{ReaderOptions, SettingsError, ViewerConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Outcome of merging an option map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionChange {
    /// Some recognized value differs from before
    pub changed: bool,
    /// A post-processing option changed; the model must be recomputed
    pub recompute: bool,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn merge<T: DeserializeOwned + PartialEq>(
    slot: &mut T,
    key: &str,
    value: &Value,
) -> Result<bool, ConfigError> {
    let new: T = serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    if *slot == new {
        return Ok(false);
    }
    *slot = new;
    Ok(true)
}

/// Merge recognized keys of `value` into the reader options
///
/// Nothing is written unless every recognized key parses. Unknown keys are
/// ignored.
pub fn merge_reader_options(
    reader: &mut ReaderOptions,
    value: &Value,
) -> Result<OptionChange, ConfigError> {
    let Value::Object(map) = value else {
        return Err(ConfigError::NotAnObject(kind(value).to_string()));
    };

    let mut merged = reader.clone();
    let mut change = OptionChange::default();
    for (key, value) in map {
        let (changed, post_processing) = match key.as_str() {
            "sortLayers" => (merge(&mut merged.sort_layers, key, value)?, true),
            "purgeEmptyLayers" => (merge(&mut merged.purge_empty_layers, key, value)?, true),
            "indexStrategy" => (merge(&mut merged.index_strategy, key, value)?, true),
            "firstReport" => (merge(&mut merged.first_report, key, value)?, false),
            "toolOffsets" => (merge(&mut merged.tool_offsets, key, value)?, false),
            "bed" => (merge(&mut merged.bed, key, value)?, false),
            "ignoreOutsideBed" => (merge(&mut merged.ignore_outside_bed, key, value)?, false),
            "g90InfluencesExtruder" => {
                (merge(&mut merged.g90_influences_extruder, key, value)?, false)
            }
            "bedZ" => (merge(&mut merged.bed_z, key, value)?, false),
            _ => {
                debug!("Ignoring unknown option '{}'", key);
                continue;
            }
        };
        if changed {
            debug!("Option '{}' changed", key);
            change.changed = true;
            change.recompute |= post_processing;
        }
    }

    *reader = merged;
    Ok(change)
}

/// Validate a complete configuration
pub fn validate_config(config: &ViewerConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|e| match e {
        SettingsError::InvalidSetting { key, reason } => ConfigError::InvalidValue { key, reason },
        other => ConfigError::InvalidValue {
            key: "config".to_string(),
            reason: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodescope_settings::IndexStrategy;
    use serde_json::json;

    #[test]
    fn test_post_processing_change_requests_recompute() {
        let mut reader = ReaderOptions::default();
        let change = merge_reader_options(&mut reader, &json!({"sortLayers": true})).unwrap();
        assert_eq!(
            change,
            OptionChange {
                changed: true,
                recompute: true
            }
        );
        assert!(reader.sort_layers);
    }

    #[test]
    fn test_unchanged_value_is_not_a_change() {
        let mut reader = ReaderOptions::default();
        let change =
            merge_reader_options(&mut reader, &json!({"purgeEmptyLayers": true})).unwrap();
        assert_eq!(change, OptionChange::default());
    }

    #[test]
    fn test_worker_options_do_not_recompute() {
        let mut reader = ReaderOptions::default();
        let change = merge_reader_options(
            &mut reader,
            &json!({"bedZ": 0.5, "toolOffsets": [{"x": 0, "y": 0}, {"x": 5, "y": 0}]}),
        )
        .unwrap();
        assert!(change.changed);
        assert!(!change.recompute);
        assert_eq!(reader.bed_z, 0.5);
        assert_eq!(reader.tool_offsets.len(), 2);
    }

    #[test]
    fn test_index_strategy_by_name() {
        let mut reader = ReaderOptions::default();
        merge_reader_options(&mut reader, &json!({"indexStrategy": "layerRanges"})).unwrap();
        assert_eq!(reader.index_strategy, IndexStrategy::LayerRanges);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let mut reader = ReaderOptions::default();
        let change = merge_reader_options(&mut reader, &json!({"colorScheme": "dark"})).unwrap();
        assert!(!change.changed);
        assert_eq!(reader, ReaderOptions::default());
    }

    #[test]
    fn test_bad_value_leaves_options_untouched() {
        let mut reader = ReaderOptions::default();
        let err = merge_reader_options(
            &mut reader,
            &json!({"sortLayers": true, "purgeEmptyLayers": "yes"}),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "purgeEmptyLayers"));
        assert_eq!(reader, ReaderOptions::default());
    }

    #[test]
    fn test_not_an_object() {
        let mut reader = ReaderOptions::default();
        assert_eq!(
            merge_reader_options(&mut reader, &json!([1, 2])),
            Err(ConfigError::NotAnObject("array".into()))
        );
    }

    #[test]
    fn test_validate_maps_setting_errors() {
        let mut config = ViewerConfig::default();
        config.reader.tool_offsets.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "reader.toolOffsets"
        ));
    }
}
