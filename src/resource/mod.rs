//! Desired-state records and the actions that converge them.
//!
//! Records are plain serde structs. Loading one from a file validates field
//! types, enum domains and unknown keys in one pass; anything serde rejects
//! surfaces as `ConsulRenderError::Validation` before any I/O on the targets.

pub mod agent;
pub mod definition;

pub use agent::{AgentConfig, LogLevel};
pub use definition::{DefinitionEntry, DefinitionType};

use crate::error::{ConsulRenderError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

pub const DEFAULT_OWNER: &str = "consul";
pub const DEFAULT_GROUP: &str = "consul";

/// Mode of rendered agent configuration and definition files.
pub const CONFIG_FILE_MODE: u32 = 0o640;

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

/// Load a record from `path`: `.json` files as JSON, anything else as TOML.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConsulRenderError::filesystem(path, e))?;
    parse(path, &contents)
}

/// Parse a record; `origin` picks the format and prefixes error messages.
///
/// TOML documents are converted to JSON values before deserializing, so
/// free-form maps (`parameters`, `ports`, ...) only ever hold JSON data.
pub fn parse<T: DeserializeOwned>(origin: &Path, contents: &str) -> Result<T> {
    let invalid = |reason: String| {
        ConsulRenderError::Validation(format!("{}: {}", origin.display(), reason.trim_end()))
    };

    let is_json = origin.extension().is_some_and(|ext| ext == "json");
    let value = if is_json {
        serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?
    } else {
        let table: toml::Table = toml::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        toml_to_json(toml::Value::Table(table)).map_err(invalid)?
    };
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}

/// Datetimes become their RFC 3339 text; non-finite floats have no JSON form.
fn toml_to_json(value: toml::Value) -> std::result::Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("float {} cannot be represented in JSON", f))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| Ok((key, toml_to_json(value)?)))
                .collect::<std::result::Result<Map<String, Value>, String>>()?,
        ),
    })
}

/// Reject empty identity fields.
fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConsulRenderError::Validation(format!(
            "'{}' is required and cannot be empty",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_parse_picks_format_from_extension() {
        let json: AgentConfig =
            parse(Path::new("agent.json"), r#"{"path": "/etc/consul/consul.json"}"#).unwrap();
        let toml: AgentConfig =
            parse(Path::new("agent.toml"), r#"path = "/etc/consul/consul.json""#).unwrap();
        assert_eq!(json, toml);
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = parse::<AgentConfig>(Path::new("agent.toml"), "path = 5").unwrap_err();
        match err {
            ConsulRenderError::Validation(msg) => assert!(msg.starts_with("agent.toml: ")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_toml_datetime_parameter_renders_as_text() {
        let entry: DefinitionEntry = parse(
            Path::new("backup.toml"),
            "name = \"backup\"\ntype = \"check\"\n\n[parameters]\nwhen = 1979-05-27T07:32:00Z\nttl = \"30s\"\n",
        )
        .unwrap();

        assert_eq!(
            entry.parameters.get("when"),
            Some(&Value::String("1979-05-27T07:32:00Z".to_string()))
        );
        let rendered = entry.render().unwrap();
        assert!(!rendered.contains("toml"));
        assert!(rendered.contains("\"when\": \"1979-05-27T07:32:00Z\""));
    }

    #[test]
    fn test_toml_datetime_in_agent_map() {
        let config: AgentConfig = parse(
            Path::new("agent.toml"),
            "path = \"/etc/consul/consul.json\"\n\n[watches]\nsince = 2024-01-02\n",
        )
        .unwrap();
        assert_eq!(config.watches.get("since"), Some(&Value::from("2024-01-02")));
    }

    #[test]
    fn test_toml_nan_rejected() {
        let err = parse::<DefinitionEntry>(
            Path::new("x.toml"),
            "name = \"x\"\ntype = \"check\"\n\n[parameters]\nweight = nan\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConsulRenderError::Validation(_)));
    }

    #[test]
    fn test_toml_nested_values_converted() {
        let entry: DefinitionEntry = parse(
            Path::new("redis.toml"),
            "name = \"redis\"\ntype = \"service\"\n\n[parameters]\ntags = [\"master\"]\nport = 6379\n\n[parameters.check]\ninterval = \"10s\"\n",
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&entry.to_document()).unwrap(),
            r#"{"service":{"tags":["master"],"port":6379,"check":{"interval":"10s"},"name":"redis"}}"#
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load::<AgentConfig>(Path::new("/nonexistent/consul-render/agent.toml"))
            .unwrap_err();
        assert!(matches!(err, ConsulRenderError::Filesystem { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("redis.toml");
        std::fs::write(
            &path,
            r#"
            name = "redis"
            type = "service"

            [parameters]
            port = 6379
            "#,
        )
        .unwrap();

        let entry: DefinitionEntry = load(&path).unwrap();
        assert_eq!(entry.name, "redis");
        assert_eq!(entry.kind, DefinitionType::Service);
        assert_eq!(
            entry.path(Path::new("/etc/consul")),
            PathBuf::from("/etc/consul/redis.json")
        );
    }
}
