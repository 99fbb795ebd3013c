//! Service and check definition files.

use super::{default_group, default_owner, require_non_empty, CONFIG_FILE_MODE};
use crate::converge::{FileSpec, Plan};
use crate::error::{ConsulRenderError, Result};
use crate::render::to_canonical_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionType {
    Service,
    Check,
}

impl DefinitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionType::Service => "service",
            DefinitionType::Check => "check",
        }
    }
}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One service or check registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DefinitionType,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "default_owner")]
    pub user: String,
    #[serde(default = "default_group")]
    pub group: String,
}

impl DefinitionEntry {
    pub fn new(name: impl Into<String>, kind: DefinitionType, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters,
            user: default_owner(),
            group: default_group(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        if self.name.contains('/')
            || self.name.contains('\0')
            || self.name == "."
            || self.name == ".."
        {
            return Err(ConsulRenderError::Validation(format!(
                "definition name '{}' must be usable as a file name",
                self.name
            )));
        }
        require_non_empty("user", &self.user)?;
        require_non_empty("group", &self.group)?;
        Ok(())
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }

    /// `<base_dir>/<name>.json`
    pub fn path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.file_name())
    }

    /// The parameters nested under the type key, with `name` injected.
    ///
    /// A caller-supplied `name` parameter is overwritten in place.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut body = self.parameters.clone();
        body.insert("name".to_string(), Value::String(self.name.clone()));

        let mut document = Map::new();
        document.insert(self.kind.as_str().to_string(), Value::Object(body));
        document
    }

    pub fn render(&self) -> Result<String> {
        self.validate()?;
        to_canonical_json(&self.to_document())
    }

    pub fn create_plan(&self, base_dir: &Path) -> Result<Plan> {
        let content = self.render()?;
        let path = self.path(base_dir);

        let mut plan = Plan::new();
        plan.ensure_directory(base_dir, true);
        plan.write_file(FileSpec {
            path,
            content,
            mode: CONFIG_FILE_MODE,
            owner: self.user.clone(),
            group: self.group.clone(),
            sensitive: false,
        });

        debug!(name = %self.name, kind = %self.kind, "planned definition create");
        Ok(plan)
    }

    /// Remove the definition file. The directory stays.
    pub fn delete_plan(&self, base_dir: &Path) -> Result<Plan> {
        self.validate()?;
        let mut plan = Plan::new();
        plan.delete_file(self.path(base_dir));
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converge::Instruction;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn redis() -> DefinitionEntry {
        DefinitionEntry::new(
            "redis",
            DefinitionType::Service,
            params(json!({
                "tags": ["master"],
                "address": "127.0.0.1",
                "port": 6379,
                "interval": "10s"
            })),
        )
    }

    #[test]
    fn test_service_definition() {
        let entry = redis();
        let compact = serde_json::to_string(&entry.to_document()).unwrap();
        assert_eq!(
            compact,
            r#"{"service":{"tags":["master"],"address":"127.0.0.1","port":6379,"interval":"10s","name":"redis"}}"#
        );
        assert_eq!(
            entry.path(Path::new("/etc/consul")),
            PathBuf::from("/etc/consul/redis.json")
        );
    }

    #[test]
    fn test_check_definition() {
        let entry = DefinitionEntry::new(
            "web-api",
            DefinitionType::Check,
            params(json!({"http": "http://localhost:5000/health", "ttl": "30s"})),
        );
        let compact = serde_json::to_string(&entry.to_document()).unwrap();
        assert_eq!(
            compact,
            r#"{"check":{"http":"http://localhost:5000/health","ttl":"30s","name":"web-api"}}"#
        );
        assert_eq!(
            entry.path(Path::new("/etc/consul")),
            PathBuf::from("/etc/consul/web-api.json")
        );
    }

    #[test]
    fn test_render_is_pretty() {
        let entry = DefinitionEntry::new("ping", DefinitionType::Check, Map::new());
        assert_eq!(
            entry.render().unwrap(),
            "{\n  \"check\": {\n    \"name\": \"ping\"\n  }\n}"
        );
    }

    #[test]
    fn test_injected_name_wins_in_place() {
        let entry = DefinitionEntry::new(
            "redis",
            DefinitionType::Service,
            params(json!({"name": "other", "port": 6379})),
        );
        let compact = serde_json::to_string(&entry.to_document()).unwrap();
        assert_eq!(compact, r#"{"service":{"name":"redis","port":6379}}"#);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: std::result::Result<DefinitionEntry, _> =
            serde_json::from_str(r#"{"name": "redis", "type": "node"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_name_rejected() {
        let result: std::result::Result<DefinitionEntry, _> =
            serde_json::from_str(r#"{"type": "service"}"#);
        assert!(result.is_err());

        let entry = DefinitionEntry::new("", DefinitionType::Service, Map::new());
        assert!(matches!(
            entry.render(),
            Err(ConsulRenderError::Validation(_))
        ));
    }

    #[test]
    fn test_name_cannot_escape_base_dir() {
        for name in ["../passwd", "a/b", ".", ".."] {
            let entry = DefinitionEntry::new(name, DefinitionType::Service, Map::new());
            assert!(entry.create_plan(Path::new("/etc/consul")).is_err(), "{}", name);
            assert!(entry.delete_plan(Path::new("/etc/consul")).is_err(), "{}", name);
        }
    }

    #[test]
    fn test_ownership_defaults() {
        let entry: DefinitionEntry =
            serde_json::from_str(r#"{"name": "redis", "type": "service"}"#).unwrap();
        assert_eq!(entry.user, "consul");
        assert_eq!(entry.group, "consul");
        assert!(entry.parameters.is_empty());
    }

    #[test]
    fn test_create_plan() {
        let plan = redis().create_plan(Path::new("/etc/consul")).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.instructions()[0],
            Instruction::EnsureDirectory {
                path: PathBuf::from("/etc/consul"),
                recursive: true
            }
        );
        match &plan.instructions()[1] {
            Instruction::WriteFile(file) => {
                assert_eq!(file.path, PathBuf::from("/etc/consul/redis.json"));
                assert_eq!(file.mode, 0o640);
                assert_eq!(file.owner, "consul");
                assert_eq!(file.group, "consul");
            }
            other => panic!("unexpected instruction: {:?}", other),
        }
    }

    #[test]
    fn test_delete_plan_leaves_directory() {
        let plan = redis().delete_plan(Path::new("/etc/consul")).unwrap();
        assert_eq!(
            plan.instructions(),
            &[Instruction::DeleteFile {
                path: PathBuf::from("/etc/consul/redis.json")
            }]
        );
    }
}
