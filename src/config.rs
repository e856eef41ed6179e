// ============================================================================
// Rule configuration - YAML rule sets compiled into a registry
// ============================================================================
//
// External collaborators hand the detector a rule set: per rule an id, a
// handler kind, an enabled flag, a severity and kind-specific params.
// Disabled rules are entirely absent from dispatch; severity is report
// metadata only.
//
// ============================================================================

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::report::Severity;
use crate::rules::handlers::{
    CtorCallHandler, DisallowedNewHandler, EmptyCatchHandler, ForbiddenCallHandler,
    GenericCatchHandler, MutableStaticHandler, NamingConventionHandler, NestingDepthHandler,
    NullComparisonHandler, StringIdentityHandler, CAMEL_CASE,
};
use crate::rules::{CompiledRule, RegistryError, RuleHandler, RuleRegistry};
use crate::tree::NodeKind;

pub const DEFAULT_NESTING_THRESHOLD: usize = 3;

/// Kind-specific rule parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleParams {
    /// Disallowed call names (forbidden-call).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Disallowed or broadest type names (disallowed-type-instantiation,
    /// generic-exception-catch).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Nesting threshold (nesting-depth).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
    /// Casing regex (naming-convention).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// One configured rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub kind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub params: RuleParams,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid rule set yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Ordered rule set, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    pub rules: Vec<RuleSpec>,
}

impl RuleSetConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Compiles the rule set into a registry. Fails fast on duplicate ids,
    /// unknown handler kinds or bad params, before any file is scanned.
    pub fn build_registry(&self) -> Result<RuleRegistry, ConfigError> {
        let mut registry = RuleRegistry::new();
        for spec in self.rules.iter().filter(|s| s.enabled) {
            let (kinds, handler) = compile_handler(spec)?;
            registry.register(CompiledRule::new(
                spec.id.clone(),
                spec.severity,
                spec.message.clone(),
                kinds,
                handler,
            ))?;
        }
        info!(rules = registry.len(), "rule registry built");
        Ok(registry)
    }
}

/// Handler factory, keyed by the configured kind string.
fn compile_handler(
    spec: &RuleSpec,
) -> Result<(Vec<NodeKind>, Box<dyn RuleHandler>), RegistryError> {
    let compiled: (Vec<NodeKind>, Box<dyn RuleHandler>) = match spec.kind.as_str() {
        "forbidden-call" => (
            vec![NodeKind::CallExpr],
            Box::new(ForbiddenCallHandler { names: name_set(spec, &spec.params.names)? }),
        ),

        "null-comparison" => (vec![NodeKind::BinaryExpr], Box::new(NullComparisonHandler)),

        "string-identity-comparison" => {
            (vec![NodeKind::BinaryExpr], Box::new(StringIdentityHandler))
        }

        "disallowed-type-instantiation" => (
            vec![NodeKind::NewExpr],
            Box::new(DisallowedNewHandler { types: name_set(spec, &spec.params.types)? }),
        ),

        "empty-handler" => (vec![NodeKind::CatchClause], Box::new(EmptyCatchHandler)),

        "generic-exception-catch" => {
            let types = if spec.params.types.is_empty() {
                ["Exception", "Throwable"].iter().map(|s| s.to_string()).collect()
            } else {
                spec.params.types.iter().cloned().collect()
            };
            (vec![NodeKind::CatchClause], Box::new(GenericCatchHandler { types }))
        }

        "nesting-depth" => (
            vec![NodeKind::IfStmt, NodeKind::ForStmt, NodeKind::WhileStmt],
            Box::new(NestingDepthHandler {
                threshold: spec.params.threshold.unwrap_or(DEFAULT_NESTING_THRESHOLD),
            }),
        ),

        "naming-convention" => {
            let pattern = match &spec.params.pattern {
                Some(p) => Regex::new(p).map_err(|e| RegistryError::InvalidParams {
                    id: spec.id.clone(),
                    reason: format!("bad casing pattern: {e}"),
                })?,
                None => CAMEL_CASE.clone(),
            };
            (
                vec![NodeKind::VarDecl, NodeKind::FieldDecl, NodeKind::ParamDecl],
                Box::new(NamingConventionHandler { pattern }),
            )
        }

        "mutable-static-field" => (vec![NodeKind::FieldDecl], Box::new(MutableStaticHandler)),

        "constructor-side-effect" => (vec![NodeKind::CallExpr], Box::new(CtorCallHandler)),

        other => {
            return Err(RegistryError::UnknownRuleKind {
                id: spec.id.clone(),
                kind: other.to_string(),
            })
        }
    };
    Ok(compiled)
}

fn name_set(spec: &RuleSpec, values: &[String]) -> Result<HashSet<String>, RegistryError> {
    if values.is_empty() {
        return Err(RegistryError::InvalidParams {
            id: spec.id.clone(),
            reason: "at least one name is required".to_string(),
        });
    }
    Ok(values.iter().cloned().collect())
}

/// Built-in catalogue generalized from the JAVA-0xx style rules this detector
/// grew up with.
pub fn default_rules() -> RuleSetConfig {
    fn spec(id: &str, kind: &str, severity: Severity, message: &str, params: RuleParams) -> RuleSpec {
        RuleSpec {
            id: id.to_string(),
            kind: kind.to_string(),
            enabled: true,
            severity,
            message: message.to_string(),
            params,
        }
    }
    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    RuleSetConfig {
        rules: vec![
            spec(
                "JAVA-001",
                "forbidden-call",
                Severity::Warning,
                "Avoid direct console output",
                RuleParams { names: strings(&["println", "print", "printStackTrace"]), ..RuleParams::default() },
            ),
            spec(
                "JAVA-002",
                "null-comparison",
                Severity::Warning,
                "Avoid comparing against null with == or !=",
                RuleParams::default(),
            ),
            spec(
                "JAVA-003",
                "naming-convention",
                Severity::Info,
                "Identifier should be camelCase",
                RuleParams::default(),
            ),
            spec(
                "JAVA-004",
                "generic-exception-catch",
                Severity::Warning,
                "Catch a specific exception type",
                RuleParams::default(),
            ),
            spec(
                "JAVA-005",
                "nesting-depth",
                Severity::Warning,
                "Deeply nested code",
                RuleParams { threshold: Some(DEFAULT_NESTING_THRESHOLD), ..RuleParams::default() },
            ),
            spec(
                "JAVA-006",
                "disallowed-type-instantiation",
                Severity::Warning,
                "Avoid legacy collection types",
                RuleParams { types: strings(&["Vector", "Hashtable", "Stack"]), ..RuleParams::default() },
            ),
            spec(
                "JAVA-007",
                "constructor-side-effect",
                Severity::Warning,
                "Avoid logic in constructors",
                RuleParams::default(),
            ),
            spec(
                "JAVA-008",
                "empty-handler",
                Severity::Error,
                "Empty exception handler swallows errors",
                RuleParams::default(),
            ),
            spec(
                "JAVA-009",
                "string-identity-comparison",
                Severity::Warning,
                "Use equals() for string comparison",
                RuleParams::default(),
            ),
            spec(
                "JAVA-010",
                "mutable-static-field",
                Severity::Warning,
                "Avoid mutable static fields",
                RuleParams::default(),
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_build() {
        let registry = default_rules().build_registry().unwrap();
        assert_eq!(registry.len(), 10);
        let ids: Vec<_> = registry.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids[0], "JAVA-001");
        assert_eq!(ids[9], "JAVA-010");
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
rules:
  - id: CHK-001
    kind: forbidden-call
    severity: error
    message: no printing
    params:
      names: [print]
  - id: CHK-002
    kind: nesting-depth
    enabled: false
    message: too deep
    params:
      threshold: 2
"#;
        let config = RuleSetConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].severity, Severity::Error);
        assert!(config.rules[0].enabled);
        assert!(!config.rules[1].enabled);
        assert_eq!(config.rules[1].params.threshold, Some(2));

        // disabled rules are absent from dispatch entirely
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all()[0].id, "CHK-001");
    }

    #[test]
    fn test_duplicate_id_fails_fast() {
        let mut config = default_rules();
        let mut dup = config.rules[0].clone();
        dup.kind = "null-comparison".to_string();
        config.rules.push(dup);

        let err = config.build_registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registry(RegistryError::DuplicateRuleId(ref id)) if id.as_str() == "JAVA-001"
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let config = RuleSetConfig {
            rules: vec![RuleSpec {
                id: "CHK-001".to_string(),
                kind: "telepathy".to_string(),
                enabled: true,
                severity: Severity::Warning,
                message: "nope".to_string(),
                params: RuleParams::default(),
            }],
        };
        let err = config.build_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::UnknownRuleKind { .. })));
    }

    #[test]
    fn test_forbidden_call_requires_names() {
        let config = RuleSetConfig {
            rules: vec![RuleSpec {
                id: "CHK-001".to_string(),
                kind: "forbidden-call".to_string(),
                enabled: true,
                severity: Severity::Warning,
                message: "no calls".to_string(),
                params: RuleParams::default(),
            }],
        };
        let err = config.build_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::InvalidParams { .. })));
    }

    #[test]
    fn test_bad_casing_pattern_rejected() {
        let config = RuleSetConfig {
            rules: vec![RuleSpec {
                id: "CHK-001".to_string(),
                kind: "naming-convention".to_string(),
                enabled: true,
                severity: Severity::Info,
                message: "casing".to_string(),
                params: RuleParams { pattern: Some("[unclosed".to_string()), ..RuleParams::default() },
            }],
        };
        let err = config.build_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::InvalidParams { .. })));
    }
}
