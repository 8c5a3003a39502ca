//! Config validation: identifiers, references and feature combinations.

use crate::config::{PickerConfig, ResourceSettings};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("identifier regex"))
}

/// Type names are spliced into `::type` casts, so only plain names, schema-qualified names,
/// spaces, one parenthesized modifier and an array suffix are accepted.
fn type_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_ .]*(\([0-9, ]+\))?[A-Za-z ]*(\[\])?$").expect("type name regex")
    })
}

fn check_identifier(kind: &str, owner: &str, name: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{}: invalid {} name '{}'",
            owner, kind, name
        )))
    }
}

fn check_type(owner: &str, column: &str, type_name: &str) -> Result<(), ConfigError> {
    if type_name_re().is_match(type_name) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{}: column {} has unsupported type '{}'",
            owner, column, type_name
        )))
    }
}

pub fn validate(config: &PickerConfig) -> Result<(), ConfigError> {
    for (name, template) in &config.templates {
        handlebars::Template::compile(template)
            .map_err(|e| ConfigError::Validation(format!("template {}: {}", name, e)))?;
    }

    let mut controllers = HashSet::new();
    for r in &config.resources {
        if r.controller.trim().is_empty() || r.controller.starts_with('/') || r.controller.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "invalid controller path '{}'",
                r.controller
            )));
        }
        if !controllers.insert(r.controller.as_str()) {
            return Err(ConfigError::DuplicateController(r.controller.clone()));
        }
        validate_resource(config, r)?;
    }
    Ok(())
}

fn validate_resource(config: &PickerConfig, r: &ResourceSettings) -> Result<(), ConfigError> {
    let owner = r.controller.as_str();
    check_identifier("schema", owner, &r.schema)?;
    check_identifier("table", owner, &r.table)?;
    check_identifier("primary key", owner, &r.primary_key)?;

    for c in &r.columns {
        check_identifier("column", owner, &c.name)?;
        check_type(owner, &c.name, &c.type_)?;
    }
    if !r.columns.is_empty() && !r.columns.iter().any(|c| c.name == r.primary_key) {
        return Err(ConfigError::InvalidPrimaryKey {
            controller: r.controller.clone(),
            column: r.primary_key.clone(),
        });
    }

    if r.per_page == Some(0) {
        return Err(ConfigError::Validation(format!("{}: per_page must be greater than 0", owner)));
    }
    if r.search_on.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(format!("{}: empty search_on expression", owner)));
    }
    if r.group_by.is_some() && r.select.is_none() {
        return Err(ConfigError::Validation(format!(
            "{}: group_by requires a select projection",
            owner
        )));
    }
    if r.group_by.is_some() && !(r.include.is_empty() && r.user_includes.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{}: group_by cannot be combined with eager-loaded includes",
            owner
        )));
    }

    let mut association_names = HashSet::new();
    for a in &r.associations {
        check_identifier("association", owner, &a.name)?;
        check_identifier("schema", owner, &a.schema)?;
        check_identifier("table", owner, &a.table)?;
        check_identifier("key", owner, &a.our_key)?;
        check_identifier("key", owner, &a.their_key)?;
        for c in &a.columns {
            check_identifier("column", owner, &c.name)?;
            check_type(owner, &c.name, &c.type_)?;
        }
        if a.name == r.table {
            return Err(ConfigError::Validation(format!(
                "{}: association {} collides with the main table alias",
                owner, a.name
            )));
        }
        if !association_names.insert(a.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: duplicate association {}",
                owner, a.name
            )));
        }
    }
    for name in r
        .include
        .iter()
        .chain(&r.joins)
        .chain(&r.left_joins)
        .chain(&r.user_includes)
    {
        if !association_names.contains(name.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "association",
                id: format!("{}.{}", owner, name),
            });
        }
    }

    if let Some(crate::config::LabelConfig::Template { template }) = &r.label {
        if !config.templates.contains_key(template) {
            return Err(ConfigError::MissingReference {
                kind: "template",
                id: template.clone(),
            });
        }
    }
    Ok(())
}
