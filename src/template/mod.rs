/// Manifest template rendering
///
/// Templates are multi-document YAML with `${NAME}` placeholders.
/// Substitution is a single, non-recursive pass: placeholders without a
/// matching variable are left verbatim, and substituted values are never
/// re-expanded even if they contain placeholder syntax.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::k8s::ResourceKind;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// One parsed document out of a rendered template, in document order.
/// `name` stays `None` for documents without `metadata.name`; such a
/// document only becomes an error at the point it is needed.
#[derive(Debug, Clone)]
pub struct RenderedResource {
    pub kind: ResourceKind,
    pub name: Option<String>,
    pub manifest: serde_yaml::Value,
}

/// Substitute variables into the template text
pub fn substitute(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render a template into typed resource descriptors. Null and empty
/// documents are skipped silently; unparseable output is fatal.
pub fn render(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<Vec<RenderedResource>> {
    let manifest = substitute(template, variables);

    let mut resources = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&manifest) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| Error::Render(e.to_string()))?;
        if value.is_null() {
            continue;
        }

        let kind = value
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .map(ResourceKind::from_kind_field)
            .unwrap_or(ResourceKind::Other);
        let name = value
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(serde_yaml::Value::as_str)
            .map(str::to_string);

        resources.push(RenderedResource {
            kind,
            name,
            manifest: value,
        });
    }

    Ok(resources)
}
