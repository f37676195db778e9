//! Markdown rendering of property documentation

use crate::docmodel::Span;
use crate::index::PropertyInfo;
use crate::schema::{Deprecation, TypedProperty};

/// Renderable hover content anchored to the key it documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverDoc {
    pub markdown: String,
    pub span: Span,
}

pub fn render_property_info(info: &PropertyInfo) -> String {
    let mut out = format!("**`{}`**\n\n`{}`", info.id, info.type_name);
    if let Some(default) = &info.default_value {
        out.push_str(&format!("\n\nDefault: `{}`", render_default(default)));
    }
    if let Some(description) = &info.description {
        out.push_str("\n\n");
        out.push_str(description);
    }
    if let Some(dep) = &info.deprecation {
        out.push_str(&render_deprecation(dep));
    }
    out
}

pub fn render_typed_property(owner: &str, prop: &TypedProperty) -> String {
    let mut out = format!(
        "**`{}`**\n\n`{}` property of `{}`",
        prop.name,
        prop.ty.type_name(),
        owner
    );
    if let Some(description) = &prop.description {
        out.push_str("\n\n");
        out.push_str(description);
    }
    if let Some(dep) = &prop.deprecation {
        out.push_str(&render_deprecation(dep));
    }
    out
}

fn render_deprecation(dep: &Deprecation) -> String {
    let mut out = format!("\n\n**Deprecated** ({})", dep.level);
    if let Some(replacement) = &dep.replacement {
        out.push_str(&format!(" → `{}`", replacement));
    }
    if let Some(reason) = &dep.reason {
        out.push_str(&format!(": {}", reason));
    }
    out
}

fn render_default(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeprecationLevel;

    #[test]
    fn test_render_property_info() {
        let info = PropertyInfo::new("server.port", "port")
            .with_description("Port the server listens on.")
            .with_default(serde_json::json!(8080));
        let md = render_property_info(&info);
        assert!(md.contains("`server.port`"));
        assert!(md.contains("Default: `8080`"));
        assert!(md.contains("Port the server listens on."));
    }

    #[test]
    fn test_render_deprecation_arrow() {
        let info = PropertyInfo::new("logging.level", "string").with_deprecation(Deprecation {
            level: DeprecationLevel::Warning,
            reason: None,
            replacement: Some("logging.level.root".to_string()),
        });
        let md = render_property_info(&info);
        assert!(md.contains("**Deprecated** (warning) → `logging.level.root`"));
    }
}
