//! Narrow rendering seam over the out-of-scope templating layer.
//!
//! The verification flow only needs "name + model in, bytes out"; anything
//! richer belongs to whichever template engine hosts the real pages.

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;

pub const VERIFY_TOTP_TEMPLATE: &str = "verify_totp.html";

const VERIFY_TOTP_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Verify your login code</title></head>
<body>
<p class="error">{{errMsg}}</p>
<p>Enter the code shown by your authenticator app.</p>
<p>(demo only: the expected code is {{correctTotpCode}})</p>
<form action="/confirm-totp-login" method="post">
<input type="hidden" name="key" value="{{key}}">
<input type="text" name="code" autocomplete="one-time-code" autofocus>
<button type="submit">Verify</button>
</form>
</body>
</html>
"#;

/// Template rendering capability: name + model to bytes, or an error that is
/// fatal for the request.
pub trait TemplateRenderer: Send + Sync {
    /// # Errors
    /// Returns an error when the template is unknown or rendering fails.
    fn render(&self, name: &str, model: &Value) -> Result<Vec<u8>>;
}

/// Compiled-in templates with `{{field}}` substitution and HTML escaping.
/// Fields absent from the model substitute to the empty string.
pub struct StaticTemplates {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for StaticTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticTemplates {
    #[must_use]
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert(VERIFY_TOTP_TEMPLATE, VERIFY_TOTP_HTML);
        Self { templates }
    }
}

impl TemplateRenderer for StaticTemplates {
    fn render(&self, name: &str, model: &Value) -> Result<Vec<u8>> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| anyhow!("Unknown template: {name}"))?;
        Ok(substitute(template, model).into_bytes())
    }
}

fn substitute(template: &str, model: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unterminated placeholder, emit it verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        if let Some(value) = model.get(after[..end].trim()) {
            let text = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            out.push_str(&escape_html(&text));
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
