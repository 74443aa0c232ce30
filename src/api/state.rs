use crate::templates::TemplateRenderer;
use crate::verify::Verifier;
use std::sync::Arc;

/// Shared per-request state: the decision core plus the rendering seam.
pub struct VerifyState {
    verifier: Verifier,
    templates: Arc<dyn TemplateRenderer>,
}

impl VerifyState {
    #[must_use]
    pub fn new(verifier: Verifier, templates: Arc<dyn TemplateRenderer>) -> Self {
        Self {
            verifier,
            templates,
        }
    }

    #[must_use]
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub(crate) fn templates(&self) -> &dyn TemplateRenderer {
        self.templates.as_ref()
    }
}
