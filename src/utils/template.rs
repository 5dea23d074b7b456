/// Template rendering for release URLs, manifest paths and the operator descriptor
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

use crate::error::InstallError;

pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Strict renderer: referencing an unknown variable is an error
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String, InstallError> {
        Ok(self.registry.render_template(template, data)?)
    }

    /// Render a template file and write the result
    pub async fn render_file<T: Serialize>(
        &self,
        source: &Path,
        destination: &Path,
        data: &T,
    ) -> Result<(), InstallError> {
        let template = tokio::fs::read_to_string(source).await.map_err(|e| {
            InstallError::Config(format!("cannot read template {}: {}", source.display(), e))
        })?;
        let rendered = self.render(&template, data)?;
        tokio::fs::write(destination, rendered).await?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}
