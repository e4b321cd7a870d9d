//! System prompt construction.
//!
//! - [`resolver`] finds the most specific template for an owner's type chain.
//! - [`template`] substitutes owner fields into the template text.

pub mod resolver;
pub mod template;

pub use resolver::{DirectoryMedium, ResolvedTemplate, TemplateMedium, TemplateResolver, underscore};
pub use template::{TemplateError, render_template};

use crate::error::{AgentryError, Result};
use crate::owner::PromptSource;
use std::path::PathBuf;

/// A rendered system prompt and the template it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    pub template_path: PathBuf,
    pub text: String,
}

/// Render `template` against the fields of `source`.
pub fn render_prompt(template: &str, source: &dyn PromptSource) -> Result<String> {
    render_template(template, source.fields()).map_err(|e| {
        AgentryError::RenderError(format!("{} template: {}", source.type_name(), e))
    })
}

/// Resolve, load and render the system prompt for `source`.
pub fn build_system_prompt(
    resolver: &TemplateResolver,
    source: &dyn PromptSource,
) -> Result<SystemPrompt> {
    let template = resolver.load(source)?;
    let text = render_prompt(&template.text, source)?;
    Ok(SystemPrompt {
        template_path: template.path,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryMedium, chain_source};
    use serde_json::json;

    #[test]
    fn test_build_system_prompt() {
        let medium = MemoryMedium::default().with(
            "/prompts/application_agent.md",
            "You are {role}. Goal: {goal}. {owner.backstory}",
        );
        let resolver = TemplateResolver::new("/prompts", "md", Box::new(medium));
        let source = chain_source(&["ApplicationAgent"])
            .with_field("role", json!("Assistant"))
            .with_field("goal", json!("Help users"))
            .with_field("backstory", json!("AI assistant"));

        let prompt = build_system_prompt(&resolver, &source).unwrap();
        assert_eq!(prompt.template_path, PathBuf::from("/prompts/application_agent.md"));
        assert_eq!(prompt.text, "You are Assistant. Goal: Help users. AI assistant");
    }

    #[test]
    fn test_render_errors_name_the_type() {
        let source = chain_source(&["LeadAgent"]);
        let err = render_prompt("Hello {territory}", &source).unwrap_err();

        assert!(matches!(err, AgentryError::RenderError(_)));
        assert_eq!(
            err.to_string(),
            "Prompt rendering failed: LeadAgent template: undefined variable 'territory' at position 6 in template"
        );
    }
}
