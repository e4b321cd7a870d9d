//! Template lookup by owner type.
//!
//! Each type in an owner's ancestor chain maps to one candidate file:
//! `Sales::LeadAgent` with extension `md` becomes `sales/lead_agent.md` under
//! the template root. Candidates are tried most specific first, so a general
//! template serves every subtype until a subtype adds its own.

use crate::config::Config;
use crate::error::{AgentryError, Result};
use crate::owner::PromptSource;
use std::fs;
use std::path::{Path, PathBuf};

/// Path-addressable text store holding templates.
pub trait TemplateMedium {
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// Templates read from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryMedium;

impl TemplateMedium for DirectoryMedium {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| {
            AgentryError::RenderError(format!(
                "failed to read template '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// A template located for a prompt source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub path: PathBuf,
    pub text: String,
}

/// Maps prompt sources to template files.
pub struct TemplateResolver {
    root: PathBuf,
    extension: String,
    medium: Box<dyn TemplateMedium>,
}

impl TemplateResolver {
    pub fn new(
        root: impl Into<PathBuf>,
        extension: impl Into<String>,
        medium: Box<dyn TemplateMedium>,
    ) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            medium,
        }
    }

    /// Filesystem resolver rooted at the configured template directory.
    pub fn from_config(config: &Config, state_dir: &Path) -> Self {
        Self::new(
            config.template_root(state_dir),
            config.template_extension.clone(),
            Box::new(DirectoryMedium),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths for `source`, most specific first.
    pub fn candidates(&self, source: &dyn PromptSource) -> Vec<PathBuf> {
        source
            .ancestor_chain()
            .iter()
            .map(|type_name| self.path_for_type(type_name))
            .collect()
    }

    /// Candidate paths paired with whether each exists.
    pub fn inspect(&self, source: &dyn PromptSource) -> Vec<(PathBuf, bool)> {
        self.candidates(source)
            .into_iter()
            .map(|path| {
                let exists = self.medium.exists(&path);
                (path, exists)
            })
            .collect()
    }

    /// The first existing candidate.
    pub fn resolve(&self, source: &dyn PromptSource) -> Result<PathBuf> {
        let checked = self.candidates(source);

        if let Some(found) = checked.iter().find(|path| self.medium.exists(path)) {
            tracing::debug!(owner_type = source.type_name(), template = %found.display(), "template resolved");
            return Ok(found.clone());
        }

        Err(AgentryError::TemplateNotFound {
            owner_type: source.type_name().to_string(),
            checked,
        })
    }

    /// Resolve and read the template for `source`.
    pub fn load(&self, source: &dyn PromptSource) -> Result<ResolvedTemplate> {
        let path = self.resolve(source)?;
        let text = self.medium.read_to_string(&path)?;
        Ok(ResolvedTemplate { path, text })
    }

    /// Template path for a single type name.
    pub fn path_for_type(&self, type_name: &str) -> PathBuf {
        let mut path = self.root.join(underscore(type_name));
        path.set_extension(&self.extension);
        path
    }
}

/// Convert a type name to its file path form.
///
/// `ApplicationAgent` → `application_agent`, `HTTPAgent` → `http_agent`,
/// `Sales::LeadAgent` → `sales/lead_agent`.
pub fn underscore(type_name: &str) -> String {
    type_name
        .split("::")
        .map(underscore_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn underscore_segment(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}
