//! Grouping parameters extracted from each run's `config.xml`.
//!
//! A [`ParameterPath`] keeps the literal layout used by the grouping files:
//! the attribute name comes first, followed by the enclosing element names
//! from the innermost one out to the document root. `config/agent@density`
//! is therefore stored as `["density", "agent", "config"]`.

use crate::error::ParamError;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Name of the per-run configuration document.
pub const CONFIG_FILE: &str = "config.xml";

/// Parameter values of one run, in parameter-list order.
pub type ResolvedParams = Vec<String>;

/// Reference to one attribute of a run's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParameterPath(Vec<String>);

impl ParameterPath {
    /// Builds a path from its literal element list (attribute first).
    pub fn literal<S: Into<String>>(elements: Vec<S>) -> Result<Self, ParamError> {
        let elements: Vec<String> = elements.into_iter().map(Into::into).collect();
        if elements.is_empty() || elements.iter().any(|e| e.is_empty()) {
            return Err(ParamError::InvalidPath(elements.join(",")));
        }
        Ok(Self(elements))
    }

    /// Builds a path from element names listed outermost first, plus the attribute.
    pub fn from_elements(elements: &[&str], attribute: &str) -> Result<Self, ParamError> {
        let mut literal = Vec::with_capacity(elements.len() + 1);
        literal.push(attribute.to_string());
        literal.extend(elements.iter().rev().map(|e| e.to_string()));
        Self::literal(literal)
    }

    /// Literal element list.
    pub fn elements(&self) -> &[String] {
        &self.0
    }

    /// Name of the attribute read at the final element.
    pub fn attribute(&self) -> &str {
        &self.0[0]
    }

    /// Column label: the first two literal elements joined by `_`.
    pub fn label(&self) -> String {
        self.0.iter().take(2).map(String::as_str).collect::<Vec<_>>().join("_")
    }

    /// Canonical `outer/inner@attribute` form.
    pub fn to_canonical(&self) -> String {
        let elements: Vec<&str> = self.0[1..].iter().rev().map(String::as_str).collect();
        format!("{}@{}", elements.join("/"), self.attribute())
    }
}

impl FromStr for ParameterPath {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (elements, attribute) = s
            .trim()
            .rsplit_once('@')
            .ok_or_else(|| ParamError::InvalidPath(s.to_string()))?;

        let elements: Vec<&str> = elements.split('/').filter(|e| !e.is_empty()).collect();
        Self::from_elements(&elements, attribute).map_err(|_| ParamError::InvalidPath(s.to_string()))
    }
}

impl TryFrom<String> for ParameterPath {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParameterPath> for String {
    fn from(path: ParameterPath) -> Self {
        path.to_canonical()
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical())
    }
}

/// What to write when a run's config.xml cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingConfigPolicy {
    /// Leave the parameter columns out of the row.
    #[default]
    Omit,
    /// Write one empty field per parameter.
    Pad,
}

/// What to do when a parameter names an element or attribute a run lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParamPolicy {
    /// Write an empty field.
    #[default]
    Empty,
    /// Fail the run.
    Strict,
}

/// Location of the config document of the run whose output file is `file_name`.
///
/// Only the last extension of `file_name` is stripped.
pub fn config_path(input_dir: &Path, file_name: &str) -> PathBuf {
    let base = match file_name.rfind('.') {
        Some(pos) => &file_name[..pos],
        None => file_name,
    };
    input_dir.join(base).join(CONFIG_FILE)
}

/// Resolves parameter paths against per-run config documents.
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    input_dir: PathBuf,
    policy: MissingParamPolicy,
}

impl ParameterResolver {
    pub fn new(input_dir: impl Into<PathBuf>, policy: MissingParamPolicy) -> Self {
        Self {
            input_dir: input_dir.into(),
            policy,
        }
    }

    /// Resolve every path for the run whose output file is `file_name`.
    pub fn resolve(
        &self,
        params: &[ParameterPath],
        file_name: &str,
    ) -> Result<ResolvedParams, ParamError> {
        let path = config_path(&self.input_dir, file_name);
        debug!("Reading parameters from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| ParamError::ConfigLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let doc = Document::parse(&content).map_err(|e| ParamError::ConfigLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        self.resolve_document(&doc, params)
    }

    /// Resolve every path against an already parsed document.
    pub fn resolve_document(
        &self,
        doc: &Document<'_>,
        params: &[ParameterPath],
    ) -> Result<ResolvedParams, ParamError> {
        params
            .iter()
            .map(|param| match resolve_path(doc, param) {
                Ok(value) => Ok(value),
                Err(e) if self.policy == MissingParamPolicy::Empty => {
                    debug!("{}", e);
                    Ok(String::new())
                }
                Err(e) => Err(e),
            })
            .collect()
    }
}

/// Resolve one path.
///
/// Walks `len - 1` literal elements starting from the last one, each step
/// descending to the first child element with that name (the first step
/// starts at the document node), then reads the attribute named by the
/// first literal element.
pub fn resolve_path(doc: &Document<'_>, param: &ParameterPath) -> Result<String, ParamError> {
    let elements = param.elements();
    let mut node: Node<'_, '_> = doc.root();

    for name in elements.iter().rev().take(elements.len() - 1) {
        node = node
            .children()
            .find(|child| child.is_element() && child.has_tag_name(name.as_str()))
            .ok_or_else(|| ParamError::MissingElement {
                param: param.to_canonical(),
                element: name.clone(),
            })?;
    }

    node.attribute(param.attribute())
        .map(str::to_string)
        .ok_or_else(|| ParamError::MissingAttribute {
            param: param.to_canonical(),
            attribute: param.attribute().to_string(),
        })
}
