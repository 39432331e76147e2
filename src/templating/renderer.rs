//! Template rendering engine with Tera.
//!
//! This module provides the [`TemplateEngine`] seam the content renderer talks
//! to, and [`TeraEngine`], the implementation wired in by default. Failures are
//! parsed into structured [`TemplateError`]s with line context and variable
//! suggestions.

use regex::Regex;
use serde_json::Value;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::{ErrorLocation, TemplateError, TemplateKind};
use super::variables::flatten;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
/// This represents a 50% similarity threshold for variable name suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Context information about the current rendering operation
#[derive(Debug, Clone)]
pub struct RenderingMetadata {
    /// Name of the content type whose template is rendered
    pub content_type: String,
    pub template: TemplateKind,
    /// Content item being rendered; `None` for previews
    pub content_id: Option<i64>,
}

/// Renders a template string against a data tree.
///
/// Implementations must be pure: the same template and data always produce the
/// same output, and rendering has no side effects. Nested fields are addressed
/// with dotted paths (`{{ site.fullname }}`).
pub trait TemplateEngine: Send + Sync {
    fn render(
        &self,
        template: &str,
        data: &Value,
        metadata: &RenderingMetadata,
    ) -> Result<String, TemplateError>;
}

/// Template engine backed by Tera one-off templates.
///
/// A fresh template is compiled per render; nothing is registered globally,
/// so templates cannot include or extend each other.
#[derive(Debug, Clone)]
pub struct TeraEngine {
    /// HTML-escape interpolated values (mustache semantics)
    autoescape: bool,
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TeraEngine {
    pub fn new(autoescape: bool) -> Self {
        Self {
            autoescape,
        }
    }

    /// Parse a Tera error into a structured TemplateError
    fn parse_tera_error(
        error: &tera::Error,
        template_content: &str,
        data: &Value,
        metadata: &RenderingMetadata,
    ) -> TemplateError {
        let line_number = Self::extract_line_from_tera_error(error);

        let context_lines = line_number
            .map(|line| Self::extract_context_lines(template_content, line, 2))
            .filter(|lines| !lines.is_empty());

        let location = Box::new(ErrorLocation {
            content_type: metadata.content_type.clone(),
            template: metadata.template,
            content_id: metadata.content_id,
            line_number,
            context_lines,
        });

        let message = Self::format_tera_error(error);
        if message.contains("Variable") && message.contains("not found") {
            if let Some(name) = Self::extract_variable_name(&message) {
                let available_variables: Vec<String> =
                    flatten(data).into_iter().map(|(path, _)| path).collect();
                let suggestions = Self::find_similar_variables(&name, &available_variables);
                return TemplateError::VariableNotFound {
                    variable: name,
                    available_variables: Box::new(available_variables),
                    suggestions: Box::new(suggestions),
                    location,
                };
            }
        }

        TemplateError::SyntaxError {
            message,
            location,
        }
    }

    /// Extract variable name from "Variable `foo` not found" message
    fn extract_variable_name(error_msg: &str) -> Option<String> {
        let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
        re.captures(error_msg).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
    }

    /// Find similar variable names using Levenshtein distance
    fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
        let mut scored: Vec<_> = available
            .iter()
            .map(|var| {
                let distance = levenshtein(target, var);
                (var.clone(), distance)
            })
            .collect();

        scored.sort_by_key(|(_, dist)| *dist);

        // Return top 3 suggestions within reasonable distance
        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(var, _)| var)
            .collect()
    }

    /// Extract context lines around an error location
    ///
    /// Returns up to `context_size` lines before and after the error line,
    /// along with their line numbers (1-indexed).
    fn extract_context_lines(
        content: &str,
        error_line: usize,
        context_size: usize,
    ) -> Vec<(usize, String)> {
        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();

        // Tera uses 1-indexed line numbers
        if error_line == 0 || error_line > total_lines {
            return Vec::new();
        }

        let start = error_line.saturating_sub(context_size + 1);
        let end = (error_line + context_size).min(total_lines);

        lines[start..end]
            .iter()
            .enumerate()
            .map(|(idx, line)| (start + idx + 1, line.to_string()))
            .collect()
    }

    /// Extract line number from Tera error message
    ///
    /// Tera includes line:column information in parse error messages.
    /// Examples: "1:7", "15:23", "864:1"
    fn extract_line_from_tera_error(error: &tera::Error) -> Option<usize> {
        let error_msg = format!("{:?}", error);

        let re = Regex::new(r"(\d+):(\d+)").ok()?;
        re.captures(&error_msg)
            .and_then(|caps| caps.get(1))
            .and_then(|line| line.as_str().parse::<usize>().ok())
    }

    /// Format a Tera error, walking the source chain and hiding the internal
    /// one-off template name.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut all_messages = vec![error.to_string()];
        let mut current_error: Option<&dyn Error> = error.source();
        while let Some(err) = current_error {
            all_messages.push(err.to_string());
            current_error = err.source();
        }

        let messages: Vec<String> = all_messages
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                    .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|cleaned| {
                !cleaned.is_empty()
                    && cleaned != "Template rendering failed"
                    && cleaned != "Template syntax error"
            })
            .collect();

        if messages.is_empty() {
            "Template syntax error (see details above)".to_string()
        } else {
            messages.join("\n  -> ")
        }
    }
}

impl TemplateEngine for TeraEngine {
    fn render(
        &self,
        template: &str,
        data: &Value,
        metadata: &RenderingMetadata,
    ) -> Result<String, TemplateError> {
        tracing::debug!(
            content_type = %metadata.content_type,
            template = %metadata.template,
            "rendering template"
        );

        let context = TeraContext::from_value(data.clone()).map_err(|e| {
            TemplateError::SyntaxError {
                message: format!("Template data must be an object: {e}"),
                location: Box::new(ErrorLocation {
                    content_type: metadata.content_type.clone(),
                    template: metadata.template,
                    content_id: metadata.content_id,
                    line_number: None,
                    context_lines: None,
                }),
            }
        })?;

        Tera::one_off(template, &context, self.autoescape)
            .map_err(|e| Self::parse_tera_error(&e, template, data, metadata))
    }
}
