//! Template engine collaborator.
//!
//! Content types carry two templates: a title template producing each item's
//! computed display name and a body template producing the rendered HTML. Both
//! are rendered against the merged data tree assembled by the content
//! [`Renderer`](crate::content::Renderer).
//!
//! # Template Syntax
//!
//! Templates use Tera syntax, which is a superset of the mustache variable
//! form used by most content types:
//!
//! ```text
//! <h2>{{ name }}</h2>
//! <p>Welcome to {{ site.fullname }}</p>
//! {% for row in userlist %}<li>{{ row.name }}</li>{% endfor %}
//! ```
//!
//! Interpolated values are HTML-escaped. Includes and inheritance are not
//! available: every render compiles a standalone one-off template.
//!
//! # Errors
//!
//! Rendering failures are [`TemplateError`]s carrying the type name, the template
//! kind, the offending line and, for unknown variables, close matches from the
//! data tree.

pub mod error;
pub mod renderer;
pub mod variables;


pub use error::{ErrorLocation, TemplateError, TemplateKind};
pub use renderer::{RenderingMetadata, TemplateEngine, TeraEngine};
pub use variables::flatten;
