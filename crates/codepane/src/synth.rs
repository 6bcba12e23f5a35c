//! Assembles the preview document from the three buffers.
//!
//! Output is a pure function of the input. Nothing is sanitized: the author
//! previews their own code.

use std::fmt;

use crate::shim::{self, ShimOptions};
use crate::source::SourceSet;

pub const TITLE: &str = "Preview";

/// A self-contained preview document, kept in sections so contexts that do
/// not parse HTML can still run its scripts in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    css: String,
    html: String,
    preamble: String,
    user_script: String,
}

impl Document {
    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// The shim, run before user code.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// User JavaScript exactly as authored.
    pub fn user_script(&self) -> &str {
        &self.user_script
    }

    /// User JavaScript inside the failure boundary, as the second script
    /// element carries it.
    pub fn boundary_script(&self) -> String {
        format!("{}{}{}", shim::boundary_open(), self.user_script, shim::boundary_close())
    }

    /// Scripts in execution order.
    pub fn scripts(&self) -> [String; 2] {
        [self.preamble.clone(), self.boundary_script()]
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html>")?;
        writeln!(f, "<head>")?;
        writeln!(f, "<meta charset=\"utf-8\">")?;
        writeln!(f, "<title>{TITLE}</title>")?;
        writeln!(f, "<style>\n{}\n</style>", self.css)?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, "{}", self.html)?;
        // Separate elements: a syntax error in user code must not take the
        // shim down with it.
        writeln!(f, "<script>\n{}</script>", self.preamble)?;
        // Browsers count script lines from the opening tag, so the boundary
        // starts on that line for user line numbers to shift by exactly
        // `USER_LINE_OFFSET`.
        writeln!(f, "<script>{}</script>", self.boundary_script())?;
        writeln!(f, "</body>")?;
        writeln!(f, "</html>")
    }
}

pub fn synthesize(source: &SourceSet) -> Document {
    synthesize_with(source, &ShimOptions::default())
}

pub fn synthesize_with(source: &SourceSet, options: &ShimOptions) -> Document {
    Document {
        css: source.css.clone(),
        html: source.html.clone(),
        preamble: shim::preamble(options),
        user_script: source.js.clone(),
    }
}
