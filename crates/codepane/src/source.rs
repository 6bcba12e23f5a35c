//! The three editor buffers treated as one unit of state.

use serde::{Deserialize, Serialize};

const BUILTIN_HTML: &str = "<!-- Write your HTML here -->\n<h1>Hello, codepane!</h1>";
const BUILTIN_CSS: &str = "/* Write your CSS here */\nbody { font-family: sans-serif; background-color: #f0f0f0; padding: 20px; } h1 { color: #333; }";
const BUILTIN_JS: &str = "// Write your JS here\nconsole.log(\"Hello from the console!\");\n\ndocument.body.style.border = \"5px dashed purple\";";

/// Names one of the three buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Html,
    Css,
    Js,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Html, SourceKind::Css, SourceKind::Js];

    /// Starter content shown when nothing was shared or saved.
    pub fn builtin(self) -> &'static str {
        match self {
            SourceKind::Html => BUILTIN_HTML,
            SourceKind::Css => BUILTIN_CSS,
            SourceKind::Js => BUILTIN_JS,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SourceKind::Html => "html",
            SourceKind::Css => "css",
            SourceKind::Js => "js",
        })
    }
}

/// Markup, styling and script as authored by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSet {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub js: String,
}

impl SourceSet {
    pub fn new(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_HTML, BUILTIN_CSS, BUILTIN_JS)
    }

    pub fn get(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Html => &self.html,
            SourceKind::Css => &self.css,
            SourceKind::Js => &self.js,
        }
    }

    pub fn set(&mut self, kind: SourceKind, text: impl Into<String>) {
        let slot = match kind {
            SourceKind::Html => &mut self.html,
            SourceKind::Css => &mut self.css,
            SourceKind::Js => &mut self.js,
        };
        *slot = text.into();
    }
}
