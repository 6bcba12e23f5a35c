//! Instrumentation shim injected into every preview document.
//!
//! The shim is JavaScript. It runs inside the preview before user code,
//! replaces the console methods of [`ConsoleMethod::ALL`], installs the global
//! error handler, and sends [`RelayMessage`](codepane_protocol::RelayMessage)s
//! to `window.parent` (and optionally to a WebSocket relay).

use codepane_protocol::ConsoleMethod;

use crate::context::ContextId;

const PREAMBLE_TEMPLATE: &str = include_str!("preamble.js");

/// Name of the value caught by the failure boundary around user code.
const CAUGHT: &str = "__codepaneCaught";

/// Lines of the user script element that precede the user's first line.
pub const USER_LINE_OFFSET: u32 = 1;

/// Name user code is evaluated under, so stack frames can be told apart.
pub const USER_SCRIPT_URL: &str = "user-code.js";

/// File names stack frames give user code: the script URL in a browser, and
/// the name QuickJS gives code run through indirect `eval`.
const USER_FILES: [&str; 2] = [USER_SCRIPT_URL, "<input>"];

/// A WebSocket endpoint the shim also forwards messages to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    /// `ws://host:port`
    pub endpoint: String,
    pub context: ContextId,
}

impl RelayTarget {
    pub fn new(endpoint: impl Into<String>, context: ContextId) -> Self {
        Self {
            endpoint: endpoint.into(),
            context,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/relay/{}", self.endpoint.trim_end_matches('/'), self.context)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShimOptions {
    pub relay: Option<RelayTarget>,
}

/// The script that must run before any user code.
pub fn preamble(options: &ShimOptions) -> String {
    let methods: Vec<&str> = ConsoleMethod::ALL.iter().map(|m| m.as_str()).collect();
    let relay = options.relay.as_ref().map(RelayTarget::url);
    PREAMBLE_TEMPLATE
        .replace("/*@methods@*/", &js_literal(&methods))
        .replace("/*@relay@*/", &js_literal(&relay))
        .replace("/*@line_offset@*/", &USER_LINE_OFFSET.to_string())
        .replace("/*@user_files@*/", &js_literal(&USER_FILES))
}

/// Opens the failure boundary; user code follows on the next line.
pub fn boundary_open() -> &'static str {
    "try {\n"
}

/// Closes the failure boundary and reports whatever it caught.
pub fn boundary_close() -> String {
    format!("\n}} catch ({CAUGHT}) {{\n    window.__codepane.reportCaught({CAUGHT});\n}}\n//# sourceURL={USER_SCRIPT_URL}\n")
}

/// JSON is valid JavaScript for the values spliced into the template.
fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_lists_each_method_once() {
        let script = preamble(&ShimOptions::default());
        assert!(script.contains(r#"var METHODS = ["log","warn","error","info","debug"];"#));
        assert!(script.contains("var RELAY_URL = null;"));
        assert!(script.contains("var USER_LINE_OFFSET = 1;"));
        assert!(script.contains(r#"var USER_FILES = ["user-code.js","<input>"];"#));
        assert!(!script.contains("/*@"));
    }

    #[test]
    fn relay_target_url() {
        let context = ContextId::new();
        let options = ShimOptions {
            relay: Some(RelayTarget::new("ws://127.0.0.1:9333/", context)),
        };
        let url = format!("ws://127.0.0.1:9333/relay/{context}");
        assert_eq!(options.relay.as_ref().unwrap().url(), url);
        assert!(preamble(&options).contains(&format!("var RELAY_URL = \"{url}\";")));
    }

    #[test]
    fn boundary_wraps_one_block() {
        let wrapped = format!("{}{}{}", boundary_open(), "throw 1;", boundary_close());
        assert_eq!(wrapped.matches('{').count(), wrapped.matches('}').count());
        assert_eq!(wrapped.lines().nth(USER_LINE_OFFSET as usize), Some("throw 1;"));
    }
}
