//! Wire schema for messages sent out of a preview context.
//!
//! Every message is a JSON object with a mandatory `type` discriminator:
//!
//! ```json
//! {"type":"console","method":"log","args":["hi","42"]}
//! {"type":"error","message":"boom","source":"User Code","lineno":1,"colno":7,"stack":"N/A"}
//! ```
//!
//! Positions and stacks that are not known travel as the `"N/A"` sentinel,
//! which is what the in-page shim has always sent.

use serde::{Deserialize, Serialize};

/// Sentinel for an unknown line, column or stack.
pub const NOT_AVAILABLE: &str = "N/A";

/// The closed set of console methods the shim wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMethod {
    Log,
    Warn,
    Error,
    Info,
    Debug,
}

impl ConsoleMethod {
    pub const ALL: [ConsoleMethod; 5] = [
        ConsoleMethod::Log,
        ConsoleMethod::Warn,
        ConsoleMethod::Error,
        ConsoleMethod::Info,
        ConsoleMethod::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConsoleMethod::Log => "log",
            ConsoleMethod::Warn => "warn",
            ConsoleMethod::Error => "error",
            ConsoleMethod::Info => "info",
            ConsoleMethod::Debug => "debug",
        }
    }
}

impl std::fmt::Display for ConsoleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by user code inside the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "lineno", default, with = "position")]
    pub line: Option<u32>,
    #[serde(rename = "colno", default, with = "position")]
    pub column: Option<u32>,
    #[serde(default, with = "stack")]
    pub stack: Option<String>,
}

/// Message relayed from a preview context to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayMessage {
    /// A console call; `args` are already stringified by the shim.
    #[serde(rename = "console")]
    Console {
        method: ConsoleMethod,
        args: Vec<String>,
    },

    /// An uncaught or boundary-caught error.
    #[serde(rename = "error")]
    Fault(Fault),
}

impl RelayMessage {
    pub fn console(method: ConsoleMethod, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        RelayMessage::Console {
            method,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse one wire message. Unknown discriminators and malformed bodies
    /// are errors; callers that must ignore them can discard the error.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        // Plain strings, numbers and enums only: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `lineno` / `colno`: numbers, numeric strings, `"N/A"`, `null` or absent.
mod position {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_u32(*n),
            None => serializer.serialize_str(super::NOT_AVAILABLE),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            }),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

/// `stack`: text, with the sentinel meaning "none".
mod stack {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(super::NOT_AVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(s)) if s != super::NOT_AVAILABLE && !s.is_empty() => Some(s),
            _ => None,
        })
    }
}
