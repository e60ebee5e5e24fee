/// Keyword FAQ responder behind `POST /api/ai/chat`.
///
/// The message is lowercased and checked against ordered keyword groups;
/// the first group with a substring hit supplies the answer. Unmatched
/// input gets a generic overview, so the responder never fails.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_MODE: &str = "standard";

struct KeywordGroup {
    keywords: &'static [&'static str],
    answer: &'static str,
}

const GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        keywords: &["current", "currents"],
        answer: "Ocean currents are measured in knots and direction (e.g., SW 240°). I can fetch live data and summarize recent speed, direction shifts, and possible impacts on navigation.",
    },
    KeywordGroup {
        keywords: &["weather", "forecast"],
        answer: "Weather outlook: temperature, humidity, pressure, wind, and precipitation risk. I can pull current conditions and a short-term forecast for your location.",
    },
    KeywordGroup {
        keywords: &["satellite", "imagery"],
        answer: "Satellite imagery can reveal sea surface temperature, chlorophyll, and cloud cover. I can show recent tiles and interpret patterns.",
    },
    KeywordGroup {
        keywords: &["report", "incident"],
        answer: "Reports module lets communities submit observations (flooding, erosion, debris) and view summaries. I can help you file or search reports.",
    },
    KeywordGroup {
        keywords: &["analytics", "risk", "threat"],
        answer: "Analytics aggregates signals into a threat index (e.g., storm surge, erosion, navigation). I can explain the drivers and mitigation tips.",
    },
    KeywordGroup {
        keywords: &["help", "how"],
        answer: "Ask me about currents, weather, satellite data, reports, or analytics. Try: \"Show latest current speed near me\" or \"Forecast rain risk next 24h\".",
    },
];

const FALLBACK_ANSWER: &str = "I can answer questions about coastal monitoring: currents, weather, satellite imagery, community reports, and risk analytics. What would you like to explore?";

/// First matching canned answer, or the overview.
pub fn answer(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    GROUPS
        .iter()
        .find(|group| group.keywords.iter().any(|k| lower.contains(k)))
        .map(|group| group.answer)
        .unwrap_or(FALLBACK_ANSWER)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub mode: String,
    pub context: Value,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            message: String::new(),
            mode: DEFAULT_MODE.to_string(),
            context: Value::Object(Default::default()),
        }
    }
}

impl ChatRequest {
    /// Lenient extraction from a request body. Non-string messages are
    /// matched on their JSON text; anything that isn't an object yields
    /// the empty request.
    pub fn from_json(body: &Value) -> Self {
        let Some(obj) = body.as_object() else {
            return Self::default();
        };
        let message = match obj.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let mode = obj
            .get("mode")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODE)
            .to_string();
        let context = match obj.get("context") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(v) => v.clone(),
        };
        Self {
            message,
            mode,
            context,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    pub mode: String,
    pub context_echo: Value,
    pub timestamp: String,
}

pub fn respond(request: ChatRequest) -> ChatReply {
    ChatReply {
        success: true,
        message: answer(&request.message).to_string(),
        mode: request.mode,
        context_echo: request.context,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
