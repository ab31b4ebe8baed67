//! Time-slot suggestions from Gemini, with a rule-based fallback.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::{Error, Result};

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRequest {
    #[serde(alias = "packageName", default)]
    pub package_name: String,
    #[serde(alias = "packageDuration", default)]
    pub package_duration: Option<String>,
    #[serde(alias = "availableSlots", default)]
    pub available_slots: Vec<String>,
    #[serde(alias = "userNotes", default)]
    pub user_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Suggester {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl Suggester {
    pub fn new(api_key: Option<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key,
            endpoint: GEMINI_URL.to_string(),
        }
    }

    /// Always produces a suggestion; model failures use [`default_suggestion`].
    pub async fn suggest(&self, request: &SuggestionRequest) -> String {
        let Some(api_key) = &self.api_key else {
            return default_suggestion(request);
        };

        match self.generate(api_key, request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("AI suggestion failed, using fallback: {e}");
                default_suggestion(request)
            }
        }
    }

    async fn generate(&self, api_key: &str, request: &SuggestionRequest) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(request) }] }]
        });

        let response: Value = self
            .http
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Integration("model response had no text".to_string()))
    }
}

fn build_prompt(request: &SuggestionRequest) -> String {
    let duration = request.package_duration.as_deref().unwrap_or("standard");
    let notes = request
        .user_notes
        .as_deref()
        .filter(|n| !n.is_empty())
        .map(|n| format!("Customer notes: \"{n}\"\n\n"))
        .unwrap_or_default();

    format!(
        "You are an AI assistant for FPSOS, a premium PC optimization service.\n\n\
         A customer is booking a \"{package}\" session ({duration} duration).\n\n\
         Available time slots: {slots}\n\n\
         {notes}\
         Suggest the best 2 time slots for this type of technical session. Consider:\n\
         - Morning slots for complex work (when focus is highest)\n\
         - Afternoon for simpler consultations\n\
         - Give ONE brief, helpful tip about preparing for their session\n\n\
         Keep your response under 60 words. Be friendly but professional.",
        package = request.package_name,
        slots = request.available_slots.join(", "),
    )
}

fn is_morning(slot: &str) -> bool {
    slot.split(':')
        .next()
        .and_then(|h| h.trim().parse::<u32>().ok())
        .is_some_and(|h| h < 12)
}

pub fn default_suggestion(request: &SuggestionRequest) -> String {
    let slots = &request.available_slots;
    let Some(first) = slots.first() else {
        return "No slots available for this date. Try selecting another day!".to_string();
    };

    let morning: Vec<&String> = slots.iter().filter(|s| is_morning(s)).collect();
    if let [a, b, ..] = morning.as_slice() {
        return format!(
            "For a {} session, I recommend {a} or {b}. Morning sessions tend to work best \
             for technical optimizations when your system is fresh. Have TeamViewer ready!",
            request.package_name
        );
    }

    let alternative = slots
        .get(1)
        .map(|s| format!(" or {s}"))
        .unwrap_or_default();
    format!(
        "I recommend {first}{alternative} for your session. Make sure you have TeamViewer \
         or AnyDesk installed before your appointment!"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slots: &[&str]) -> SuggestionRequest {
        SuggestionRequest {
            package_name: "Full Tune-Up".to_string(),
            package_duration: Some("2h".to_string()),
            available_slots: slots.iter().map(|s| s.to_string()).collect(),
            user_notes: None,
        }
    }

    #[test]
    fn test_no_slots() {
        assert_eq!(
            default_suggestion(&request(&[])),
            "No slots available for this date. Try selecting another day!"
        );
    }

    #[test]
    fn test_prefers_two_morning_slots() {
        let text = default_suggestion(&request(&["13:00", "09:00", "10:00", "11:00"]));
        assert!(text.starts_with("For a Full Tune-Up session, I recommend 09:00 or 10:00."));
    }

    #[test]
    fn test_single_morning_slot_uses_first_two() {
        let text = default_suggestion(&request(&["14:00", "09:00", "18:00"]));
        assert!(text.starts_with("I recommend 14:00 or 09:00 for your session."));

        let single = default_suggestion(&request(&["20:00"]));
        assert!(single.starts_with("I recommend 20:00 for your session."));
    }

    #[test]
    fn test_accepts_camel_case_body() {
        let parsed: SuggestionRequest = serde_json::from_value(json!({
            "packageName": "Quick Fix",
            "availableSlots": ["10:00"]
        }))
        .unwrap();
        assert_eq!(parsed.package_name, "Quick Fix");
        assert_eq!(parsed.available_slots, vec!["10:00".to_string()]);
    }

    #[tokio::test]
    async fn test_without_key_uses_fallback() {
        let suggester = Suggester::new(None, reqwest::Client::new());
        let req = request(&["20:00"]);
        assert_eq!(suggester.suggest(&req).await, default_suggestion(&req));
    }

    #[test]
    fn test_prompt_includes_notes() {
        let mut req = request(&["10:00", "12:00"]);
        req.user_notes = Some("stutters in CS2".to_string());
        let prompt = build_prompt(&req);
        assert!(prompt.contains("Available time slots: 10:00, 12:00"));
        assert!(prompt.contains("Customer notes: \"stutters in CS2\""));
    }
}
