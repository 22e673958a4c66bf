//! Platform-appropriate message formatting
//!
//! Renders notification bodies from opportunity data, honoring the
//! declared capabilities of the target platform: rich markup only where
//! supported, and bodies clamped to the platform's maximum length on a
//! character boundary.

use crate::adapter::PlatformCapabilities;
use chrono::DateTime;
use types::opportunity::Opportunity;

/// Longest description excerpt included in an alert
const DESCRIPTION_EXCERPT_CHARS: usize = 200;

/// Tags listed in an alert, at most
const MAX_TAGS: usize = 5;

/// Render an opportunity alert body
pub fn opportunity_alert(opportunity: &Opportunity, caps: &PlatformCapabilities) -> String {
    let title = emphasize(&opportunity.title, caps);
    let mut body = format!("🎓 {title}\n\n");

    if !opportunity.description.is_empty() {
        body.push_str(&format!(
            "📝 {}\n\n",
            excerpt(&opportunity.description, DESCRIPTION_EXCERPT_CHARS)
        ));
    }

    body.push_str(&format!("🏢 Organization: {}\n", opportunity.organization));

    if let Some(deadline) = opportunity.deadline.and_then(format_date) {
        body.push_str(&format!("⏰ Deadline: {deadline}\n"));
    }

    if let Some(location) = &opportunity.location {
        body.push_str(&format!("📍 Location: {location}\n"));
    }

    if let Some(url) = &opportunity.url {
        body.push_str(&format!("🔗 Learn more: {url}\n"));
    }

    if !opportunity.tags.is_empty() {
        let tags: Vec<&str> = opportunity
            .tags
            .iter()
            .take(MAX_TAGS)
            .map(String::as_str)
            .collect();
        body.push_str(&format!("🏷️ Tags: {}\n", tags.join(", ")));
    }

    clamp(body, caps.max_message_length)
}

/// Render the welcome message for a newly linked user
pub fn welcome(display_name: &str, caps: &PlatformCapabilities) -> String {
    let heading = emphasize("Welcome to EduOpportunity!", caps);
    let body = format!(
        "🎓 {heading}\n\n\
         Hello {display_name}! I'm here to help you discover educational \
         opportunities: scholarships, learning resources, events, \
         mentorships, and funding.\n\n\
         Set your preferences to receive personalized recommendations."
    );
    clamp(body, caps.max_message_length)
}

fn emphasize(text: &str, caps: &PlatformCapabilities) -> String {
    if caps.supports_rich_formatting {
        format!("*{text}*")
    } else {
        text.to_string()
    }
}

/// First `max` characters, with an ellipsis when truncated
fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

/// Clamp a body to the platform maximum on a character boundary
fn clamp(body: String, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body;
    }
    body.chars().take(max_chars).collect()
}

fn format_date(nanos: i64) -> Option<String> {
    let secs = nanos.div_euclid(1_000_000_000);
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}
