// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-facing copy for every handoff outcome.
//!
//! Each trigger reason carries one [`MessageTemplates`] value with the same
//! set of slots, so the shared flow never branches on the reason to pick
//! text. [`DECLINE`] sits outside the sets: only an explicit request
//! (keyword or button) is ever declined, the confidence path stays silent
//! when handoff is off.

/// One set of replies, a slot per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplates {
    /// Outside business hours.
    pub offline: &'static str,
    /// No agents online at all.
    pub unavailable: &'static str,
    /// The handoff failed internally.
    pub technical_error: &'static str,
    /// Routed straight back to the previous agent.
    pub direct_assignment: &'static str,
    /// Placed in the queue. `{position}` and `{wait}` are substituted.
    pub queued: &'static str,
    /// Already talking to an agent.
    pub already_connected: &'static str,
}

/// Reply to an explicit request when handoff is switched off for the tenant.
pub const DECLINE: &str = "I understand you'd like to speak with a person. Live support \
                           isn't available here, but I'm happy to keep helping you.";

impl MessageTemplates {
    pub fn render_queued(&self, position: u32, wait: &str) -> String {
        self.queued
            .replace("{position}", &position.to_string())
            .replace("{wait}", wait)
    }
}

/// Used when the customer asked for a person, by keyword or button.
pub const KEYWORD: MessageTemplates = MessageTemplates {
    offline: "Our support team is offline right now. I'll keep helping you here, \
              and you can reach a person again during business hours.",
    unavailable: "No one from our support team is available at the moment. \
                  I'll keep helping you here in the meantime.",
    technical_error: "Sorry, I couldn't connect you with our support team because of a \
                      technical problem. Please try again in a moment.",
    direct_assignment: "Reconnecting you with the agent who helped you before. \
                        They'll be with you in less than a minute.",
    queued: "I'm connecting you with a member of our support team. You're number \
             {position} in line, estimated wait: {wait}.",
    already_connected: "You're already connected with a member of our support team.",
};

/// Used when the answer retrieval came back with weak matches.
pub const LOW_CONFIDENCE: MessageTemplates = MessageTemplates {
    offline: "I'm not confident I have the right answer for that, and our support \
              team is offline right now. Please reach out again during business hours.",
    unavailable: "I'm not confident I have the right answer for that, and no one from \
                  our support team is available at the moment.",
    technical_error: "I'm not confident I have the right answer for that, and I couldn't \
                      bring in our support team because of a technical problem.",
    direct_assignment: "I'm not confident I have the right answer for that, so I'm \
                        bringing back the agent who helped you before.",
    queued: "I'm not confident I have the right answer for that, so I'm bringing in a \
             member of our support team. You're number {position} in line, estimated \
             wait: {wait}.",
    already_connected: "A member of our support team is already with you in this conversation.",
};

/// Human-readable wait estimate for a queue position.
///
/// One minute per position ahead. A heuristic, not a measured SLA.
pub fn estimated_wait(position: u32) -> String {
    if position <= 1 {
        "less than a minute".to_string()
    } else {
        format!("about {position} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_estimate_wording() {
        assert_eq!(estimated_wait(1), "less than a minute");
        assert_eq!(estimated_wait(4), "about 4 minutes");
    }

    #[test]
    fn queued_placeholders_are_filled() {
        for templates in [KEYWORD, LOW_CONFIDENCE] {
            let text = templates.render_queued(3, "about 3 minutes");
            assert!(text.contains("number 3 in line"));
            assert!(text.contains("about 3 minutes"));
            assert!(!text.contains('{'));
        }
    }

    #[test]
    fn variants_differ_in_copy() {
        assert_ne!(KEYWORD.offline, LOW_CONFIDENCE.offline);
        assert_ne!(KEYWORD.queued, LOW_CONFIDENCE.queued);
    }
}
