use time::macros::datetime;

use crate::domain::{Incident, Severity};

/// Starter collection shown when storage holds nothing yet.
pub fn seed_incidents() -> Vec<Incident> {
    vec![
        Incident {
            id: 1,
            title: "Biased Recommendation Algorithm".to_string(),
            description: "Algorithm consistently favored certain demographics...".to_string(),
            severity: Severity::Medium,
            reported_at: datetime!(2025-03-15 10:00:00 UTC),
        },
        Incident {
            id: 2,
            title: "LLM Hallucination in Critical Info".to_string(),
            description: "LLM provided incorrect safety procedure information...".to_string(),
            severity: Severity::High,
            reported_at: datetime!(2025-04-01 14:30:00 UTC),
        },
        Incident {
            id: 3,
            title: "Minor Data Leak via Chatbot".to_string(),
            description: "Chatbot inadvertently exposed non-sensitive user metadata..."
                .to_string(),
            severity: Severity::Low,
            reported_at: datetime!(2025-03-20 09:15:00 UTC),
        },
    ]
}
