/// Tasker badges
///
/// Badges aren't stored. They're derived on read from the user row, the
/// tasker profile, and the tasker's task outcome counts.

use serde::Serialize;

use crate::models::user::{TaskerProfile, User};

/// Minimum assigned tasks before the reliability badge is considered
pub const RELIABLE_MIN_TASKS: i64 = 10;

/// Static badge definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub id: &'static str,
    pub name_en: &'static str,
    pub name_fr: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub description: &'static str,
    pub description_fr: &'static str,
}

pub const VERIFIED: Badge = Badge {
    id: "verified",
    name_en: "Verified",
    name_fr: "Vérifié",
    icon: "✓",
    color: "emerald",
    description: "Identity verified by TaskAfy",
    description_fr: "Identité vérifiée par TaskAfy",
};

pub const TOP_RATED: Badge = Badge {
    id: "top_rated",
    name_en: "Top Rated",
    name_fr: "Très bien noté",
    icon: "⭐",
    color: "yellow",
    description: "Maintains 4.5+ rating with 10+ reviews",
    description_fr: "Maintient une note de 4.5+ avec 10+ avis",
};

pub const EXPERIENCED: Badge = Badge {
    id: "experienced",
    name_en: "Experienced Pro",
    name_fr: "Professionnel expérimenté",
    icon: "🏆",
    color: "teal",
    description: "Completed 50+ tasks successfully",
    description_fr: "Plus de 50 tâches réussies",
};

pub const RELIABLE: Badge = Badge {
    id: "reliable",
    name_en: "Reliable",
    name_fr: "Fiable",
    icon: "💯",
    color: "blue",
    description: "95%+ task completion rate",
    description_fr: "Taux de réussite de 95%+",
};

pub const FAST_RESPONDER: Badge = Badge {
    id: "fast_responder",
    name_en: "Fast Responder",
    name_fr: "Réponse rapide",
    icon: "⚡",
    color: "emerald",
    description: "Quick to respond to bookings",
    description_fr: "Répond rapidement aux réservations",
};

pub const CERTIFIED: Badge = Badge {
    id: "certified",
    name_en: "Certified",
    name_fr: "Certifié",
    icon: "📜",
    color: "purple",
    description: "Has professional certifications",
    description_fr: "Possède des certifications professionnelles",
};

/// Completed and cancelled task counts for the reliability badge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcomes {
    pub completed: i64,
    pub cancelled: i64,
}

impl TaskOutcomes {
    pub fn total(&self) -> i64 {
        self.completed + self.cancelled
    }

    /// Completion rate in percent, `None` with no finished tasks
    pub fn completion_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.completed as f64 * 100.0 / total as f64)
        }
    }
}

/// Returns every badge the tasker currently qualifies for, in display order
pub fn evaluate(user: &User, profile: &TaskerProfile, outcomes: TaskOutcomes) -> Vec<Badge> {
    let mut badges = Vec::new();

    if user.is_verified {
        badges.push(VERIFIED);
    }

    if profile.average_rating >= 4.5 && profile.total_reviews >= 10 {
        badges.push(TOP_RATED);
    }

    if profile.completed_tasks >= 50 {
        badges.push(EXPERIENCED);
    }

    if outcomes.total() >= RELIABLE_MIN_TASKS
        && outcomes.completion_rate().is_some_and(|rate| rate >= 95.0)
    {
        badges.push(RELIABLE);
    }

    if profile.is_available && profile.average_rating >= 4.0 {
        badges.push(FAST_RESPONDER);
    }

    if !profile.certifications.is_empty() {
        badges.push(CERTIFIED);
    }

    badges
}
