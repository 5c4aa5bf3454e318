//! Scheduled economic events: source merge, next high-impact lookup, event light

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Secondary events this close to a primary event are duplicates
const DUPLICATE_WINDOW_SECS: i64 = 3600;
/// Look-behind / look-ahead for the next high-impact event, hours
const NEXT_EVENT_FROM_HOURS: f64 = -0.5;
const NEXT_EVENT_TO_HOURS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Calendar entry supplied by a collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub title: String,
    pub impact: Impact,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledEvent {
    /// Hours from `now` until the event; negative once it has passed
    pub fn hours_until(&self, now: DateTime<Utc>) -> f64 {
        (self.scheduled_at - now).num_seconds() as f64 / 3600.0
    }
}

/// Next high-impact event relative to the evaluation instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProximity {
    pub title: String,
    pub hours_until: f64,
}

impl EventProximity {
    /// True while the event is within `minutes` either side of now
    pub fn within_minutes(&self, minutes: u32) -> bool {
        let window = minutes as f64 / 60.0;
        (-window..=window).contains(&self.hours_until)
    }
}

/// Merge two event sources, dropping secondary events that duplicate a primary one.
///
/// Output is sorted by scheduled time.
pub fn merge_event_sources(
    primary: Vec<ScheduledEvent>,
    secondary: Vec<ScheduledEvent>,
) -> Vec<ScheduledEvent> {
    let extra: Vec<ScheduledEvent> = secondary
        .into_iter()
        .filter(|s| {
            !primary
                .iter()
                .any(|p| (s.scheduled_at - p.scheduled_at).num_seconds().abs() <= DUPLICATE_WINDOW_SECS)
        })
        .collect();

    let mut merged = primary;
    merged.extend(extra);
    merged.sort_by_key(|e| e.scheduled_at);
    merged
}

/// Nearest high-impact event in the `[-0.5h, 3h]` band, smallest hours-until wins
pub fn next_high_impact(events: &[ScheduledEvent], now: DateTime<Utc>) -> Option<EventProximity> {
    events
        .iter()
        .filter(|e| e.impact == Impact::High)
        .map(|e| EventProximity {
            title: e.title.clone(),
            hours_until: e.hours_until(now),
        })
        .filter(|p| (NEXT_EVENT_FROM_HOURS..=NEXT_EVENT_TO_HOURS).contains(&p.hours_until))
        .min_by(|a, b| a.hours_until.total_cmp(&b.hours_until))
}

/// Traffic light shown next to each tick for human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLight {
    /// Event 15-30 minutes out: liquidity is building
    Green,
    /// Event just released or imminent
    Red,
    /// Event further out
    Yellow,
    /// No high-impact event nearby
    Idle,
}

impl EventLight {
    pub fn from_proximity(next: Option<&EventProximity>) -> Self {
        match next {
            None => EventLight::Idle,
            Some(p) if (0.25..=0.5).contains(&p.hours_until) => EventLight::Green,
            Some(p) if (-0.5..0.25).contains(&p.hours_until) => EventLight::Red,
            Some(_) => EventLight::Yellow,
        }
    }
}

impl std::fmt::Display for EventLight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLight::Green => write!(f, "green"),
            EventLight::Red => write!(f, "red"),
            EventLight::Yellow => write!(f, "yellow"),
            EventLight::Idle => write!(f, "idle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(title: &str, impact: Impact, at: DateTime<Utc>) -> ScheduledEvent {
        ScheduledEvent {
            title: title.to_string(),
            impact,
            scheduled_at: at,
        }
    }

    #[test]
    fn test_merge_drops_near_duplicates() {
        let now = Utc::now();
        let primary = vec![event("CPI", Impact::High, now + Duration::hours(2))];
        let secondary = vec![
            event("CPI m/m", Impact::High, now + Duration::minutes(150)),
            event("Jobless Claims", Impact::Medium, now + Duration::minutes(30)),
        ];
        let merged = merge_event_sources(primary, secondary);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Jobless Claims");
        assert_eq!(merged[1].title, "CPI");
    }

    #[test]
    fn test_next_high_impact_window() {
        let now = Utc::now();
        let events = vec![
            event("Old", Impact::High, now - Duration::hours(2)),
            event("Medium", Impact::Medium, now + Duration::minutes(10)),
            event("FOMC", Impact::High, now + Duration::minutes(90)),
            event("NFP", Impact::High, now + Duration::minutes(20)),
            event("Far", Impact::High, now + Duration::hours(5)),
        ];
        let next = next_high_impact(&events, now).unwrap();
        assert_eq!(next.title, "NFP");
        assert!(next_high_impact(&events[..2], now).is_none());
    }

    #[test]
    fn test_event_window_and_light() {
        let near = EventProximity { title: "NFP".into(), hours_until: 0.4 };
        assert!(near.within_minutes(30));
        assert_eq!(EventLight::from_proximity(Some(&near)), EventLight::Green);

        let imminent = EventProximity { title: "NFP".into(), hours_until: 0.1 };
        assert_eq!(EventLight::from_proximity(Some(&imminent)), EventLight::Red);

        let later = EventProximity { title: "NFP".into(), hours_until: 2.0 };
        assert!(!later.within_minutes(30));
        assert_eq!(EventLight::from_proximity(Some(&later)), EventLight::Yellow);
        assert_eq!(EventLight::from_proximity(None), EventLight::Idle);
    }
}
