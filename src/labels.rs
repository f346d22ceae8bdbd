//! Container label filter.
//!
//! Decides whether a container (or one of its lifecycle events) carries
//! the label that requests a DNS record, and extracts the requested name.

use std::collections::HashMap;

use crate::types::{ActionKind, DesiredRecord, LifecycleEvent};

/// Label key whose value is the DNS name a container wants.
pub const TARGET_KEY: &str = "docker-pihole-customdns.domain";

/// Looks up the target key and returns the lower-cased record name. The
/// exact key wins; otherwise the first case-insensitive match in key order.
/// An empty value is still a match.
pub fn desired_record(labels: &HashMap<String, String>) -> Option<DesiredRecord> {
    labels
        .get(TARGET_KEY)
        .or_else(|| {
            labels
                .iter()
                .filter(|(key, _)| key.eq_ignore_ascii_case(TARGET_KEY))
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, value)| value)
        })
        .map(|value| DesiredRecord::new(value))
}

/// Same as [`desired_record`] for an event, paired with its action.
pub fn relevant_event(event: &LifecycleEvent) -> Option<(ActionKind, DesiredRecord)> {
    desired_record(&event.attributes).map(|record| (event.action, record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_key_is_not_relevant() {
        assert_eq!(desired_record(&HashMap::new()), None);
        let other = labels(&[("com.example.domain", "foo"), ("name", "web")]);
        assert_eq!(desired_record(&other), None);
    }

    #[test]
    fn key_matches_in_any_casing() {
        for key in [
            "docker-pihole-customdns.domain",
            "Docker-Pihole-CustomDNS.Domain",
            "DOCKER-PIHOLE-CUSTOMDNS.DOMAIN",
        ] {
            let record = desired_record(&labels(&[(key, "Web.Lan")])).unwrap();
            assert_eq!(record.name, "web.lan");
        }
    }

    #[test]
    fn exact_key_wins_over_other_casings() {
        let both = labels(&[
            ("Docker-Pihole-CustomDNS.Domain", "other.lan"),
            (TARGET_KEY, "web.lan"),
            ("DOCKER-PIHOLE-CUSTOMDNS.DOMAIN", "third.lan"),
        ]);
        for _ in 0..16 {
            assert_eq!(desired_record(&both).unwrap().name, "web.lan");
        }

        let mixed_only = labels(&[
            ("Docker-Pihole-CustomDNS.Domain", "other.lan"),
            ("DOCKER-PIHOLE-CUSTOMDNS.DOMAIN", "third.lan"),
        ]);
        assert_eq!(desired_record(&mixed_only).unwrap().name, "third.lan");
    }

    #[test]
    fn empty_value_is_still_relevant() {
        let record = desired_record(&labels(&[(TARGET_KEY, "")])).unwrap();
        assert_eq!(record.name, "");
    }

    #[test]
    fn event_value_is_lower_cased() {
        let event = LifecycleEvent {
            action: ActionKind::Created,
            container_name: "svc".into(),
            attributes: labels(&[(TARGET_KEY, "Svc.Example"), ("image", "nginx")]),
        };
        let (action, record) = relevant_event(&event).unwrap();
        assert_eq!(action, ActionKind::Created);
        assert_eq!(record.name, "svc.example");
    }

    #[test]
    fn event_without_label_is_ignored() {
        let event = LifecycleEvent {
            action: ActionKind::Removed,
            container_name: "svc".into(),
            attributes: labels(&[("image", "nginx")]),
        };
        assert!(relevant_event(&event).is_none());
    }
}
