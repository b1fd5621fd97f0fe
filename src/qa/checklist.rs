//! Fixed, type-keyed checklist templates and the pure derivations over a
//! deliverable's completion map. Items are keyed `"{block}-{item}"` by
//! template position; the map stores booleans only.

use std::collections::HashMap;

use super::DeliverableKind;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChecklistBlock {
    pub title: &'static str,
    pub items: &'static [&'static str],
}

pub type ChecklistState = HashMap<String, bool>;

const SOFTWARE: &[ChecklistBlock] = &[
    ChecklistBlock {
        title: "Code quality",
        items: &[
            "Peer review approved",
            "Static analysis clean",
            "Branch merged to main",
        ],
    },
    ChecklistBlock {
        title: "Testing",
        items: &[
            "Unit tests green",
            "Regression pass on staging",
            "Cross-browser smoke test",
        ],
    },
    ChecklistBlock {
        title: "Release",
        items: &[
            "Deployment runbook updated",
            "Monitoring alerts configured",
            "Client sign-off recorded",
        ],
    },
];

const DESIGN: &[ChecklistBlock] = &[
    ChecklistBlock {
        title: "Source files",
        items: &[
            "Layers named and grouped",
            "Fonts licensed",
            "Assets exported at 1x and 2x",
        ],
    },
    ChecklistBlock {
        title: "Handoff",
        items: &["Specs annotated", "Prototype link shared"],
    },
    ChecklistBlock {
        title: "Brand",
        items: &["Palette matches brand kit", "Logo clearspace respected"],
    },
];

const REPORT: &[ChecklistBlock] = &[
    ChecklistBlock {
        title: "Data",
        items: &[
            "Figures reconciled with source",
            "Period totals spot-checked",
        ],
    },
    ChecklistBlock {
        title: "Narrative",
        items: &["Executive summary drafted", "Recommendations actionable"],
    },
    ChecklistBlock {
        title: "Delivery",
        items: &["PDF renders correctly", "Client distribution list confirmed"],
    },
];

pub fn template(kind: &DeliverableKind) -> &'static [ChecklistBlock] {
    match kind {
        DeliverableKind::Software => SOFTWARE,
        DeliverableKind::Design => DESIGN,
        DeliverableKind::Report => REPORT,
        DeliverableKind::Unknown(_) => &[],
    }
}

pub fn item_key(block: usize, item: usize) -> String {
    format!("{block}-{item}")
}

pub fn total_items(kind: &DeliverableKind) -> usize {
    template(kind).iter().map(|b| b.items.len()).sum()
}

pub fn checked_count(kind: &DeliverableKind, state: &ChecklistState) -> usize {
    template(kind)
        .iter()
        .enumerate()
        .flat_map(|(bi, block)| (0..block.items.len()).map(move |ii| item_key(bi, ii)))
        .filter(|key| state.get(key).copied().unwrap_or(false))
        .count()
}

pub fn progress(kind: &DeliverableKind, state: &ChecklistState) -> u32 {
    let total = total_items(kind);
    if total == 0 {
        return 0;
    }
    ((checked_count(kind, state) * 100) / total) as u32
}

pub fn is_complete(kind: &DeliverableKind, state: &ChecklistState) -> bool {
    let total = total_items(kind);
    total > 0 && checked_count(kind, state) == total
}

/// Flip one item. An absent key counts as unchecked, so the first toggle
/// checks it and a second toggle restores the original unchecked state.
pub fn toggle(state: &mut ChecklistState, key: &str) {
    let current = state.get(key).copied().unwrap_or(false);
    state.insert(key.to_string(), !current);
}

pub fn mark_all(kind: &DeliverableKind) -> ChecklistState {
    template(kind)
        .iter()
        .enumerate()
        .flat_map(|(bi, block)| (0..block.items.len()).map(move |ii| (item_key(bi, ii), true)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds() -> [DeliverableKind; 3] {
        [
            DeliverableKind::Software,
            DeliverableKind::Design,
            DeliverableKind::Report,
        ]
    }

    #[test]
    fn mark_all_completes_every_template() {
        for kind in kinds() {
            let state = mark_all(&kind);
            assert_eq!(checked_count(&kind, &state), total_items(&kind));
            assert_eq!(progress(&kind, &state), 100);
            assert!(is_complete(&kind, &state));
        }
    }

    #[test]
    fn toggle_twice_is_an_involution() {
        let kind = DeliverableKind::Software;
        let mut state = ChecklistState::new();

        toggle(&mut state, "0-1");
        assert_eq!(checked_count(&kind, &state), 1);
        toggle(&mut state, "0-1");
        assert_eq!(checked_count(&kind, &state), 0);
        assert!(!is_complete(&kind, &state));
    }

    #[test]
    fn stray_keys_do_not_inflate_progress() {
        let kind = DeliverableKind::Design;
        let mut state = ChecklistState::new();
        state.insert("9-9".to_string(), true);
        assert_eq!(checked_count(&kind, &state), 0);
        assert_eq!(progress(&kind, &state), 0);
    }

    #[test]
    fn unknown_kind_has_an_empty_template() {
        let kind = DeliverableKind::Unknown("video".to_string());
        assert_eq!(total_items(&kind), 0);
        assert!(!is_complete(&kind, &ChecklistState::new()));
    }
}
