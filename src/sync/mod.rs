pub(crate) mod settle;

pub use settle::{SettleConfig, SettleEvent, SettleWatcher};

use crate::error::HostError;
use crate::host::HostDocument;
use crate::index::OrdinalIndex;
use crate::models::SavedGroup;
use leptos::logging::log;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Groups rebuilt on the page, in saved order.
    pub built: Vec<String>,
    /// Groups with no member left in range.
    pub dropped_groups: Vec<String>,
    /// Saved ordinals that no longer resolve (out of range or already claimed).
    pub dropped_indices: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(ReconcileReport),
    /// Containers already exist; a second pass would double-wrap.
    AlreadyApplied,
    /// The page has no session key, so there is nothing to restore.
    Unpersisted,
}

/// Rebuild saved groups against the current render.
///
/// Saved ordinals are resolved through a fresh full index. Ordinals past the end
/// of the list are discarded, and a group left with no members is dropped
/// rather than partially shown. Groups are built in saved order, each anchored
/// where its first surviving member currently sits, and start collapsed.
pub fn reconcile<D: HostDocument>(
    doc: &mut D,
    saved: &[SavedGroup],
) -> Result<ReconcileOutcome, HostError> {
    // Deleted containers stay in the page hidden; they count as applied too.
    let applied = !doc.group_containers().is_empty()
        || doc.turns().iter().any(|t| doc.enclosing_group(t).is_some());
    if applied {
        return Ok(ReconcileOutcome::AlreadyApplied);
    }

    let index = OrdinalIndex::full(doc);
    let mut claimed = vec![false; index.len()];
    let mut report = ReconcileReport::default();

    for group in saved {
        let mut ordinals: Vec<usize> = Vec::with_capacity(group.indices.len());
        for &i in &group.indices {
            if i < index.len() && !claimed[i] && !ordinals.contains(&i) {
                ordinals.push(i);
            } else {
                report.dropped_indices += 1;
            }
        }
        ordinals.sort_unstable();

        let members: Vec<D::Turn> = ordinals
            .iter()
            .filter_map(|&i| index.get(i).cloned())
            .collect();
        let Some(anchor) = members.first() else {
            log!(
                "Organizer: dropping group {:?}; none of its {} saved turns are on the page",
                group.name,
                group.indices.len()
            );
            report.dropped_groups.push(group.name.clone());
            continue;
        };

        let container = doc.create_group(&group.name, anchor)?;
        for turn in &members {
            doc.move_into_group(&container, turn)?;
        }
        for &i in &ordinals {
            claimed[i] = true;
        }
        report.built.push(group.name.clone());
    }

    if report.dropped_indices > 0 {
        log!(
            "Organizer: {} saved turn references no longer resolve ({} turns on page)",
            report.dropped_indices,
            index.len()
        );
    }
    Ok(ReconcileOutcome::Applied(report))
}

/// Serialize the page's current grouping.
///
/// Each container's rendered members are translated through the full index,
/// so ordinals count grouped and ungrouped turns alike.
pub fn collect_saved_groups<D: HostDocument>(doc: &D) -> Vec<SavedGroup> {
    let index = OrdinalIndex::full(doc);
    doc.group_containers()
        .iter()
        .map(|c| SavedGroup {
            name: doc.group_name(c),
            indices: doc
                .group_members(c)
                .iter()
                .filter_map(|t| index.ordinal_of(t))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryDocument, TurnId};

    fn names<D: HostDocument>(doc: &D) -> Vec<String> {
        doc.group_containers()
            .iter()
            .map(|c| doc.group_name(c))
            .collect()
    }

    #[test]
    fn test_reconcile_rebuilds_groups_collapsed() {
        let mut doc = MemoryDocument::with_turns(6);
        let saved = vec![
            SavedGroup::new("a", vec![0, 1]),
            SavedGroup::new("b", vec![3, 4, 5]),
        ];

        let outcome = reconcile(&mut doc, &saved).unwrap();
        let ReconcileOutcome::Applied(report) = outcome else {
            panic!("expected reconcile to apply");
        };
        assert_eq!(report.built, vec!["a", "b"]);
        assert_eq!(names(&doc), vec!["a", "b"]);

        let groups = doc.group_containers();
        assert_eq!(doc.group_members(&groups[0]), vec![TurnId(0), TurnId(1)]);
        assert_eq!(
            doc.group_members(&groups[1]),
            vec![TurnId(3), TurnId(4), TurnId(5)]
        );
        assert!(groups.iter().all(|g| doc.is_collapsed(g)));
        assert_eq!(collect_saved_groups(&doc), saved);
    }

    #[test]
    fn test_second_reconcile_is_noop() {
        let mut doc = MemoryDocument::with_turns(4);
        let saved = vec![SavedGroup::new("a", vec![1, 2])];
        reconcile(&mut doc, &saved).unwrap();
        let before = collect_saved_groups(&doc);

        assert_eq!(
            reconcile(&mut doc, &saved).unwrap(),
            ReconcileOutcome::AlreadyApplied
        );
        assert_eq!(collect_saved_groups(&doc), before);
        assert_eq!(doc.group_containers().len(), 1);
    }

    #[test]
    fn test_shrunk_page_drops_out_of_range_members() {
        let mut doc = MemoryDocument::with_turns(5);
        let saved = vec![SavedGroup::new("tail", vec![3, 4, 7])];

        let ReconcileOutcome::Applied(report) = reconcile(&mut doc, &saved).unwrap() else {
            panic!("expected reconcile to apply");
        };
        assert_eq!(report.dropped_indices, 1);
        let groups = doc.group_containers();
        assert_eq!(doc.group_members(&groups[0]), vec![TurnId(3), TurnId(4)]);
    }

    #[test]
    fn test_group_with_no_surviving_members_is_omitted() {
        let mut doc = MemoryDocument::with_turns(5);
        let saved = vec![
            SavedGroup::new("gone", vec![7, 8]),
            SavedGroup::new("kept", vec![0]),
        ];

        let ReconcileOutcome::Applied(report) = reconcile(&mut doc, &saved).unwrap() else {
            panic!("expected reconcile to apply");
        };
        assert_eq!(report.dropped_groups, vec!["gone"]);
        assert_eq!(names(&doc), vec!["kept"]);
    }

    #[test]
    fn test_overlapping_saved_groups_stay_disjoint() {
        let mut doc = MemoryDocument::with_turns(5);
        let saved = vec![
            SavedGroup::new("first", vec![1, 2]),
            SavedGroup::new("second", vec![2, 3]),
        ];
        reconcile(&mut doc, &saved).unwrap();

        let groups = doc.group_containers();
        let first = doc.group_members(&groups[0]);
        let second = doc.group_members(&groups[1]);
        assert!(first.iter().all(|t| !second.contains(t)));
        assert_eq!(second, vec![TurnId(3)]);
    }

    #[test]
    fn test_empty_document_reconciles_to_nothing() {
        let mut doc = MemoryDocument::default();
        let saved = vec![SavedGroup::new("a", vec![0])];
        let ReconcileOutcome::Applied(report) = reconcile(&mut doc, &saved).unwrap() else {
            panic!("expected reconcile to apply");
        };
        assert!(report.built.is_empty());
        assert!(doc.group_containers().is_empty());
    }

    #[test]
    fn test_deleted_group_blocks_rebuild_and_keeps_ordinals() {
        let mut doc = MemoryDocument::with_turns(6);
        let saved = vec![
            SavedGroup::new("a", vec![0, 1]),
            SavedGroup::new("b", vec![3, 4]),
        ];
        reconcile(&mut doc, &saved).unwrap();
        let a = doc.group_containers()[0];
        doc.remove_group(&a).unwrap();

        assert_eq!(doc.turns().len(), 6);
        assert_eq!(
            collect_saved_groups(&doc),
            vec![SavedGroup::new("b", vec![3, 4])]
        );
        assert_eq!(
            reconcile(&mut doc, &saved).unwrap(),
            ReconcileOutcome::AlreadyApplied
        );
    }
}
