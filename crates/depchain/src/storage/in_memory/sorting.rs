//! Orderings for occurrence listings.

use crate::domain::{NullsOrder, Occurrence, OccurrenceSort, SortDirection, SortField};
use std::cmp::Ordering;

/// An occurrence paired with its component name for filtering and sorting
#[derive(Debug, Clone, Copy)]
pub(super) struct Listed<'a> {
    pub(super) occurrence: &'a Occurrence,
    pub(super) name: &'a str,
}

/// Sort listed occurrences.
///
/// `direction` applies to rows that have the sort key; rows without it are
/// placed according to `nulls` regardless of direction. Equal keys fall back
/// to ascending occurrence id so listings are deterministic.
pub(super) fn sort_listing(rows: &mut [Listed<'_>], sort: OccurrenceSort) {
    rows.sort_by(|a, b| {
        let by_key = match sort.field {
            SortField::Name => compare_keys(Some(a.name), Some(b.name), sort),
            SortField::PackageManager => compare_keys(
                a.occurrence.metadata.package_manager.as_deref(),
                b.occurrence.metadata.package_manager.as_deref(),
                sort,
            ),
            SortField::Severity => compare_keys(
                a.occurrence.metadata.highest_severity,
                b.occurrence.metadata.highest_severity,
                sort,
            ),
            SortField::License => compare_keys(first_license(a), first_license(b), sort),
        };
        by_key.then(a.occurrence.id.cmp(&b.occurrence.id))
    });
}

fn first_license<'a>(row: &Listed<'a>) -> Option<&'a str> {
    row.occurrence
        .metadata
        .licenses
        .first()
        .map(|l| l.spdx_identifier.as_str())
}

fn compare_keys<T: Ord>(a: Option<T>, b: Option<T>, sort: OccurrenceSort) -> Ordering {
    let absent_first = match sort.nulls {
        NullsOrder::First => Ordering::Less,
        NullsOrder::Last => Ordering::Greater,
    };
    match (a, b) {
        (Some(a), Some(b)) => match sort.direction {
            SortDirection::Asc => a.cmp(&b),
            SortDirection::Desc => b.cmp(&a),
        },
        (None, None) => Ordering::Equal,
        (None, Some(_)) => absent_first,
        (Some(_), None) => absent_first.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ComponentId, ComponentVersionId, OccurrenceId, OccurrenceMetadata, ProjectId, Severity,
        SourceId,
    };
    use chrono::Utc;
    use rstest::rstest;

    fn occurrence(id: u64, severity: Option<Severity>) -> Occurrence {
        Occurrence {
            id: OccurrenceId::new(id),
            uuid: format!("uuid-{id}"),
            project_id: ProjectId::new(1),
            component_id: ComponentId::new(1),
            component_version_id: ComponentVersionId::new(1),
            source_id: SourceId::new(1),
            commit_sha: "abc".to_string(),
            ancestors: vec![],
            metadata: OccurrenceMetadata {
                highest_severity: severity,
                ..OccurrenceMetadata::default()
            },
            created_at: Utc::now(),
        }
    }

    fn sorted_ids(occurrences: &[Occurrence], sort: OccurrenceSort) -> Vec<u64> {
        let mut rows: Vec<Listed<'_>> = occurrences
            .iter()
            .map(|occurrence| Listed {
                occurrence,
                name: "same",
            })
            .collect();
        sort_listing(&mut rows, sort);
        rows.iter().map(|r| r.occurrence.id.get()).collect()
    }

    #[rstest]
    #[case(SortDirection::Asc, NullsOrder::Last, vec![3, 1, 4, 2])]
    #[case(SortDirection::Asc, NullsOrder::First, vec![2, 3, 1, 4])]
    #[case(SortDirection::Desc, NullsOrder::Last, vec![1, 4, 3, 2])]
    #[case(SortDirection::Desc, NullsOrder::First, vec![2, 1, 4, 3])]
    fn test_severity_ordering(
        #[case] direction: SortDirection,
        #[case] nulls: NullsOrder,
        #[case] expected: Vec<u64>,
    ) {
        let occurrences = vec![
            occurrence(1, Some(Severity::Critical)),
            occurrence(2, None),
            occurrence(3, Some(Severity::Low)),
            occurrence(4, Some(Severity::Critical)),
        ];
        let sort = OccurrenceSort::by(SortField::Severity)
            .direction(direction)
            .nulls(nulls);
        assert_eq!(sorted_ids(&occurrences, sort), expected);
    }

    #[test]
    fn test_equal_keys_fall_back_to_id() {
        let occurrences = vec![occurrence(9, None), occurrence(2, None), occurrence(5, None)];
        assert_eq!(
            sorted_ids(&occurrences, OccurrenceSort::default()),
            vec![2, 5, 9]
        );
    }
}
