//! Mapping requested filters onto the shard groups that provide them.

use std::collections::HashSet;

use crate::config::AmbiguityPolicy;
use crate::error::{CatalogError, Result};
use crate::filter_index::FilterIndex;
use crate::filter_name::FilterName;
use crate::shard_group::ShardGroup;

/// Filters to read from one shard group, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRequest {
    pub group: ShardGroup,
    pub filters: Vec<FilterName>,
}

/// A batch of requested filters partitioned by shard group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedGroups {
    /// Requested filters with duplicates removed, in request order.
    pub requested: Vec<FilterName>,
    /// One entry per distinct group, in order of first use.
    pub groups: Vec<GroupRequest>,
}

impl ResolvedGroups {
    /// Number of filters across all groups.
    pub fn filter_count(&self) -> usize {
        self.groups.iter().map(|g| g.filters.len()).sum()
    }
}

/// Resolves filters against a [`FilterIndex`].
///
/// Resolution is a pure function of the index contents, its scan order and the
/// ambiguity policy.
#[derive(Debug, Clone)]
pub struct ShardResolver<'a> {
    index: &'a FilterIndex,
    policy: AmbiguityPolicy,
}

impl<'a> ShardResolver<'a> {
    pub fn new(index: &'a FilterIndex, policy: AmbiguityPolicy) -> Self {
        Self { index, policy }
    }

    /// The shard group providing `filter`.
    pub fn resolve_one(&self, filter: &FilterName) -> Result<&'a ShardGroup> {
        let candidates = self.index.candidates(filter);
        let chosen = match candidates.as_slice() {
            [] => {
                return Err(CatalogError::FilterNotFound {
                    filter: filter.to_string(),
                })
            }
            [only] => *only,
            [first, ..] => match &self.policy {
                AmbiguityPolicy::Reject => return Err(ambiguous(filter, &candidates)),
                AmbiguityPolicy::FirstMatch => {
                    log::warn!(
                        "filter {filter} is provided by {} groups, taking {first}",
                        candidates.len()
                    );
                    *first
                }
                AmbiguityPolicy::Priority(order) => order
                    .iter()
                    .find_map(|pattern| {
                        candidates
                            .iter()
                            .find(|group| group.pattern() == pattern.as_str())
                    })
                    .copied()
                    .ok_or_else(|| ambiguous(filter, &candidates))?,
            },
        };
        log::debug!("filter {filter} resolved to {chosen}");
        Ok(chosen)
    }

    /// Resolve a batch and group it by shard group.
    ///
    /// Every distinct requested filter lands in exactly one group. Groups appear
    /// in the order they were first needed and keep request order inside.
    pub fn resolve_and_group(&self, filters: &[FilterName]) -> Result<ResolvedGroups> {
        let mut seen = HashSet::new();
        let mut resolved = ResolvedGroups::default();

        for filter in filters {
            if !seen.insert(filter) {
                log::warn!("filter {filter} requested more than once, ignoring repeat");
                continue;
            }
            let group = self.resolve_one(filter)?;
            match resolved.groups.iter_mut().find(|g| &g.group == group) {
                Some(request) => request.filters.push(filter.clone()),
                None => resolved.groups.push(GroupRequest {
                    group: group.clone(),
                    filters: vec![filter.clone()],
                }),
            }
            resolved.requested.push(filter.clone());
        }

        log::info!(
            "{} filters resolved to {} shard groups",
            resolved.requested.len(),
            resolved.groups.len()
        );
        Ok(resolved)
    }
}

fn ambiguous(filter: &FilterName, candidates: &[&ShardGroup]) -> CatalogError {
    CatalogError::AmbiguousFilter {
        filter: filter.to_string(),
        groups: candidates.iter().map(|g| g.pattern().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_index::IndexEntry;
    use std::path::PathBuf;

    fn entry(prefix: &str, filters: &[&str]) -> IndexEntry {
        IndexEntry {
            representative: PathBuf::from(format!("/sed/{prefix}_SED_00.hdf5")),
            group: ShardGroup::new("/sed", format!("{prefix}_SED_??.hdf5")),
            filters: filters.iter().map(|f| FilterName::new(f)).collect(),
        }
    }

    fn request(names: &[&str]) -> Vec<FilterName> {
        names.iter().map(|n| FilterName::new(n)).collect()
    }

    #[test]
    fn test_grouping_preserves_orders() {
        let index = FilterIndex::from_entries(vec![entry("a", &["X", "Y"]), entry("b", &["Z"])]);
        let resolver = ShardResolver::new(&index, AmbiguityPolicy::Reject);

        let resolved = resolver.resolve_and_group(&request(&["X", "Z", "Y"])).unwrap();
        assert_eq!(resolved.groups.len(), 2);
        assert_eq!(resolved.groups[0].group.pattern(), "a_SED_??.hdf5");
        assert_eq!(resolved.groups[0].filters, request(&["X", "Y"]));
        assert_eq!(resolved.groups[1].group.pattern(), "b_SED_??.hdf5");
        assert_eq!(resolved.groups[1].filters, request(&["Z"]));
        assert_eq!(resolved.requested, request(&["X", "Z", "Y"]));
    }

    #[test]
    fn test_unknown_filter() {
        let index = FilterIndex::from_entries(vec![entry("a", &["X"])]);
        let resolver = ShardResolver::new(&index, AmbiguityPolicy::Reject);
        let err = resolver.resolve_one(&FilterName::new("Q")).unwrap_err();
        assert!(matches!(err, CatalogError::FilterNotFound { filter } if filter == "Q"));
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let index = FilterIndex::from_entries(vec![entry("a", &["X", "Y"])]);
        let resolver = ShardResolver::new(&index, AmbiguityPolicy::Reject);
        let resolved = resolver.resolve_and_group(&request(&["Y", "X", "Y"])).unwrap();
        assert_eq!(resolved.requested, request(&["Y", "X"]));
        assert_eq!(resolved.filter_count(), 2);
    }

    #[test]
    fn test_ambiguity_policies() {
        let index = FilterIndex::from_entries(vec![
            entry("b", &["X", "S"]),
            entry("a", &["X", "T"]),
        ]);
        let x = FilterName::new("X");

        let reject = ShardResolver::new(&index, AmbiguityPolicy::Reject);
        match reject.resolve_one(&x).unwrap_err() {
            CatalogError::AmbiguousFilter { groups, .. } => {
                assert_eq!(groups, vec!["b_SED_??.hdf5", "a_SED_??.hdf5"])
            }
            other => panic!("unexpected error {other}"),
        }
        // Unambiguous filters still resolve under the strict policy.
        assert_eq!(
            reject.resolve_one(&FilterName::new("T")).unwrap().pattern(),
            "a_SED_??.hdf5"
        );

        let first = ShardResolver::new(&index, AmbiguityPolicy::FirstMatch);
        assert_eq!(first.resolve_one(&x).unwrap().pattern(), "b_SED_??.hdf5");

        let priority = ShardResolver::new(
            &index,
            AmbiguityPolicy::Priority(vec!["c_SED_??.hdf5".into(), "a_SED_??.hdf5".into()]),
        );
        assert_eq!(priority.resolve_one(&x).unwrap().pattern(), "a_SED_??.hdf5");

        let unlisted = ShardResolver::new(&index, AmbiguityPolicy::Priority(vec![]));
        assert!(matches!(
            unlisted.resolve_one(&x),
            Err(CatalogError::AmbiguousFilter { .. })
        ));
    }
}
