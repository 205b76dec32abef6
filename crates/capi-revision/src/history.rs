//! Installer revision history
//!
//! History is kept newest first. A new revision is only created when the
//! rendered content differs from the newest one, so reconciling the same
//! content repeatedly is a no-op. Old revisions are dropped only once the
//! installer reports the newest revision as current.

use std::collections::HashSet;

use capi_common::crd::InstallerRevision;
use capi_common::Error;

use crate::rendered::RenderedRevision;

/// Hard ceiling on stored revisions. Reaching it needs human intervention.
pub const MAX_REVISIONS: usize = 16;

/// Merge a freshly rendered revision into the existing history.
///
/// Returns the history sorted newest first. When `candidate` has the same
/// content id as the newest revision, or is absent, no revision is added.
/// Otherwise the candidate is prepended with the next index, stamped with
/// `release_version`.
///
/// Fails if the persisted history repeats an index or the newest index
/// cannot be incremented.
///
/// The returned history may exceed [`MAX_REVISIONS`]; callers check it with
/// [`enforce_max_revisions`] before persisting.
pub fn merge_revisions(
    existing: &[InstallerRevision],
    candidate: Option<&RenderedRevision>,
    release_version: &str,
) -> Result<Vec<InstallerRevision>, Error> {
    let mut history = existing.to_vec();
    history.sort_by(|a, b| b.revision.cmp(&a.revision));

    let mut indices = HashSet::new();
    for rev in &history {
        if !indices.insert(rev.revision) {
            return Err(Error::revision(format!(
                "revision index {} appears more than once in history",
                rev.revision
            )));
        }
    }

    let Some(candidate) = candidate else {
        return Ok(history);
    };

    let next_index = match history.first() {
        Some(newest) => {
            if newest.content_id == candidate.content_id() {
                return Ok(history);
            }
            newest.revision.checked_add(1).ok_or_else(|| {
                Error::revision(format!(
                    "revision index {} cannot be incremented",
                    newest.revision
                ))
            })?
        }
        None => 1,
    };

    history.insert(0, candidate.to_installer_revision(next_index, release_version));
    Ok(history)
}

/// Fail with a terminal error if `history` is over the revision ceiling
pub fn enforce_max_revisions(history: &[InstallerRevision]) -> Result<(), Error> {
    if history.len() > MAX_REVISIONS {
        return Err(Error::terminal(Error::revision(format!(
            "maximum number of revisions ({}) reached; remove old revisions from the ClusterAPI status to continue",
            MAX_REVISIONS
        ))));
    }
    Ok(())
}

/// Drop superseded revisions once the newest one is current.
///
/// `history` must be sorted newest first, as returned by [`merge_revisions`].
/// Returns `true` if anything was dropped.
pub fn trim_revisions(history: &mut Vec<InstallerRevision>, current: Option<&str>) -> bool {
    let newest_is_current = match (history.first(), current) {
        (Some(newest), Some(current)) => newest.name == current,
        _ => false,
    };
    if newest_is_current && history.len() > 1 {
        history.truncate(1);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ProviderComponent;
    use capi_common::Platform;

    fn rendered(content: &str) -> RenderedRevision {
        let component = ProviderComponent {
            name: "cluster-api".to_string(),
            image_ref: "registry.example/cluster-api:v1".to_string(),
            profile: "default".to_string(),
            platform: None,
            install_order: 10,
            content_id: content.to_string(),
        };
        RenderedRevision::new(&[component], Platform::Aws).unwrap()
    }

    fn indices(history: &[InstallerRevision]) -> Vec<i64> {
        history.iter().map(|r| r.revision).collect()
    }

    #[test]
    fn first_revision_gets_index_one() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        assert_eq!(indices(&history), vec![1]);
        assert_eq!(history[0].release_version, "4.18.0");
        assert!(history[0].name.starts_with("4.18.0-1-"));
    }

    #[test]
    fn absent_candidate_returns_sorted_history() {
        let one = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let two = merge_revisions(&one, Some(&rendered("b")), "4.18.0").unwrap();
        let mut reversed = two.clone();
        reversed.reverse();

        let result = merge_revisions(&reversed, None, "4.18.0").unwrap();
        assert_eq!(indices(&result), vec![2, 1]);
    }

    #[test]
    fn same_content_is_a_no_op() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let again = merge_revisions(&history, Some(&rendered("a")), "4.19.0").unwrap();
        assert_eq!(again, history);
    }

    #[test]
    fn new_content_prepends_next_index() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let history = merge_revisions(&history, Some(&rendered("b")), "4.19.0").unwrap();
        assert_eq!(indices(&history), vec![2, 1]);
        assert_eq!(history[0].release_version, "4.19.0");
        assert_eq!(history[1].release_version, "4.18.0");
    }

    #[test]
    fn content_matching_an_older_revision_still_creates_new_one() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let history = merge_revisions(&history, Some(&rendered("b")), "4.18.0").unwrap();
        let history = merge_revisions(&history, Some(&rendered("a")), "4.18.0").unwrap();
        assert_eq!(indices(&history), vec![3, 2, 1]);
        assert_eq!(history[0].content_id, history[2].content_id);
        assert_ne!(history[0].name, history[2].name);
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let mut broken = history.clone();
        broken.push(history[0].clone());
        let err = merge_revisions(&broken, Some(&rendered("b")), "4.18.0").unwrap_err();
        assert!(matches!(err, Error::Revision { .. }));
    }

    #[test]
    fn exhausted_index_space_is_an_error() {
        let mut newest = rendered("old").to_installer_revision(i64::MAX, "4.17.0");
        newest.content_id = "other".to_string();

        let err = merge_revisions(&[newest], Some(&rendered("new")), "4.18.0").unwrap_err();
        assert!(matches!(err, Error::Revision { .. }));
        assert!(err.to_string().contains("cannot be incremented"));
    }

    #[test]
    fn max_revisions_is_terminal() {
        let mut history = Vec::new();
        for i in 0..MAX_REVISIONS {
            history = merge_revisions(&history, Some(&rendered(&i.to_string())), "4.18.0").unwrap();
        }
        assert!(enforce_max_revisions(&history).is_ok());

        let over = merge_revisions(&history, Some(&rendered("new")), "4.18.0").unwrap();
        let err = enforce_max_revisions(&over).unwrap_err();
        assert!(err.is_terminal());
        assert!(err.to_string().contains("maximum number of revisions"));
    }

    #[test]
    fn trim_when_newest_is_current() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let mut history = merge_revisions(&history, Some(&rendered("b")), "4.18.0").unwrap();
        let newest = history[0].name.clone();

        assert!(trim_revisions(&mut history, Some(&newest)));
        assert_eq!(indices(&history), vec![2]);
    }

    #[test]
    fn no_trim_when_older_revision_is_current() {
        let history = merge_revisions(&[], Some(&rendered("a")), "4.18.0").unwrap();
        let mut history = merge_revisions(&history, Some(&rendered("b")), "4.18.0").unwrap();
        let older = history[1].name.clone();

        assert!(!trim_revisions(&mut history, Some(&older)));
        assert!(!trim_revisions(&mut history, None));
        assert_eq!(indices(&history), vec![2, 1]);
    }
}
