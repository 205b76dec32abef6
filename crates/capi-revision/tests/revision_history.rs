//! End-to-end properties of revision rendering and history management

use capi_common::crd::InstallerRevision;
use capi_common::Platform;
use capi_revision::{
    enforce_max_revisions, merge_revisions, trim_revisions, ProviderComponent, RenderedRevision,
    MAX_REVISIONS,
};

const RELEASE: &str = "4.18.0";

fn provider(name: &str, platform: Option<Platform>, order: i32, content: &str) -> ProviderComponent {
    ProviderComponent {
        name: name.to_string(),
        image_ref: format!("quay.io/openshift/{name}:latest"),
        profile: "default".to_string(),
        platform,
        install_order: order,
        content_id: content.to_string(),
    }
}

fn catalog(core_content: &str) -> Vec<ProviderComponent> {
    vec![
        provider("cluster-api", None, 10, core_content),
        provider("infrastructure-aws", Some(Platform::Aws), 20, "aws"),
        provider("infrastructure-gcp", Some(Platform::Gcp), 20, "gcp"),
        provider("ipam", None, 20, "ipam"),
    ]
}

fn render(components: &[ProviderComponent], platform: Platform) -> RenderedRevision {
    RenderedRevision::new(components, platform).expect("components render")
}

fn indices(history: &[InstallerRevision]) -> Vec<i64> {
    history.iter().map(|r| r.revision).collect()
}

#[test]
fn merging_the_same_content_twice_is_idempotent() {
    let candidate = render(&catalog("core-v1"), Platform::Aws);
    let seeds: Vec<Vec<InstallerRevision>> = vec![
        vec![],
        merge_revisions(&[], Some(&render(&catalog("core-v0"), Platform::Aws)), RELEASE).unwrap(),
    ];

    for seed in seeds {
        let once = merge_revisions(&seed, Some(&candidate), RELEASE).unwrap();
        let twice = merge_revisions(&once, Some(&candidate), RELEASE).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn content_id_ignores_input_order() {
    let forward = catalog("core-v1");
    let mut shuffled = forward.clone();
    shuffled.rotate_left(2);
    shuffled.swap(0, 1);

    for platform in [Platform::Aws, Platform::Gcp, Platform::Azure] {
        assert_eq!(
            render(&forward, platform).content_id(),
            render(&shuffled, platform).content_id()
        );
    }
}

#[test]
fn content_id_tracks_every_component() {
    let base = catalog("core-v1");
    let original = render(&base, Platform::Aws).content_id();

    for i in 0..base.len() {
        let mut changed = base.clone();
        changed[i].content_id.push_str("-patched");
        let id = render(&changed, Platform::Aws).content_id();
        if changed[i].applies_to(Platform::Aws) {
            assert_ne!(id, original, "{} change not reflected", changed[i].name);
        } else {
            assert_eq!(id, original, "{} is not rendered on AWS", changed[i].name);
        }
    }
}

#[test]
fn distinct_merges_number_revisions_from_one() {
    let mut history = Vec::new();
    for n in 1..=5 {
        let candidate = render(&catalog(&format!("core-v{n}")), Platform::Aws);
        history = merge_revisions(&history, Some(&candidate), RELEASE).unwrap();
    }
    assert_eq!(indices(&history), vec![5, 4, 3, 2, 1]);
}

#[test]
fn full_history_rejects_new_content_without_modification() {
    let mut history = Vec::new();
    for n in 0..MAX_REVISIONS {
        let candidate = render(&catalog(&format!("core-v{n}")), Platform::Aws);
        history = merge_revisions(&history, Some(&candidate), RELEASE).unwrap();
    }
    assert_eq!(history.len(), MAX_REVISIONS);
    let snapshot = history.clone();

    let candidate = render(&catalog("core-next"), Platform::Aws);
    let merged = merge_revisions(&history, Some(&candidate), RELEASE).unwrap();
    let err = enforce_max_revisions(&merged).unwrap_err();
    assert!(err.is_terminal());
    assert_eq!(history, snapshot);

    // Same content as the newest is still accepted
    let newest = render(&catalog(&format!("core-v{}", MAX_REVISIONS - 1)), Platform::Aws);
    let merged = merge_revisions(&history, Some(&newest), RELEASE).unwrap();
    assert!(enforce_max_revisions(&merged).is_ok());
}

#[test]
fn trim_keeps_only_current_newest_revision() {
    let history = merge_revisions(&[], Some(&render(&catalog("v1"), Platform::Aws)), RELEASE).unwrap();
    let history = merge_revisions(&history, Some(&render(&catalog("v2"), Platform::Aws)), RELEASE).unwrap();
    let rev2 = history[0].name.clone();
    let rev1 = history[1].name.clone();

    let mut kept = history.clone();
    assert!(!trim_revisions(&mut kept, Some(&rev1)));
    assert_eq!(indices(&kept), vec![2, 1]);

    let mut trimmed = history;
    assert!(trim_revisions(&mut trimmed, Some(&rev2)));
    assert_eq!(indices(&trimmed), vec![2]);
}

#[test]
fn freshly_merged_revision_is_not_current_until_installed() {
    let history = merge_revisions(&[], Some(&render(&catalog("v1"), Platform::Aws)), RELEASE).unwrap();
    let rev1 = history[0].name.clone();

    // Installer has rev1, new content arrives: rev1 is no longer newest
    let mut history =
        merge_revisions(&history, Some(&render(&catalog("v2"), Platform::Aws)), RELEASE).unwrap();
    assert!(!trim_revisions(&mut history, Some(&rev1)));
    assert_eq!(history.len(), 2);
}

#[test]
fn platform_with_no_matching_providers_renders_empty_revision() {
    let gcp_only = vec![provider("infrastructure-gcp", Some(Platform::Gcp), 20, "gcp")];
    let empty = render(&gcp_only, Platform::Aws);
    assert!(empty.is_empty());

    let history = merge_revisions(&[], Some(&empty), RELEASE).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].components.is_empty());
    assert_ne!(
        history[0].content_id,
        render(&gcp_only, Platform::Gcp).content_id()
    );
}
