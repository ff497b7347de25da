//! Engine E2E tests
//!
//! Every test runs against a real SQLite catalog in a temp dir. Writes go
//! through the store and are followed by the matching engine hook, the way
//! a publishing workflow would call it.

mod helper;

use helper::TestCatalog;

use modcompat::catalog::snapshot::{
    ArtifactSnapshot, CatalogSnapshot, ReleaseSnapshot, RequirementSnapshot,
};
use modcompat::catalog::store::Store;
use modcompat::catalog::storer::CompatStorer;
use modcompat::catalog::types::{ArtifactId, NewRelease, ReleaseId};
use modcompat::config::{CyclePolicy, EngineConfig, PropagationMode};
use modcompat::resolve::error::{CycleDetected, EngineError};
use modcompat::resolve::propagator::{ChangeEvent, PropagatorState};
use modcompat::version::matches_str;

#[test]
fn tilde_platform_constraint_resolves_to_patch_range() {
    let catalog = TestCatalog::new();
    for version in ["1.0.0", "1.1.0", "1.1.1", "1.2.0"] {
        catalog.platform(version);
    }
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "~1.1.0");

    assert_eq!(catalog.platform_versions_of(release), vec!["1.1.0", "1.1.1"]);
}

#[test]
fn caret_requirement_excludes_next_major() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0", "1.1.0", "2.0.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");

    let requirement = catalog.require(release, api, "^1.0");

    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0", "1.1.0"]);
}

#[test]
fn or_groups_resolve_to_union_of_ranges() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0", "1.2.0", "1.5.0", "2.0.0", "2.5.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");

    let requirement = catalog.require(release, api, ">1.0 <2.0 || >=2.5.0 <3.0");

    assert_eq!(
        catalog.matches_of(requirement),
        vec!["1.2.0", "1.5.0", "2.5.0"]
    );
}

#[test]
fn requirement_written_before_target_releases_picks_them_up() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let requirement = catalog.require(release, api, "^1.0");
    assert!(catalog.matches_of(requirement).is_empty());

    catalog.releases(api, &["1.0.0", "2.0.0"]);

    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0"]);
}

#[test]
fn updating_requirement_constraint_replaces_matches() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0", "1.1.0", "2.0.0", "2.1.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let requirement = catalog.require(release, api, "^1.0");

    catalog
        .engine
        .update_requirement(requirement, api, "^2.0")
        .unwrap();

    assert_eq!(catalog.matches_of(requirement), vec!["2.0.0", "2.1.0"]);
}

#[test]
fn deleting_platform_version_removes_exactly_its_rows() {
    let catalog = TestCatalog::new();
    let old = catalog.platform("1.20.0");
    let current = catalog.platform("1.20.1");
    let sodium = catalog.artifact("sodium");
    let a = catalog.release(sodium, "1.0.0", "~1.20");
    let b = catalog.release(sodium, "1.1.0", "=1.20.1");

    let before = catalog.derived_rows().platform_compat;
    assert_eq!(
        before,
        vec![(a.0, old.0), (a.0, current.0), (b.0, current.0)]
    );

    catalog.store().delete_platform_version(old).unwrap();
    catalog.engine.on_platform_version_deleted(old).unwrap();

    assert_eq!(
        catalog.derived_rows().platform_compat,
        vec![(a.0, current.0), (b.0, current.0)]
    );
}

#[test]
fn new_platform_version_is_added_to_matching_releases() {
    let catalog = TestCatalog::new();
    catalog.platform("1.20.0");
    let sodium = catalog.artifact("sodium");
    let open = catalog.release(sodium, "1.0.0", ">=1.20");
    let pinned = catalog.release(sodium, "1.1.0", "=1.20.0");

    catalog.platform("1.21.0");

    assert_eq!(catalog.platform_versions_of(open), vec!["1.20.0", "1.21.0"]);
    assert_eq!(catalog.platform_versions_of(pinned), vec!["1.20.0"]);
}

#[test]
fn changing_platform_constraint_recomputes_rows() {
    let catalog = TestCatalog::new();
    for version in ["1.20.0", "1.21.0", "1.22.0"] {
        catalog.platform(version);
    }
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "1.0.0", "~1.20");

    catalog
        .store()
        .update_release(release, "1.0.0", "^1.21")
        .unwrap();
    catalog
        .engine
        .on_release_written(release, Some("~1.20"), Some("1.0.0"))
        .unwrap();

    assert_eq!(catalog.platform_versions_of(release), vec!["1.21.0", "1.22.0"]);
}

#[test]
fn changing_release_version_moves_it_between_requirements() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    let ids = catalog.releases(api, &["1.0.0", "1.1.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let v1 = catalog.require(release, api, "^1.0");
    let v2 = catalog.require(release, api, "^2.0");

    catalog.store().update_release(ids[1], "2.0.0", "").unwrap();
    catalog
        .engine
        .on_release_written(ids[1], Some(""), Some("1.1.0"))
        .unwrap();

    assert_eq!(catalog.matches_of(v1), vec!["1.0.0"]);
    assert_eq!(catalog.matches_of(v2), vec!["2.0.0"]);
}

#[test]
fn deleting_release_removes_its_rows_and_matches() {
    let catalog = TestCatalog::new();
    let pv = catalog.platform("1.20.0");
    let api = catalog.artifact("fabric-api");
    let ids = catalog.releases(api, &["1.0.0"]);
    let newest = catalog.release(api, "1.1.0", "*");
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let requirement = catalog.require(release, api, "^1.0");
    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0", "1.1.0"]);

    catalog.store().delete_release(newest).unwrap();
    catalog.engine.on_release_deleted(newest).unwrap();

    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0"]);
    let rows = catalog.derived_rows();
    assert!(!rows.platform_compat.contains(&(newest.0, pv.0)));
    assert_eq!(rows.requirement_matches, vec![(requirement.0, ids[0].0)]);
}

#[test]
fn deleting_dependant_release_drops_rows_of_its_requirements() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    catalog.require(release, api, "*");

    catalog.store().delete_release(release).unwrap();
    catalog.engine.on_release_deleted(release).unwrap();

    assert!(catalog.derived_rows().requirement_matches.is_empty());
    assert!(catalog.engine.verify().unwrap().is_empty());
}

#[test]
fn deleting_requirement_clears_its_matches() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let requirement = catalog.require(release, api, "^1.0");

    catalog.store().delete_requirement(requirement).unwrap();
    catalog.engine.on_requirement_deleted(requirement).unwrap();

    assert!(catalog.derived_rows().requirement_matches.is_empty());
}

#[test]
fn missing_target_artifact_resolves_to_empty_set() {
    let catalog = TestCatalog::new();
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    let requirement = catalog.require(release, ArtifactId(404), "^1.0");

    assert!(catalog.matches_of(requirement).is_empty());
}

#[test]
fn disabled_releases_still_resolve() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    let ids = catalog.releases(api, &["1.0.0"]);
    catalog.store().set_release_disabled(ids[0], true).unwrap();
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");

    let requirement = catalog.require(release, api, "*");

    let matches = catalog.engine.resolved_matches_for(requirement).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].disabled);
}

#[test]
fn resolved_rows_agree_with_matcher() {
    let catalog = TestCatalog::new();
    let platforms = ["1.19.4", "1.20.0", "1.20.1", "1.20.2-pre1", "1.21.0", "2.0.0"];
    for version in platforms {
        catalog.platform(version);
    }
    let sodium = catalog.artifact("sodium");
    let constraints = [
        "~1.20",
        "^1.20.1",
        ">=1.20 <1.21",
        "1.20.x",
        "*",
        "1.19.4 - 1.20.1",
        "<1.20 || >=2",
        "",
        "not a constraint",
    ];

    for (i, constraint) in constraints.iter().enumerate() {
        let release = catalog.release(sodium, &format!("0.{i}.0"), constraint);
        let resolved = catalog.platform_versions_of(release);
        for platform in platforms {
            assert_eq!(
                resolved.contains(&platform.to_string()),
                matches_str(constraint, platform),
                "{constraint:?} against {platform}"
            );
        }
    }
}

#[test]
fn rebuilding_unchanged_catalog_is_idempotent() {
    let catalog = TestCatalog::new();
    catalog.platform("1.20.0");
    catalog.platform("1.20.1");
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0", "1.1.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "~1.20");
    catalog.require(release, api, "^1.0");

    let before = catalog.derived_rows();
    let stats = catalog.engine.materialize_all().unwrap();

    assert_eq!(stats.changed, 0);
    assert_eq!(catalog.derived_rows(), before);
    assert!(catalog.engine.verify().unwrap().is_empty());
}

#[test]
fn rebuild_repairs_drifted_rows() {
    let catalog = TestCatalog::new();
    let pv = catalog.platform("1.20.0");
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "*");

    // Source write without the hook
    catalog
        .store()
        .update_release(release, "0.5.0", "<1.20")
        .unwrap();
    assert_eq!(catalog.engine.verify().unwrap().len(), 1);

    catalog.engine.materialize_all().unwrap();

    assert!(catalog.engine.verify().unwrap().is_empty());
    assert!(!catalog.derived_rows().platform_compat.contains(&(release.0, pv.0)));
}

#[test]
fn requirement_closing_a_cycle_is_rejected_and_not_persisted() {
    let catalog = TestCatalog::new();
    let a = catalog.artifact("a");
    let b = catalog.artifact("b");
    let c = catalog.artifact("c");
    let a1 = catalog.release(a, "1.0.0", "");
    let b1 = catalog.release(b, "1.0.0", "");
    let c1 = catalog.release(c, "1.0.0", "");
    catalog.require(a1, b, "*");
    catalog.require(b1, c, "*");

    assert!(catalog.engine.would_create_cycle(c1, a).unwrap());
    let result = catalog.engine.add_requirement(c1, a, "^1.0");

    assert!(matches!(
        result,
        Err(EngineError::Cycle(CycleDetected { path })) if path == vec![c, a, b, c]
    ));
    assert!(catalog.store().requirements_of_release(c1).unwrap().is_empty());
}

#[test]
fn declared_requirement_without_matches_still_counts_for_cycles() {
    let catalog = TestCatalog::new();
    let a = catalog.artifact("a");
    let b = catalog.artifact("b");
    let a1 = catalog.release(a, "1.0.0", "");
    let b1 = catalog.release(b, "1.0.0", "");
    // Nothing of b satisfies this yet
    catalog.require(a1, b, "^9.0");

    assert!(catalog.engine.would_create_cycle(b1, a).unwrap());
}

#[test]
fn self_dependency_is_a_cycle() {
    let catalog = TestCatalog::new();
    let a = catalog.artifact("a");
    let a1 = catalog.release(a, "1.0.0", "");

    let result = catalog.engine.add_requirement(a1, a, "*");
    assert!(matches!(result, Err(EngineError::Cycle(_))));
}

#[test]
fn retargeting_requirement_is_cycle_checked() {
    let catalog = TestCatalog::new();
    let a = catalog.artifact("a");
    let b = catalog.artifact("b");
    let c = catalog.artifact("c");
    let a1 = catalog.release(a, "1.0.0", "");
    let b1 = catalog.release(b, "1.0.0", "");
    catalog.require(a1, b, "*");
    let requirement = catalog.require(b1, c, "*");

    let result = catalog.engine.update_requirement(requirement, a, "*");

    assert!(matches!(result, Err(EngineError::Cycle(_))));
    let stored = catalog.store().requirements_of_release(b1).unwrap();
    assert_eq!(stored[0].target_artifact_id, c);
}

#[test]
fn advisory_cycle_policy_persists_requirement() {
    let mut config = EngineConfig::default();
    config.cycles.mode = CyclePolicy::Advisory;
    let catalog = TestCatalog::with_config(config);
    let a = catalog.artifact("a");
    let b = catalog.artifact("b");
    let a1 = catalog.release(a, "1.0.0", "");
    let b1 = catalog.release(b, "1.0.0", "");
    catalog.require(a1, b, "*");

    let requirement = catalog.engine.add_requirement(b1, a, "*").unwrap();

    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0"]);
}

#[test]
fn latest_matches_return_one_release_per_artifact() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0", "1.2.0", "1.10.0", "2.0.0"]);
    let lib = catalog.artifact("lib");
    catalog.releases(lib, &["0.2.0", "0.3.0"]);
    let sodium = catalog.artifact("sodium");
    let release = catalog.release(sodium, "0.5.0", "");
    catalog.require(release, api, "^1.0");
    catalog.require(release, api, ">=1.2 <2");
    let on_lib = catalog.require(release, lib, "*");

    let latest: Vec<_> = catalog
        .engine
        .latest_resolved_matches_for(release)
        .unwrap()
        .into_iter()
        .map(|r| (r.artifact_id, r.version))
        .collect();

    assert_eq!(
        latest,
        vec![(api, "1.10.0".to_string()), (lib, "0.3.0".to_string())]
    );
    let newest_lib = catalog
        .engine
        .latest_resolved_match_for_requirement(on_lib)
        .unwrap()
        .map(|r| r.version);
    assert_eq!(newest_lib.as_deref(), Some("0.3.0"));
}

#[test]
fn dependants_and_unconstrained_listings() {
    let catalog = TestCatalog::new();
    let api = catalog.artifact("fabric-api");
    catalog.releases(api, &["1.0.0"]);
    let sodium = catalog.artifact("sodium");
    let matched = catalog.release(sodium, "0.5.0", "^1.20");
    let unmatched = catalog.release(sodium, "0.6.0", "  ");
    catalog.require(matched, api, "^1.0");
    catalog.require(unmatched, api, "^3.0");

    let dependants: Vec<_> = catalog
        .engine
        .dependants_of(api)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(dependants, vec![matched]);

    let unconstrained: Vec<_> = catalog
        .engine
        .unconstrained_releases()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    // fabric-api 1.0.0 was created with a blank constraint too
    assert_eq!(unconstrained.len(), 2);
    assert!(unconstrained.contains(&unmatched));
}

/// Write the same catalog, routing every event through `emit`
fn populate(store: &Store, mut emit: impl FnMut(ChangeEvent)) {
    for version in ["1.20.0", "1.20.1", "1.21.0"] {
        let id = store.create_platform_version(version).unwrap();
        emit(ChangeEvent::PlatformVersionWritten {
            platform_version_id: id,
        });
    }

    let api = store.create_artifact("fabric-api").unwrap();
    let mut api_releases = Vec::new();
    for version in ["1.0.0", "1.1.0", "2.0.0"] {
        let id = store
            .create_release(&NewRelease::new(api, version, ">=1.20"))
            .unwrap();
        emit(ChangeEvent::release_created(id));
        api_releases.push(id);
    }

    let sodium = store.create_artifact("sodium").unwrap();
    let release = store
        .create_release(&NewRelease::new(sodium, "0.5.0", "~1.20"))
        .unwrap();
    emit(ChangeEvent::release_created(release));

    let requirement = store.create_requirement(release, api, "^1.0").unwrap();
    emit(ChangeEvent::RequirementWritten {
        requirement_id: requirement,
    });

    store.update_release(release, "0.5.0", "^1.20.1").unwrap();
    emit(ChangeEvent::release_updated(release, "~1.20", "0.5.0"));

    store.delete_release(api_releases[1]).unwrap();
    emit(ChangeEvent::release_deleted(api_releases[1], Some(api)));

    let obsolete = store.find_platform_version("1.20.0").unwrap().unwrap();
    store.delete_platform_version(obsolete).unwrap();
    emit(ChangeEvent::PlatformVersionDeleted {
        platform_version_id: obsolete,
    });
}

#[test]
fn batched_and_unbatched_resolution_reach_same_state() {
    let immediate = TestCatalog::new();
    populate(immediate.store(), |event| {
        immediate.engine.emit(event).unwrap();
    });

    let deferred = TestCatalog::new();
    let mut unit = deferred.engine.begin();
    populate(deferred.store(), |event| unit.emit(event).unwrap());
    assert_eq!(unit.state(), PropagatorState::Pending);
    // Nothing is resolved before commit
    assert!(deferred.derived_rows().platform_compat.is_empty());
    unit.commit().unwrap();

    assert_eq!(deferred.derived_rows(), immediate.derived_rows());
    assert!(deferred.engine.verify().unwrap().is_empty());
}

#[test]
fn immediate_unit_of_work_resolves_per_event() {
    let mut config = EngineConfig::default();
    config.propagation.mode = PropagationMode::Immediate;
    let catalog = TestCatalog::with_config(config);
    let mut unit = catalog.engine.begin();

    let pv = catalog.store().create_platform_version("1.20.0").unwrap();
    unit.on_platform_version_written(pv).unwrap();
    let sodium = catalog.artifact("sodium");
    let release = catalog
        .store()
        .create_release(&NewRelease::new(sodium, "0.5.0", "*"))
        .unwrap();
    unit.on_release_written(release, None, None).unwrap();

    assert_eq!(unit.state(), PropagatorState::Idle);
    assert_eq!(catalog.platform_versions_of(release), vec!["1.20.0"]);
    unit.commit().unwrap();
}

fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot {
        platform_versions: vec!["1.20.0".to_string(), "1.20.1".to_string()],
        artifacts: vec![
            ArtifactSnapshot {
                slug: "sodium".to_string(),
                releases: vec![ReleaseSnapshot {
                    version: "0.5.0".to_string(),
                    platform_constraint: "~1.20".to_string(),
                    disabled: false,
                    requirements: vec![RequirementSnapshot {
                        artifact: "fabric-api".to_string(),
                        constraint: "^1.0".to_string(),
                    }],
                }],
            },
            ArtifactSnapshot {
                slug: "fabric-api".to_string(),
                releases: ["1.0.0", "1.1.0", "2.0.0"]
                    .into_iter()
                    .map(|version| ReleaseSnapshot {
                        version: version.to_string(),
                        platform_constraint: "=1.20.1".to_string(),
                        ..Default::default()
                    })
                    .collect(),
            },
        ],
    }
}

#[test]
fn snapshot_import_resolves_every_derived_row() {
    let catalog = TestCatalog::new();

    let report = catalog.engine.import_snapshot(&snapshot()).unwrap();

    assert_eq!(report.artifacts, 2);
    assert_eq!(report.releases, 4);
    assert_eq!(report.requirements, 1);
    assert_eq!(report.platform_versions, 2);
    assert!(catalog.engine.verify().unwrap().is_empty());

    let sodium = catalog.store().find_artifact("sodium").unwrap().unwrap();
    let release = catalog.store().releases_of_artifact(sodium).unwrap()[0].id;
    assert_eq!(catalog.platform_versions_of(release), vec!["1.20.0", "1.20.1"]);
    let latest = catalog.engine.latest_resolved_matches_for(release).unwrap();
    assert_eq!(latest[0].version, "1.1.0");
}

#[test]
fn reimporting_same_snapshot_changes_nothing() {
    let catalog = TestCatalog::new();
    catalog.engine.import_snapshot(&snapshot()).unwrap();
    let before = catalog.derived_rows();

    let report = catalog.engine.import_snapshot(&snapshot()).unwrap();

    assert_eq!(report.artifacts, 0);
    assert_eq!(report.releases, 0);
    assert_eq!(report.requirements, 0);
    assert_eq!(report.flush.stats.changed, 0);
    assert_eq!(catalog.derived_rows(), before);
}

#[test]
fn snapshot_with_unknown_requirement_target_fails() {
    let catalog = TestCatalog::new();
    let mut snapshot = snapshot();
    snapshot.artifacts[0].releases[0].requirements[0].artifact = "missing".to_string();

    let result = catalog.engine.import_snapshot(&snapshot);

    assert!(matches!(result, Err(EngineError::UnknownArtifact(slug)) if slug == "missing"));
}

#[test]
fn snapshot_with_cyclic_requirements_is_rejected() {
    let catalog = TestCatalog::new();
    let mut snapshot = snapshot();
    snapshot.artifacts[1].releases[0].requirements.push(RequirementSnapshot {
        artifact: "sodium".to_string(),
        constraint: "*".to_string(),
    });

    let result = catalog.engine.import_snapshot(&snapshot);

    assert!(matches!(result, Err(EngineError::Cycle(_))));
    // sodium and its requirement were written before the rejection
    let sodium = catalog.store().find_artifact("sodium").unwrap().unwrap();
    let release = catalog.store().releases_of_artifact(sodium).unwrap()[0].id;
    assert_eq!(catalog.platform_versions_of(release), vec!["1.20.0", "1.20.1"]);
    assert!(catalog.engine.verify().unwrap().is_empty());
}

#[test]
fn reimport_with_changed_constraint_updates_requirement() {
    let catalog = TestCatalog::new();
    catalog.engine.import_snapshot(&snapshot()).unwrap();
    let mut snapshot = snapshot();
    snapshot.artifacts[0].releases[0].requirements[0].constraint = "^2.0".to_string();

    let report = catalog.engine.import_snapshot(&snapshot).unwrap();

    assert_eq!(report.requirements, 1);
    let sodium = catalog.store().find_artifact("sodium").unwrap().unwrap();
    let release = catalog.store().releases_of_artifact(sodium).unwrap()[0].id;
    let requirements = catalog.store().requirements_of_release(release).unwrap();
    assert_eq!(requirements.len(), 1);
    assert_eq!(requirements[0].constraint, "^2.0");
    assert_eq!(catalog.matches_of(requirements[0].id), vec!["2.0.0"]);
    assert!(catalog.engine.verify().unwrap().is_empty());
}

#[test]
fn deleting_release_rechecks_requirements_on_its_artifact() {
    let catalog = TestCatalog::new();
    catalog.engine.import_snapshot(&snapshot()).unwrap();
    let api = catalog.store().find_artifact("fabric-api").unwrap().unwrap();
    let api_releases = catalog.store().releases_of_artifact(api).unwrap();
    let sodium = catalog.store().find_artifact("sodium").unwrap().unwrap();
    let release = catalog.store().releases_of_artifact(sodium).unwrap()[0].id;
    let requirement = catalog.store().requirements_of_release(release).unwrap()[0].id;
    // Leave the requirement without any match row for 2.0.0 to point at
    catalog
        .store()
        .replace_requirement_matches(requirement, &[])
        .unwrap();
    let removed = api_releases.iter().find(|r| r.version == "2.0.0").unwrap().id;

    catalog.engine.delete_release(removed).unwrap();

    assert_eq!(catalog.matches_of(requirement), vec!["1.0.0", "1.1.0"]);
    assert!(catalog.engine.verify().unwrap().is_empty());
}

#[test]
fn deleting_unknown_release_fails() {
    let catalog = TestCatalog::new();

    let result = catalog.engine.delete_release(ReleaseId(42));

    assert!(matches!(result, Err(EngineError::ReleaseNotFound(ReleaseId(42)))));
}
