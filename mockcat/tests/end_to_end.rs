//! Full catalog builds over shards written to disk

use approx::assert_relative_eq;
use mockcat::pipeline::{FILTER_CATALOG_FILE, GALAXY_CATALOG_FILE, GROUP_CATALOG_FILE};
use mockcat::text::{ids_below_threshold_in_file, read_catalog, read_header, MAGNITUDE_ID_COLUMN};
use mockcat::{
    discover, CatalogBuild, CatalogConfig, CatalogError, FilterName, IdMismatch, JsonShardStore,
};
use test_helpers::{apparent_magnitude, ra_of, FixtureDir, SedShard};

fn config_for(fixture: &FixtureDir) -> CatalogConfig {
    CatalogConfig {
        sed_dir: fixture.sed_dir(),
        light_cone_dir: fixture.light_cone_dir(),
        output_dir: fixture.output_dir(),
        ..CatalogConfig::default()
    }
}

fn standard_fixture(ids: &[i64]) -> FixtureDir {
    let fixture = FixtureDir::new().unwrap();
    fixture
        .write_sed_group("run1", ids, &["u_VST", "Z_VISTA"], 3)
        .unwrap();
    fixture.write_sed_group("run2", ids, &["K_VISTA"], 2).unwrap();
    let mut shuffled = ids.to_vec();
    shuffled.reverse();
    fixture.write_light_cone(&shuffled, 2).unwrap();
    fixture
}

fn names(list: &[&str]) -> Vec<FilterName> {
    list.iter().map(|n| FilterName::new(n)).collect()
}

#[test]
fn test_discover_on_disk() {
    let ids: Vec<i64> = (1..=12).collect();
    let fixture = standard_fixture(&ids);
    let config = config_for(&fixture);

    let filters = discover(
        &JsonShardStore::new(),
        &fixture.sed_dir(),
        &config.naming,
        &config.sed,
    )
    .unwrap();
    // run2 sorts after run1, so the descending scan sees it first.
    assert_eq!(filters, names(&["K_VISTA", "u_VST", "Z_VISTA"]));
}

#[test]
fn test_build_and_write_catalogs() {
    let ids: Vec<i64> = (0..=30).collect();
    let fixture = standard_fixture(&ids);
    let config = config_for(&fixture);
    let store = JsonShardStore::new();

    let output = CatalogBuild::new(&store, &config)
        .run(&names(&["u_VST", "K_VISTA"]))
        .unwrap();

    assert_eq!(output.resolved.requested, names(&["u_VST", "K_VISTA", "Z_VISTA"]));
    assert_eq!(output.resolved.groups.len(), 2);
    // Id 0 is the sentinel and never reaches any catalog.
    assert_eq!(output.magnitudes.len(), ids.len() - 1);
    assert_eq!(output.invalid_magnitude_rows, 1);
    assert!(apparent_magnitude(0, "Z_VISTA") < config.magnitude_limit);

    let expected: Vec<i64> = ids
        .iter()
        .copied()
        .filter(|&id| id != 0 && apparent_magnitude(id, "Z_VISTA") < config.magnitude_limit)
        .collect();
    assert_eq!(output.selected_ids, expected);
    assert!(!expected.is_empty());

    let joined = &output.galaxies;
    assert_eq!(joined.report.invalid_ids, 1);
    assert_eq!(joined.report.unmeasured, 0);
    assert_eq!(joined.report.input_rows, expected.len() + 1);
    assert_eq!(joined.table.len(), expected.len());
    assert_eq!(
        joined.table.header(),
        vec![
            "id_galaxy_sky",
            "ra",
            "dec",
            "zobs",
            "zcos",
            "zcmb",
            "u_VST_ap",
            "u_VST_ab",
            "K_VISTA_ap",
            "K_VISTA_ab",
            "Z_VISTA_ap",
            "Z_VISTA_ab",
        ]
    );

    let joined_ids: Vec<i64> = joined.table.ids().iter().map(|id| id.unwrap()).collect();
    let mut sorted = joined_ids.clone();
    sorted.sort();
    assert_eq!(joined_ids, sorted);

    let ra = &joined.table.column("ra").unwrap().values;
    let z_ap = &joined.table.column("Z_VISTA_ap").unwrap().values;
    for (row, &id) in joined_ids.iter().enumerate() {
        assert_relative_eq!(ra[row], ra_of(id));
        assert_relative_eq!(z_ap[row], apparent_magnitude(id, "Z_VISTA"));
    }
    assert_eq!(output.groups.ids(), &[Some(1), Some(2)]);

    let written = output.write_to(&config.output_dir).unwrap();
    assert_eq!(written.len(), 3);

    let out = config.output_dir.as_path();
    let filter_catalog = out.join(FILTER_CATALOG_FILE);
    assert_eq!(read_header(&filter_catalog, MAGNITUDE_ID_COLUMN).unwrap()[0], "ID");
    let from_file =
        ids_below_threshold_in_file(&filter_catalog, MAGNITUDE_ID_COLUMN, "Z_VISTA_ap", 25.0).unwrap();
    assert_eq!(from_file, expected);

    let galaxies = read_catalog(&out.join(GALAXY_CATALOG_FILE), "id_galaxy_sky").unwrap();
    assert_eq!(galaxies.ids(), joined.table.ids());
    assert_relative_eq!(
        galaxies.column("K_VISTA_ab").unwrap().values[0],
        joined.table.column("K_VISTA_ab").unwrap().values[0],
        epsilon = 1e-12
    );

    let groups = read_catalog(&out.join(GROUP_CATALOG_FILE), "id_group_sky").unwrap();
    assert_eq!(groups.len(), 2);
    assert!(matches!(
        read_catalog(&out.join(GROUP_CATALOG_FILE), MAGNITUDE_ID_COLUMN),
        Err(CatalogError::MalformedHeader { .. })
    ));
}

#[test]
fn test_sentinel_ids_missing_from_light_cone_are_dropped() {
    let fixture = FixtureDir::new().unwrap();
    let shard = SedShard {
        ids: vec![Some(1), Some(0), Some(2), Some(0)],
        filters: vec!["Z_VISTA".to_string()],
        apparent: vec![vec![20.0; 4]],
        absolute: vec![vec![-20.0; 4]],
    };
    test_helpers::write_sed_shard(&fixture.sed_dir(), "run1_SED_00.hdf5", &shard).unwrap();
    fixture.write_light_cone(&[1, 2], 1).unwrap();
    let config = config_for(&fixture);

    let output = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["Z_VISTA"]))
        .unwrap();
    assert_eq!(output.selected_ids, vec![1, 2]);
    assert_eq!(output.invalid_magnitude_rows, 2);
    assert_eq!(output.galaxies.table.ids(), &[Some(1), Some(2)]);
    assert_eq!(output.galaxies.report.invalid_ids, 2);
    assert_eq!(output.galaxies.report.input_rows, 4);
    assert_eq!(output.galaxies.report.output_rows(), 2);
}

#[test]
fn test_magnitude_catalog_skips_null_ids() {
    let fixture = FixtureDir::new().unwrap();
    let shard = SedShard {
        ids: vec![Some(1), None, Some(2)],
        filters: vec!["Z_VISTA".to_string()],
        apparent: vec![vec![20.0, 21.0, 22.0]],
        absolute: vec![vec![-20.0, -21.0, -22.0]],
    };
    test_helpers::write_sed_shard(&fixture.sed_dir(), "run1_SED_00.hdf5", &shard).unwrap();
    fixture.write_light_cone(&[1, 2], 1).unwrap();
    let config = config_for(&fixture);

    let output = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["Z_VISTA"]))
        .unwrap();
    assert_eq!(output.invalid_magnitude_rows, 1);
    output.write_to(&config.output_dir).unwrap();

    let path = config.output_dir.join(FILTER_CATALOG_FILE);
    let written = read_catalog(&path, MAGNITUDE_ID_COLUMN).unwrap();
    assert_eq!(written.ids(), &[Some(1), Some(2)]);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.lines().any(|line| line.starts_with("NaN")));
}

#[test]
fn test_representative_without_filters_is_skipped() {
    let ids: Vec<i64> = (1..=6).collect();
    let fixture = standard_fixture(&ids);
    test_helpers::write_sed_shard(&fixture.sed_dir(), "empty_SED_00.hdf5", &SedShard::default())
        .unwrap();
    let config = config_for(&fixture);

    let filters = discover(
        &JsonShardStore::new(),
        &fixture.sed_dir(),
        &config.naming,
        &config.sed,
    )
    .unwrap();
    assert_eq!(filters, names(&["K_VISTA", "u_VST", "Z_VISTA"]));

    let output = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["K_VISTA"]))
        .unwrap();
    assert_eq!(output.resolved.groups.len(), 2);
}

#[test]
fn test_diverging_groups_abort_the_build() {
    let fixture = FixtureDir::new().unwrap();
    fixture
        .write_sed_group("run1", &[1, 2, 3], &["Z_VISTA"], 1)
        .unwrap();
    fixture.write_sed_group("run2", &[1, 3, 2], &["K_VISTA"], 1).unwrap();
    fixture.write_light_cone(&[1, 2, 3], 1).unwrap();
    let config = config_for(&fixture);

    let err = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["Z_VISTA", "K_VISTA"]))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::IdentifierMismatch(IdMismatch::Position { index: 1, .. })
    ));
    assert!(!config.output_dir.exists());
}

#[test]
fn test_light_cone_missing_selected_galaxy() {
    let ids: Vec<i64> = (1..=10).collect();
    let fixture = FixtureDir::new().unwrap();
    fixture.write_sed_group("run1", &ids, &["Z_VISTA"], 2).unwrap();
    // Every galaxy is bright, but the light cone lacks id 4.
    let light_cone: Vec<i64> = ids.iter().copied().filter(|&id| id != 4).collect();
    fixture.write_light_cone(&light_cone, 2).unwrap();
    let mut config = config_for(&fixture);
    config.magnitude_limit = 99.0;

    let err = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&[])
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::IdentifierMismatch(IdMismatch::Length { left: 9, right: 10 })
    ));
}

#[test]
fn test_unknown_filter_is_reported() {
    let fixture = standard_fixture(&[1, 2, 3]);
    let config = config_for(&fixture);
    let err = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["W1_WISE"]))
        .unwrap_err();
    assert!(matches!(err, CatalogError::FilterNotFound { ref filter } if filter == "W1_WISE"));
}

#[test]
fn test_null_magnitudes_in_shard() {
    let fixture = FixtureDir::new().unwrap();
    let shard = SedShard {
        ids: vec![Some(1), Some(2), Some(3)],
        filters: vec!["Z_VISTA".to_string(), "F".to_string()],
        apparent: vec![vec![20.0, 21.0, 22.0], vec![10.0, 20.0, f64::NAN]],
        absolute: vec![vec![-20.0, -21.0, -22.0], vec![-10.0, -20.0, f64::NAN]],
    };
    test_helpers::write_sed_shard(&fixture.sed_dir(), "solo_SED_00.hdf5", &shard).unwrap();
    fixture.write_light_cone(&[3, 1, 2], 1).unwrap();
    let mut config = config_for(&fixture);
    config.selection_filter = FilterName::new("F");

    let output = CatalogBuild::new(&JsonShardStore::new(), &config)
        .run(&names(&["Z_VISTA", "F"]))
        .unwrap();
    // Only F drives the selection, so id 3 with a null F never gets that far.
    assert_eq!(output.selected_ids, vec![1, 2]);
    assert_eq!(output.galaxies.table.ids(), &[Some(1), Some(2)]);
}
