//! End-to-end tests: load third-party datasets, write dust files, read them back

use approx::assert_relative_eq;
use dust::{
    DustError, DustModel, DustSource, ScatteringElement, SublimationMode, SublimationPolicy,
};
use shared::table_set::TableSet;
use tempfile::tempdir;
use test_helpers::fixtures::{write_bhmie, write_miex, write_simple, SyntheticDust};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_simple_dust_round_trip() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(30, 2);
    let path = write_simple(dir.path(), &dust).unwrap();

    let mut model = DustModel::from_source(&DustSource::Simple { path }).unwrap();
    let md5 = model.md5().map(str::to_string);
    assert_eq!(md5.as_ref().map(String::len), Some(32));

    let output = dir.path().join("simple.dust");
    model.write(&output, true).unwrap();
    assert_eq!(model.filename(), Some(output.as_path()));

    let back = DustModel::read(&output).unwrap();
    assert_eq!(back.md5().map(str::to_string), md5);
    assert_eq!(back.filename(), Some(output.as_path()));

    let (a, b) = (model.optical_properties(), back.optical_properties());
    assert_eq!(a.n_mu(), 100);
    assert_eq!(b.n_mu(), 100);
    assert_eq!(b.n_wav(), 30);
    for j in 0..30 {
        assert_relative_eq!(a.nu()[j], b.nu()[j], max_relative = 1e-14);
        assert_relative_eq!(a.albedo()[j], b.albedo()[j], max_relative = 1e-14);
        assert_relative_eq!(a.chi()[j], b.chi()[j], max_relative = 1e-14);
    }
    for element in ScatteringElement::ALL {
        let (ma, mb) = (a.matrix(element).unwrap(), b.matrix(element).unwrap());
        assert_eq!(ma.dim(), mb.dim());
        for (x, y) in ma.iter().zip(mb.iter()) {
            assert_relative_eq!(*x, *y, max_relative = 1e-14);
        }
    }

    assert_eq!(back.emissivities(), model.emissivities());
    assert_eq!(back.mean_opacities(), model.mean_opacities());
}

#[test]
fn test_uncompressed_file_is_readable_json() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(8, 5);
    let model_prefix = write_bhmie(dir.path(), "grains", &dust).unwrap();

    let mut model = DustModel::from_source(&DustSource::Bhmie {
        model: model_prefix,
    })
    .unwrap();
    let output = dir.path().join("grains.dust");
    model.write(&output, false).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["keywords"]["version"], 1);
    assert_eq!(json["keywords"]["type"], 1);
    assert_eq!(json["keywords"]["sublimation_mode"], "no");

    let back = DustModel::read(&output).unwrap();
    assert_eq!(back.optical_properties(), model.optical_properties());
}

#[test]
fn test_version_two_is_rejected_without_mutation() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(6, 4);
    let model_prefix = write_miex(dir.path(), "silicate", &dust).unwrap();
    let mut model = DustModel::from_source(&DustSource::Miex {
        model: model_prefix,
    })
    .unwrap();

    let mut ts: TableSet = model.to_table_set().unwrap();
    ts.add_keyword("version", 2);
    let future = dir.path().join("future.dust");
    ts.write(&future, true).unwrap();

    let before = model.clone();
    let err = model.reload(&future).unwrap_err();
    assert!(matches!(err, DustError::VersionMismatch(2)));

    assert_eq!(model.optical_properties(), before.optical_properties());
    assert_eq!(model.sublimation(), before.sublimation());
    assert_eq!(model.filename(), before.filename());
    assert_eq!(model.emissivities(), before.emissivities());
}

#[test]
fn test_reload_replaces_model() {
    init_logger();
    let dir = tempdir().unwrap();

    let mut first = DustModel::from_source(&DustSource::Bhmie {
        model: write_bhmie(dir.path(), "a", &SyntheticDust::new(5, 3)).unwrap(),
    })
    .unwrap();
    let mut second = DustModel::from_source(&DustSource::Bhmie {
        model: write_bhmie(dir.path(), "b", &SyntheticDust::new(7, 4)).unwrap(),
    })
    .unwrap();
    second
        .set_sublimation_temperature(SublimationMode::Slow, Some(1400.0))
        .unwrap();
    let path = dir.path().join("b.dust");
    second.write(&path, true).unwrap();

    first.reload(&path).unwrap();
    assert_eq!(first.optical_properties().n_wav(), 7);
    assert_eq!(first.optical_properties().n_mu(), 4);
    assert_eq!(first.sublimation(), second.sublimation());
    assert_eq!(first.filename(), Some(path.as_path()));
}

#[test]
fn test_raw_arrays_five_by_three() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(5, 3);
    let model = DustModel::from_source(&DustSource::Bhmie {
        model: write_bhmie(dir.path(), "bh", &dust).unwrap(),
    })
    .unwrap();

    for element in ScatteringElement::ALL {
        let m = model.optical_properties().matrix(element).unwrap();
        assert_eq!(m.dim(), (5, 3));
        assert!(m.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_sublimation_temperature_equivalence() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(40, 3);
    let source = DustSource::Simple {
        path: write_simple(dir.path(), &dust).unwrap(),
    };

    let mut by_temperature = DustModel::from_source(&source).unwrap();
    by_temperature
        .set_sublimation_temperature(SublimationMode::Fast, Some(1500.0))
        .unwrap();

    let mut by_energy = DustModel::from_source(&source).unwrap();
    let energy = by_energy
        .optical_properties()
        .temperature_to_specific_energy(1500.0)
        .unwrap();
    by_energy
        .set_sublimation_specific_energy(SublimationMode::Fast, Some(energy))
        .unwrap();

    assert_eq!(by_temperature.sublimation(), by_energy.sublimation());

    let (a, b) = (dir.path().join("t.dust"), dir.path().join("e.dust"));
    by_temperature.write(&a, false).unwrap();
    by_energy.write(&b, false).unwrap();

    let (ta, tb) = (TableSet::read(&a).unwrap(), TableSet::read(&b).unwrap());
    assert_eq!(ta.keywords.text("sublimation_mode").unwrap(), "fast");
    assert_eq!(
        ta.keywords.float("sublimation_specific_energy").unwrap(),
        tb.keywords.float("sublimation_specific_energy").unwrap()
    );
}

#[test]
fn test_slow_sublimation_without_threshold_fails() {
    let mut model = DustModel::new();
    let result = model.set_sublimation_temperature(SublimationMode::Slow, None);
    assert!(matches!(
        result,
        Err(DustError::MissingSublimationThreshold(SublimationMode::Slow))
    ));
    assert_eq!(model.sublimation(), SublimationPolicy::None);
}

#[test]
fn test_unknown_mode_string_fails() {
    assert!(matches!(
        "sublimate".parse::<SublimationMode>(),
        Err(DustError::InvalidSublimationMode(_))
    ));
}

#[test]
fn test_write_to_output_dir() {
    init_logger();
    let dir = tempdir().unwrap();
    let dust = SyntheticDust::new(20, 2);
    let mut model = DustModel::from_source(&DustSource::Simple {
        path: write_simple(dir.path(), &dust).unwrap(),
    })
    .unwrap();
    model
        .set_sublimation_specific_energy(SublimationMode::Cap, Some(3e11))
        .unwrap();

    let path = test_helpers::output_path("simple_cap.dust");
    model.write(&path, true).unwrap();

    let back = DustModel::read(&path).unwrap();
    assert_eq!(
        back.sublimation(),
        SublimationPolicy::Cap {
            specific_energy: 3e11
        }
    );
}

#[test]
fn test_isotropic_mean_opacities_equal_chi() {
    init_logger();
    let wav: Vec<f64> = (0..80).map(|i| 0.05 * 1.15_f64.powi(i)).collect();
    let chi = vec![25.0; wav.len()];
    let albedo = vec![0.4; wav.len()];
    let mut model = DustModel::from_source(&DustSource::Isotropic { wav, chi, albedo }).unwrap();

    let mean = model.ensure_mean_opacities().unwrap();
    for i in 0..mean.specific_energy().len() {
        assert_relative_eq!(mean.chi_planck()[i], 25.0, max_relative = 1e-9);
        assert_relative_eq!(mean.kappa_rosseland()[i], 15.0, max_relative = 1e-9);
    }
}
