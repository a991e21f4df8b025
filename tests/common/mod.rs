//! Synthetic student records shared by the integration tests

#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use student_dropout::data::{prepare_frame, write_csv, FeatureSchema, ReferenceData};
use student_dropout::export::ModelArtifact;
use student_dropout::optimizer::LogisticParamGrid;
use student_dropout::training::{PipelineConfig, Penalty, Solver, TrainEngine};

/// Raw records with the full column set and a textual `Status`.
///
/// Roughly one in ten rows is `Enrolled`; dropouts get fewer approved units,
/// lower grades and more unpaid tuition.
pub fn raw_students(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut status = Vec::with_capacity(n);
    let mut cat: Vec<Vec<i64>> = vec![Vec::with_capacity(n); 11];
    let mut admission = Vec::with_capacity(n);
    let mut prev_grade = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut grade1 = Vec::with_capacity(n);
    let mut grade2 = Vec::with_capacity(n);
    let mut units: Vec<Vec<i64>> = vec![Vec::with_capacity(n); 10];

    for _ in 0..n {
        let roll: f64 = rng.gen();
        let label = if roll < 0.1 {
            "Enrolled"
        } else if roll < 0.45 {
            "Dropout"
        } else {
            "Graduate"
        };
        let dropout = label == "Dropout";
        status.push(label);

        cat[0].push(if rng.gen_bool(0.85) { 1 } else { 2 });
        cat[1].push([1, 17, 39][rng.gen_range(0..3)]);
        cat[2].push(if rng.gen_bool(0.9) { 1 } else { 0 });
        cat[3].push(if rng.gen_bool(0.8) { 1 } else { 3 });
        cat[4].push(rng.gen_range(0..2));
        cat[5].push(if rng.gen_bool(0.97) { 0 } else { 1 });
        cat[6].push(if dropout { rng.gen_bool(0.6) as i64 } else { rng.gen_bool(0.97) as i64 });
        cat[7].push(rng.gen_range(0..2));
        cat[8].push(if dropout { rng.gen_bool(0.1) as i64 } else { rng.gen_bool(0.35) as i64 });
        cat[9].push(if rng.gen_bool(0.95) { 0 } else { 1 });
        cat[10].push([33, 171, 9500, 9773][rng.gen_range(0..4)]);

        admission.push(rng.gen_range(100.0..180.0_f64));
        prev_grade.push(rng.gen_range(100.0..180.0_f64));
        age.push(rng.gen_range(18..40_i64));
        let (lo, hi) = if dropout { (0.0, 11.0) } else { (10.5, 16.0) };
        grade1.push(rng.gen_range(lo..hi));
        grade2.push(rng.gen_range(lo..hi));

        for sem in 0..2 {
            let enrolled = rng.gen_range(5..8_i64);
            let approved = if dropout { rng.gen_range(0..4) } else { rng.gen_range(4..=enrolled) };
            units[sem * 5].push(rng.gen_range(0..2));
            units[sem * 5 + 1].push(enrolled);
            units[sem * 5 + 2].push(enrolled + rng.gen_range(0..4));
            units[sem * 5 + 3].push(approved);
            units[sem * 5 + 4].push(if dropout { rng.gen_range(0..3) } else { 0 });
        }
    }

    let names = FeatureSchema::default();
    let mut columns: Vec<Column> = Vec::new();
    for (name, values) in names.categorical.iter().zip(cat) {
        columns.push(Column::new(name.as_str().into(), values));
    }
    columns.push(Column::new("Admission_grade".into(), admission));
    columns.push(Column::new("Previous_qualification_grade".into(), prev_grade));
    columns.push(Column::new("Age_at_enrollment".into(), age));
    columns.push(Column::new("Curricular_units_1st_sem_grade".into(), grade1));
    columns.push(Column::new("Curricular_units_2nd_sem_grade".into(), grade2));
    let unit_names = names.numeric[5..].to_vec();
    for (name, values) in unit_names.iter().zip(units) {
        columns.push(Column::new(name.as_str().into(), values));
    }

    columns.push(Column::new("Nacionality".into(), vec![1i64; n]));
    columns.push(Column::new("Application_order".into(), (0..n as i64).map(|i| i % 6 + 1).collect::<Vec<_>>()));
    columns.push(Column::new("Unemployment_rate".into(), vec![10.8f64; n]));
    columns.push(Column::new("Inflation_rate".into(), vec![1.4f64; n]));
    columns.push(Column::new("GDP".into(), vec![1.74f64; n]));
    columns.push(Column::new("Mothers_qualification".into(), vec![19i64; n]));
    columns.push(Column::new("Fathers_qualification".into(), vec![12i64; n]));
    columns.push(Column::new("Mothers_occupation".into(), vec![5i64; n]));
    columns.push(Column::new("Fathers_occupation".into(), vec![9i64; n]));
    columns.push(Column::new("Debtor".into(), vec![0i64; n]));
    columns.push(Column::new("Status".into(), status));

    DataFrame::new(columns).expect("fixture frame")
}

/// Prepared (filtered, encoded) records
pub fn prepared_students(n: usize, seed: u64) -> DataFrame {
    prepare_frame(&raw_students(n, seed)).expect("prepare fixture")
}

pub fn write_raw_csv(dir: &Path, n: usize, seed: u64) -> PathBuf {
    let path = dir.join("students.csv");
    let mut df = raw_students(n, seed);
    write_csv(&mut df, &path).expect("write fixture csv");
    path
}

/// Four candidates; keeps integration runs quick
pub fn small_grid() -> LogisticParamGrid {
    LogisticParamGrid {
        c: vec![0.1, 1.0],
        l1_ratio: vec![0.5],
        max_iter: vec![200],
        penalty: vec![Penalty::L2, Penalty::ElasticNet],
        solver: vec![Solver::Saga],
    }
}

pub fn small_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_param_grid(small_grid())
        .with_n_jobs(2)
}

/// One artifact trained per test binary
pub fn trained_artifact() -> &'static ModelArtifact {
    static ARTIFACT: OnceLock<ModelArtifact> = OnceLock::new();
    ARTIFACT.get_or_init(|| {
        let df = prepared_students(240, 7);
        let outcome = TrainEngine::new(small_config()).train(&df).expect("training fixture");
        outcome.to_artifact()
    })
}

pub fn reference_data() -> ReferenceData {
    ReferenceData::from_frame(&prepared_students(240, 7), &FeatureSchema::default()).expect("reference fixture")
}
