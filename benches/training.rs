use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use student_dropout::data::{FeatureFrame, FeatureSchema};
use student_dropout::preprocessing::build_preprocessors;
use student_dropout::synthetic::{Sampler, SMOTE};
use student_dropout::training::{resampling_scores, CrossValidator, LogisticRegression};

fn create_student_data(n_rows: usize) -> (FeatureFrame, Array1<i64>) {
    let schema = FeatureSchema::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let y = Array1::from_iter((0..n_rows).map(|_| rng.gen_bool(0.35) as i64));
    let categorical = Array2::from_shape_fn((n_rows, schema.categorical.len()), |_| {
        rng.gen_range(0..4).to_string()
    });
    let numeric = Array2::from_shape_fn((n_rows, schema.numeric.len()), |(i, j)| {
        let shift = if y[i] == 1 { -2.0 } else { 2.0 };
        rng.gen::<f64>() * 10.0 + if j >= 3 { shift } else { 0.0 }
    });

    (FeatureFrame::new(categorical, numeric).unwrap(), y)
}

fn bench_resampled_cv(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampled_cv");
    group.sample_size(10);

    let (_, robust) = build_preprocessors(&FeatureSchema::default());
    let cv = CrossValidator::default();
    let model = LogisticRegression::new();

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_student_data(*n_rows);
        group.bench_with_input(BenchmarkId::new("f2", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| resampling_scores(&model, black_box(x), black_box(y), &robust, &cv).unwrap())
        });
    }

    group.finish();
}

fn bench_smote(c: &mut Criterion) {
    let mut group = c.benchmark_group("smote");

    for n_rows in [500, 2000].iter() {
        let (frame, y) = create_student_data(*n_rows);
        let (_, mut robust) = build_preprocessors(&FeatureSchema::default());
        let x = robust.fit_transform(&frame).unwrap();

        group.bench_with_input(BenchmarkId::new("fit_resample", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let mut smote = SMOTE::new().with_seed(42);
                smote.fit_resample(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_logistic_fit(c: &mut Criterion) {
    let (frame, y) = create_student_data(2000);
    let (_, mut robust) = build_preprocessors(&FeatureSchema::default());
    let x = robust.fit_transform(&frame).unwrap();

    c.bench_function("logistic_fit_2000", |b| {
        b.iter(|| {
            let mut model = LogisticRegression::new().with_max_iter(200);
            model.fit(black_box(&x), black_box(&y)).unwrap();
        })
    });
}

criterion_group!(benches, bench_resampled_cv, bench_smote, bench_logistic_fit);
criterion_main!(benches);
