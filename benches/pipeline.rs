use correlation_pca::{Dataset, Eigensolver, EigensolverProvider, JacobiEigensolver, PCA};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::hint::black_box;

fn generate_data(n_samples: usize, n_features: usize) -> Array2<f64> {
    Array::random((n_samples, n_features), Uniform::new(0., 10.))
}

// Full pipeline: standardize, correlate, eigendecompose, select, project.
fn bench_pipeline_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("PCA_fit");

    for &(n_samples, n_features) in [(150, 4), (1000, 20), (500, 60)].iter() {
        let dataset = Dataset::new(generate_data(n_samples, n_features)).unwrap();
        let n_components = n_features.min(3);
        let pca = PCA::new();
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        group.bench_with_input(
            BenchmarkId::new("fit", format!("{}x{}", n_samples, n_features)),
            &dataset,
            |b, dataset| b.iter(|| pca.fit(black_box(dataset), n_components).unwrap()),
        );
    }
    group.finish();
}

fn bench_eigensolvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("eigendecompose");

    for &n_features in [4usize, 20, 60].iter() {
        let data = generate_data(4 * n_features, n_features);
        let correlation = PCA::new()
            .fit(&Dataset::new(data).unwrap(), 1)
            .unwrap()
            .correlation()
            .matrix()
            .clone();
        let jacobi = JacobiEigensolver::default();
        let provider = EigensolverProvider::default();
        group.bench_with_input(
            BenchmarkId::new("jacobi", n_features),
            &correlation,
            |b, matrix| b.iter(|| jacobi.eigendecompose(black_box(matrix.view())).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new(provider.backend_name(), n_features),
            &correlation,
            |b, matrix| b.iter(|| provider.eigendecompose(black_box(matrix.view())).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline_fit, bench_eigensolvers);
criterion_main!(benches);
