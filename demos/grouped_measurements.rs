use correlation_pca::{Dataset, PCA};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Three groups of 50 samples; four measurements, the first three driven by the group.
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let unit = Normal::new(0.0, 1.0)?;
    let tight = Normal::new(0.0, 0.3)?;
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (name, center) in [("low", -3.0), ("mid", 0.0), ("high", 3.0)] {
        for _ in 0..50 {
            let t = center + unit.sample(&mut rng);
            rows.extend([
                t + tight.sample(&mut rng),
                t + tight.sample(&mut rng),
                t + unit.sample(&mut rng),
                unit.sample(&mut rng),
            ]);
            labels.push(name);
        }
    }
    let data = ndarray::Array2::from_shape_vec((labels.len(), 4), rows)?;
    let dataset = Dataset::new(data)?
        .with_feature_names(["length", "width", "depth", "noise"])?
        .with_labels(labels)?;

    let output = PCA::new().fit(&dataset, 2)?;

    println!("Backend: {}", PCA::new().solver().backend_name());
    println!("{:>4} {:>12} {:>9} {:>12}", "PC", "eigenvalue", "percent", "cumulative");
    for c in output.variance_report().iter() {
        println!(
            "{:>4} {:>12.4} {:>8.2}% {:>11.2}%",
            c.component, c.eigenvalue, c.percent, c.cumulative_percent
        );
    }

    println!("\nLoadings:");
    for (name, row) in output
        .feature_names()
        .iter()
        .zip(output.projection().matrix().rows())
    {
        println!("{:>8} {:>8.4} {:>8.4}", name, row[0], row[1]);
    }

    println!("\nFirst rows of each group:");
    for (label, scores) in output.projected().labeled_rows().step_by(50) {
        println!("{:>8} {:>8.4} {:>8.4}", label.unwrap_or("-"), scores[0], scores[1]);
    }

    println!("\n{}", serde_json::to_string_pretty(output.variance_report())?);
    Ok(())
}
