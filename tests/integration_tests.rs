use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use cloud_sift::binary::{dump_to_text, PointFile};
use cloud_sift::external_sort::{sort_and_encode, sort_to_text, ExternalSortConfig};
use cloud_sift::query::{run_query, QueryConfig, TargetVariable};
use cloud_sift::PointError;

/// Helper function to create a scrambled point cloud text file
fn create_test_data(temp_dir: &TempDir, n: usize) -> Result<(PathBuf, Vec<(f64, f64, f64, i64)>)> {
    let mut points = Vec::with_capacity(n);
    let mut lines = Vec::with_capacity(n);
    for i in 0..n {
        let x = ((i * 7919) % 1000) as f64 * 0.25;
        let y = ((i * 104_729) % 400) as f64 * 0.5;
        let z = 300.0 + ((i * 31) % 250) as f64 * 0.125;
        let intensity = ((i * 13) % 2000) as i64 - 1000;
        points.push((x, y, z, intensity));
        lines.push(format!("{} {} {} {}", x, y, z, intensity));
    }

    let path = temp_dir.path().join("cloud.txt");
    fs::write(&path, lines.join("\n"))?;
    Ok((path, points))
}

/// Helper function to create a test configuration
fn create_test_config(temp_dir: &TempDir) -> ExternalSortConfig {
    ExternalSortConfig {
        temp_directory: temp_dir.path().join("temp"),
        chunk_size_kb: 4,
        ..ExternalSortConfig::default()
    }
}

#[tokio::test]
async fn test_full_pipeline_matches_brute_force() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, points) = create_test_data(&temp_dir, 5000)?;
    let binary = temp_dir.path().join("cloud.bin");

    let stats = sort_and_encode(&[input], &binary, create_test_config(&temp_dir)).await?;
    assert_eq!(stats.records_written, 5000);
    assert!(stats.chunks_created > 1);

    let file = PointFile::open(&binary)?;
    assert_eq!(file.record_count(), 5000);
    assert_eq!(fs::metadata(&binary)?.len(), 4 + 5000 * 14);

    let config = QueryConfig {
        memory_budget_bytes: 64 * 1024,
        block_size_bytes: 4096,
        min_x: 40.0,
        max_x: 180.25,
        min_y: 20.0,
        max_y: 150.0,
        bin_width: 0.5,
        target: TargetVariable::Z,
    };
    let report = run_query(&binary, &config)?;

    let expected: Vec<f64> = points
        .iter()
        .filter(|p| p.0 >= 40.0 && p.0 <= 180.25 && p.1 >= 20.0 && p.1 < 150.0)
        .map(|p| p.2)
        .collect();
    assert_eq!(report.point_count, expected.len() as u64);
    assert_eq!(
        report.candidate_len(),
        points.iter().filter(|p| p.0 >= 40.0 && p.0 <= 180.25).count()
    );

    // Binned mean is within half a bin of the exact mean.
    let exact_mean = expected.iter().sum::<f64>() / expected.len() as f64;
    let moments = report.moments.expect("points in range");
    assert!((moments.mean - exact_mean).abs() <= config.bin_width / 2.0);
    assert!(moments.stddev > 0.0);
    assert!(moments.skewness.is_some());
    assert!(moments.kurtosis.is_some());

    Ok(())
}

#[tokio::test]
async fn test_intensity_statistics() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, points) = create_test_data(&temp_dir, 2000)?;
    let binary = temp_dir.path().join("cloud.bin");
    sort_and_encode(&[input], &binary, create_test_config(&temp_dir)).await?;

    let config = QueryConfig {
        min_x: 0.0,
        max_x: 250.0,
        min_y: 0.0,
        max_y: 200.0,
        bin_width: 1.0,
        target: TargetVariable::Intensity,
        block_size_bytes: 1400,
        ..QueryConfig::default()
    };
    let report = run_query(&binary, &config)?;
    assert_eq!(report.point_count, points.len() as u64);

    let exact_mean = points.iter().map(|p| p.3 as f64).sum::<f64>() / points.len() as f64;
    assert!((report.moments.unwrap().mean - exact_mean).abs() <= 0.5);
    Ok(())
}

#[tokio::test]
async fn test_sorted_text_and_dump_agree() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, _) = create_test_data(&temp_dir, 800)?;
    let binary = temp_dir.path().join("cloud.bin");
    let sorted_text = temp_dir.path().join("sorted.txt");
    let dumped = temp_dir.path().join("dumped.txt");

    sort_and_encode(&[input.clone()], &binary, create_test_config(&temp_dir)).await?;
    sort_to_text(&[input], &sorted_text, create_test_config(&temp_dir)).await?;
    assert_eq!(dump_to_text(&binary, &dumped, 512)?, 800);

    let sorted_lines: Vec<String> = fs::read_to_string(&sorted_text)?.lines().map(String::from).collect();
    let dumped_lines: Vec<String> = fs::read_to_string(&dumped)?.lines().map(String::from).collect();
    assert_eq!(sorted_lines.len(), dumped_lines.len());

    for (sorted, dumped) in sorted_lines.iter().zip(&dumped_lines) {
        let a: Vec<f64> = sorted.split(' ').map(|v| v.parse().unwrap()).collect();
        let b: Vec<f64> = dumped.split(' ').map(|v| v.parse().unwrap()).collect();
        for (u, v) in a.iter().zip(&b) {
            assert!((u - v).abs() <= 0.005 + 1e-9, "{sorted} vs {dumped}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_line_creates_no_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("bad.txt");
    let binary = temp_dir.path().join("bad.bin");
    fs::write(&input, "0 0 0 1\n1 2 notanumber 3\n2 2 2 3\n")?;

    let error = sort_and_encode(&[input], &binary, create_test_config(&temp_dir))
        .await
        .unwrap_err();
    assert!(matches!(error, PointError::Parse { line_number: 2, .. }));
    assert!(!binary.exists());
    Ok(())
}

#[tokio::test]
async fn test_concrete_four_point_query() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("four.txt");
    let binary = temp_dir.path().join("four.bin");
    fs::write(&input, "3 3 3 4\n1 1 1 2\n0 0 0 1\n2 2 2 3\n")?;
    sort_and_encode(&[input], &binary, create_test_config(&temp_dir)).await?;

    let config = QueryConfig {
        min_x: 1.0,
        max_x: 2.0,
        min_y: 0.0,
        max_y: 3.0,
        bin_width: 1.0,
        target: TargetVariable::Z,
        ..QueryConfig::default()
    };
    let report = run_query(&binary, &config)?;
    assert_eq!((report.candidate_start, report.candidate_end), (1, 3));
    assert_eq!(report.point_count, 2);
    assert!((report.moments.unwrap().mean - 1.5).abs() < 1e-12);

    let rendered = report.to_string();
    assert!(rendered.contains("Points:             2"));
    assert!(rendered.contains("Skewness:           undefined"));
    Ok(())
}
