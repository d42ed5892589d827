#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use tempfile::{tempdir, TempDir};
    use crate::binary::codec::decode_header;
    use crate::binary::Point;
    use crate::constants::{HEADER_SIZE_BYTES, RECORD_SIZE_BYTES};
    use crate::error::{ParseErrorKind, PointError};
    use crate::external_sort::{sort_and_encode, sort_to_text, ExternalSortConfig, ExternalSortProcessor, TextSink};
    use crate::external_sort::record::SortRecord;

    fn test_config(temp_dir: &TempDir) -> ExternalSortConfig {
        ExternalSortConfig {
            temp_directory: temp_dir.path().join("temp"),
            chunk_size_kb: 1,
            ..ExternalSortConfig::default()
        }
    }

    /// Deterministic scrambled points with repeated x and y values.
    fn scrambled_lines(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let x = (i * 7919) % 97;
                let y = (i * 104_729) % 13;
                let z = (i * 31) % 17;
                format!("{}.5 {} {}.25 {}", x, y, z, i % 300)
            })
            .collect()
    }

    fn read_points(path: &Path) -> Vec<Point> {
        let bytes = fs::read(path).unwrap();
        bytes[HEADER_SIZE_BYTES..]
            .chunks_exact(RECORD_SIZE_BYTES)
            .map(|record| Point::decode(record).unwrap())
            .collect()
    }

    #[test]
    fn test_sort_record_parsing() {
        let record = SortRecord::from_text_line("462123.47  101234.98\t312.05 17\n").unwrap();
        assert_eq!(record.x, 462123.47);
        assert_eq!(record.y, 101234.98);
        assert_eq!(record.z, 312.05);
        assert_eq!(record.intensity, 17);
        assert_eq!(record.to_text_line(), "462123.47 101234.98 312.05 17");
    }

    #[test]
    fn test_sort_record_parse_failures() {
        assert_eq!(
            SortRecord::from_text_line("1 2 3").unwrap_err(),
            ParseErrorKind::FieldCount { found: 3 }
        );
        assert_eq!(
            SortRecord::from_text_line("1 2 3 4 5").unwrap_err(),
            ParseErrorKind::FieldCount { found: 5 }
        );
        assert_eq!(
            SortRecord::from_text_line("1 2 notanumber 3").unwrap_err(),
            ParseErrorKind::InvalidNumber { field: "z", value: "notanumber".to_string() }
        );
        assert_eq!(
            SortRecord::from_text_line("1 2 3 4.5").unwrap_err(),
            ParseErrorKind::InvalidNumber { field: "intensity", value: "4.5".to_string() }
        );
        assert_eq!(
            SortRecord::from_text_line("NaN 2 3 4").unwrap_err(),
            ParseErrorKind::NonFinite { field: "x" }
        );
    }

    #[test]
    fn test_key_comparator() {
        use std::cmp::Ordering;

        let parse = |line: &str| SortRecord::from_text_line(line).unwrap();
        assert_eq!(parse("1 9 9 0").key_cmp(&parse("2 0 0 0")), Ordering::Less);
        assert_eq!(parse("1 2 9 0").key_cmp(&parse("1 3 0 0")), Ordering::Less);
        assert_eq!(parse("1 2 3 0").key_cmp(&parse("1 2 2 0")), Ordering::Greater);
        assert_eq!(parse("1 2 3 0").key_cmp(&parse("1.0 2.0 3.0 99")), Ordering::Equal);
        // Numeric, not lexicographic on text.
        assert_eq!(parse("10 0 0 0").key_cmp(&parse("9 0 0 0")), Ordering::Greater);
    }

    #[test]
    fn test_narrowing_to_binary_schema() {
        let point = SortRecord::from_text_line("1.5 -2.25 3 -7").unwrap().to_point().unwrap();
        assert_eq!(point, Point::new(1.5, -2.25, 3.0, -7));

        assert!(SortRecord::from_text_line("1 2 3 32768").unwrap().to_point().is_err());
        assert!(SortRecord::from_text_line("1e300 2 3 0").unwrap().to_point().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ExternalSortConfig::default();
        assert!(config.validate().is_ok());

        config.memory_usage_percent = 5.0;
        assert!(config.validate().is_err());

        config.memory_usage_percent = 95.0;
        assert!(config.validate().is_err());

        config.memory_usage_percent = 50.0;
        config.chunk_size_kb = 0;
        assert!(config.validate().is_err());

        config.chunk_size_kb = 64;
        config.io_buffer_size_kb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("sort.json");

        let config = test_config(&temp_dir);
        config.to_file(&path).unwrap();
        let loaded = ExternalSortConfig::from_file(&path).unwrap();
        assert_eq!(loaded.chunk_size_kb, 1);
        assert_eq!(loaded.temp_directory, config.temp_directory);
    }

    #[tokio::test]
    async fn test_multi_chunk_sort_to_text() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("sorted.txt");
        let lines = scrambled_lines(500);
        fs::write(&input_file, lines.join("\n")).unwrap();

        let stats = sort_to_text(&[input_file], &output_file, test_config(&temp_dir)).await.unwrap();

        assert_eq!(stats.total_records, 500);
        assert_eq!(stats.records_written, 500);
        assert!(stats.chunks_created > 1, "expected several chunks, got {}", stats.chunks_created);

        let output = fs::read_to_string(&output_file).unwrap();
        let sorted: Vec<SortRecord> = output
            .lines()
            .map(|line| SortRecord::from_text_line(line).unwrap())
            .collect();
        assert_eq!(sorted.len(), 500);
        for pair in sorted.windows(2) {
            assert_ne!(pair[0].key_cmp(&pair[1]), std::cmp::Ordering::Greater);
        }

        // Spill files are gone.
        let leftovers = fs::read_dir(temp_dir.path().join("temp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_ties_keep_input_order() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("sorted.txt");
        let mut lines: Vec<String> = (0..200).map(|i| format!("5 5 5 {}", i)).collect();
        lines.push("1 1 1 -1".to_string());
        fs::write(&input_file, lines.join("\n")).unwrap();

        sort_to_text(&[input_file], &output_file, test_config(&temp_dir)).await.unwrap();

        let output = fs::read_to_string(&output_file).unwrap();
        let intensities: Vec<i64> = output
            .lines()
            .map(|line| SortRecord::from_text_line(line).unwrap().intensity)
            .collect();
        let mut expected = vec![-1];
        expected.extend(0..200);
        assert_eq!(intensities, expected);
    }

    #[tokio::test]
    async fn test_sort_and_encode_multiple_inputs() {
        let temp_dir = tempdir().unwrap();
        let first = temp_dir.path().join("a.txt");
        let second = temp_dir.path().join("b.txt");
        let output_file = temp_dir.path().join("points.bin");
        let lines = scrambled_lines(300);
        fs::write(&first, lines[..120].join("\n")).unwrap();
        fs::write(&second, format!("{}\n\n", lines[120..].join("\n"))).unwrap();

        let stats = sort_and_encode(&[first, second], &output_file, test_config(&temp_dir))
            .await
            .unwrap();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.records_written, 300);

        let bytes = fs::read(&output_file).unwrap();
        assert_eq!(decode_header(&bytes).unwrap(), 300);
        assert_eq!((bytes.len() - HEADER_SIZE_BYTES) / RECORD_SIZE_BYTES, 300);

        let points = read_points(&output_file);
        for pair in points.windows(2) {
            assert_ne!(pair[0].key_cmp(&pair[1]), std::cmp::Ordering::Greater);
        }
    }

    #[tokio::test]
    async fn test_parse_error_aborts_without_output() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("points.bin");
        let mut lines = scrambled_lines(100);
        lines.insert(60, "1 2 notanumber 3".to_string());
        fs::write(&input_file, lines.join("\n")).unwrap();

        let error = sort_and_encode(&[input_file], &output_file, test_config(&temp_dir))
            .await
            .unwrap_err();

        match error {
            PointError::Parse { line_number, kind, .. } => {
                assert_eq!(line_number, 61);
                assert!(matches!(kind, ParseErrorKind::InvalidNumber { field: "z", .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output_file.exists());
        assert_eq!(fs::read_dir(temp_dir.path().join("temp")).unwrap().count(), 0);
        // Only the input remains next to the would-be output.
        let siblings: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(siblings.len(), 2);
    }

    #[tokio::test]
    async fn test_encoding_error_aborts_without_output() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("points.bin");
        fs::write(&input_file, "3 3 3 1\n1 1 1 70000\n2 2 2 2\n").unwrap();

        let error = sort_and_encode(&[input_file], &output_file, test_config(&temp_dir))
            .await
            .unwrap_err();
        assert!(matches!(error, PointError::Encoding { index: 0, .. }));
        assert!(!output_file.exists());
    }

    #[tokio::test]
    async fn test_shutdown_signal_interrupts_sort() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("sorted.txt");
        fs::write(&input_file, scrambled_lines(50).join("\n")).unwrap();

        let mut processor = ExternalSortProcessor::new(test_config(&temp_dir))
            .unwrap()
            .with_shutdown_signal(Arc::new(AtomicBool::new(true)));
        assert!(processor.shutdown_requested());

        let mut sink = TextSink::create(&output_file).unwrap();
        let error = processor.process(&[input_file], &mut sink).await.unwrap_err();
        assert!(matches!(error, PointError::Interrupted));
        assert!(!output_file.exists());
    }

    #[tokio::test]
    async fn test_sort_key_uses_stored_precision() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("points.bin");
        // Both x values round to 1.0f32, so y decides the order.
        fs::write(&input_file, "1.00000001 5 0 1\n1.00000002 3 0 2\n").unwrap();

        let stats = sort_and_encode(&[input_file], &output_file, test_config(&temp_dir))
            .await
            .unwrap();
        assert_eq!(stats.records_written, 2);

        let points = read_points(&output_file);
        assert_eq!(points, vec![Point::new(1.0, 3.0, 0.0, 2), Point::new(1.0, 5.0, 0.0, 1)]);
    }

    #[test]
    fn test_sub_f32_differences_compare_equal() {
        let a = SortRecord::from_text_line("1.00000001 2 3 0").unwrap();
        let b = SortRecord::from_text_line("1.00000002 2 3 0").unwrap();
        assert_eq!(a.key_cmp(&b), std::cmp::Ordering::Equal);
    }

    #[tokio::test]
    async fn test_runs_sharing_temp_directory_use_separate_spill_dirs() {
        let temp_dir = tempdir().unwrap();
        let first_input = temp_dir.path().join("a.txt");
        let second_input = temp_dir.path().join("b.txt");
        let first_output = temp_dir.path().join("a_sorted.txt");
        let second_output = temp_dir.path().join("b_sorted.txt");
        fs::write(&first_input, scrambled_lines(200).join("\n")).unwrap();
        fs::write(&second_input, scrambled_lines(150).join("\n")).unwrap();

        let mut first = ExternalSortProcessor::new(test_config(&temp_dir)).unwrap();
        let mut second = ExternalSortProcessor::new(test_config(&temp_dir)).unwrap();
        assert_ne!(first.run_directory(), second.run_directory());
        assert!(first.run_directory().starts_with(temp_dir.path().join("temp")));
        let second_run_dir = second.run_directory().to_path_buf();

        // Spills of the second run survive the first run's cleanup.
        second.process_file(&second_input).await.unwrap();
        let spilled = fs::read_dir(&second_run_dir).unwrap().count();
        assert!(spilled > 1);

        let mut first_sink = TextSink::create(&first_output).unwrap();
        first.process(&[first_input], &mut first_sink).await.unwrap();
        assert_eq!(fs::read_dir(&second_run_dir).unwrap().count(), spilled);
        second.cleanup();

        let mut second_sink = TextSink::create(&second_output).unwrap();
        let stats = second.process(&[second_input], &mut second_sink).await.unwrap();
        assert_eq!(stats.records_written, 150);
        assert_eq!(fs::read_to_string(&first_output).unwrap().lines().count(), 200);

        drop(first);
        drop(second);
        assert_eq!(fs::read_dir(temp_dir.path().join("temp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_produces_empty_file() {
        let temp_dir = tempdir().unwrap();
        let input_file = temp_dir.path().join("points.txt");
        let output_file = temp_dir.path().join("points.bin");
        fs::write(&input_file, "").unwrap();

        let stats = sort_and_encode(&[input_file], &output_file, test_config(&temp_dir))
            .await
            .unwrap();
        assert_eq!(stats.records_written, 0);
        assert_eq!(fs::read(&output_file).unwrap(), vec![0, 0, 0, 0]);
    }
}
