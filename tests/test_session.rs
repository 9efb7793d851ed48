//! Integration tests for full calibration runs: live calibration, cache reuse and failure paths

use std::io::Write;
use std::path::{Path, PathBuf};

use kolosal_int8::calibration::MIN_MAX_HEADER;
use kolosal_int8::prelude::*;

fn write_calibration_set(dir: &Path, n: usize, value: f32) -> PathBuf {
    let manifest = dir.join("list.txt");
    let mut list = std::fs::File::create(&manifest).unwrap();
    for i in 0..n {
        let path = dir.join(format!("{i}.bin"));
        let bytes: Vec<u8> = std::iter::repeat(value.to_le_bytes())
            .take(4 * 4 * 3)
            .flatten()
            .collect();
        std::fs::write(&path, bytes).unwrap();
        writeln!(list, "{}", path.display()).unwrap();
    }
    manifest
}

fn config(dir: &Path, manifest: &Path) -> CalibratorConfig {
    CalibratorConfig::new()
        .with_batch_size(4)
        .with_input_shape(4, 4, 3)
        .with_input_blob_name("data")
        .with_calibration_set(manifest)
        .with_calibration_table(dir.join("calib.table"))
        .with_seed(1234)
}

fn calibrator(config: CalibratorConfig) -> EntropyCalibrator<HostDevice, RawTensorDecoder> {
    EntropyCalibrator::new(config, &HostDevice::new(), RawTensorDecoder::new(3)).unwrap()
}

/// Engine that records what it is fed and returns a fixed table
#[derive(Default)]
struct RecordingEngine {
    batches: Vec<usize>,
    fail_on: Option<usize>,
}

impl CalibrationEngine for RecordingEngine {
    fn observe(&mut self, batch: &[f32], batch_size: usize) -> Result<()> {
        if self.fail_on == Some(self.batches.len()) {
            return Err(KolosalError::DeviceError("engine rejected batch".to_string()));
        }
        assert_eq!(batch.len(), batch_size * 4 * 4 * 3);
        self.batches.push(batch_size);
        Ok(())
    }

    fn finish(&mut self, input_name: &str) -> Result<Vec<u8>> {
        Ok(format!("recorded {} {}", input_name, self.batches.len()).into_bytes())
    }
}

#[test]
fn test_live_calibration_writes_table() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 10, 0.635);
    let mut calibrator = calibrator(config(dir.path(), &manifest));
    let mut engine = MinMaxEngine::new();

    let outcome = run_calibration(&mut calibrator, &mut engine).unwrap();

    match &outcome {
        CalibrationOutcome::Computed { batches, .. } => assert_eq!(*batches, 2),
        other => panic!("expected computed table, got {:?}", other),
    }
    assert_eq!(calibrator.cursor(), 8);
    assert_eq!(engine.images(), 8);

    let on_disk = std::fs::read(dir.path().join("calib.table")).unwrap();
    assert_eq!(on_disk, outcome.table());

    let table = CalibrationTable::parse(&on_disk).unwrap();
    assert_eq!(table.header, MIN_MAX_HEADER);
    assert_eq!(table.scale("data"), Some(0.635 / 127.0));
}

#[test]
fn test_second_run_reuses_table_without_staging() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 8, 0.5);

    let first = run_calibration(&mut calibrator(config(dir.path(), &manifest)), &mut MinMaxEngine::new()).unwrap();
    assert!(!first.is_cached());

    let mut second_calibrator = calibrator(config(dir.path(), &manifest));
    let mut engine = RecordingEngine::default();
    let second = run_calibration(&mut second_calibrator, &mut engine).unwrap();

    assert!(second.is_cached());
    assert_eq!(second.table(), first.table());
    assert!(engine.batches.is_empty());
    assert_eq!(second_calibrator.cursor(), 0);
    assert_eq!(second_calibrator.state(), CalibratorState::Ready);
}

#[test]
fn test_cache_disabled_recalibrates_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 8, 0.5);
    std::fs::write(dir.path().join("calib.table"), b"stale table").unwrap();

    let mut calibrator = calibrator(config(dir.path(), &manifest).with_read_cache(false));
    let mut engine = RecordingEngine::default();
    let outcome = run_calibration(&mut calibrator, &mut engine).unwrap();

    assert!(!outcome.is_cached());
    assert_eq!(engine.batches, vec![4, 4]);
    assert_eq!(std::fs::read(dir.path().join("calib.table")).unwrap(), b"recorded data 2".to_vec());
}

#[test]
fn test_engine_failure_writes_no_table() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 12, 0.5);
    let mut calibrator = calibrator(config(dir.path(), &manifest));
    let mut engine = RecordingEngine {
        fail_on: Some(1),
        ..Default::default()
    };

    assert!(run_calibration(&mut calibrator, &mut engine).is_err());
    assert!(!dir.path().join("calib.table").exists());
}

#[test]
fn test_decode_failure_writes_no_table() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 4, 0.5);
    std::fs::remove_file(dir.path().join("2.bin")).unwrap();

    let mut calibrator = calibrator(config(dir.path(), &manifest));
    let err = run_calibration(&mut calibrator, &mut MinMaxEngine::new()).unwrap_err();

    assert!(err.is_fatal());
    assert!(!dir.path().join("calib.table").exists());
}

#[test]
fn test_too_few_images_for_a_batch() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_calibration_set(dir.path(), 3, 0.5);
    let mut calibrator = calibrator(config(dir.path(), &manifest));

    let err = run_calibration(&mut calibrator, &mut MinMaxEngine::new()).unwrap_err();
    assert!(matches!(err, KolosalError::ConfigError(_)));
    assert!(!dir.path().join("calib.table").exists());
}
