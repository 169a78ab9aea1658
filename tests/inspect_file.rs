use std::io::Write;

use gcodescope::inspect_file;
use gcodescope::settings::{IndexStrategy, ViewerConfig};

const PRINT: &str = "G28\n\
G1 Z0.2 F600\n\
G1 X10 Y10 F3000\n\
G1 X20 Y10 E1 F1200\n\
G1 X20 Y20 E2\n\
G1 Z0.4 F600\n\
G1 X10 Y20 E3 F1200\n\
G1 X10 Y10 E4\n";

fn write_print() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PRINT.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_inspect_reports_summary() {
    let file = write_print();
    let report = inspect_file(file.path(), ViewerConfig::default(), None)
        .await
        .unwrap();

    assert_eq!(report.summary.layer_count, 2);
    assert!((report.summary.total_filament - 4.0).abs() < 1e-9);
    assert!((report.summary.model_size.x - 10.0).abs() < 1e-9);
    assert!((report.summary.layer_height - 0.2).abs() < 1e-9);
    assert_eq!(report.info.layer_cnt, 2);
    assert!(report.located.is_none());
}

#[tokio::test]
async fn test_inspect_locates_percentage() {
    let file = write_print();
    for strategy in [IndexStrategy::Tree, IndexStrategy::LayerRanges] {
        let mut config = ViewerConfig::default();
        config.reader.index_strategy = strategy;
        let report = inspect_file(file.path(), config, Some(50.0)).await.unwrap();
        let (locator, layer) = report.located.expect("no command located");
        assert_eq!(locator.layer, layer.index);
        assert!(locator.cmd < layer.command_count);
    }
}

#[tokio::test]
async fn test_inspect_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.gcode");
    let err = inspect_file(&missing, ViewerConfig::default(), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing.gcode"));
}
