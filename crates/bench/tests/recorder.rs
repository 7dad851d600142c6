//! Result sink persistence across appends and runs

use kaibench::recorder::summarize_records;
use kaibench::{BenchError, CsvRecorder, ResultRecord};

fn record(question: &str, answer: &str, accurate: bool, secs: f64, comment: &str) -> ResultRecord {
    ResultRecord {
        timestamp: "5/6/2025, 9:36:04 AM".into(),
        question: question.into(),
        raw_response: answer.into(),
        is_accurate: accurate,
        elapsed_secs: secs,
        comment: comment.into(),
    }
}

#[test]
fn round_trip_preserves_fields_with_commas_and_newlines() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::new(dir.path().join("Kai_Test_Results.csv"));

    let written = record(
        "Which devices are offline, and since when?",
        "Two devices are offline:\n- edge-01, since Monday\n- edge-07 \"core\" switch",
        false,
        12.345,
        "Reply lists edge-07, table does not",
    );
    recorder.append(&written).unwrap();

    let read = recorder.read_all().unwrap();
    assert_eq!(read, vec![written]);
}

#[test]
fn header_is_written_once_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    CsvRecorder::new(&path)
        .append(&record("q1", "a1", true, 1.0, "ok"))
        .unwrap();
    // A second recorder on the same path stands in for a later run.
    let later = CsvRecorder::new(&path);
    later.append(&record("q2", "a2", false, 2.0, "no")).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let headers = content
        .lines()
        .filter(|l| l.starts_with("DateTime,"))
        .count();
    assert_eq!(headers, 1);

    let rows = later.read_all().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].question, "q1");
    assert_eq!(rows[1].question, "q2");
}

#[test]
fn missing_parent_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::new(dir.path().join("runs/2026/results.csv"));

    recorder.append(&record("q", "a", true, 0.5, "ok")).unwrap();
    assert_eq!(recorder.read_all().unwrap().len(), 1);
}

#[test]
fn append_to_a_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::new(dir.path());

    let err = recorder.append(&record("q", "a", true, 0.5, "ok")).unwrap_err();
    assert!(matches!(err, BenchError::Io(_)));
    assert!(err.is_fatal());
}

#[test]
fn existing_sink_can_be_summarized() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::new(dir.path().join("results.csv"));
    recorder.append(&record("q1", "a", true, 3.0, "ok")).unwrap();
    recorder.append(&record("q2", "b", false, 5.0, "no")).unwrap();

    let summary = summarize_records(&recorder.read_all().unwrap()).unwrap();
    assert_eq!(summary.total_questions, 2);
    assert_eq!(summary.accuracy_percent, 50.0);
    assert_eq!(summary.average_secs, 4.0);
    assert_eq!(summary.slowest.as_deref(), Some("q2"));
}
