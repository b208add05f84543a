//! End-to-end builds against scripted sources and the fixture documents.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tickerlist_core::seed::SEED_SYMBOLS;
use tickerlist_core::snapshot::parse_artifact;
use tickerlist_core::{
    ArtifactFormat, BuildConfig, BuildStatus, ClassSeparator, Controller, DocumentShape, Fetch,
    FileSnapshotStore, MemorySnapshotStore, NetworkError, Normalizer, RawDocument,
    RecordingSleeper, SnapshotStore, SymbolSet, EXIT_NO_ARTIFACT,
};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(path).unwrap()
}

/// Replays a fixed sequence of responses, repeating the last one.
struct Scripted {
    responses: RefCell<VecDeque<Result<RawDocument, NetworkError>>>,
    last: Result<RawDocument, ()>,
    calls: RefCell<usize>,
}

impl Scripted {
    fn new(responses: Vec<Result<RawDocument, NetworkError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            last: Err(()),
            calls: RefCell::new(0),
        }
    }

    fn always(doc: RawDocument) -> Self {
        Self {
            responses: RefCell::new(VecDeque::new()),
            last: Ok(doc),
            calls: RefCell::new(0),
        }
    }

    fn failing() -> Self {
        Self::new(Vec::new())
    }

    fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl Fetch for Scripted {
    fn fetch(&self, url: &str) -> Result<RawDocument, NetworkError> {
        *self.calls.borrow_mut() += 1;
        if let Some(next) = self.responses.borrow_mut().pop_front() {
            return next;
        }
        match &self.last {
            Ok(doc) => Ok(doc.clone()),
            Err(()) => Err(NetworkError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }
}

fn unavailable() -> Result<RawDocument, NetworkError> {
    Err(NetworkError::Status {
        status: 503,
        url: "https://example.test".into(),
    })
}

fn controller(config: &BuildConfig) -> (Controller, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let c = Controller::from_config(config).with_sleeper(Arc::clone(&sleeper));
    (c, sleeper)
}

/// A valid artifact holding the first `n` seed symbols.
fn previous_artifact(n: usize, format: ArtifactFormat) -> String {
    let set: SymbolSet = Normalizer::default()
        .normalize_all(&SEED_SYMBOLS[..n])
        .into_iter()
        .collect();
    format.serialize(&set).unwrap()
}

fn html_doc() -> RawDocument {
    RawDocument::new(fixture("sp100_wiki.html"), DocumentShape::Html)
}

#[test]
fn wiki_fixture_builds_full_list() {
    let config = BuildConfig::default();
    let (c, sleeper) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Pretty);

    let outcome = c.run(&Scripted::always(html_doc()), &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Changed);
    assert_eq!(outcome.exit_code(), 10);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.warnings.is_empty());
    assert!(sleeper.waits().is_empty());

    let written = parse_artifact(&store.text().unwrap()).unwrap();
    let expected: Vec<String> = SEED_SYMBOLS.iter().map(|s| s.to_string()).collect();
    assert_eq!(written.to_vec(), expected);
}

#[test]
fn csv_fixture_with_slash_convention() {
    let mut config = BuildConfig::default();
    config.validation.separator = ClassSeparator::Slash;
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Compact);
    let doc = RawDocument::new(fixture("sp100_sheet.csv"), DocumentShape::Unknown);

    let outcome = c.run(&Scripted::always(doc), &store).unwrap();
    assert_eq!(outcome.status, BuildStatus::Changed);

    let text = store.text().unwrap();
    assert!(text.contains(r#""BRK/B""#));
    assert!(!text.contains("BRK.B"));
    assert!(text.contains(r#""MSFT""#));
    assert!(text.starts_with(r#"["AAPL","ABBV""#));
}

#[test]
fn identical_second_build_is_unchanged() {
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Pretty);
    let fetcher = Scripted::always(html_doc());

    let first = c.run(&fetcher, &store).unwrap();
    let second = c.run(&fetcher, &store).unwrap();

    assert!(first.write.written);
    assert!(!second.write.written);
    assert_eq!(second.status, BuildStatus::Unchanged);
    assert_eq!(second.exit_code(), 0);
    assert_eq!(first.write.digest, second.write.digest);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn transient_failures_are_retried_with_backoff() {
    let config = BuildConfig::default();
    let (c, sleeper) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Pretty);
    let fetcher = Scripted::new(vec![unavailable(), unavailable(), Ok(html_doc())]);

    let outcome = c.run(&fetcher, &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Changed);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[test]
fn network_failure_with_snapshot_is_degraded() {
    let config = BuildConfig::default();
    let (c, sleeper) = controller(&config);
    // Compact on disk while the store is configured for pretty output.
    let previous = previous_artifact(90, ArtifactFormat::Compact);
    let store = MemorySnapshotStore::with_text(previous.clone(), ArtifactFormat::Pretty);
    let fetcher = Scripted::failing();

    let outcome = c.run(&fetcher, &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Degraded);
    assert!(!outcome.status.is_success());
    assert_eq!(outcome.exit_code(), 20);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(sleeper.waits().len(), 2);
    assert_eq!(store.text().unwrap(), previous);
    assert_eq!(store.write_count(), 1);
    assert_eq!(outcome.write.count, 90);
    assert_eq!(outcome.cause.as_ref().unwrap().kind(), "NetworkError");
    assert!(outcome.message().contains("NetworkError"));
}

#[test]
fn empty_artifact_is_not_a_fallback() {
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::with_text("[]", ArtifactFormat::Pretty);

    let outcome = c.run(&Scripted::failing(), &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Seeded);
    let written = parse_artifact(&store.text().unwrap()).unwrap();
    assert_eq!(written.len(), SEED_SYMBOLS.len());
}

#[test]
fn malformed_artifact_is_not_a_fallback() {
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let mut items: Vec<String> = SEED_SYMBOLS.iter().map(|s| s.to_string()).collect();
    items.extend(["aapl".into(), "<b>x</b>".into(), "TOOLONGSYMBOLXX".into()]);
    let text = format!("[{}]", items.iter().map(|s| format!("{s:?}")).collect::<Vec<_>>().join(","));
    let store = MemorySnapshotStore::with_text(text, ArtifactFormat::Pretty);

    let outcome = c.run(&Scripted::failing(), &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Seeded);
    assert_eq!(outcome.exit_code(), 21);
    let on_store = store.text().unwrap();
    assert!(!on_store.contains("<b>"));
    assert!(!on_store.contains("TOOLONGSYMBOLXX"));
    assert_eq!(parse_artifact(&on_store).unwrap().len(), SEED_SYMBOLS.len());
}

#[test]
fn failure_without_snapshot_writes_seed() {
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Pretty);

    let outcome = c.run(&Scripted::failing(), &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Seeded);
    assert_eq!(outcome.exit_code(), 21);
    let written = parse_artifact(&store.text().unwrap()).unwrap();
    assert_eq!(written.len(), SEED_SYMBOLS.len());
    assert!(written.contains("BRK.B"));
}

#[test]
fn too_few_symbols_retries_then_falls_back() {
    let config = BuildConfig::default();
    let (c, sleeper) = controller(&config);
    let previous = previous_artifact(85, ArtifactFormat::Compact);
    let store = MemorySnapshotStore::with_text(previous.clone(), ArtifactFormat::Compact);
    let doc = RawDocument::new("Symbol\nAAPL\nmsft\n BRK.B \n", DocumentShape::Csv);
    let fetcher = Scripted::always(doc);

    let outcome = c.run(&fetcher, &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Degraded);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(sleeper.waits().len(), 2);
    let msg = outcome.message();
    assert!(msg.contains("ValidationError"), "{msg}");
    assert!(msg.contains("only 3 valid symbols"), "{msg}");
    assert!(msg.contains("at least 80"), "{msg}");
    assert_eq!(store.text().unwrap(), previous);
}

#[test]
fn changed_layout_is_parse_error_then_fallback() {
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Pretty);
    let doc = RawDocument::new(
        "<html><table><tr><th>Company</th></tr><tr><td>Apple</td></tr></table></html>",
        DocumentShape::Html,
    );

    let outcome = c.run(&Scripted::always(doc), &store).unwrap();
    assert_eq!(outcome.status, BuildStatus::Seeded);
    assert_eq!(outcome.cause.unwrap().kind(), "ParseError");
}

#[test]
fn must_have_shortfall_warns_but_succeeds() {
    let mut config = BuildConfig::default();
    config.validation.min_count = 2;
    config.validation.must_have = vec!["AAPL".into(), "MSFT".into(), "NVDA".into()];
    config.validation.max_missing = 0;
    let (c, _) = controller(&config);
    let store = MemorySnapshotStore::new(ArtifactFormat::Compact);
    let doc = RawDocument::new(r#"{"tickers": ["aapl", "ko"]}"#, DocumentShape::Json);

    let outcome = c.run(&Scripted::always(doc), &store).unwrap();

    assert_eq!(outcome.status, BuildStatus::Changed);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("MSFT"));
    assert_eq!(store.text().unwrap(), r#"["AAPL","KO"]"#);
}

#[test]
fn file_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuildConfig::default();
    config.output.path = dir.path().join("public/sp100.json");
    let (c, _) = controller(&config);
    let store = FileSnapshotStore::new(&config.output.path, config.output.format);

    let first = c.run(&Scripted::always(html_doc()), &store).unwrap();
    assert_eq!(first.status, BuildStatus::Changed);

    let on_disk = std::fs::read_to_string(&config.output.path).unwrap();
    assert!(on_disk.starts_with("[\n  \"AAPL\","));
    assert!(!on_disk.ends_with('\n'));

    let degraded = c.run(&Scripted::failing(), &store).unwrap();
    assert_eq!(degraded.status, BuildStatus::Degraded);
    assert_eq!(std::fs::read_to_string(&config.output.path).unwrap(), on_disk);
    assert_eq!(store.load().unwrap().unwrap().symbols.len(), SEED_SYMBOLS.len());
}

#[cfg(unix)]
#[test]
fn unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the parent directory should be.
    let blocker = dir.path().join("public");
    std::fs::write(&blocker, "not a dir").unwrap();
    let config = BuildConfig::default();
    let (c, _) = controller(&config);
    let store = FileSnapshotStore::new(blocker.join("sp100.json"), ArtifactFormat::Pretty);

    let err = c.run(&Scripted::always(html_doc()), &store).unwrap_err();
    assert!(err.to_string().contains("sp100.json"));
    assert_eq!(EXIT_NO_ARTIFACT, 30);
}
