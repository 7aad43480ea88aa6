//! End-to-end scenarios for the sorting pipeline.
//!
//! Each test builds a throwaway watch root and library under a temp dir,
//! swaps the oracle and courier for in-memory fakes, and pushes entries
//! through the same path a filesystem event takes.

use async_trait::async_trait;
use mediasort::core::{Identity, LibcChown, Mover};
use mediasort::courier::{Courier, Notification};
use mediasort::engine::{Classifier, Dispatcher, MovableEntry};
use mediasort::librarian::{Librarian, WatcherState};
use mediasort::oracle::Oracle;
use mediasort::{Destinations, EntryOutcome, MediaCategory, Pipeline, SortError, WatchMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test Utilities
// ============================================================================

/// Answers every prompt with the same canned text.
struct CannedOracle {
    reply: Result<String, String>,
    calls: Mutex<usize>,
}

#[async_trait]
impl Oracle for CannedOracle {
    async fn generate(&self, _prompt: &str) -> mediasort::Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.reply.clone().map_err(SortError::Oracle)
    }
}

#[derive(Default)]
struct RecordingCourier {
    sent: Mutex<Vec<Notification>>,
}

impl Courier for RecordingCourier {
    fn send(&self, notification: &Notification) -> mediasort::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct TestFixture {
    temp_dir: TempDir,
    oracle: Arc<CannedOracle>,
    courier: Arc<RecordingCourier>,
    pipeline: Pipeline,
}

impl TestFixture {
    fn new(reply: Result<&str, &str>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        let destinations = Destinations {
            movies: root.join("movies"),
            shows: root.join("shows"),
            audiobooks: root.join("audiobooks"),
            ebooks: root.join("ebooks"),
        };
        for category in MediaCategory::ALL {
            fs::create_dir_all(destinations.root(category)).unwrap();
        }
        fs::create_dir_all(root.join("watch")).unwrap();

        let oracle = Arc::new(CannedOracle {
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: Mutex::new(0),
        });
        let courier = Arc::new(RecordingCourier::default());
        let dispatcher = Dispatcher::new(
            destinations,
            Mover::new(Identity::default(), Arc::new(LibcChown)),
            Some(courier.clone()),
        );
        let pipeline = Pipeline::new(Classifier::new(oracle.clone()), dispatcher);

        Self {
            temp_dir,
            oracle,
            courier,
            pipeline,
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }

    fn arrive_dir(&self, name: &str) -> MovableEntry {
        let path = self.path("watch").join(name);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("payload.bin"), b"data").unwrap();
        MovableEntry::from_path(&path).unwrap()
    }

    fn arrive_file(&self, name: &str) -> MovableEntry {
        let path = self.path("watch").join(name);
        fs::write(&path, b"data").unwrap();
        MovableEntry::from_path(&path).unwrap()
    }

    fn sent(&self) -> Vec<Notification> {
        self.courier.sent.lock().unwrap().clone()
    }
}

fn fenced(title: &str, classification: &str) -> String {
    format!(
        "```json\n{{\"title\": \"{}\", \"classification\": \"{}\"}}\n```",
        title, classification
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_movie_directory_is_moved_without_mail() {
    let reply = fenced("Some.Movie.2020", "movie");
    let f = TestFixture::new(Ok(&reply));
    let entry = f.arrive_dir("Some.Movie.2020");

    let outcome = f.pipeline.process(entry).await.unwrap();

    let dest = f.path("movies/Some.Movie.2020");
    assert_eq!(outcome, EntryOutcome::Moved(dest.clone()));
    assert!(dest.join("payload.bin").is_file());
    assert!(!f.path("watch/Some.Movie.2020").exists());
    assert!(f.sent().is_empty());
}

#[tokio::test]
async fn test_ebook_file_is_moved_then_mailed_once() {
    let reply = format!("Here you go:\n{}\nEnjoy!", fenced("Cool Book", "ebook"));
    let f = TestFixture::new(Ok(&reply));
    let entry = f.arrive_file("Cool Book.epub");

    let outcome = f.pipeline.process(entry).await.unwrap();

    let dest = f.path("ebooks/Cool Book.epub");
    assert_eq!(outcome, EntryOutcome::Moved(dest.clone()));
    let sent = f.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Cool Book.epub");
    assert_eq!(sent[0].attachment.as_deref(), Some(dest.as_path()));
}

#[tokio::test]
async fn test_unknown_category_leaves_entry_untouched() {
    let reply = fenced("Planet Earth", "documentary");
    let f = TestFixture::new(Ok(&reply));
    let entry = f.arrive_dir("Planet Earth");

    let outcome = f.pipeline.process(entry).await.unwrap();

    assert_eq!(
        outcome,
        EntryOutcome::Dropped {
            label: "documentary".into()
        }
    );
    assert!(f.path("watch/Planet Earth/payload.bin").is_file());
    for category in MediaCategory::ALL {
        let root = match category {
            MediaCategory::Movie => "movies",
            MediaCategory::TvShow => "shows",
            MediaCategory::Audiobook => "audiobooks",
            MediaCategory::Ebook => "ebooks",
        };
        assert_eq!(fs::read_dir(f.path(root)).unwrap().count(), 0);
    }
    assert!(f.sent().is_empty());
}

#[tokio::test]
async fn test_refusal_without_block_is_dropped() {
    let f = TestFixture::new(Ok("I'm not sure what that is."));
    let entry = f.arrive_file("random.bin");

    let outcome = f.pipeline.process(entry).await.unwrap();
    assert_eq!(
        outcome,
        EntryOutcome::Dropped {
            label: "unknown".into()
        }
    );
    assert!(f.path("watch/random.bin").exists());
}

#[tokio::test]
async fn test_oracle_failure_is_dropped_not_fatal() {
    let f = TestFixture::new(Err("503 Service Unavailable"));
    let entry = f.arrive_dir("Some.Show.S01");

    let outcome = f.pipeline.process(entry).await.unwrap();
    assert!(matches!(outcome, EntryOutcome::Dropped { .. }));
    assert!(f.path("watch/Some.Show.S01").is_dir());
}

#[tokio::test]
async fn test_label_case_is_normalised() {
    let reply = fenced("Some Show", "TV Show");
    let f = TestFixture::new(Ok(&reply));
    let entry = f.arrive_dir("Some.Show.S01");

    let outcome = f.pipeline.process(entry).await.unwrap();
    assert_eq!(outcome, EntryOutcome::Moved(f.path("shows/Some.Show.S01")));
}

#[tokio::test]
async fn test_same_name_arriving_twice_is_skipped() {
    let reply = fenced("Narrated", "audiobook");
    let f = TestFixture::new(Ok(&reply));

    let first = f.arrive_dir("Narrated");
    assert!(matches!(
        f.pipeline.process(first).await.unwrap(),
        EntryOutcome::Moved(_)
    ));

    let second = f.arrive_dir("Narrated");
    assert_eq!(
        f.pipeline.process(second).await.unwrap(),
        EntryOutcome::Skipped(f.path("audiobooks/Narrated"))
    );
    assert!(f.path("watch/Narrated").is_dir());
}

#[tokio::test]
async fn test_vanished_entry_skips_the_oracle() {
    let reply = fenced("x", "movie");
    let f = TestFixture::new(Ok(&reply));
    let entry = f.arrive_file("short-lived.tmp");
    fs::remove_file(&entry.source_path).unwrap();

    assert_eq!(
        f.pipeline.process(entry).await.unwrap(),
        EntryOutcome::Vanished
    );
    assert_eq!(*f.oracle.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_drain_processes_queue_in_order_until_closed() {
    let reply = fenced("x", "movie");
    let f = TestFixture::new(Ok(&reply));
    let (tx, rx) = mpsc::unbounded_channel();
    for name in ["A", "B", "C"] {
        tx.send(f.arrive_dir(name)).unwrap();
    }
    drop(tx);

    f.pipeline.drain(rx, CancellationToken::new()).await;

    for name in ["A", "B", "C"] {
        assert!(f.path("movies").join(name).is_dir(), "{} not moved", name);
    }
    assert_eq!(*f.oracle.calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_drain_stops_on_cancel() {
    let reply = fenced("x", "movie");
    let f = TestFixture::new(Ok(&reply));
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(f.arrive_dir("Late")).unwrap();

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    f.pipeline.drain(rx, shutdown).await;

    // Cancelled before anything was taken off the queue.
    assert!(f.path("watch/Late").is_dir());
    assert_eq!(*f.oracle.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_run_sorts_a_live_arrival_and_stops_the_watcher() {
    let reply = fenced("Live.Movie.2021", "movie");
    let f = TestFixture::new(Ok(&reply));
    let mut librarian = Librarian::new(f.path("watch"), WatchMode::AnyEntry);
    let shutdown = CancellationToken::new();
    let dest = f.path("movies/Live.Movie.2021");

    let driver = async {
        // Let the watcher subscribe before anything lands.
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::create_dir(f.path("watch/Live.Movie.2021")).unwrap();

        for _ in 0..100 {
            if dest.is_dir() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        shutdown.cancel();
    };

    let (result, ()) = tokio::join!(f.pipeline.run(&mut librarian, shutdown.clone()), driver);

    result.unwrap();
    assert!(dest.is_dir(), "arrival was not sorted before shutdown");
    assert!(!f.path("watch/Live.Movie.2021").exists());
    assert_eq!(librarian.state(), WatcherState::Stopped);
}

#[test]
fn test_entry_from_path_reads_name() {
    let entry = MovableEntry::from_path(Path::new("/downloads/Some.Movie.2020")).unwrap();
    assert_eq!(entry.name, "Some.Movie.2020");
    assert!(MovableEntry::from_path(Path::new("/")).is_none());
}
