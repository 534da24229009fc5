use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tokio::sync::mpsc;

use super::debouncer::{DEBOUNCE_MS, Debouncer};
use super::filter::ChangeFilter;
use super::types::{ChangeKind, ChangeSet};
use super::watch_roots::WatchRoots;
use super::dispatch;
use crate::actor::messages::BuildMsg;
use crate::config::{ProjectConfig, test_config_at};
use crate::pipeline::Generation;
use crate::utils::path::normalize_path;

fn make_config() -> (TempDir, ProjectConfig) {
    let temp = TempDir::new().unwrap();
    let root = normalize_path(temp.path());
    let mut config = test_config_at(&root);
    config.config_path = root.join("packwright.toml");

    std::fs::create_dir_all(&config.build.source).unwrap();
    std::fs::create_dir_all(&config.build.output).unwrap();
    (temp, config)
}

fn make_event(paths: &[&Path], kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.iter().map(|p| p.to_path_buf()).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn expire(debouncer: &mut Debouncer) {
    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 1));
}

#[test]
fn test_debouncer_empty() {
    let mut debouncer = Debouncer::new();
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() > Duration::from_secs(60));
}

#[test]
fn test_event_merging() {
    let mut debouncer = Debouncer::new();
    let (a, b, c) = (Path::new("/p/a.js"), Path::new("/p/b.js"), Path::new("/p/c.js"));

    // created then removed cancels out
    debouncer.add_event(&make_event(&[a], create_kind()));
    debouncer.add_event(&make_event(&[a], remove_kind()));
    // removed then recreated is a modification (atomic save)
    debouncer.add_event(&make_event(&[b], remove_kind()));
    debouncer.add_event(&make_event(&[b], create_kind()));
    // modified then removed is a removal
    debouncer.add_event(&make_event(&[c], modify_kind()));
    debouncer.add_event(&make_event(&[c], remove_kind()));

    assert!(!debouncer.changes.contains_key(a));
    assert_eq!(debouncer.changes[b], ChangeKind::Modified);
    assert_eq!(debouncer.changes[c], ChangeKind::Removed);
}

#[test]
fn test_editor_artifacts_and_metadata_ignored() {
    let mut debouncer = Debouncer::new();
    for name in ["/p/.App.jsx.swp", "/p/App.jsx~", "/p/.#App.jsx", "/p/notes.tmp"] {
        debouncer.add_event(&make_event(&[Path::new(name)], modify_kind()));
    }
    debouncer.add_event(&make_event(
        &[Path::new("/p/App.jsx")],
        notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::Any,
        )),
    ));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_take_waits_for_quiet_period() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(&[Path::new("/p/App.jsx")], modify_kind()));
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(DEBOUNCE_MS));

    expire(&mut debouncer);
    let taken = debouncer.take_if_ready().unwrap();
    assert_eq!(taken.len(), 1);
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_filter_drops_output_and_secondary_dirs() {
    let (_temp, config) = make_config();
    let filter = ChangeFilter::new(&config);
    let source_file = config.build.source.join("App.jsx");
    std::fs::write(&source_file, "").unwrap();

    let mut raw = FxHashMap::default();
    raw.insert(source_file.clone(), ChangeKind::Modified);
    raw.insert(config.build.output.join("index.html"), ChangeKind::Modified);
    raw.insert(config.root.join("build/index.html"), ChangeKind::Created);
    raw.insert(config.root.join("node_modules/react/index.js"), ChangeKind::Modified);

    let set = filter.apply(raw);
    assert_eq!(set.changes, vec![(source_file, ChangeKind::Modified)]);
    assert!(!set.config_changed);
}

#[test]
fn test_filter_detects_config_change() {
    let (_temp, config) = make_config();
    std::fs::write(&config.config_path, "").unwrap();
    let filter = ChangeFilter::new(&config);

    let mut raw = FxHashMap::default();
    raw.insert(config.config_path.clone(), ChangeKind::Modified);
    let set = filter.apply(raw);
    assert!(set.config_changed);
    assert_eq!(set.paths(), vec![config.config_path.clone()]);
}

#[test]
fn test_filter_drops_directories_but_keeps_removals() {
    let (_temp, config) = make_config();
    let filter = ChangeFilter::new(&config);
    let dir = config.build.source.join("components");
    std::fs::create_dir_all(&dir).unwrap();
    let gone = config.build.source.join("Old.jsx");

    let mut raw = FxHashMap::default();
    raw.insert(dir, ChangeKind::Created);
    raw.insert(gone.clone(), ChangeKind::Removed);

    let set = filter.apply(raw);
    assert_eq!(set.changes, vec![(gone, ChangeKind::Removed)]);
}

#[test]
fn test_watch_roots_collapse_nested_paths() {
    let (_temp, mut config) = make_config();
    let outside = config.root.join("shared");
    config.resolve.aliases.insert("@shared".into(), outside.clone());

    let roots = WatchRoots::for_project(&config);
    let roots = roots.roots();

    assert!(roots.contains(&config.build.source));
    assert!(roots.contains(&outside));
    assert!(roots.contains(&config.config_path));
    // aliases inside the source tree are already covered
    assert!(!roots.iter().any(|r| r != &config.build.source && r.starts_with(&config.build.source)));
}

#[tokio::test]
async fn test_dispatch_bumps_generation_before_sending() {
    let generation = Generation::new();
    let stale = generation.token();
    let (tx, mut rx) = mpsc::channel(4);

    let set = ChangeSet {
        changes: vec![(PathBuf::from("/p/App.jsx"), ChangeKind::Modified)],
        config_changed: false,
    };
    dispatch(set, &tx, &generation).await.unwrap();

    assert!(stale.is_stale());
    match rx.recv().await.unwrap() {
        BuildMsg::Rebuild { changed, config_changed } => {
            assert_eq!(changed, vec![PathBuf::from("/p/App.jsx")]);
            assert!(!config_changed);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn test_dispatch_skips_empty_sets() {
    let generation = Generation::new();
    let before = generation.current();
    let (tx, mut rx) = mpsc::channel(4);

    dispatch(ChangeSet::default(), &tx, &generation).await.unwrap();
    assert_eq!(generation.current(), before);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_dispatch_reports_closed_builder() {
    let generation = Generation::new();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let set = ChangeSet {
        changes: vec![(PathBuf::from("/p/App.jsx"), ChangeKind::Created)],
        config_changed: false,
    };
    assert!(dispatch(set, &tx, &generation).await.is_err());
}
