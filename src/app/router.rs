// LogCore - app/router.rs
//
// Maps records to output files. Owned by the delivery worker and touched by
// no other thread, so it holds its file handles without any locking.
//
// Per target file the router keeps the open handle, the path it was opened
// for, and whether that path's directory has been ensured. The path is
// recomputed from the live global config on every write. A change closes the
// old handle and starts over at the new path; an unchanged path costs neither
// a directory check nor an open.
//
// Failure policy: a file that cannot be opened or written drops the record,
// logs a warning, and is retried by the next record for the same path. No
// error ever propagates to producers.

use crate::app::config_store::ConfigStore;
use crate::core::model::{LogLevel, LogRecord, SourceLocation};
use crate::platform::fs::{DirectoryEnsurer, FsDirectoryEnsurer};
use crate::util::constants::{
    ERRORS_FILE_NAME, FATALS_FILE_NAME, MODULE_FILE_EXTENSION, WARNINGS_FILE_NAME,
};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Running counters, readable from a delivery task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Successful file opens (first open and every reopen).
    pub files_opened: u64,
    /// Lines written and flushed.
    pub records_written: u64,
    /// Records lost to open or write failures.
    pub records_dropped: u64,
}

/// State of one output file.
#[derive(Debug, Default)]
struct FileState {
    path: Option<PathBuf>,
    stream: Option<File>,
    dir_ensured: bool,
}

/// Slot index and file name for levels that own a file.
fn level_slot(level: LogLevel) -> Option<(usize, &'static str)> {
    match level {
        LogLevel::Warning => Some((0, WARNINGS_FILE_NAME)),
        LogLevel::Error => Some((1, ERRORS_FILE_NAME)),
        LogLevel::Fatal => Some((2, FATALS_FILE_NAME)),
        _ => None,
    }
}

/// `true` if `level` has a dedicated level file.
pub fn has_level_file(level: LogLevel) -> bool {
    level_slot(level).is_some()
}

/// Routes level records, module records and console lines.
pub struct LevelFileRouter {
    store: Arc<ConfigStore>,
    ensurer: Box<dyn DirectoryEnsurer>,
    level_files: [FileState; 3],
    module_files: HashMap<String, FileState>,
    /// Every path opened so far. A truncating module file only truncates
    /// when its path is not in here yet.
    opened_paths: HashSet<PathBuf>,
    stats: RouterStats,
}

impl LevelFileRouter {
    /// Router backed by the real filesystem.
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self::with_ensurer(store, Box::new(FsDirectoryEnsurer::new()))
    }

    /// Router with a caller-supplied directory ensurer.
    pub fn with_ensurer(store: Arc<ConfigStore>, ensurer: Box<dyn DirectoryEnsurer>) -> Self {
        Self {
            store,
            ensurer,
            level_files: Default::default(),
            module_files: HashMap::new(),
            opened_paths: HashSet::new(),
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Path of the currently open (or last attempted) file for `level`.
    pub fn level_file_path(&self, level: LogLevel) -> Option<&Path> {
        let (idx, _) = level_slot(level)?;
        self.level_files[idx].path.as_deref()
    }

    /// Append `record` to its level file as `[time] [module] message`.
    ///
    /// Levels without a level file are ignored. Returns `true` when the line
    /// was written and flushed.
    pub fn write_record(&mut self, record: &LogRecord) -> bool {
        let Some((idx, file_name)) = level_slot(record.level) else {
            return false;
        };
        let root = self.store.global_config().logs_root_folder;
        let path = PathBuf::from(format!("{root}{file_name}"));
        let line = format!(
            "[{}] [{}] {}\n",
            record.timestamp, record.module, record.message
        );

        deliver(
            &mut self.level_files[idx],
            path,
            false,
            &line,
            self.ensurer.as_ref(),
            &mut self.opened_paths,
            &mut self.stats,
        )
    }

    /// Append `record` to the module's own file as `[time] [LEVEL] message`,
    /// followed by the call site unless debug info is disabled.
    ///
    /// With `append == false` the file is truncated the first time this
    /// router opens it.
    pub fn write_module_record(
        &mut self,
        record: &LogRecord,
        append: bool,
        location: Option<SourceLocation>,
    ) -> bool {
        let global = self.store.global_config();
        let path = PathBuf::from(format!(
            "{}{}{}",
            global.logs_root_folder, record.module, MODULE_FILE_EXTENSION
        ));

        let mut line = format!(
            "[{}] [{}] {}",
            record.timestamp,
            record.level.label(),
            record.message
        );
        if let Some(loc) = location.filter(|_| !global.disable_debug_info) {
            line.push_str(&format!(" ({loc})"));
        }
        line.push('\n');

        let state = self.module_files.entry(record.module.clone()).or_default();
        deliver(
            state,
            path,
            !append,
            &line,
            self.ensurer.as_ref(),
            &mut self.opened_paths,
            &mut self.stats,
        )
    }

    /// Write an already formatted console line.
    pub fn write_console(&mut self, line: &str, to_stderr: bool) {
        let result = if to_stderr {
            let mut err = io::stderr().lock();
            writeln!(err, "{line}").and_then(|()| err.flush())
        } else {
            let mut out = io::stdout().lock();
            writeln!(out, "{line}").and_then(|()| out.flush())
        };
        if let Err(e) = result {
            tracing::trace!(error = %e, "Console write failed");
        }
    }

    /// Close every open handle. Later writes reopen as needed.
    pub fn close_all(&mut self) {
        for state in self.level_files.iter_mut().chain(self.module_files.values_mut()) {
            state.stream = None;
        }
    }
}

/// Write one line to `state`, (re)opening the file at `path` as needed.
fn deliver(
    state: &mut FileState,
    path: PathBuf,
    truncate_on_first_open: bool,
    line: &str,
    ensurer: &dyn DirectoryEnsurer,
    opened_paths: &mut HashSet<PathBuf>,
    stats: &mut RouterStats,
) -> bool {
    if state.path.as_deref() != Some(path.as_path()) {
        if state.stream.take().is_some() {
            tracing::debug!(
                old = ?state.path,
                new = %path.display(),
                "Log path changed; closing old file"
            );
        }
        state.path = Some(path.clone());
        state.dir_ensured = false;
    }

    if !state.dir_ensured {
        ensurer.ensure_folders(&path);
        state.dir_ensured = true;
    }

    if state.stream.is_none() {
        let truncate = truncate_on_first_open && !opened_paths.contains(&path);
        match open_log_file(&path, truncate) {
            Ok(file) => {
                stats.files_opened += 1;
                opened_paths.insert(path.clone());
                state.stream = Some(file);
                tracing::debug!(path = %path.display(), truncate, "Opened log file");
            }
            Err(e) => {
                stats.records_dropped += 1;
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cannot open log file; record dropped"
                );
                return false;
            }
        }
    }
    let Some(stream) = state.stream.as_mut() else {
        return false;
    };

    match stream
        .write_all(line.as_bytes())
        .and_then(|()| stream.flush())
    {
        Ok(()) => {
            stats.records_written += 1;
            true
        }
        Err(e) => {
            // Drop the handle so the next record reopens.
            state.stream = None;
            stats.records_dropped += 1;
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Cannot write log file; record dropped"
            );
            false
        }
    }
}

fn open_log_file(path: &Path, truncate: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::GlobalConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Ensurer that counts calls and delegates to the real one.
    struct CountingEnsurer {
        calls: Arc<AtomicUsize>,
        inner: FsDirectoryEnsurer,
    }

    impl DirectoryEnsurer for CountingEnsurer {
        fn ensure_folders(&self, file_path: &Path) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.ensure_folders(file_path);
        }
    }

    fn root_of(dir: &Path) -> String {
        format!("{}/", dir.display())
    }

    fn setup(root: &str) -> (Arc<ConfigStore>, LevelFileRouter, Arc<AtomicUsize>) {
        let store = Arc::new(ConfigStore::new());
        store.set_global_config(GlobalConfig {
            logs_root_folder: root.to_string(),
            ..GlobalConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));
        let router = LevelFileRouter::with_ensurer(
            Arc::clone(&store),
            Box::new(CountingEnsurer {
                calls: Arc::clone(&calls),
                inner: FsDirectoryEnsurer::new(),
            }),
        );
        (store, router, calls)
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn same_path_opens_once_and_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let root = root_of(&tmp.path().join("logs"));
        let (_store, mut router, calls) = setup(&root);

        for i in 0..25 {
            let record = LogRecord::new("t", LogLevel::Error, "net", format!("msg {i}"));
            assert!(router.write_record(&record));
        }

        let written = lines(&tmp.path().join("logs").join("errors.log"));
        let expected: Vec<String> = (0..25).map(|i| format!("[t] [net] msg {i}")).collect();
        assert_eq!(written, expected);

        let stats = router.stats();
        assert_eq!(stats.files_opened, 1);
        assert_eq!(stats.records_written, 25);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn levels_without_file_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let (_store, mut router, calls) = setup(&root_of(tmp.path()));

        for level in [LogLevel::None, LogLevel::Debug, LogLevel::Info, LogLevel::Verbose] {
            assert!(!router.write_record(&LogRecord::new("t", level, "net", "x")));
        }

        assert_eq!(router.stats(), RouterStats::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn each_level_gets_its_own_file() {
        let tmp = TempDir::new().unwrap();
        let (_store, mut router, _) = setup(&root_of(tmp.path()));

        router.write_record(&LogRecord::new("t1", LogLevel::Warning, "net", "timeout"));
        router.write_record(&LogRecord::new("t2", LogLevel::Error, "net", "fatal IO"));
        router.write_record(&LogRecord::new("t3", LogLevel::Fatal, "db", "gone"));

        assert_eq!(lines(&tmp.path().join("warnings.log")), ["[t1] [net] timeout"]);
        assert_eq!(lines(&tmp.path().join("errors.log")), ["[t2] [net] fatal IO"]);
        assert_eq!(lines(&tmp.path().join("fatals.log")), ["[t3] [db] gone"]);
    }

    #[test]
    fn root_change_reopens_at_new_path() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("one");
        let second = tmp.path().join("two");
        let (store, mut router, calls) = setup(&root_of(&first));

        router.write_record(&LogRecord::new("t", LogLevel::Warning, "net", "a"));
        store.set_global_config(GlobalConfig {
            logs_root_folder: root_of(&second),
            ..GlobalConfig::default()
        });
        router.write_record(&LogRecord::new("t", LogLevel::Warning, "net", "b"));

        assert_eq!(lines(&first.join("warnings.log")), ["[t] [net] a"]);
        assert_eq!(lines(&second.join("warnings.log")), ["[t] [net] b"]);
        assert_eq!(router.stats().files_opened, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            router.level_file_path(LogLevel::Warning),
            Some(second.join("warnings.log").as_path())
        );
    }

    #[test]
    fn open_failure_drops_record_then_retries() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();
        let (_store, mut router, _) = setup(&root_of(&blocker));

        assert!(!router.write_record(&LogRecord::new("t", LogLevel::Error, "net", "lost")));
        assert_eq!(router.stats().records_dropped, 1);

        std::fs::remove_file(&blocker).unwrap();
        std::fs::create_dir(&blocker).unwrap();

        assert!(router.write_record(&LogRecord::new("t", LogLevel::Error, "net", "kept")));
        assert_eq!(lines(&blocker.join("errors.log")), ["[t] [net] kept"]);
    }

    #[test]
    fn existing_level_file_is_appended() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("errors.log"), "[old] [net] earlier\n").unwrap();
        let (_store, mut router, _) = setup(&root_of(tmp.path()));

        router.write_record(&LogRecord::new("new", LogLevel::Error, "net", "later"));

        assert_eq!(
            lines(&tmp.path().join("errors.log")),
            ["[old] [net] earlier", "[new] [net] later"]
        );
    }

    #[test]
    fn module_file_includes_level_and_location() {
        let tmp = TempDir::new().unwrap();
        let (_store, mut router, _) = setup(&root_of(tmp.path()));
        let loc = SourceLocation {
            file: "src/net.rs",
            line: 42,
        };

        router.write_module_record(
            &LogRecord::new("t", LogLevel::Info, "net", "up"),
            true,
            Some(loc),
        );

        assert_eq!(lines(&tmp.path().join("net.log")), ["[t] [INFO] up (src/net.rs:42)"]);
    }

    #[test]
    fn module_file_omits_location_when_debug_info_disabled() {
        let tmp = TempDir::new().unwrap();
        let (store, mut router, _) = setup(&root_of(tmp.path()));
        store.set_global_config(GlobalConfig {
            logs_root_folder: root_of(tmp.path()),
            disable_debug_info: true,
            ..GlobalConfig::default()
        });
        let loc = SourceLocation {
            file: "src/net.rs",
            line: 42,
        };

        router.write_module_record(
            &LogRecord::new("t", LogLevel::Debug, "net", "detail"),
            true,
            Some(loc),
        );

        assert_eq!(lines(&tmp.path().join("net.log")), ["[t] [DEBUG] detail"]);
    }

    #[test]
    fn non_append_module_file_truncates_only_on_first_open() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("net.log"), "stale\n").unwrap();
        let (_store, mut router, _) = setup(&root_of(tmp.path()));

        router.write_module_record(&LogRecord::new("t", LogLevel::Info, "net", "one"), false, None);
        router.close_all();
        router.write_module_record(&LogRecord::new("t", LogLevel::Info, "net", "two"), false, None);

        assert_eq!(
            lines(&tmp.path().join("net.log")),
            ["[t] [INFO] one", "[t] [INFO] two"]
        );
        assert_eq!(router.stats().files_opened, 2);
    }

    #[test]
    fn non_append_module_file_is_not_truncated_again_after_root_round_trip() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let (store, mut router, _) = setup(&root_of(&a));
        let set_root = |root: &Path| {
            store.set_global_config(GlobalConfig {
                logs_root_folder: root_of(root),
                ..GlobalConfig::default()
            });
        };

        router.write_module_record(&LogRecord::new("t", LogLevel::Info, "job", "one"), false, None);
        set_root(&b);
        router.write_module_record(&LogRecord::new("t", LogLevel::Info, "job", "two"), false, None);
        set_root(&a);
        router.write_module_record(&LogRecord::new("t", LogLevel::Info, "job", "three"), false, None);

        assert_eq!(
            lines(&a.join("job.log")),
            ["[t] [INFO] one", "[t] [INFO] three"]
        );
        assert_eq!(lines(&b.join("job.log")), ["[t] [INFO] two"]);
    }
}
