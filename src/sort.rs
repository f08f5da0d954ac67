//! Recursive split/merge sorter.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use log;

use crate::file;
use crate::ids::{IdRange, WorkId};
use crate::store::TempStore;
use crate::task::{FailurePolicy, Task, TaskOutcome};
use crate::{counter, merger, splitter};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// File read/write buffer size is unusable.
    InvalidBufSize(usize),
    /// Path does not resolve to an existing file.
    NotFound(PathBuf),
    /// Path is empty or malformed.
    InvalidPath(PathBuf),
    /// Common I/O error.
    IO(io::Error),
    /// Work-ID range is too small for the subtree it was assigned to.
    IdRangeExhausted { range: IdRange, required: u64 },
    /// Subtask failed and the failure policy aborted the sort.
    TaskFailed { task: Task, source: Box<SortError> },
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
            SortError::IO(err) => Some(err),
            SortError::TaskFailed { source, .. } => Some(source.as_ref()),
            SortError::InvalidBufSize(_)
            | SortError::NotFound(_)
            | SortError::InvalidPath(_)
            | SortError::IdRangeExhausted { .. } => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::InvalidBufSize(size) => write!(f, "invalid read/write buffer size: {}", size),
            SortError::NotFound(path) => write!(f, "file not found: {}", path.display()),
            SortError::InvalidPath(path) => write!(f, "invalid path: {:?}", path),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::IdRangeExhausted { range, required } => {
                write!(f, "work-id range {} too small, {} ids required", range, required)
            }
            SortError::TaskFailed { task, source } => write!(f, "{} task failed: {}", task, source),
        }
    }
}

/// Sorting summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Number of tokens in the source.
    pub tokens: usize,
    /// Number of orchestrator frames, the root included.
    pub frames: usize,
    /// Number of temporary files created and removed.
    pub temp_files: usize,
    /// Number of failed subtasks tolerated by [`FailurePolicy::Continue`].
    pub failed_tasks: usize,
}

impl SortReport {
    fn absorb(&mut self, child: SortReport) {
        self.frames += child.frames;
        self.temp_files += child.temp_files;
        self.failed_tasks += child.failed_tasks;
    }
}

/// Merge sorter builder. Provides methods for [`MergeSorter`] initialization.
#[derive(Clone, Default)]
pub struct MergeSorterBuilder {
    /// Number of threads to be used to sort data in parallel.
    threads_number: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// File read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Subtask failure handling.
    failure_policy: FailurePolicy,
}

impl MergeSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        MergeSorterBuilder::default()
    }

    /// Builds a [`MergeSorter`] instance using provided configuration.
    pub fn build(self) -> Result<MergeSorter, SortError> {
        MergeSorter::new(
            self.threads_number,
            self.tmp_dir.as_deref(),
            self.rw_buf_size,
            self.failure_policy,
        )
    }

    /// Sets number of threads to be used to sort data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> MergeSorterBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> MergeSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> MergeSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets subtask failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> MergeSorterBuilder {
        self.failure_policy = policy;
        return self;
    }
}

/// Merge sorter.
///
/// Sorts a token file by splitting it into two temporary files, sorting both halves recursively
/// in parallel and merging the results. Temporary files are named by work IDs carved out of a
/// per-call [`IdRange`], so parallel subtrees never touch each other's files.
pub struct MergeSorter {
    /// Sorting thread pool.
    thread_pool: rayon::ThreadPool,
    /// Temporary files storage.
    tmp_store: TempStore,
    /// File read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Subtask failure handling.
    failure_policy: FailurePolicy,
}

impl MergeSorter {
    /// Creates a new merge sorter instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of threads to be used to sort data in parallel. If the parameter is [`None`]
    ///   threads number will be selected based on available CPU core number.
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - File read/write buffer size. A zero-sized buffer is rejected.
    /// * `failure_policy` - What to do when a subtask fails.
    pub fn new(
        threads_number: Option<usize>,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
        failure_policy: FailurePolicy,
    ) -> Result<Self, SortError> {
        // an empty buffer reads as end of stream
        if let Some(0) = rw_buf_size {
            return Err(SortError::InvalidBufSize(0));
        }

        return Ok(MergeSorter {
            rw_buf_size,
            failure_policy,
            thread_pool: Self::init_thread_pool(threads_number)?,
            tmp_store: TempStore::new(tmp_path)?,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    /// Directory holding temporary files.
    pub fn tmp_path(&self) -> &Path {
        self.tmp_store.path()
    }

    /// Sorts the tokens of `source` into `destination`. Source and destination may be the same file.
    pub fn sort(&self, source: &Path, destination: &Path) -> Result<SortReport, SortError> {
        self.sort_with_seed(source, destination, 0)
    }

    /// Sorts the tokens of `source` into `destination` using work IDs starting at `seed`.
    /// Sorts running concurrently on the same sorter must be given seeds far enough apart
    /// for their ranges not to overlap.
    ///
    /// # Arguments
    /// * `source` - File to be sorted
    /// * `destination` - Result file, created or truncated
    /// * `seed` - First work ID the sort may use
    pub fn sort_with_seed(&self, source: &Path, destination: &Path, seed: WorkId) -> Result<SortReport, SortError> {
        log::info!(
            "sorting {} into {} (seed: {})",
            source.display(),
            destination.display(),
            seed
        );

        let report = self
            .thread_pool
            .install(|| self.sort_frame(source, destination, IdRange::from_seed(seed)))?;

        log::info!(
            "sorting done (tokens: {}, frames: {}, temporary files: {}, failed tasks: {})",
            report.tokens,
            report.frames,
            report.temp_files,
            report.failed_tasks
        );

        return Ok(report);
    }

    fn sort_frame(&self, source: &Path, destination: &Path, ids: IdRange) -> Result<SortReport, SortError> {
        let mut report = SortReport {
            frames: 1,
            ..SortReport::default()
        };

        let len = self
            .resolve(Task::Count, counter::count_tokens(&[source], self.rw_buf_size), &mut report)?
            .unwrap_or(0);
        report.tokens = len;

        if len <= 1 {
            if source != destination {
                log::debug!("copying {} to {}", source.display(), destination.display());
                self.resolve(Task::Copy, file::copy(source, destination), &mut report)?;
            }
            return Ok(report);
        }

        let carving = ids.carve(len)?;
        log::trace!(
            "carved {} for {} tokens: files {} and {}, children {} and {}",
            ids,
            len,
            carving.left_file,
            carving.right_file,
            carving.left_child,
            carving.right_child
        );

        let left = self.tmp_store.path_for(carving.left_file);
        let right = self.tmp_store.path_for(carving.right_file);

        let split = splitter::split_file(source, &left, &right, self.rw_buf_size);
        if self.resolve(Task::Split, split, &mut report)?.is_some() {
            report.temp_files += 2;
        }

        let (left_sorted, right_sorted) = rayon::join(
            || self.sort_frame(&left, &left, carving.left_child),
            || self.sort_frame(&right, &right, carving.right_child),
        );
        for sorted in [left_sorted, right_sorted] {
            if let Some(child) = self.resolve(Task::Sort, sorted, &mut report)? {
                report.absorb(child);
            }
        }

        let merge = merger::merge_files(&left, &right, destination, self.rw_buf_size);
        self.resolve(Task::Merge, merge, &mut report)?;

        for path in [&left, &right] {
            self.resolve(Task::Cleanup, file::unlink(path), &mut report)?;
        }

        log::debug!("sorted {} into {} ({} tokens)", source.display(), destination.display(), len);

        return Ok(report);
    }

    fn resolve<T>(
        &self,
        task: Task,
        result: Result<T, SortError>,
        report: &mut SortReport,
    ) -> Result<Option<T>, SortError> {
        TaskOutcome::new(task, result).resolve(self.failure_policy, &mut report.failed_tasks)
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{MergeSorter, MergeSorterBuilder, SortError};
    use crate::task::{FailurePolicy, Task};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir_in("./").unwrap()
    }

    fn sorter(threads_number: usize) -> MergeSorter {
        MergeSorterBuilder::new()
            .with_threads_number(threads_number)
            .with_tmp_dir(Path::new("./"))
            .build()
            .unwrap()
    }

    #[rstest]
    #[case("", "")]
    #[case("7\n", "7\n")]
    #[case("3\n1\n2\n", "1\n2\n3\n")]
    #[case("5\n5\n1\n", "1\n5\n5\n")]
    #[case("3,,1;2", "1\n2\n3\n")]
    #[case("10 9 8 7 6 5 4 3 2 1 0", "0\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n")]
    fn test_sort_scenarios(tmp_dir: tempfile::TempDir, #[case] input: &str, #[case] expected: &str) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, input).unwrap();

        let sorter = sorter(2);
        sorter.sort(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), expected);
        assert_eq!(fs::read_to_string(&source).unwrap(), input);
    }

    #[rstest]
    #[case(1, None)]
    #[case(4, None)]
    #[case(4, Some(16))]
    fn test_sort_random(tmp_dir: tempfile::TempDir, #[case] threads_number: usize, #[case] buf_size: Option<usize>) {
        let mut rng = rand::thread_rng();
        let mut values: Vec<u64> = (0..1500).map(|_| rng.gen_range(0..500)).collect();
        values.shuffle(&mut rng);

        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        let input: String = values.iter().map(|v| format!("{}\n", v)).collect();
        fs::write(&source, input).unwrap();

        let mut builder = MergeSorterBuilder::new()
            .with_threads_number(threads_number)
            .with_tmp_dir(tmp_dir.path());
        if let Some(buf_size) = buf_size {
            builder = builder.with_rw_buf_size(buf_size);
        }
        let sorter = builder.build().unwrap();

        let report = sorter.sort(&source, &destination).unwrap();

        values.sort();
        let expected: String = values.iter().map(|v| format!("{}\n", v)).collect();
        assert_eq!(fs::read_to_string(&destination).unwrap(), expected);
        assert_eq!(report.tokens, 1500);
        assert_eq!(report.frames, 2 * 1500 - 1);
        assert_eq!(report.temp_files, 2 * 1500 - 2);
        assert_eq!(report.failed_tasks, 0);
    }

    #[rstest]
    fn test_sort_in_place_is_idempotent(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, "42\n7\n7\n0\n1000\n13\n").unwrap();

        let sorter = sorter(2);
        sorter.sort(&source, &source).unwrap();
        let once = fs::read(&source).unwrap();
        assert_eq!(once, b"0\n7\n7\n13\n42\n1000\n");

        sorter.sort(&source, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), once);
    }

    #[rstest]
    fn test_temp_files_removed(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        let input: String = (0..100).rev().map(|v| format!("{}\n", v)).collect();
        fs::write(&source, input).unwrap();

        let sorter = sorter(4);
        sorter.sort_with_seed(&source, &destination, 1_000).unwrap();

        assert_eq!(fs::read_dir(sorter.tmp_path()).unwrap().count(), 0);
    }

    #[rstest]
    fn test_single_token_copied_verbatim(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, " 7;").unwrap();

        let report = sorter(1).sort(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), " 7;");
        assert_eq!(report.frames, 1);
        assert_eq!(report.temp_files, 0);
    }

    #[rstest]
    fn test_abort_on_missing_source(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("never-created");
        let destination = tmp_dir.path().join("output");

        let result = sorter(1).sort(&source, &destination);

        match result {
            Err(SortError::TaskFailed { task, source: err }) => {
                assert_eq!(task, Task::Count);
                assert!(matches!(*err, SortError::NotFound(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[rstest]
    fn test_continue_on_missing_source(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("never-created");
        let destination = tmp_dir.path().join("output");

        let sorter = MergeSorterBuilder::new()
            .with_threads_number(1)
            .with_tmp_dir(tmp_dir.path())
            .with_failure_policy(FailurePolicy::Continue)
            .build()
            .unwrap();
        let report = sorter.sort(&source, &destination).unwrap();

        // count and copy both fail
        assert_eq!(report.failed_tasks, 2);
        assert_eq!(report.tokens, 0);
    }

    #[rstest]
    fn test_policies_agree_on_success(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        fs::write(&source, "9 8 7 1 2 3 3").unwrap();

        let mut outputs = Vec::new();
        for policy in [FailurePolicy::Abort, FailurePolicy::Continue] {
            let destination = tmp_dir.path().join(format!("{:?}", policy));
            let sorter = MergeSorterBuilder::new()
                .with_tmp_dir(tmp_dir.path())
                .with_failure_policy(policy)
                .build()
                .unwrap();
            sorter.sort(&source, &destination).unwrap();
            outputs.push(fs::read(&destination).unwrap());
        }

        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], b"1\n2\n3\n3\n7\n8\n9\n");
    }

    #[rstest]
    fn test_zero_buf_size_rejected(tmp_dir: tempfile::TempDir) {
        let result = MergeSorterBuilder::new()
            .with_tmp_dir(tmp_dir.path())
            .with_rw_buf_size(0)
            .build();

        assert!(matches!(result, Err(SortError::InvalidBufSize(0))));
    }

    #[rstest]
    fn test_single_byte_buf_size(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, "3\n1\n2\n").unwrap();

        let sorter = MergeSorterBuilder::new()
            .with_tmp_dir(tmp_dir.path())
            .with_rw_buf_size(1)
            .build()
            .unwrap();
        let report = sorter.sort(&source, &destination).unwrap();

        assert_eq!(report.tokens, 3);
        assert_eq!(fs::read_to_string(&destination).unwrap(), "1\n2\n3\n");
    }

    #[rstest]
    fn test_abort_on_merge_failure(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("missing-dir").join("output");
        fs::write(&source, "4\n3\n2\n1\n").unwrap();

        let sorter = sorter(2);
        let store_path = sorter.tmp_path().to_path_buf();

        match sorter.sort(&source, &destination) {
            Err(SortError::TaskFailed { task, source: err }) => {
                assert_eq!(task, Task::Merge);
                assert!(matches!(*err, SortError::NotFound(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // the root halves are left behind until the sorter goes away
        assert!(fs::read_dir(&store_path).unwrap().count() > 0);
        drop(sorter);
        assert!(!store_path.exists());
    }

    #[rstest]
    fn test_continue_on_merge_failure(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("missing-dir").join("output");
        fs::write(&source, "4\n3\n2\n1\n").unwrap();

        let sorter = MergeSorterBuilder::new()
            .with_threads_number(2)
            .with_tmp_dir(tmp_dir.path())
            .with_failure_policy(FailurePolicy::Continue)
            .build()
            .unwrap();
        let report = sorter.sort(&source, &destination).unwrap();

        assert_eq!(report.failed_tasks, 1);
        assert_eq!(report.tokens, 4);
        assert_eq!(fs::read_dir(sorter.tmp_path()).unwrap().count(), 0);
    }

    #[rstest]
    fn test_abort_keeps_failed_task_of_nested_frame(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, "4\n3\n2\n1\n").unwrap();

        let sorter = sorter(2);
        // ids for 4 tokens from seed 0: root halves 0 and 3, left half split into 1 and 2
        fs::create_dir(sorter.tmp_path().join("1.out")).unwrap();

        match sorter.sort(&source, &destination) {
            Err(SortError::TaskFailed { task, .. }) => assert_eq!(task, Task::Split),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[rstest]
    fn test_continue_past_nested_frame_failure(tmp_dir: tempfile::TempDir) {
        let source = tmp_dir.path().join("input");
        let destination = tmp_dir.path().join("output");
        fs::write(&source, "4\n3\n2\n1\n").unwrap();

        let sorter = MergeSorterBuilder::new()
            .with_threads_number(2)
            .with_tmp_dir(tmp_dir.path())
            .with_failure_policy(FailurePolicy::Continue)
            .build()
            .unwrap();
        fs::create_dir(sorter.tmp_path().join("1.out")).unwrap();

        let report = sorter.sort(&source, &destination).unwrap();

        assert!(report.failed_tasks > 0);
        assert_eq!(report.tokens, 4);
        assert!(destination.exists());
    }
}
