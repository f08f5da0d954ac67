//! `ext-mergesort` is a recursive external merge sort of integer text files.
//!
//! Input files hold non-negative decimal integers separated by any run of non-digit bytes. A sort
//! counts the tokens of its source and, if there is more than one, splits the source round-robin
//! into two temporary files, sorts both halves recursively and in parallel, merges them into the
//! destination and removes the temporary files. Sources holding at most one token are copied
//! verbatim.
//!
//! The parallel halves never share a file: every call receives a range of work IDs by value,
//! names its two temporary files with IDs from that range and hands each recursive call a
//! disjoint sub-range. No locking is involved.
//!
//! # Overview
//!
//! `ext-mergesort` consists of the following building blocks:
//!
//! * [`token`]: decimal token reader and writer.
//! * [`counter`]: token counter over one or more files.
//! * [`splitter`]: round-robin splitter of one token stream into two.
//! * [`merger`]: stable two-way merger of sorted token streams.
//! * [`ids`]: work-ID range carving.
//! * [`sort`]: the recursive sorter driving all of the above on a `rayon` thread pool.
//!
//! # Example
//!
//! ```no_run
//! use std::path;
//!
//! use ext_mergesort::{FailurePolicy, MergeSorter, MergeSorterBuilder};
//!
//! fn main() {
//!     let sorter: MergeSorter = MergeSorterBuilder::new()
//!         .with_tmp_dir(path::Path::new("./"))
//!         .with_threads_number(4)
//!         .with_failure_policy(FailurePolicy::Abort)
//!         .build()
//!         .unwrap();
//!
//!     let report = sorter.sort(path::Path::new("input.txt"), path::Path::new("output.txt")).unwrap();
//!     println!("{} tokens sorted", report.tokens);
//! }
//! ```

pub mod counter;
pub mod file;
pub mod ids;
pub mod merger;
pub mod sort;
pub mod splitter;
pub mod store;
pub mod task;
pub mod token;

pub use counter::count_tokens;
pub use ids::{Carving, IdRange, WorkId};
pub use merger::{merge_files, TwoWayMerger};
pub use sort::{MergeSorter, MergeSorterBuilder, SortError, SortReport};
pub use splitter::{split_file, SplitStats};
pub use task::{FailurePolicy, Task, TaskOutcome};
pub use token::{Token, TokenReader};
