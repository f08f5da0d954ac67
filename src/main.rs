use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_mergesort::{count_tokens, merge_files, split_file, FailurePolicy, MergeSorter, MergeSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    match arg_parser.subcommand() {
        Some(("sort", args)) => run_sort(args),
        Some(("count", args)) => run_count(args),
        Some(("split", args)) => run_split(args),
        Some(("merge", args)) => run_merge(args),
        _ => unreachable!("subcommand is required"),
    }
}

fn run_sort(args: &clap::ArgMatches) {
    let input = args.value_of("input").expect("value is required");
    let output = args.value_of("output").expect("value is required");
    let seed: u64 = args.value_of_t_or_exit("seed");
    let on_failure: OnFailure = args.value_of_t_or_exit("on_failure");
    let tmp_dir: Option<&str> = args.value_of("tmp_dir");
    let threads: Option<usize> = args.is_present("threads").then(|| args.value_of_t_or_exit("threads"));
    let buf_size: Option<usize> = args
        .value_of("buf_size")
        .map(|v| v.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize);

    let mut sorter_builder = MergeSorterBuilder::new().with_failure_policy(match on_failure {
        OnFailure::Abort => FailurePolicy::Abort,
        OnFailure::Continue => FailurePolicy::Continue,
    });
    if let Some(threads) = threads {
        sorter_builder = sorter_builder.with_threads_number(threads);
    }

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(buf_size) = buf_size {
        sorter_builder = sorter_builder.with_rw_buf_size(buf_size);
    }

    let sorter: MergeSorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let report = match sorter.sort_with_seed(path::Path::new(input), path::Path::new(output), seed) {
        Ok(report) => report,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    if report.failed_tasks > 0 {
        log::warn!("{} tasks failed, the result may be incomplete", report.failed_tasks);
    }
}

fn run_count(args: &clap::ArgMatches) {
    let inputs: Vec<&str> = args.values_of("input").expect("value is required").collect();

    match count_tokens(&inputs[..], None) {
        Ok(count) => println!("{}", count),
        Err(err) => {
            log::error!("token counting error: {}", err);
            process::exit(1);
        }
    }
}

fn run_split(args: &clap::ArgMatches) {
    let input = args.value_of("input").expect("value is required");
    let first = args.value_of("first").expect("value is required");
    let second = args.value_of("second").expect("value is required");

    if let Err(err) = split_file(
        path::Path::new(input),
        path::Path::new(first),
        path::Path::new(second),
        None,
    ) {
        log::error!("data splitting error: {}", err);
        process::exit(1);
    }
}

fn run_merge(args: &clap::ArgMatches) {
    let first = args.value_of("first").expect("value is required");
    let second = args.value_of("second").expect("value is required");
    let output = args.value_of("output").expect("value is required");

    if let Err(err) = merge_files(
        path::Path::new(first),
        path::Path::new(second),
        path::Path::new(output),
        None,
    ) {
        log::error!("data merging error: {}", err);
        process::exit(1);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum OnFailure {
    Abort,
    Continue,
}

impl OnFailure {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        OnFailure::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for OnFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <OnFailure as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-mergesort")
        .about("recursive split/merge sorter of integer files")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .subcommand(
            clap::App::new("sort")
                .about("sort integers of a file")
                .arg(
                    clap::Arg::new("input")
                        .help("file to be sorted")
                        .required(true)
                        .index(1),
                )
                .arg(
                    clap::Arg::new("output")
                        .help("result file, may be the input itself")
                        .required(true)
                        .index(2),
                )
                .arg(
                    clap::Arg::new("seed")
                        .short('s')
                        .long("seed")
                        .help("first work id used to name temporary files")
                        .takes_value(true)
                        .default_value("0"),
                )
                .arg(
                    clap::Arg::new("threads")
                        .short('t')
                        .long("threads")
                        .help("number of threads to use for parallel sorting")
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("tmp_dir")
                        .short('d')
                        .long("tmp-dir")
                        .help("directory to be used to store temporary data")
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("buf_size")
                        .short('b')
                        .long("buf-size")
                        .help("file read/write buffer size")
                        .takes_value(true)
                        .validator(|v| match v.parse::<ByteSize>() {
                            Ok(size) if size.as_u64() == 0 => Err("Buffer size must be positive".to_string()),
                            Ok(_) => Ok(()),
                            Err(err) => Err(format!("Buffer size format incorrect: {}", err)),
                        }),
                )
                .arg(
                    clap::Arg::new("on_failure")
                        .short('f')
                        .long("on-failure")
                        .help("what to do when a subtask fails")
                        .takes_value(true)
                        .default_value("abort")
                        .possible_values(OnFailure::possible_values()),
                ),
        )
        .subcommand(
            clap::App::new("count")
                .about("count integers in files")
                .arg(
                    clap::Arg::new("input")
                        .help("files to be counted")
                        .required(true)
                        .multiple_values(true)
                        .index(1),
                ),
        )
        .subcommand(
            clap::App::new("split")
                .about("split integers of a file into two files, round-robin")
                .arg(clap::Arg::new("input").help("file to be split").required(true).index(1))
                .arg(clap::Arg::new("first").help("first result file").required(true).index(2))
                .arg(clap::Arg::new("second").help("second result file").required(true).index(3)),
        )
        .subcommand(
            clap::App::new("merge")
                .about("merge two sorted integer files")
                .arg(clap::Arg::new("first").help("first sorted file").required(true).index(1))
                .arg(clap::Arg::new("second").help("second sorted file").required(true).index(2))
                .arg(clap::Arg::new("output").help("result file").required(true).index(3)),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
