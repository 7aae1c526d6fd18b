use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use jstacksample::cancel_status::CancelStatus;
use jstacksample::process_iterator::JvmProcesses;
use jstacksample::resolver;
use jstacksample::sampler::{DumpOptions, DumpTool, JdkDumpSource, SampleConfig, Sampler};

#[derive(Parser, Debug)]
#[command(version, about = "Takes periodic thread dumps of a running JVM")]
struct Options {
    /// The process pid or main class name to sample
    process: String,
    /// Number of dumps to take
    #[arg(default_value_t = 1)]
    count: u32,
    /// Delay between dumps in milliseconds
    #[arg(default_value_t = 5000)]
    delay: u64,
    /// JDK tool used to take the dumps
    #[arg(long, value_enum, default_value_t = DumpTool::Jcmd)]
    tool: DumpTool,
    /// JDK installation to take the tool from, PATH is searched otherwise
    #[arg(long, env = "JAVA_HOME")]
    java_home: Option<PathBuf>,
    /// Leave out lock ownership information
    #[arg(long)]
    no_locks: bool,
    /// Print a per-thread summary instead of the full dump
    #[arg(long)]
    summary: bool,
    /// Log what the sampler is doing
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let options = Options::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if options.verbose { "debug" } else { "warn" },
    ))
    .init();

    let pid = match resolver::resolve(&options.process, &JvmProcesses) {
        Ok(pid) => pid,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }
    };

    let config = match SampleConfig::new(pid, options.count, options.delay) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }
    };

    let cancel_status = CancelStatus::new();
    cancel_status.activate_ctrl_c_handler();

    let source = JdkDumpSource::new(options.tool, options.java_home.clone());
    let mut sampler = Sampler::new(config, source).with_options(DumpOptions {
        locks: !options.no_locks,
    });

    log::info!(
        "sampling pid {} {} times, {}ms apart",
        pid,
        options.count,
        options.delay
    );

    while !sampler.is_done() {
        if cancel_status.is_canceled() {
            eprintln!("Sampling of pid {} canceled", pid);
            return ExitCode::FAILURE;
        }

        match sampler.generate() {
            Ok(Some(dump)) if options.summary => println!("{}", dump),
            Ok(Some(dump)) => println!("{}", dump.get_raw()),
            Ok(None) => {}
            Err(error) => {
                eprintln!("{}", error);
                return ExitCode::FAILURE;
            }
        }

        if !sampler.is_done() && !cancel_status.is_canceled() {
            sampler.sleep_between_iterations();
        }
    }

    eprintln!(
        "{} dump(s) taken from pid {}",
        sampler.get_iterations_completed(),
        pid
    );
    ExitCode::SUCCESS
}
