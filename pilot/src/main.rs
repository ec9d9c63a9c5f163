// pilot/src/main.rs

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use pilot_common::queues::{CommQueues, DataQueues};
use pilot_common::shutdown::Shutdown;
use pilot_common::Config;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use cli::CliArgs;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

fn init_logging(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("PILOT_LOG")
        .from_env_lossy();

    if verbose > 0 {
        let file_appender = tracing_appender::rolling::daily(".", "pilot.log");
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
        Box::leak(Box::new(guard));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr.and(non_blocking_appender))
            .with_ansi(true)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .try_init();
    }
}

fn load_initial_jobs(job_files: &[std::path::PathBuf], queues: &DataQueues) {
    for path in job_files {
        match pilot_io::read_json_sync::<pilot_common::Job>(path) {
            Ok(job) => {
                info!(panda_id = job.panda_id, path = %path.display(), "queued job for stage-in");
                let _ = queues.data_in.0.send(job);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load job descriptor, skipping");
            }
        }
    }
}

fn main() {
    let args = CliArgs::parse();
    init_logging(args.verbose);
    install_signal_handlers();

    let config = Config::load();
    if let Some(plugin) = &config.communicator_plugin {
        info!(plugin, "communicator plugin selected via COMMUNICATOR_PLUGIN");
    }

    let data_queues = DataQueues::new();
    let comm_queues = CommQueues::new();
    let shutdown = Shutdown::new();
    let reporter = pilot_core::pipeline::NoopStateReporter;
    let transfer_runner = pilot_io::SystemTransferRunner;
    let plugin = pilot_net::plugin_from_env(args.communicator_endpoint.clone());

    load_initial_jobs(&args.job_files, &data_queues);

    info!("pilot core starting; press Ctrl-C to stop");

    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !INTERRUPTED.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            info!("interrupt received, signalling graceful stop");
            shutdown.signal();
        });

        scope.spawn(|| pilot_core::pipeline::run_stage_in_worker(&data_queues, &shutdown, &reporter, &transfer_runner));
        scope.spawn(|| pilot_core::pipeline::run_stage_out_worker(&data_queues, &shutdown, &transfer_runner));
        scope.spawn(|| pilot_core::pipeline::run_queue_monitor(&data_queues, &shutdown, &transfer_runner));
        scope.spawn(|| pilot_core::comm::run_dispatch_loop(&comm_queues, plugin.as_ref(), &shutdown));
    });

    let finished = data_queues.finished_jobs.1.try_iter().count();
    let failed = data_queues.failed_jobs.1.try_iter().count();
    info!(finished, failed, "pilot core stopped");
}
