// main.rs

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::json;
use tokio::runtime;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, Layer};
use video_merge::{MergeConfig, MergeRequest, MergeService, PROGRESS_EVENT};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
enum LogLevel {
    Trace = 0, // Designates very fine-grained informational events, extremely verbose.
    Debug = 1, // Designates fine-grained informational events.
    Info = 2, // Designates informational messages.
    Warn = 3, // Designates hazardous situations.
    Error = 4, // Designates very serious errors.
}

#[derive(Parser, Debug)]
#[command(author, version, about = "video-merge")]
struct Args {
    /// Input files or URIs, merged in the given order
    #[arg(required = true)]
    inputs: Vec<String>,
    /// Output file (a file:// prefix is stripped)
    #[arg(short, long)]
    output: String,
    /// JSON file with merge settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    // Set the log level (possible values: error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LogLevel,
    /// Skip inputs after the first one that cannot be opened
    #[arg(long)]
    skip_unopenable: bool,
    /// Keep the partial output when the merge fails
    #[arg(long)]
    keep_partial: bool,
    /// Print progress events and the result as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Parse command-line arguments
    let args = Args::parse();

    // Build the FmtSubscriber layer
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_filter(match args.log_level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        });
    let subscriber = tracing_subscriber::registry().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global default subscriber");

    info!("{:?}", args);

    let mut config = match &args.config {
        Some(path) => MergeConfig::load_from(path)?,
        None => MergeConfig::default(),
    };
    config.skip_unopenable_inputs |= args.skip_unopenable;
    config.keep_partial_output |= args.keep_partial;

    let runtime = runtime::Builder::new_multi_thread()
        .thread_name("MERGE w")
        .enable_all()
        .build()?;

    let request = MergeRequest {
        video_paths: args.inputs,
        output_path: args.output,
    };
    let json_output = args.json;

    let outcome = runtime.block_on(async move {
        let service = MergeService::new(config);
        let mut handle = service.spawn(request);

        let cancel = handle_ctrl_c();
        let mut cancelling = false;
        loop {
            tokio::select! {
                event = handle.progress().recv() => match event {
                    Some(event) if json_output => {
                        println!("{}", json!({ "event": PROGRESS_EVENT, "progress": event.progress, "message": event.message }));
                    }
                    Some(event) => info!("{} ({:.1}%)", event.message, event.progress * 100.0),
                    None => break,
                },
                _ = cancel.cancelled(), if !cancelling => {
                    info!("Cancelling merge");
                    cancelling = true;
                    handle.cancel();
                }
            }
        }
        handle.outcome().await
    });

    match outcome {
        Ok(response) => {
            if json_output {
                println!("{}", json!({ "path": response.path }));
            } else {
                println!("{}", response.path);
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                println!("{}", json!({ "error": e.to_string() }));
            }
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Token that fires on the first Ctrl-C.
fn handle_ctrl_c() -> tokio_util::sync::CancellationToken {
    let token = tokio_util::sync::CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}
