use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use pulsestream::command::CommandChannel;
use pulsestream::controller::Pipeline;
use pulsestream::data::StreamMessage;
use pulsestream::transport::{SerialTransport, Transport, VirtualTransport};
use pulsestream::CliArgs;
use pulsetools::cfg::Session;
use pulsetools::cmd::Command;

const GIT_VERSION: &str = git_version::git_version!(fallback = "0.2.0");

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();

    if args.version {
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(env!("CARGO_BIN_NAME"), " ", "{}"),
            GIT_VERSION,
        )?;
        return Ok(());
    }

    tracing_subscriber::fmt::init();

    let mut session = match &args.config {
        Some(path) => {
            let f = std::fs::File::open(path)
                .with_context(|| format!("opening session config {path}"))?;
            serde_json::from_reader(std::io::BufReader::new(f))
                .with_context(|| format!("parsing session config {path}"))?
        }
        None => Session::default(),
    };
    if let Some(port) = args.port {
        session.data_port = port;
    }
    if let Some(ms) = args.interval {
        session.dispatch_interval = Duration::from_millis(ms);
    }

    let transport: Box<dyn Transport> = if args.demo {
        tracing::info!("demo mode: streaming from a simulated device");
        // A real device never emits sub-threshold intervals; neither does
        // the simulated one.
        Box::new(
            VirtualTransport::new(session.read_timeout)
                .with_interval_range(session.debounce_us + 1, 20_000),
        )
    } else {
        Box::new(SerialTransport::open(
            &session.data_port,
            session.data_baud,
            session.read_timeout,
        )?)
    };

    // Control channel, when the device has one wired up. Counting is
    // started for the session and stopped again on the way out.
    let mut command = match (&session.command_port, args.demo) {
        (Some(path), false) => Some(CommandChannel::new(Box::new(SerialTransport::open(
            path,
            session.command_baud,
            session.read_timeout,
        )?))),
        _ => None,
    };
    if let Some(channel) = command.as_mut() {
        channel.send(&Command::SetCounting(true))?;
    }

    let (tx, rx) = flume::unbounded();
    let pipeline = Pipeline::start(&session, transport, tx);
    tracing::info!(
        port = %session.data_port,
        interval = ?session.dispatch_interval,
        "acquisition started"
    );

    let mut total: u64 = 0;
    while let Ok(message) = rx.recv() {
        match message {
            StreamMessage::Batch(batch) => {
                total += batch.len() as u64;
                let mean_us =
                    batch.iter().map(|s| s.delta_us as f64).sum::<f64>() / batch.len() as f64;
                tracing::info!(
                    samples = batch.len(),
                    total,
                    "batch, mean interval {mean_us:.1} us"
                );
            }
            StreamMessage::ConnectionLost => {
                tracing::error!("connection lost, ending session");
                break;
            }
        }
    }

    if let Some(channel) = command.as_mut() {
        let _ = channel.send(&Command::SetCounting(false));
    }
    let diag = pipeline.diagnostics();
    tracing::info!(
        decoded = diag.frames_decoded,
        dropped = diag.frames_dropped,
        queued = diag.queue_depth,
        "final counters"
    );
    pipeline.stop();
    Ok(())
}
