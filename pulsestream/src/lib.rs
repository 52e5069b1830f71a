pub mod acquisition;
pub mod command;
pub mod controller;
pub mod data;
pub mod diag;
pub mod queue;
pub mod timer;
pub mod transport;

use argh::FromArgs;

#[derive(Debug, FromArgs)]
/// Stream pulse intervals from a counter into timed batches
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// path to a JSON session config
    #[argh(option, short = 'c')]
    pub config: Option<String>,
    /// serial port of the interval stream (overrides the config)
    #[argh(option, short = 'p')]
    pub port: Option<String>,
    /// dispatch interval in ms (overrides the config)
    #[argh(option)]
    pub interval: Option<u64>,
    /// run against a built-in simulated device
    #[argh(switch)]
    pub demo: bool,
}

/// Control events understood by the dispatch loop.
pub enum Event {
    Tick,
    Pause,
    Resume,
    Stop,
}
