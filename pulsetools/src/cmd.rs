//! The ASCII device-control sub-protocol.
//!
//! Commands are single letters with an optional numeric argument,
//! newline-terminated. The counter answers setting commands by echoing
//! the current value and answers a report request with a line of six
//! comma-separated integers. This channel is logically independent of
//! the binary interval stream and must never share a decoder with it;
//! the reference device carries the two on separate serial interfaces.

use anyhow::{ensure, Context, Result};

/// Count duration presets supported by the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountTime {
    Infinite,
    Secs1,
    Secs10,
    Secs60,
    Secs100,
    Secs300,
}

impl CountTime {
    fn code(self) -> u8 {
        match self {
            CountTime::Infinite => 0,
            CountTime::Secs1 => 1,
            CountTime::Secs10 => 2,
            CountTime::Secs60 => 3,
            CountTime::Secs100 => 4,
            CountTime::Secs300 => 5,
        }
    }
}

/// When and how the counter pushes status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Stop unsolicited reports
    Stop,
    /// Report when the running count finishes
    WhenReady,
    /// Report once, immediately
    Now,
    /// Report now and again when ready
    NowAndWhenReady,
    /// Report every 50 ms
    Every50Ms,
}

impl ReportMode {
    fn code(self) -> u8 {
        match self {
            ReportMode::Stop => 0,
            ReportMode::WhenReady => 1,
            ReportMode::Now => 2,
            ReportMode::NowAndWhenReady => 3,
            ReportMode::Every50Ms => 4,
        }
    }
}

/// Accepted tube voltage range in volts.
pub const VOLTAGE_RANGE: std::ops::RangeInclusive<u16> = 300..=700;

/// A command understood by the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `s`: start or stop counting
    SetCounting(bool),
    /// `j`: tube voltage in volts; prefer [`Command::set_voltage`]
    SetVoltage(u16),
    /// `f`: count duration preset
    SetCountTime(CountTime),
    /// `o`: repeat mode
    SetRepeat(bool),
    /// `U`: GM click and ready chime
    SetSpeaker { gm: bool, ready: bool },
    /// `b`: status report mode / one-shot request
    Report(ReportMode),
    /// `w`: clear the count register
    ClearRegister,
    /// `c`: copyright string
    Copyright,
    /// `v`: firmware version
    Version,
}

impl Command {
    /// Voltage command with the tube's limits enforced.
    pub fn set_voltage(volts: u16) -> Result<Command> {
        ensure!(
            VOLTAGE_RANGE.contains(&volts),
            "voltage {} V outside the accepted {}..={} V",
            volts,
            VOLTAGE_RANGE.start(),
            VOLTAGE_RANGE.end(),
        );
        Ok(Command::SetVoltage(volts))
    }

    /// The wire line for this command, without the terminating newline.
    pub fn encode(&self) -> String {
        match self {
            Command::SetCounting(on) => format!("s{}", *on as u8),
            Command::SetVoltage(volts) => format!("j{}", volts),
            Command::SetCountTime(preset) => format!("f{}", preset.code()),
            Command::SetRepeat(on) => format!("o{}", *on as u8),
            Command::SetSpeaker { gm, ready } => {
                format!("U{}", *gm as u8 + 2 * *ready as u8)
            }
            Command::Report(mode) => format!("b{}", mode.code()),
            Command::ClearRegister => String::from("w"),
            Command::Copyright => String::from("c"),
            Command::Version => String::from("v"),
        }
    }
}

/// One status report from the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Running count of the current measurement
    pub count: u32,
    /// Count of the previous, completed measurement
    pub last_count: u32,
    /// Selected count duration in seconds (0 = infinite)
    pub counting_time: u32,
    /// Repeat mode enabled
    pub repeat: bool,
    /// Progress through the count duration, percent
    pub progress: u32,
    /// Tube voltage in volts
    pub voltage: u16,
}

/// Parse a status report line: exactly six comma-separated integers.
///
/// A trailing separator and CR are tolerated (the device emits both in
/// some modes); anything else is rejected.
pub fn parse_status(line: &str) -> Result<DeviceStatus> {
    let body = line.trim_end_matches(['\r', '\n']);
    let body = body.strip_suffix(',').unwrap_or(body);

    let mut fields = [0u32; 6];
    let mut n = 0;
    for part in body.split(',') {
        ensure!(n < fields.len(), "status line has too many fields: {line:?}");
        fields[n] = part
            .trim()
            .parse()
            .with_context(|| format!("bad status field {:?} in {line:?}", part))?;
        n += 1;
    }
    ensure!(
        n == fields.len(),
        "status line has {n} fields, expected {}: {line:?}",
        fields.len(),
    );

    Ok(DeviceStatus {
        count: fields[0],
        last_count: fields[1],
        counting_time: fields[2],
        repeat: fields[3] != 0,
        progress: fields[4],
        voltage: fields[5] as u16,
    })
}
