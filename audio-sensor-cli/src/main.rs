use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

use audio_sensor_core::{AudioFormat, AudioSensor, CaptureConfiguration, ChannelSink, SensorNode};
use audio_sensor_cpal::{AudioSubsystem, CpalCapture, DeviceEnumerator};

#[derive(Parser)]
#[command(name = "audio-sensor", version, about = "Publish microphone audio as (channels, frames) tensors")]
struct Cli {
    /// Audio host to use (e.g. ALSA, JACK). Defaults to the platform default.
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List capture devices
    Devices,
    /// Capture and log tensor messages
    Stream(StreamArgs),
}

#[derive(Args)]
struct StreamArgs {
    /// JSON capture configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture device index (see `devices`); default device if omitted
    #[arg(long)]
    device: Option<usize>,

    #[arg(long)]
    channels: Option<u16>,

    /// Sample rate in Hz
    #[arg(long)]
    rate: Option<u32>,

    /// Frames per buffer
    #[arg(long)]
    frames: Option<u32>,

    /// Sample format: S8 U8 S16[LSB|MSB|SYS] U16.. S32.. F32..
    #[arg(long)]
    format: Option<AudioFormat>,

    #[arg(long)]
    data_key: Option<String>,

    #[arg(long)]
    name: Option<String>,

    /// Log requested vs. negotiated device spec
    #[arg(long)]
    debug: bool,

    /// How long to capture
    #[arg(long, default_value_t = 300)]
    seconds: u64,

    /// Undelivered messages to hold before dropping
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..))]
    queue: u32,
}

impl StreamArgs {
    fn to_config(&self) -> anyhow::Result<CaptureConfiguration> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                CaptureConfiguration::from_json(&json)?
            }
            None => CaptureConfiguration::default(),
        };

        if self.device.is_some() {
            config.device_index = self.device;
        }
        if let Some(channels) = self.channels {
            config.channels = channels;
        }
        if let Some(rate) = self.rate {
            config.sample_rate = rate;
        }
        if let Some(frames) = self.frames {
            config.frames_per_buffer = frames;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(ref key) = self.data_key {
            config.data_key = key.clone();
        }
        if let Some(ref name) = self.name {
            config.name = name.clone();
        }
        config.debug |= self.debug;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let subsystem = AudioSubsystem::initialize_with_host(cli.host.as_deref())?;

    match cli.command {
        Command::Devices => {
            print!("{}", DeviceEnumerator::new(subsystem).describe()?);
            Ok(())
        }
        Command::Stream(args) => stream(subsystem, &args),
    }
}

fn stream(subsystem: Arc<AudioSubsystem>, args: &StreamArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;

    match DeviceEnumerator::new(Arc::clone(&subsystem)).describe() {
        Ok(listing) => eprint!("{}", listing),
        Err(e) => log::warn!("Device enumeration failed: {}", e),
    }

    let mut sensor = AudioSensor::open(CpalCapture::new(subsystem), config)?;
    let (sink, rx) = ChannelSink::bounded(args.queue as usize);
    let sink = Arc::new(sink);
    sensor.on_data(sink.clone());
    sensor.start()?;
    log::info!("{} streaming for {}s", sensor.name(), args.seconds);

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut window_start = Instant::now();
    let mut window_messages = 0u64;
    let mut window_frames = 0usize;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining.min(Duration::from_millis(500))) {
            Ok(msg) => {
                log::debug!(
                    "{} #{} key={} {} {} @ {} Hz",
                    msg.label,
                    msg.sequence,
                    msg.data_key,
                    msg.tensor.dtype(),
                    msg.shape_string(),
                    msg.sample_rate
                );
                window_messages += 1;
                window_frames += msg.tensor.frames();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if window_start.elapsed() >= Duration::from_secs(1) {
            log::info!("{} messages, {} frames in the last second", window_messages, window_frames);
            window_start = Instant::now();
            window_messages = 0;
            window_frames = 0;
        }
    }

    sensor.stop()?;
    let diag = sensor.diagnostics();
    log::info!(
        "callbacks: {} bytes: {} messages: {} conversion errors: {} sink errors: {} truncated bytes: {} queue drops: {}",
        diag.callback_count,
        diag.bytes_received,
        diag.messages_emitted,
        diag.conversion_errors,
        diag.sink_errors,
        diag.truncated_bytes,
        sink.dropped()
    );
    sensor.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "audio-sensor",
            "stream",
            "--device",
            "0",
            "--channels",
            "2",
            "--rate",
            "44100",
            "--frames",
            "512",
            "--format",
            "F32",
            "--debug",
        ]);
        let Command::Stream(args) = cli.command else {
            panic!("expected stream");
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.device_index, Some(0));
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.frames_per_buffer, 512);
        assert_eq!(config.format, AudioFormat::F32_SYS);
        assert_eq!(config.data_key, "data");
        assert!(config.debug);
        assert_eq!(args.seconds, 300);
    }

    #[test]
    fn bad_format_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["audio-sensor", "stream", "--format", "F64"]);
        assert!(result.is_err());
    }

    #[test]
    fn host_flag_is_global() {
        let cli = Cli::parse_from(["audio-sensor", "devices", "--host", "ALSA"]);
        assert_eq!(cli.host.as_deref(), Some("ALSA"));
        assert!(matches!(cli.command, Command::Devices));
    }

    #[test]
    fn queue_must_hold_at_least_one_message() {
        assert!(Cli::try_parse_from(["audio-sensor", "stream", "--queue", "0"]).is_err());

        let cli = Cli::parse_from(["audio-sensor", "stream", "--queue", "1"]);
        let Command::Stream(args) = cli.command else {
            panic!("expected stream");
        };
        assert_eq!(args.queue, 1);
    }
}
