//! Live sender
//!
//! Captures audio from an input device and streams it as RTP until
//! interrupted.

use anyhow::Result;
use clap::Parser;

use rtp_audio_cast::{
    audio::{find_input_device, list_input_devices, AudioRing, LiveCapture, LiveSource},
    cli::{init_logging, CommonArgs},
    codec,
    network::RtpSender,
    stream::LoopOptions,
    Packetizer, StopFlag, StreamLoop,
};

#[derive(Parser, Debug)]
#[command(name = "rtp-cast", version, about = "Stream live audio input as RTP")]
struct Args {
    /// <address>[/<port>] to send to
    #[arg(required_unless_present = "list_devices")]
    destination: Option<String>,

    #[command(flatten)]
    common: CommonArgs,

    /// Ring-buffer duration in milliseconds
    #[arg(short = 'r', long)]
    ring_ms: Option<u32>,

    /// Number of audio channels
    #[arg(short = 'c', long)]
    channels: Option<u16>,

    /// Name of the input device (default device if unset)
    #[arg(short = 'n', long)]
    device: Option<String>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.verbose);

    if args.list_devices {
        println!("\n=== Available Input Devices ===");
        for device in list_input_devices() {
            let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
            println!("  {}{}", device.name, default_marker);
            if let Some(rate) = device.sample_rate {
                println!("    Sample rate: {} Hz", rate);
            }
            println!("    Max channels: {}", device.max_channels);
        }
        return Ok(());
    }

    let destination = args.destination.as_deref().unwrap_or_default();
    let mut config = args.common.load_config(destination)?;
    if let Some(ring_ms) = args.ring_ms {
        config.ring_duration_ms = ring_ms;
    }
    if let Some(channels) = args.channels {
        config.channels = channels;
    }
    config.validate()?;

    let device = find_input_device(args.device.as_deref())?;
    let sample_rate = device.sample_rate()?;
    tracing::info!("Input device: {}", device.name);
    tracing::info!(
        "Input Format: {} Hz, {}",
        sample_rate,
        if config.channels == 2 { "Stereo" } else { "Mono" }
    );

    let mut codec = codec::create(&config.payload, sample_rate, config.channels)?;
    for (name, value) in config.codec_params()? {
        codec.set_param(&name, &value)?;
    }

    let packetizer = Packetizer::new(codec, config.payload_size_limit)?;
    let transport = RtpSender::from_config(&config.network, packetizer.codec().payload_type())?;

    let ring_bytes = config.ring_capacity_bytes(sample_rate, packetizer.frames_per_packet());
    let (producer, consumer) = AudioRing::with_capacity_bytes(ring_bytes)?;
    tracing::debug!("Ring buffer: {} bytes", ring_bytes);

    let stop = StopFlag::new();

    let mut capture = LiveCapture::new(device, sample_rate, config.channels);
    capture.start(producer)?;

    if let Some(errors) = capture.take_errors() {
        let stop = stop.clone();
        std::thread::spawn(move || {
            if let Ok(e) = errors.recv() {
                tracing::error!("Capture failed: {}", e);
                stop.stop();
            }
        });
    }

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received interrupt, stopping");
                stop.stop();
            }
        });
    }

    let source = LiveSource::new(
        consumer,
        sample_rate,
        config.channels,
        stop.clone(),
        config.stop_check_interval(),
    );
    let options = LoopOptions {
        initial_timestamp: 0,
        timestamp_mode: config.timestamp_mode,
    };
    let mut stream = StreamLoop::new(source, packetizer, transport, stop, options)?;

    let (stats, overflow) = tokio::task::spawn_blocking(move || {
        let result = stream.run();
        let overflow = stream.source().consumer().ring().overflow_count();
        result.map(|stats| (stats, overflow))
    })
    .await??;

    capture.stop();

    if overflow > 0 {
        tracing::warn!("Ring buffer overflowed, {} samples dropped", overflow);
    }
    tracing::info!(
        "Sent {} packets ({:.1} KB), {} samples captured",
        stats.packets_sent,
        stats.bytes_sent as f64 / 1024.0,
        capture.samples_captured()
    );

    Ok(())
}
