//! File sender
//!
//! Streams a WAV file as RTP in real time, optionally looping it.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use rtp_audio_cast::{
    audio::{FileDecoder, FileSource, WavDecoder},
    cli::{init_logging, CommonArgs},
    codec,
    network::{PacedTransport, RtpSender},
    stream::LoopOptions,
    Packetizer, StopFlag, StreamLoop,
};

#[derive(Parser, Debug)]
#[command(name = "rtp-filecast", version, about = "Stream an audio file as RTP")]
struct Args {
    /// <address>[/<port>] to send to
    destination: String,

    /// Audio file to stream
    file: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Loop the audio file
    #[arg(short = 'l', long = "loop")]
    loop_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let mut config = args.common.load_config(&args.destination)?;
    config.loop_file |= args.loop_file;
    config.validate()?;

    let decoder = WavDecoder::open(&args.file)?;
    let info = decoder.info();
    println!("---------------------------------------------------------");
    println!("Input File: {}", args.file.display());
    println!("{}", info);
    println!("---------------------------------------------------------");

    let mut codec = codec::create(&config.payload, info.sample_rate, info.channels)?;
    for (name, value) in config.codec_params()? {
        codec.set_param(&name, &value)?;
    }
    tracing::info!(
        "Output Format: {} Hz, {} channels, {}",
        codec.sample_rate(),
        codec.channels(),
        codec.name()
    );

    let packetizer = Packetizer::new(codec, config.payload_size_limit)?;
    let codec = packetizer.codec();
    let sender = RtpSender::from_config(&config.network, codec.payload_type())?;
    let transport = PacedTransport::new(sender, codec.clock_rate());

    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received interrupt, stopping");
                stop.stop();
            }
        });
    }

    let source = FileSource::new(decoder, config.loop_file);
    let options = LoopOptions {
        initial_timestamp: 0,
        timestamp_mode: config.timestamp_mode,
    };
    let mut stream = StreamLoop::new(source, packetizer, transport, stop, options)?;

    let stats = tokio::task::spawn_blocking(move || stream.run()).await??;
    tracing::info!(
        "Sent {} packets ({:.1} KB), file looped {} times",
        stats.packets_sent,
        stats.bytes_sent as f64 / 1024.0,
        stats.restarts
    );

    Ok(())
}
