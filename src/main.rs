use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use robot36_core::{
    decode_wav, encode_image,
    demodulation::Robot36Demodulator,
    wav, Config, Robot36Modulator, Signal, YuvPlanes, IMAGE_HEIGHT, IMAGE_WIDTH,
};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "robot36")]
#[command(about = "Robot36 SSTV image encoder and decoder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an image into a Robot36 WAV file
    Encode {
        /// Input image (PNG, JPEG, BMP or GIF)
        image: PathBuf,

        /// Output WAV file
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,

        /// Volume level (0.0 - 1.0)
        #[arg(long, default_value = "1.0")]
        volume: f32,
    },

    /// Decode a Robot36 WAV file into a grayscale image
    Decode {
        /// Input WAV file (16-bit PCM)
        input: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "decoded_sstv.png")]
        output: PathBuf,

        /// Write raw 320x240 luma bytes instead of PNG
        #[arg(long)]
        raw: bool,

        /// Minimum Goertzel power for a sync pulse
        #[arg(long, default_value = "0.08")]
        sync_threshold: f32,
    },

    /// Show container metadata and sync diagnostics for a WAV file
    Info {
        /// Input WAV file
        input: PathBuf,
    },

    /// Encode and decode a synthetic raster (loopback test)
    Test,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            image,
            output,
            volume,
        } => {
            let config = Config {
                volume: volume.clamp(0.0, 1.0),
                ..Default::default()
            };
            let bytes =
                fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let wav_bytes = encode_image(&bytes, &config)?;
            fs::write(&output, &wav_bytes)
                .with_context(|| format!("writing {}", output.display()))?;

            let samples = (wav_bytes.len() - 44) / 2;
            eprintln!(
                "Wrote {} ({} samples, {:.2} s)",
                output.display(),
                samples,
                samples as f32 / config.sample_rate as f32
            );
        }

        Commands::Decode {
            input,
            output,
            raw,
            sync_threshold,
        } => {
            let config = Config {
                sync_threshold,
                ..Default::default()
            };
            let bytes =
                fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let decoded = decode_wav(&bytes, &config)?;

            let out = if raw {
                decoded.frame.pixels.clone()
            } else {
                decoded.to_png()?
            };
            fs::write(&output, out).with_context(|| format!("writing {}", output.display()))?;

            let report = &decoded.report;
            eprintln!(
                "Decoded {} lines from {} sync pulses{}",
                report.lines_decoded,
                report.sync_pulses,
                if report.fallback { " (fixed timing)" } else { "" }
            );
            eprintln!("Saved {}", output.display());
        }

        Commands::Info { input } => {
            let bytes =
                fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            show_info(&bytes)?;
        }

        Commands::Test => {
            println!("Running Robot36 loopback test...");
            run_test()?;
        }
    }

    Ok(())
}

fn show_info(bytes: &[u8]) -> Result<()> {
    let data = wav::parse(bytes)?;
    let signal = Signal::from_pcm16(&data.samples, data.sample_rate);

    println!("Sample rate: {} Hz", data.sample_rate);
    println!("Channels: {}", data.channels);
    println!("Samples: {}", signal.len());
    println!("Duration: {:.2} s", signal.duration_secs());

    let (grid, report) = Robot36Demodulator::new(Config::default()).timing_grid(&signal);

    match report.header_end {
        Some(end) => println!(
            "VIS header: ends at sample {}, code {}",
            end,
            report
                .vis_code
                .map_or("parity error".to_string(), |code| format!("{:#04x}", code.get()))
        ),
        None => println!("VIS header: not found"),
    }
    println!("Sync pulses: {}", report.sync_pulses);
    println!(
        "Refinement: {} kept, {} blended, {} substituted",
        report.refinement.kept, report.refinement.blended, report.refinement.substituted
    );
    println!(
        "Timing: {} ({} lines)",
        if grid.is_fallback() { "fixed" } else { "sync" },
        grid.positions().len()
    );

    Ok(())
}

fn run_test() -> Result<()> {
    const BANDS: [u8; 5] = [0, 62, 128, 191, 255];

    let config = Config::default();
    let luma: Vec<u8> = (0..IMAGE_WIDTH * IMAGE_HEIGHT)
        .map(|i| BANDS[(i / IMAGE_WIDTH / 8) % BANDS.len()])
        .collect();
    let rgb: Vec<u8> = luma.iter().flat_map(|&v| [v, v, v]).collect();
    let planes = YuvPlanes::from_rgb(&rgb, IMAGE_WIDTH, IMAGE_HEIGHT)?;

    let signal = Robot36Modulator::new(config.clone()).modulate(&planes)?;
    println!("Audio samples: {}", signal.len());
    println!("Duration: {:.2} s", signal.duration_secs());

    let (frame, report) = Robot36Demodulator::new(config).demodulate(&signal);
    println!("Sync pulses: {}", report.sync_pulses);
    println!("Lines decoded: {}", report.lines_decoded);

    let close = frame
        .pixels
        .iter()
        .zip(&luma)
        .filter(|&(&got, &want)| got.abs_diff(want) <= 10)
        .count();
    let ratio = close as f32 / luma.len() as f32;
    println!("Pixels within tolerance: {:.1}%", ratio * 100.0);

    if ratio >= 0.95 && !report.fallback {
        println!("\n✓ Test PASSED");
    } else {
        println!("\n✗ Test FAILED");
        std::process::exit(1);
    }

    Ok(())
}
