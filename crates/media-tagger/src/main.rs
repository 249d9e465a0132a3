use argh::FromArgs;
use std::path::PathBuf;

use media_tagger::{OutputFormat, Tagger, TaggerConfig};
use media_tagger_vlm::blip::{BlipCaptioner, BlipConfig, BlipVariant};

#[derive(FromArgs)]
/// Generate captions for images and videos into a CSV file
struct Args {
    /// path to an image, a video or a directory of media files
    #[argh(positional)]
    input_path: PathBuf,

    /// path to the output CSV file
    #[argh(option, short = 'o', default = "PathBuf::from(\"captions.csv\")")]
    output: PathBuf,

    /// log verbose progress
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// load the model in half precision on accelerators for throughput
    #[argh(switch)]
    batch: bool,

    /// caption every file even if it is already in the CSV
    #[argh(switch)]
    no_skip: bool,

    /// write the CSV once at the end instead of after each file
    #[argh(switch)]
    no_continuous: bool,

    /// the CSV layout: basic or detailed
    #[argh(option, default = "OutputFormat::Detailed")]
    format: OutputFormat,

    /// maximum number of frames captioned per video
    #[argh(option, default = "5")]
    max_frames: usize,

    /// the BLIP checkpoint: base or large
    #[argh(option, default = "BlipVariant::Base")]
    model: BlipVariant,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("media_tagger", level)
        .filter_module("media_tagger_io", level)
        .filter_module("media_tagger_vlm", level)
        .parse_default_env()
        .init();

    if !args.input_path.exists() {
        log::error!("Error: {} does not exist", args.input_path.display());
        std::process::exit(1);
    }

    log::info!("Loading AI models...");
    let captioner = BlipCaptioner::new(BlipConfig {
        variant: args.model,
        half_precision: args.batch,
        ..Default::default()
    })?;
    log::info!("Models loaded!");

    let config = TaggerConfig {
        format: args.format,
        skip_existing: !args.no_skip,
        continuous_save: !args.no_continuous,
        max_frames: args.max_frames,
        show_progress: true,
        verbose: args.verbose,
        batch_mode: args.batch,
    };

    let mut tagger = Tagger::new(captioner, config);
    tagger.process(&args.input_path, &args.output)?;

    Ok(())
}
