use clap::Parser;
use log::{error, info};

use pose2coco::{annotations_to_coco, Args};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.input.exists() {
        error!(
            "The specified input file does not exist: {}",
            args.input.display()
        );
        std::process::exit(1);
    }

    info!("Starting annotation conversion to COCO format...");

    match annotations_to_coco(&args.input, &args.output, &args.to_options()) {
        Ok(path) => info!("Conversion completed successfully: {}", path.display()),
        Err(e) => {
            error!("Failed to convert annotations: {}", e);
            std::process::exit(1);
        }
    }
}
