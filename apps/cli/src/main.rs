use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use twiflash_core::artifact::PlanArtifact;
use twiflash_core::session::{SessionConfig, UpdateSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "Two-wire bootloader flashing tool", long_about = None)]
struct Args {
    /// Path to the firmware binary
    #[arg(long)]
    firmware: Option<String>,

    /// Bus device node to open
    #[arg(long)]
    bus: Option<String>,

    /// Two-wire address of the bootloader (e.g. 0x58)
    #[arg(long, value_parser = parse_address)]
    address: Option<u8>,

    /// Device offset to load the firmware binary at
    #[arg(long)]
    load_offset: Option<usize>,

    /// Give up probing after this many attempts (default: retry forever)
    #[arg(long)]
    probe_retries: Option<u32>,

    /// Load session configuration from a TOML file
    #[arg(long)]
    config: Option<String>,

    /// Save the effective configuration to a TOML file
    #[arg(long)]
    save_config: Option<String>,

    /// Write the transfer plan parameters to a TOML file
    #[arg(long)]
    export_plan: Option<String>,

    /// Build and summarize the transfer plan without touching the bus
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u8::from_str_radix(digits, radix).map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load_from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(path) = &args.firmware {
        config.firmware_path = Some(path.clone());
    }
    if let Some(path) = &args.bus {
        config.bus_path = path.clone();
    }
    if let Some(address) = args.address {
        config.device_address = address;
    }
    if let Some(offset) = args.load_offset {
        config.load_offset = offset;
    }
    if let Some(limit) = args.probe_retries {
        config.probe_retry_limit = Some(limit);
    }

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        info!(path = %path, "Configuration saved");
    }

    let session = UpdateSession::new(config);

    if args.export_plan.is_some() || args.dry_run {
        let plan = session.build_plan()?;
        if let Some(path) = &args.export_plan {
            PlanArtifact::from_plan(&plan).save_to_file(path)?;
            info!(path = %path, "Transfer plan exported");
        }
        if args.dry_run {
            info!(
                pages = plan.page_count(),
                bytes = plan.data_len(),
                first_offset = ?plan.first_offset(),
                "Dry run: plan built, device untouched"
            );
            return Ok(());
        }
    }

    let report = session.run()?;
    info!(
        version = report.device_version,
        checksum = %format!("{:04X}", report.checksum_after),
        pages = report.pages_written,
        restarted = report.restarted,
        "Firmware update complete"
    );
    Ok(())
}
