//! usynth: offline rendering, realtime playback and bank tooling for the
//! wavetable tone generator.

use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use us_engine::PatchTable;
use us_formats::{parse_hex, write_wav_file};
use us_master::{BankFile, Controller, SynthConfig};

#[derive(Parser)]
#[clap(version = crate_version!(), about = "Polyphonic wavetable tone generator.")]
struct Cli {
    /// YAML configuration file. `USYNTH_*` variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Bank file to use instead of the configured or built-in bank.
    #[arg(short, long, global = true)]
    bank: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

/// Where the serial input comes from.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// File of raw MIDI bytes as they arrive on the serial line.
    #[arg(long)]
    midi: Option<PathBuf>,
    /// Bytes given inline, e.g. "91 3c 64".
    #[arg(long)]
    hex: Option<String>,
}

impl Input {
    fn bytes(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        match (&self.midi, &self.hex) {
            (Some(path), _) => Ok(std::fs::read(path)?),
            (None, Some(text)) => Ok(parse_hex(text)?),
            (None, None) => Err("no input given".into()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the input to a WAV file.
    Render {
        #[command(flatten)]
        input: Input,
        /// Output WAV path.
        #[arg(short, long)]
        out: PathBuf,
        /// Exact length to render. Defaults to the input plus the configured tail.
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Play the input through the default audio device.
    Play {
        #[command(flatten)]
        input: Input,
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Bank file tools.
    Bank {
        #[clap(subcommand)]
        command: BankCommands,
    },
}

#[derive(Subcommand)]
enum BankCommands {
    /// Write the built-in bank to a file.
    Export { path: PathBuf },
    /// Describe a bank file.
    Info { path: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { input, out, seconds } => {
            let controller = controller(cli.config, cli.bank)?;
            let bytes = input.bytes()?;
            let rendered = controller.render(&bytes, seconds)?;
            let rate = controller.config().sample_rate;
            write_wav_file(&out, rate, &rendered.samples)?;
            println!(
                "Rendered {} samples ({:.2} s) to {}",
                rendered.samples.len(),
                rendered.samples.len() as f32 / rate as f32,
                out.display()
            );
            print_report(&rendered.report);
        }
        Commands::Play { input, seconds } => {
            let controller = controller(cli.config, cli.bank)?;
            let bytes = input.bytes()?;
            let report = controller.play(&bytes, seconds)?;
            print_report(&report);
        }
        Commands::Bank { command: BankCommands::Export { path } } => {
            BankFile::builtin()?.save(&path)?;
            println!("Wrote built-in bank to {}", path.display());
        }
        Commands::Bank { command: BankCommands::Info { path } } => {
            let bank = BankFile::load(&path)?;
            let programs: Vec<String> = PatchTable::new(&bank.patches).programs().map(|p| p.to_string()).collect();
            println!("Bank:       {}", path.display());
            println!("Version:    {}", bank.version);
            println!("Waveforms:  {}", bank.waveform_count());
            println!("Wavetables: {} ({} slots each)", bank.wavetable_count(), bank.wavetable_size);
            println!("Programs:   {}", programs.join(", "));
        }
    }
    Ok(())
}

fn controller(config: Option<PathBuf>, bank: Option<PathBuf>) -> Result<Controller, Box<dyn Error>> {
    let mut config = SynthConfig::load(config.as_deref())?;
    if bank.is_some() {
        config.bank = bank;
    }
    tracing::debug!(?config, "configuration");
    Ok(Controller::new(config)?)
}

fn print_report(report: &us_master::Report) {
    if !report.tx.is_empty() {
        let tx: Vec<String> = report.tx.iter().map(|b| format!("{:02x}", b)).collect();
        println!("Transmitted: {}", tx.join(" "));
    }
    if report.resets > 0 {
        println!("Resets:      {}", report.resets);
    }
    if report.overruns > 0 {
        println!("Overruns:    {}", report.overruns);
    }
}
