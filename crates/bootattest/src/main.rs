//! CLI entrypoint for boot measurement-log attestation.

mod report;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use bootattest_core::baseline::{load_baseline, save_baseline, Baseline, SCHEMA_VERSION};
use bootattest_core::differ::diff;
use bootattest_core::error::{AttestError, Result};
use bootattest_core::policy::{Policy, Severity};
use bootattest_core::replay::{banks_to_hex, replay};
use bootattest_core::sbom::build_sbom;
use bootattest_core::tcg::parse_event_log;
use bootattest_core::variables::{hash_variables, VariableSource};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "bootattest")]
#[command(about = "Boot measurement-log attestation against a recorded baseline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Diff the current boot state against a baseline and emit a report.
    Attest {
        #[arg(long)]
        event_log: Option<PathBuf>,
        #[arg(long)]
        efivars: Option<PathBuf>,
        #[arg(long)]
        baseline: PathBuf,
        #[arg(long)]
        policy: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FailOn::Medium)]
        fail_on: FailOn,
    },
    /// Baseline operations.
    Baseline {
        #[command(subcommand)]
        command: BaselineCommand,
    },
    /// Export a boot software bill-of-materials.
    Sbom {
        #[arg(long)]
        event_log: Option<PathBuf>,
        #[arg(long)]
        efivars: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the tool version.
    Version,
}

#[derive(Debug, Subcommand)]
enum BaselineCommand {
    /// Record the current boot state as a baseline document.
    Create {
        #[arg(long)]
        event_log: Option<PathBuf>,
        #[arg(long)]
        efivars: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Sarif,
    Junit,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailOn {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl FailOn {
    fn rank(self) -> u8 {
        match self {
            FailOn::None => u8::MAX,
            FailOn::Low => Severity::Low.rank(),
            FailOn::Medium => Severity::Medium.rank(),
            FailOn::High => Severity::High.rank(),
            FailOn::Critical => Severity::Critical.rank(),
        }
    }
}

const AUTO_DISCOVERY_PATHS: &[&str] = &[
    "/sys/kernel/security/tpm0/binary_bios_measurements",
    "/sys/kernel/security/tpm1/binary_bios_measurements",
    "/sys/firmware/tpm/tpm0/binary_bios_measurements",
    "/sys/firmware/tpm/tpm1/binary_bios_measurements",
];

fn auto_discover_event_log() -> Option<PathBuf> {
    AUTO_DISCOVERY_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn load_event_log_bytes(event_log: Option<PathBuf>) -> Result<Vec<u8>> {
    let path = event_log.or_else(auto_discover_event_log).ok_or_else(|| {
        AttestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "event log not found; pass --event-log",
        ))
    })?;
    std::fs::read(&path).map_err(AttestError::from)
}

fn current_platform() -> String {
    if cfg!(target_os = "windows") {
        "windows".to_string()
    } else {
        "linux".to_string()
    }
}

fn epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_secs()
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Attest {
            event_log,
            efivars,
            baseline,
            policy,
            format,
            output,
            fail_on,
        } => {
            let baseline = load_baseline(&baseline)?;
            let policy = match policy {
                Some(path) => {
                    let body = std::fs::read_to_string(&path)?;
                    Policy::from_json(&body)?
                }
                None => Policy::default(),
            };

            let blob = load_event_log_bytes(event_log)?;
            let (table, events) = parse_event_log(&blob)?;
            let banks = replay(&table, &events);
            let vars = VariableSource::resolve(efivars).read()?;
            let var_hashes = hash_variables(&vars);

            let findings = diff(&baseline, &banks, &var_hashes, &policy);

            let content = match format {
                Format::Text => report::text::render(&findings),
                Format::Json => report::json::render(&findings),
                Format::Sarif => report::sarif::render(&findings),
                Format::Junit => report::junit::render(&findings, fail_on.rank()),
            };

            match &output {
                Some(path) => {
                    if let Some(parent) = path.parent()
                        && !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent)?;
                        }
                    std::fs::write(path, content)?;
                }
                None => println!("{content}"),
            }

            let worst = findings.iter().map(|f| f.severity.rank()).max().unwrap_or(0);
            if worst as u32 >= fail_on.rank() as u32 {
                Ok(ExitCode::from(1))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Baseline {
            command: BaselineCommand::Create {
                event_log,
                efivars,
                output,
            },
        } => {
            let blob = load_event_log_bytes(event_log)?;
            let (table, events) = parse_event_log(&blob)?;
            let banks = replay(&table, &events);
            let vars = VariableSource::resolve(efivars).read()?;

            let digests: BTreeMap<String, BTreeMap<String, String>> = banks_to_hex(&banks)
                .into_iter()
                .map(|(alg, regs)| {
                    let regs = regs.into_iter().map(|(idx, hex)| (idx.to_string(), hex)).collect();
                    (alg, regs)
                })
                .collect();

            let doc = Baseline {
                schema_version: SCHEMA_VERSION,
                platform: current_platform(),
                digests,
                variables: hash_variables(&vars),
                created_at: epoch_seconds(),
            };
            save_baseline(&output, &doc)?;
            eprintln!("Wrote baseline to {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Sbom {
            event_log,
            efivars,
            output,
        } => {
            let blob = load_event_log_bytes(event_log)?;
            let (_table, events) = parse_event_log(&blob)?;
            let vars = VariableSource::resolve(efivars).read()?;

            let sbom = build_sbom(&events, &vars, epoch_seconds())?;
            let body = serde_json::to_string_pretty(&sbom)
                .map_err(|e| AttestError::schema(format!("sbom serialization failed: {e}")))?;
            if let Some(parent) = output.parent()
                && !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            std::fs::write(&output, body)?;
            eprintln!("Wrote SBOM to {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
