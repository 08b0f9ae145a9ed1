use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_omics::app::App;
use kira_omics::config::{ConfigLoader, Settings};
use kira_omics::error::KiraError;
use kira_omics::gdc::GdcHttpClient;
use kira_omics::output::JsonOutput;
use kira_omics::store::Store;

#[derive(Parser)]
#[command(name = "kira-omics")]
#[command(about = "Compile GDC cohort filters and integrate per-file omics tables into matrices")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Print the predicates a filter file compiles to")]
    Compile(CompileArgs),
    #[command(about = "Query the catalog for a filter and save answers and case tables")]
    Answer(AnswerArgs),
    #[command(about = "Merge downloaded files of an answer into matrices")]
    Integrate(IntegrateArgs),
    #[command(about = "Download the files an answer lists")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct CompileArgs {
    filter: PathBuf,
}

#[derive(Args)]
struct AnswerArgs {
    filter: PathBuf,

    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args)]
struct IntegrateArgs {
    answer: PathBuf,

    #[arg(long)]
    files: PathBuf,

    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Args)]
struct DownloadArgs {
    answer: PathBuf,

    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::MissingDataFile(_) => 2,
        KiraError::ConfigRead(_) => 2,
        KiraError::CatalogHttp(_)
        | KiraError::CatalogStatus { .. }
        | KiraError::CatalogWarnings(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(args) => {
            let app = app_at(Path::new("."), &settings)?;
            let result = app.compile(&args.filter, &JsonOutput)?;
            JsonOutput::print_compile(&result).into_diagnostic()
        }
        Commands::Answer(args) => {
            let app = app_at(&args.out, &settings)?;
            let result = app.fetch_answers(&args.filter, &JsonOutput)?;
            JsonOutput::print_answer(&result).into_diagnostic()
        }
        Commands::Integrate(args) => {
            let app = app_at(&args.out, &settings)?;
            let result = app.integrate(&args.answer, &args.files, &JsonOutput)?;
            JsonOutput::print_integrate(&result).into_diagnostic()
        }
        Commands::Download(args) => {
            let app = app_at(&args.out, &settings)?;
            let downloader = GdcHttpClient::new(&settings)?;
            let result = app.download(&args.answer, &downloader, &JsonOutput)?;
            JsonOutput::print_download(&result).into_diagnostic()
        }
    }
}

fn app_at(out: &Path, settings: &Settings) -> miette::Result<App<GdcHttpClient>> {
    let store = Store::from_path(out)?;
    let catalog = GdcHttpClient::new(settings)?;
    Ok(App::new(store, catalog, settings.clone()))
}
