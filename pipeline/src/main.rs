use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use common::config::Settings;
use pipeline::services::{Outcome, PipelineService};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/pipeline.toml";

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn config_path(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG)
}

async fn run_once(matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let config = Settings::new(config_path(matches)).context("loading configuration")?;
    let tuple = matches
        .get_one::<String>("tuple")
        .context("missing --tuple")?;

    let service = PipelineService::new(&config).await?;
    let report = service.run(tuple).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(report.outcome)
}

async fn inject(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = Settings::new(config_path(matches)).context("loading configuration")?;
    let file = matches
        .get_one::<String>("file")
        .context("missing --file")?;
    let concurrency = matches.get_one::<usize>("concurrency").copied().unwrap_or(8);

    let service = PipelineService::new(&config).await?;
    let summary = service
        .inject_file(file, concurrency)
        .await
        .with_context(|| format!("injecting tuples from {}", file))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = Command::new("NYC Taxi Pipeline")
        .version("1.0")
        .about("Validates, transforms and stores NYC yellow taxi trip tuples")
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP front door")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Run a single tuple through the pipeline")
                .arg(config_arg())
                .arg(
                    Arg::new("tuple")
                        .short('t')
                        .long("tuple")
                        .value_name("CSV")
                        .required(true)
                        .help("Raw comma separated trip tuple"),
                ),
        )
        .subcommand(
            Command::new("inject")
                .about("Run every line of a file through the pipeline")
                .arg(config_arg())
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .value_name("FILE")
                        .required(true)
                        .help("File with one raw tuple per line"),
                )
                .arg(
                    Arg::new("concurrency")
                        .short('n')
                        .long("concurrency")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .default_value("8")
                        .help("Maximum runs in flight"),
                ),
        )
        .get_matches();

    init_logging(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("serve", serve_matches)) => {
            let path = config_path(serve_matches);
            info!(config = %path, "Starting pipeline server");

            if let Err(e) = pipeline::run_pipeline_server(path).await {
                error!(error = %e, "Pipeline server error");
                process::exit(1);
            }
        }
        Some(("run", run_matches)) => match run_once(run_matches).await {
            Ok(Outcome::Accepted) => {}
            Ok(_) => process::exit(2),
            Err(e) => {
                error!(error = %format!("{:#}", e), "Pipeline run error");
                process::exit(1);
            }
        },
        Some(("inject", inject_matches)) => {
            if let Err(e) = inject(inject_matches).await {
                error!(error = %format!("{:#}", e), "Injection error");
                process::exit(1);
            }
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
