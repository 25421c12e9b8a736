use crate::app_error::AppError;
use crate::client::HttpClient;
use crate::config::{self, Config, Overrides};
use crate::model::Outcome;
use crate::output::{self, CaseRow};
use crate::publisher::{self, Publisher};
use crate::report::{self, Session};
use crate::version;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, generate};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "./testrail.yml";

const DEFAULT_CONFIG_TEMPLATE: &str = r#"version: 1

server:
  url: "https://example.testrail.io"
  user: "ci@example.com"
  api_key_env: "TESTRAIL_API_KEY"  # env var holding the password or API key
  timeout: "30s"
  cert_check: true

run:
  project_id: 1
  suite_id: 1
  # run_id: 100           # publish into an existing open run
  # plan_id: 7            # publish into every open run of a plan
  # assign_user_id: 3
  # milestone_id: 4
  # name: "Nightly"       # defaults to "Automated Run <timestamp>"
  # version: "1.0.0"
  publish_skips: true
  close_on_finish: false

cases:
  # test name as printed by the test harness -> TestRail case ids
  tests::login::accepts_valid_password: ["C101"]
"#;

#[derive(Debug, Parser)]
#[command(
    name = "testrail-reporter",
    version = version::VALUE,
    about = "Publish test results to TestRail",
    styles = clap_styles()
)]
struct Cli {
    #[arg(long = "no-color", global = true)]
    no_color: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Init(InitArgs),
    Publish(PublishArgs),
    Header(HeaderArgs),
    Cases(CasesArgs),
    Validate(ValidateArgs),
    Version,
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct PublishArgs {
    #[arg(long)]
    config: Option<PathBuf>,

    /// libtest JSON output; `-` reads stdin.
    #[arg(long, default_value = "-")]
    report: PathBuf,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Debug, Args)]
struct HeaderArgs {
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Debug, Args)]
struct OverrideArgs {
    #[arg(long = "run-id", conflicts_with = "plan_id")]
    run_id: Option<u64>,

    #[arg(long = "plan-id")]
    plan_id: Option<u64>,

    #[arg(long = "run-name")]
    run_name: Option<String>,

    #[arg(long = "build-version")]
    build_version: Option<String>,

    #[arg(long = "no-skips")]
    no_skips: bool,

    #[arg(long)]
    close: bool,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            run_id: args.run_id,
            plan_id: args.plan_id,
            run_name: args.run_name,
            version: args.build_version,
            no_skips: args.no_skips,
            close: args.close,
        }
    }
}

#[derive(Debug, Args)]
struct CasesArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CompletionArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn clap_styles() -> Styles {
    Styles::plain()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Cyan.on_default())
        .context(AnsiColor::White.on_default())
        .context_value(AnsiColor::Cyan.on_default())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    output::configure(cli.no_color);
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init(args) => run_init(args),
        Commands::Publish(args) => run_publish(args),
        Commands::Header(args) => run_header(args),
        Commands::Cases(args) => run_cases(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Version => {
            println!("{}", version::VALUE);
            Ok(())
        }
        Commands::Completion(args) => run_completion(args),
    }
}

fn run_init(args: InitArgs) -> Result<(), AppError> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if config_path.exists() && !args.force {
        return Err(AppError::usage(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
        .map_err(|e| AppError::internal(format!("write {}: {e}", config_path.display())))?;

    println!(
        "created {}",
        output::command(&config_path.display().to_string())
    );
    Ok(())
}

fn run_publish(args: PublishArgs) -> Result<(), AppError> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cfg = load_config_classified(&config_path)?;

    let session = report::load(&args.report).map_err(AppError::usage)?;
    let server = cfg.server_settings().map_err(AppError::usage)?;
    let client = HttpClient::new(&server).map_err(|e| AppError::internal(e.to_string()))?;

    let settings = cfg.publisher_settings(&args.overrides.into());
    let mut publisher = Publisher::new(client, settings);
    println!("{}", publisher.header());

    let items = cfg.test_items(&session.collected);
    publisher
        .on_collection_complete(&items)
        .map_err(|e| AppError::usage(e.to_string()))?;

    for finished in &session.finished {
        publisher.on_test_finished(finished);
    }
    publisher.on_session_finished();

    println!(
        "{} processed {} tests ({})",
        output::success("ok"),
        output::number(&session.collected.len().to_string()),
        outcome_summary(&session)
    );
    Ok(())
}

fn outcome_summary(session: &Session) -> String {
    let count = |wanted: Outcome| {
        session
            .finished
            .iter()
            .filter(|report| report.outcome == wanted)
            .count()
    };

    output::format_outcome_counts(
        count(Outcome::Passed),
        count(Outcome::Failed),
        count(Outcome::Skipped),
    )
}

fn run_header(args: HeaderArgs) -> Result<(), AppError> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cfg = load_config_classified(&config_path)?;

    let settings = cfg.publisher_settings(&args.overrides.into());
    println!("{}", publisher::header_message(&settings));
    Ok(())
}

fn run_cases(args: CasesArgs) -> Result<(), AppError> {
    #[derive(Serialize)]
    struct CaseJson<'a> {
        test: &'a str,
        case_ids: &'a [String],
    }

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cfg = load_config_classified(&config_path)?;

    if args.json {
        let items: Vec<CaseJson<'_>> = cfg
            .cases
            .iter()
            .map(|(test, case_ids)| CaseJson { test, case_ids })
            .collect();
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &items)
            .map_err(|e| AppError::internal(format!("encode cases json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))?;
        return Ok(());
    }

    let rows: Vec<CaseRow> = cfg
        .cases
        .iter()
        .map(|(test, case_ids)| CaseRow {
            test: test.clone(),
            case_ids: case_ids.clone(),
        })
        .collect();

    output::print_cases(io::stdout().lock(), &rows)
        .map_err(|e| AppError::internal(format!("print cases: {e}")))
}

fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    #[derive(Serialize)]
    struct Issue<'a> {
        field: &'a str,
        message: &'a str,
    }

    #[derive(Serialize)]
    struct ValidateOutput<'a> {
        valid: bool,
        config: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<Issue<'a>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    }

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config_path_text = config_path.display().to_string();

    let print_json = |output: &ValidateOutput<'_>| -> Result<(), AppError> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, output)
            .map_err(|e| AppError::internal(format!("encode validate json: {e}")))?;
        writeln!(stdout).map_err(|e| AppError::internal(format!("write output: {e}")))
    };

    let cfg = match config::parse(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            if args.json {
                print_json(&ValidateOutput {
                    valid: false,
                    config: &config_path_text,
                    issues: None,
                    error: Some(&err),
                })?;
            }
            return Err(AppError::usage(err));
        }
    };

    match config::validate(&cfg) {
        Ok(()) => {
            if args.json {
                print_json(&ValidateOutput {
                    valid: true,
                    config: &config_path_text,
                    issues: None,
                    error: None,
                })?;
            } else {
                println!(
                    "{} {}",
                    output::success("valid"),
                    output::command(&config_path_text)
                );
            }
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            if args.json {
                let issues: Vec<Issue<'_>> = err
                    .issues
                    .iter()
                    .map(|issue| Issue {
                        field: &issue.field,
                        message: &issue.message,
                    })
                    .collect();
                print_json(&ValidateOutput {
                    valid: false,
                    config: &config_path_text,
                    issues: Some(issues),
                    error: Some(&message),
                })?;
            } else {
                for issue in &err.issues {
                    eprintln!(
                        "{} {}: {}",
                        output::failure("x"),
                        output::bold(&issue.field),
                        issue.message
                    );
                }
            }
            Err(AppError::usage(message))
        }
    }
}

fn load_config_classified(path: &Path) -> Result<Config, AppError> {
    config::load(path).map_err(|err| {
        if err.starts_with("read config:") && !err.contains("No such file") {
            AppError::internal(err)
        } else {
            AppError::usage(err)
        }
    })
}

fn run_completion(args: CompletionArgs) -> Result<(), AppError> {
    let mut cmd = Cli::command();
    let mut stdout = io::stdout().lock();

    match args.shell {
        Shell::Bash => generate_completion(clap_complete::shells::Bash, &mut cmd, &mut stdout),
        Shell::Zsh => generate_completion(clap_complete::shells::Zsh, &mut cmd, &mut stdout),
        Shell::Fish => generate_completion(clap_complete::shells::Fish, &mut cmd, &mut stdout),
        Shell::Powershell => {
            generate_completion(clap_complete::shells::PowerShell, &mut cmd, &mut stdout)
        }
    }
    .map_err(|e| AppError::internal(format!("generate completion: {e}")))
}

fn generate_completion<G: Generator>(
    generator: G,
    cmd: &mut clap::Command,
    writer: &mut impl Write,
) -> Result<(), io::Error> {
    generate(generator, cmd, "testrail-reporter", writer);
    writer.flush()
}
