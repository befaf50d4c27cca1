use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use testcase_workbench_lib::config::merger::{
    PartialCoverageConfig, PartialExportConfig, PartialServerConfig, PartialServiceConfig,
};
use testcase_workbench_lib::config::secrets::{resolve_credential, GENERATION_TOKEN};
use testcase_workbench_lib::config::{AppConfig, ConfigLoader, PartialConfig, SecretsConfig};
use testcase_workbench_lib::generation::HttpGenerationClient;
use testcase_workbench_lib::report::{self, ExportKind, RawExport};
use testcase_workbench_lib::{
    coverage, parsers, CoveragePolicy, ExportScope, RequirementUpdate, Rule, WorkflowEngine,
    WorkflowError,
};

/// Testcase Workbench - requirement-driven test case generation
#[derive(Parser, Debug)]
#[command(name = "testcase-workbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the generation service
    #[arg(long, global = true, env = "TCW_SERVICE_URL")]
    service_url: Option<String>,

    /// Store the service's own coverage artifacts instead of recomputing them
    #[arg(long, global = true)]
    trust_service: bool,

    /// Generation service credential (falls back to ~/.testcase-workbench/secrets.toml)
    #[arg(long, global = true, env = "TCW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Store the given --api-key in the secrets file for later runs
    #[arg(long, global = true, requires = "api_key")]
    save_api_key: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Port to bind the server to
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind the server to
        #[arg(long)]
        bind: Option<String>,

        /// Fixed auth token (a random token is generated on each startup otherwise)
        #[arg(long, env = "TCW_SERVER_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Drive one requirement through the whole workflow and write all exports
    Run {
        /// Requirement file (.json, .yaml or .yml)
        #[arg(long)]
        request: PathBuf,

        /// Directory the exports are written to
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Recompute coverage for a raw export and report discrepancies
    Verify {
        /// Raw export JSON file
        #[arg(long)]
        export: PathBuf,
    },
}

impl Cli {
    fn partial_config(&self) -> PartialConfig {
        let mut partial = PartialConfig::default();
        if let Some(base_url) = &self.service_url {
            partial.service = Some(PartialServiceConfig {
                base_url: Some(base_url.clone()),
                ..Default::default()
            });
        }
        if self.trust_service {
            partial.coverage = Some(PartialCoverageConfig {
                trust_service: Some(true),
            });
        }
        match &self.command {
            Command::Serve { port, bind, .. } => {
                partial.server = Some(PartialServerConfig {
                    port: *port,
                    bind: bind.clone(),
                    cors_origins: None,
                });
            }
            Command::Run { out: Some(out), .. } => {
                partial.export = Some(PartialExportConfig {
                    output_dir: Some(out.clone()),
                });
            }
            _ => {}
        }
        partial
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run_cli(cli: Cli) -> Result<i32> {
    let config = ConfigLoader::new().load(Some(cli.partial_config()))?;

    if cli.save_api_key {
        if let Some(key) = cli.api_key.as_deref() {
            let mut secrets = SecretsConfig::load()?;
            secrets.set_token(GENERATION_TOKEN, key);
            secrets.save()?;
            log::info!("Stored generation credential in the secrets file");
        }
    }

    match cli.command {
        Command::Verify { export } => verify_export(&export),
        Command::Serve { token, .. } => {
            let credential = load_credential(cli.api_key.as_deref());
            let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            runtime.block_on(serve(config, token, credential))?;
            Ok(0)
        }
        Command::Run { request, .. } => {
            let credential = load_credential(cli.api_key.as_deref()).ok_or_else(|| {
                anyhow!("No generation credential: pass --api-key, set TCW_API_KEY or store one in secrets.toml")
            })?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            runtime.block_on(run_workflow(&config, &request, credential))
        }
    }
}

fn load_credential(explicit: Option<&str>) -> Option<String> {
    let secrets = SecretsConfig::load().unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable secrets file: {:#}", e);
        SecretsConfig::default()
    });
    resolve_credential(explicit, &secrets)
}

async fn serve(config: AppConfig, token: Option<String>, credential: Option<String>) -> Result<()> {
    use testcase_workbench_lib::server::{self, generate_auth_token, ServerAppState};
    use testcase_workbench_lib::shutdown::{register_signal_handlers, ShutdownState};

    let shutdown_state = ShutdownState::new();
    register_signal_handlers(shutdown_state.clone());

    let client = HttpGenerationClient::new(&config.service.base_url, config.service.timeout())?;
    if credential.is_none() {
        log::info!("No stored generation credential; workflows must supply one");
    }

    let auth_token = token.unwrap_or_else(generate_auth_token);
    let port = config.server.port;
    let bind = config.server.bind.clone();
    let state = ServerAppState::new(auth_token, config, client, credential, shutdown_state);

    server::run_server(port, &bind, state)
        .await
        .map_err(anyhow::Error::msg)
}

async fn run_workflow(config: &AppConfig, request_path: &Path, credential: String) -> Result<i32> {
    let request = parsers::load_requirement(request_path)?;
    let requirement_id = request.requirement_id.clone();

    let mut engine = WorkflowEngine::new(CoveragePolicy::from_trust_flag(
        config.coverage.trust_service,
    ));
    engine.update_requirement(RequirementUpdate {
        requirement_id: Some(request.requirement_id),
        requirement_text: Some(request.requirement_text),
        credential: Some(credential),
    })?;
    engine.advance()?;

    for input in request.inputs {
        engine.add_input(input)?;
    }
    engine.advance()?;

    for output in request.outputs {
        engine.add_output(output)?;
    }

    let client = HttpGenerationClient::new(&config.service.base_url, config.service.timeout())?;
    engine.generate(&client).await?;

    if let Some(outcome) = &engine.state().outcome {
        println!(
            "Interpretation {}: {} rules, {} test cases",
            outcome.interpretation.status.as_str(),
            outcome.interpretation.rules.len(),
            outcome.test_cases.len()
        );
        for warning in &outcome.warnings {
            println!("  warning: {}", warning);
        }
        for discrepancy in &outcome.discrepancies {
            println!("  coverage discrepancy: {}", discrepancy);
        }
    }

    match engine.advance() {
        Ok(_) => {}
        Err(WorkflowError::AmbiguityBlock { ambiguities }) => {
            eprintln!("Requirement {} is ambiguous:", requirement_id);
            for ambiguity in &ambiguities {
                eprintln!("  - {}", ambiguity);
            }
            return Ok(2);
        }
        Err(e) => return Err(e.into()),
    }
    engine.advance()?;

    let dir = &config.export.output_dir;
    let date = report::export_date();

    let workbook = engine.export_test_cases(ExportScope::All)?;
    let mut written = vec![report::write_workbook(
        dir,
        ExportKind::TestCases,
        &requirement_id,
        date,
        &workbook,
    )?];

    match engine.export_test_cases(ExportScope::Selected) {
        Ok(workbook) => written.push(report::write_workbook(
            dir,
            ExportKind::SelectedTestCases,
            &requirement_id,
            date,
            &workbook,
        )?),
        Err(e) => log::warn!("Skipping selected test case export: {}", e),
    }

    let workbook = engine.export_coverage()?;
    written.push(report::write_workbook(
        dir,
        ExportKind::CoverageReport,
        &requirement_id,
        date,
        &workbook,
    )?);

    let raw = engine.raw_export()?;
    written.push(report::write_raw(dir, &requirement_id, date, &raw)?);

    if let Some(report) = engine.state().coverage_report() {
        println!(
            "Coverage: {}/{} rules ({:.1}%)",
            report.rules_covered, report.total_rules, report.coverage_percentage
        );
    }
    if let Some(matrix) = engine.state().traceability_matrix() {
        let uncovered = matrix.uncovered_rules();
        if !uncovered.is_empty() {
            println!("Uncovered rules: {}", uncovered.join(", "));
        }
    }
    for file in &written {
        println!("Wrote {}", file.path.display());
    }
    Ok(0)
}

fn verify_export(path: &Path) -> Result<i32> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read export: {}", path.display()))?;
    let raw = RawExport::from_json(&content)
        .with_context(|| format!("Failed to parse export: {}", path.display()))?;

    let rules: Vec<Rule> = raw
        .traceability_matrix
        .rule_coverage
        .rule_ids()
        .map(|id| Rule::new(id, "", ""))
        .collect();
    let computed = coverage::compute(
        &raw.coverage_report.requirement_id,
        &rules,
        &raw.test_cases,
    );
    let discrepancies = coverage::reconcile(
        &computed,
        Some(&raw.coverage_report),
        Some(&raw.traceability_matrix),
    );

    if discrepancies.is_empty() {
        println!(
            "{}: coverage verified ({}/{} rules, {:.1}%)",
            path.display(),
            computed.report.rules_covered,
            computed.report.total_rules,
            computed.report.coverage_percentage
        );
        return Ok(0);
    }

    println!("{}: {} discrepancies", path.display(), discrepancies.len());
    for discrepancy in &discrepancies {
        println!("  {}", discrepancy);
    }
    Ok(1)
}
