/// contract-synth entry point
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use convert_case::{Case, Casing};
use serde_json::Value;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use synth_api::ApiServer;
use synth_core::config::{ConfigManager, Environment, LogConfig, SynthConfig};
use synth_core::types::is_valid_contract_name;
use synth_core::validation::extract_contract_name;
use synth_core::{CompileResponse, ContractFamily, GenerationRequest};
use synth_pipeline::ContractPipeline;

#[derive(Parser)]
#[command(name = "contract-synth")]
#[command(author, version, about = "Synthesize and compile Solidity contracts", long_about = None)]
struct Cli {
    /// Configuration file path (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a contract from a family and a feature set
    Generate {
        /// Contract family (erc20, erc721, erc1155, governance)
        #[arg(short, long)]
        family: ContractFamily,

        /// Contract name; converted to PascalCase
        #[arg(short, long)]
        name: String,

        /// Comma-separated feature ids
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Token symbol
        #[arg(short, long)]
        symbol: Option<String>,

        /// Constructor parameter as key=value; repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,

        /// Directory to write `<Name>.sol` into; prints to stdout when absent
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Report the target path without writing
        #[arg(long)]
        dry_run: bool,

        /// Compile the composed source as well
        #[arg(long)]
        compile: bool,
    },

    /// Compile a Solidity file
    Compile {
        /// Source file
        file: PathBuf,

        /// Contract to extract; defaults to the first declared contract
        #[arg(short, long)]
        name: Option<String>,

        /// Override the configured optimizer switch
        #[arg(long)]
        optimizer: Option<bool>,
    },

    /// Interpret a free-text request
    Interpret {
        prompt: String,

        /// Compose the suggested contract and print its source
        #[arg(long, conflicts_with = "generate")]
        compose: bool,

        /// Have the model write the whole contract and print its source
        #[arg(long)]
        generate: bool,

        /// Directory to write the model-written `<Name>.sol` into
        #[arg(short, long, requires = "generate")]
        out: Option<PathBuf>,
    },

    /// List the features each family accepts
    Features {
        #[arg(short, long)]
        family: Option<ContractFamily>,
    },

    /// Run the HTTP API
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg(default_value = "contract-synth.toml")]
        path: PathBuf,

        #[arg(short, long, default_value = "development")]
        env: Environment,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { path, env } = &cli.command {
        ConfigManager::generate_default_config(path, env.clone())?;
        println!("Wrote {} configuration to {}", env, path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Generate {
            family,
            name,
            features,
            symbol,
            params,
            out,
            dry_run,
            compile,
        } => {
            let name = if is_valid_contract_name(&name) {
                name
            } else {
                name.to_case(Case::Pascal)
            };
            let mut request = GenerationRequest::new(family, name).with_features(features);
            if let Some(symbol) = symbol {
                request = request.with_symbol(symbol.to_uppercase());
            }
            for (key, value) in params {
                request = request.with_parameter(key, value);
            }

            let pipeline = ContractPipeline::from_config(&config)?;
            generate(&pipeline, request, out.as_deref(), dry_run, compile).await?;
        }
        Commands::Compile { file, name, optimizer } => {
            let source = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let name = match name.or_else(|| extract_contract_name(&source)) {
                Some(name) => name,
                None => file_stem(&file)?,
            };

            let pipeline = ContractPipeline::from_config(&config)?;
            let mut request = synth_solidity::CompileRequest::new(name, source);
            request.optimizer = optimizer;

            let response = CompileResponse::from_result(pipeline.compile(request).await);
            print_compile_response(&response)?;
        }
        Commands::Interpret {
            prompt,
            compose,
            generate,
            out,
        } => {
            let pipeline = ContractPipeline::from_config(&config)?;
            if generate {
                let contract = pipeline.generate_source(&prompt, None).await?;
                eprintln!("{} ({}): {}", contract.contract_name, contract.family, contract.explanation);
                match out {
                    Some(dir) => {
                        if !is_valid_contract_name(&contract.contract_name) {
                            bail!("Model named the contract '{}', which is not a usable file name", contract.contract_name);
                        }
                        let path = dir.join(format!("{}.sol", contract.contract_name));
                        tokio::fs::create_dir_all(&dir)
                            .await
                            .with_context(|| format!("Failed to create {}", dir.display()))?;
                        tokio::fs::write(&path, &contract.contract_code)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Wrote {}", path.display());
                    }
                    None => println!("{}", contract.contract_code),
                }
            } else if compose {
                let (interpretation, composed) = pipeline.interpret_and_generate(&prompt, None).await?;
                eprintln!("{}", serde_json::to_string_pretty(&interpretation)?);
                println!("{}", composed.source);
            } else {
                let interpretation = pipeline.interpret(&prompt, None).await;
                println!("{}", serde_json::to_string_pretty(&interpretation)?);
            }
        }
        Commands::Features { family } => {
            let families = match family {
                Some(family) => vec![family],
                None => ContractFamily::ALL.to_vec(),
            };
            for family in families {
                print_family(family);
            }
        }
        Commands::Serve { host, port } => {
            let mut api = config.api.clone();
            if let Some(host) = host {
                api.host = host;
            }
            if let Some(port) = port {
                api.port = port;
            }

            let pipeline = Arc::new(ContractPipeline::from_config(&config)?);
            if let Err(e) = pipeline.compiler().context().preload().await {
                error!("Compiler not available yet: {}", e);
            }

            let server = ApiServer::from_config(&api, pipeline)?;
            tokio::select! {
                result = server.start() => result?,
                _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
            }
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SynthConfig> {
    let manager = ConfigManager::load(path)?;
    if let Err(errors) = manager.validate() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok(manager.into_config())
}

/// Logs go to stderr; stdout carries command output
fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}

async fn generate(
    pipeline: &ContractPipeline,
    request: GenerationRequest,
    out: Option<&Path>,
    dry_run: bool,
    compile: bool,
) -> Result<()> {
    let (composed, compilation) = if compile {
        let outcome = pipeline.generate_and_compile(request).await?;
        (outcome.composed, Some(outcome.compilation))
    } else {
        (pipeline.generate(request)?, None)
    };

    match out {
        Some(dir) => {
            let path = pipeline.composer().write_source(&composed, dir, dry_run).await?;
            let verb = if dry_run { "Would write" } else { "Wrote" };
            println!("{} {}", verb, path.display());
        }
        None => println!("{}", composed.source),
    }

    if let Some(response) = compilation {
        print_compile_response(&response)?;
    }
    Ok(())
}

fn print_compile_response(response: &CompileResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.success {
        bail!(response.error.clone().unwrap_or_else(|| "Compilation failed".to_string()));
    }
    Ok(())
}

fn print_family(family: ContractFamily) {
    println!("{} ({})", family.display_name(), family);
    let features = family.allowed_features();
    if features.is_empty() {
        println!("  no optional features");
    }
    for feature in features {
        println!("  {:<12} {}", feature.as_str(), feature.description());
    }
    for parameter in family.parameters() {
        let marker = if parameter.required { "*" } else { " " };
        println!("  {}{:<14} {:<8} {}", marker, parameter.name, parameter.solidity_type, parameter.description);
    }
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive a contract name from {}", path.display()))
}

/// Parse `key=value`; the value is read as JSON when it parses, otherwise kept as text
fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }

    let value = serde_json::from_str(value.trim()).unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}
