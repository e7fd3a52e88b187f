use agentkit::config::Config;
use agentkit::executor::SystemShellRunner;
use agentkit::jq_runner::{ensure_api_key, JqRunner};
use clap::{Arg, ArgAction, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("jq-gen")
        .about("Generate jq commands from plain-English requests")
        .long_about("Asks Claude for a single jq command that fulfils the request, prints it, and optionally runs it through the shell")
        .arg(Arg::new("prompt")
            .help("The jq command request to send to Anthropic")
            .required(true))
        .arg(Arg::new("exe")
            .long("exe")
            .help("Execute the generated jq command")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("model")
            .long("model")
            .help("Model to request the command from")
            .value_name("MODEL"))
        .arg(Arg::new("max-tokens")
            .long("max-tokens")
            .help("Maximum tokens in the model reply")
            .value_name("N")
            .value_parser(clap::value_parser!(u32)))
        .get_matches();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error occurred: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Some(model) = matches.get_one::<String>("model") {
        config.model = model.clone();
    }
    if let Some(max_tokens) = matches.get_one::<u32>("max-tokens") {
        config.max_tokens = *max_tokens;
    }

    if let Err(guidance) = ensure_api_key(&config) {
        eprintln!("{}", guidance);
        std::process::exit(1);
    }

    let prompt = matches
        .get_one::<String>("prompt")
        .map(String::as_str)
        .unwrap_or_default();
    let execute = matches.get_flag("exe");
    info!("Request: {:?} (execute: {})", prompt, execute);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let result = match JqRunner::from_config(&config, SystemShellRunner) {
        Ok(runner) => runner.run(prompt, execute, &mut stdout, &mut stderr).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("\nError occurred: {}", e);
        std::process::exit(1);
    }
}
