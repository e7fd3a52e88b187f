use agentkit::agent::{EditorAgent, AGENT_MAX_TOKENS, AGENT_MODEL};
use agentkit::config::Config;
use agentkit::jq_runner::ensure_api_key;
use clap::{Arg, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("editor-agent")
        .about("Chat with Claude while it views and edits files for you")
        .arg(Arg::new("model")
            .long("model")
            .help("Model to chat with")
            .value_name("MODEL"))
        .arg(Arg::new("max-tokens")
            .long("max-tokens")
            .help("Maximum tokens in each model reply")
            .value_name("N")
            .value_parser(clap::value_parser!(u32)))
        .get_matches();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error occurred: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(guidance) = ensure_api_key(&config) {
        eprintln!("{}", guidance);
        std::process::exit(1);
    }

    let model = matches
        .get_one::<String>("model")
        .map(String::as_str)
        .unwrap_or(AGENT_MODEL);
    let max_tokens = matches
        .get_one::<u32>("max-tokens")
        .copied()
        .unwrap_or(AGENT_MAX_TOKENS);

    let result = match EditorAgent::from_config(&config, model, max_tokens) {
        Ok(mut agent) => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            agent.chat(stdin.lock(), &mut stdout).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("\nError occurred: {}", e);
        std::process::exit(1);
    }
}
