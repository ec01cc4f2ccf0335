use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use fireprox::batch::ThreadPause;
use fireprox::commands::{CommandKind, Handlers, Invocation, Outcome};
use fireprox::config::Config;
use fireprox::credentials::{self, CredentialArgs, GatewayProbe};
use fireprox::logging::init_logging;
use fireprox::words::{WordList, WordSource};
use std::path::Path;

fn main() {
    match run() {
        Ok(Outcome::Success | Outcome::NoOp) => {}
        Ok(Outcome::Failed) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<Outcome> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let Some(kind) = command_kind(&matches) else {
        let name = matches.get_one::<String>("command").map(String::as_str).unwrap_or("None");
        eprintln!("[ERROR] Unsupported command: {name}\n");
        eprintln!("{}", build_cli().render_help());
        std::process::exit(1);
    };

    let invocation = Invocation {
        kind,
        api_id: string_arg(&matches, "api_id"),
        url: string_arg(&matches, "url"),
        unique: matches.get_flag("unique"),
    };

    // Load the word list before any remote call so a bad list fails fast.
    let mut words = match kind {
        CommandKind::Create => Some(load_words(matches.get_one::<String>("wordlist"))?),
        _ => None,
    };

    let config = Config::from_env();
    let args = CredentialArgs {
        profile_name: string_arg(&matches, "profile_name"),
        access_key: string_arg(&matches, "access_key"),
        secret_access_key: string_arg(&matches, "secret_access_key"),
        session_token: string_arg(&matches, "session_token"),
        region: string_arg(&matches, "region"),
    };
    let session = credentials::resolve(&args, &config, &GatewayProbe { config: &config })?;
    let gateway = session.client(&config).context("build gateway client")?;

    let pause = ThreadPause;
    let stdout = std::io::stdout().lock();
    let mut handlers = Handlers::new(&gateway, &pause, stdout);
    handlers.dispatch(
        &invocation,
        words.as_mut().map(|w| w as &mut dyn WordSource),
    )
}

fn build_cli() -> Command {
    let text = |name: &'static str, help: &'static str| {
        Arg::new(name).long(name).value_name(name.to_uppercase()).help(help)
    };

    Command::new("fireprox")
        .about("FireProx API Gateway Manager")
        .arg(text("profile_name", "AWS Profile Name to store/retrieve credentials"))
        .arg(text("access_key", "AWS Access Key"))
        .arg(text("secret_access_key", "AWS Secret Access Key"))
        .arg(text("session_token", "AWS Session Token"))
        .arg(text("region", "AWS Region"))
        .arg(text(
            "command",
            "Commands: list, list-id, create, delete, delete-all, update",
        ))
        .arg(text("api_id", "API ID"))
        .arg(
            Arg::new("unique")
                .long("unique")
                .action(ArgAction::SetTrue)
                .help("Avoid creating duplicate proxies."),
        )
        .arg(text("url", "URL end-point or file containing URLs per line"))
        .arg(text("wordlist", "File of words (one per line) used to name proxy paths"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Debug logging on stderr"),
        )
}

fn command_kind(matches: &ArgMatches) -> Option<CommandKind> {
    matches.get_one::<String>("command")?.parse().ok()
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn load_words(path: Option<&String>) -> Result<WordList> {
    match path {
        Some(path) => WordList::from_file(Path::new(path)),
        None => WordList::embedded(),
    }
}
