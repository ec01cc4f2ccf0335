use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, Command};
use fireprox::error::GatewayError;
use fireprox::prune::prune;
use fireprox::template;
use fireprox::words::WordList;
use std::fs;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = Command::new("fireprox-template")
        .about("Render the API Gateway import document for a list of URLs")
        .arg(Arg::new("urls").long("urls").required(true).help("File with one URL per line"))
        .arg(Arg::new("out").long("out").help("Write here instead of stdout"))
        .arg(Arg::new("wordlist").long("wordlist").help("Custom word list"))
        .arg(
            Arg::new("yaml")
                .long("yaml")
                .action(ArgAction::SetTrue)
                .help("Emit YAML instead of JSON"),
        )
        .get_matches();

    let urls_path = matches
        .get_one::<String>("urls")
        .context("urls path missing")?;
    let raw = fs::read_to_string(urls_path)
        .with_context(|| format!("read urls {}", urls_path))?;
    let urls: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    // Offline: there are no existing proxies to compare against.
    let pruned = prune(&urls, || Ok::<_, GatewayError>(Vec::new()), false)?;
    if pruned.is_empty() {
        return Err(anyhow!("no urls in {}", urls_path));
    }
    for notice in pruned.notices() {
        eprintln!("{notice}");
    }

    let mut words = match matches.get_one::<String>("wordlist") {
        Some(path) => WordList::from_file(Path::new(path))?,
        None => WordList::embedded()?,
    };
    let (document, drawn) = template::build(&pruned.urls, &mut words);
    for (url, word) in pruned.urls.iter().zip(&drawn) {
        eprintln!("/{word}/ => {url}");
    }

    let rendered = if matches.get_flag("yaml") {
        document.to_yaml().context("render yaml")?.into_bytes()
    } else {
        document.to_json().context("render json")?
    };

    match matches.get_one::<String>("out") {
        Some(out_path) => {
            fs::write(out_path, rendered).with_context(|| format!("write {}", out_path))?
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
