//! Codepad CLI - a terminal editor session against a codepad server
//!
//! Usage:
//!   codepad [FILE] [--server <url>] [--name <name>]
//!
//! Lines that do not start with `:` are appended to the buffer. Commands
//! switch language or mode, run the buffer, and save or delete the shared
//! team document. Switching away from unsaved work asks first.

use anyhow::{Context, Result};
use codepad::Language;
use codepad::api::{ExecuteResponse, ExplainResponse};
use codepad::store::RemoteStore;
use codepad::workspace::{Decision, LeaveVerdict, Mode, Reconciler, Step};
use colored::Colorize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SERVER: &str = "http://localhost:8080";
const REQUEST_TIMEOUT_SECS: u64 = 30;

fn print_usage() {
    eprintln!(
        r#"
{} - Run and share code from the terminal

{}
    codepad [FILE] [OPTIONS]

{}
    --server <URL>    Codepad server (default: http://localhost:8080)
    --name <NAME>     Name recorded by :save when none is given
    -h, --help        Print this help message

{}
    :lang <python|javascript|java|c|c++>   Switch language
    :mode <personal|team>                  Switch between your template and the team document
    :load <FILE>                           Replace the buffer with a file
    :show                                  Print the buffer
    :clear                                 Empty the buffer
    :run                                   Run the buffer
    :explain                               Ask for a plain-language explanation
    :write                                 Save the buffer as code.<ext>
    :save [NAME]                           Overwrite the team document (team mode)
    :delete                                Reset the team document (team mode)
    :quit                                  Leave
"#,
        "Codepad CLI".bold(),
        "USAGE:".bold(),
        "OPTIONS:".bold(),
        "COMMANDS:".bold(),
    );
}

struct CliArgs {
    file: Option<PathBuf>,
    server: String,
    name: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut file = None;
    let mut server = DEFAULT_SERVER.to_string();
    let mut name = std::env::var("USER").ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" => {
                i += 1;
                if i < args.len() {
                    server = args[i].trim_end_matches('/').to_string();
                }
            }
            "--name" => {
                i += 1;
                if i < args.len() {
                    name = Some(args[i].clone());
                }
            }
            other => file = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    CliArgs { file, server, name }
}

fn confirm(question: &str) -> Result<bool> {
    eprint!("{} {} ", question.yellow(), "[y/N]".dimmed());
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Resolve a parked transition by asking on stdin
async fn settle(reconciler: &mut Reconciler, step: Step) -> Result<Step> {
    match step {
        Step::NeedsConfirmation(_) => {
            let decision = if confirm("You have unsaved changes that will be lost. Continue?")? {
                Decision::Proceed
            } else {
                Decision::Decline
            };
            Ok(reconciler.resolve(decision).await?)
        }
        other => Ok(other),
    }
}

fn print_status(reconciler: &Reconciler) {
    let session = reconciler.session();
    let mode = match session.mode {
        Mode::Personal => "personal".cyan(),
        Mode::Team => "team".magenta(),
    };
    let dirty = if session.is_diverged() {
        " (modified)".yellow().to_string()
    } else {
        String::new()
    };
    eprintln!("{} {} · {}{}", "▸".blue(), mode, session.language, dirty);
}

async fn run_buffer(client: &reqwest::Client, server: &str, reconciler: &Reconciler) -> Result<()> {
    let session = reconciler.session();
    eprintln!("{}", "⏳ Running...".dimmed());

    let response = client
        .post(format!("{}/execute", server))
        .json(&json!({
            "language": session.language.label(),
            "code": session.current_text,
            "encoding": "plain",
        }))
        .send()
        .await;

    match response {
        Ok(response) if response.status().is_success() => {
            let result: ExecuteResponse = response.json().await?;
            println!("{}", result.output);
        }
        Ok(response) => {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let error = body["error"].as_str().unwrap_or("unknown error");
            println!("{}\n{}", "❌ Error:".red(), error);
        }
        Err(e) => println!("{}\n{}", "🔥 Error:".red(), e),
    }
    Ok(())
}

async fn explain_buffer(
    client: &reqwest::Client,
    server: &str,
    reconciler: &Reconciler,
) -> Result<()> {
    let session = reconciler.session();
    eprintln!("{}", "⏳ Explaining...".dimmed());

    let response = client
        .post(format!("{}/explain", server))
        .json(&json!({
            "language": session.language.label(),
            "code": session.current_text,
        }))
        .send()
        .await?;

    if response.status().is_success() {
        let result: ExplainResponse = response.json().await?;
        println!("{}", result.explanation);
    } else {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let error = body["error"].as_str().unwrap_or("unknown error");
        println!("{}\n{}", "❌ Error:".red(), error);
    }
    Ok(())
}

async fn load_file(reconciler: &mut Reconciler, path: &str) -> Result<()> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let language = Language::from_file_name(path);

    // Same language means no guarded switch, so ask here
    if language == reconciler.session().language
        && reconciler.is_diverged()
        && !confirm("You have unsaved changes that will be lost. Continue?")?
    {
        return Ok(());
    }

    let step = reconciler.switch_language(language).await?;
    if settle(reconciler, step).await? == Step::Applied {
        reconciler.edit(contents);
        eprintln!("{} {}", "📁 Loaded".green(), path);
    }
    Ok(())
}

/// Name recorded on `:save`: the argument, else `--name`/`$USER`
fn editor_name(arg: &str, fallback: Option<&str>) -> Option<String> {
    if arg.is_empty() {
        fallback.map(str::to_string)
    } else {
        Some(arg.to_string())
    }
}

async fn handle(
    reconciler: &mut Reconciler,
    client: &reqwest::Client,
    args: &CliArgs,
    line: &str,
) -> Result<bool> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        ":lang" => match Language::from_label(rest) {
            Some(language) => {
                let step = reconciler.switch_language(language).await?;
                settle(reconciler, step).await?;
            }
            None => eprintln!("{} {}", "Unsupported language:".red(), rest),
        },
        ":mode" => match Mode::from_label(rest) {
            Some(mode) => {
                let step = reconciler.switch_mode(mode).await?;
                settle(reconciler, step).await?;
            }
            None => eprintln!("{} {}", "Unknown mode:".red(), rest),
        },
        ":load" => load_file(reconciler, rest).await?,
        ":show" => println!("{}", reconciler.session().current_text),
        ":clear" => reconciler.edit(""),
        ":run" => run_buffer(client, &args.server, reconciler).await?,
        ":explain" => explain_buffer(client, &args.server, reconciler).await?,
        ":write" => {
            let session = reconciler.session();
            let name = session.language.download_name();
            std::fs::write(&name, &session.current_text)
                .with_context(|| format!("Failed to write {}", name))?;
            eprintln!("{} {}", "Saved".green(), name);
        }
        ":save" => {
            reconciler.save_team(editor_name(rest, args.name.as_deref())).await?;
            eprintln!("{}", "Saved Successfully ✔".green());
        }
        ":delete" => {
            if confirm("Reset the team document for everyone?")? {
                reconciler.delete_team().await?;
                eprintln!("{}", "Team document reset".green());
            }
        }
        ":quit" | ":q" => {
            if reconciler.leave() == LeaveVerdict::Proceed
                || confirm("You have unsaved changes. Quit anyway?")?
            {
                return Ok(false);
            }
        }
        _ if command.starts_with(':') => {
            eprintln!("{} {}", "Unknown command:".red(), command);
        }
        _ => {
            let mut text = reconciler.session().current_text.clone();
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line);
            reconciler.edit(text);
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let store = RemoteStore::new(&args.server, timeout).context("Failed to create store client")?;
    let mut reconciler = Reconciler::new(Arc::new(store));

    if let Some(file) = args.file.clone() {
        load_file(&mut reconciler, &file.to_string_lossy()).await?;
    }

    eprintln!("{} connected to {}", "Codepad".bold(), args.server);
    print_status(&reconciler);

    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);

        match handle(&mut reconciler, &client, &args, line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("{} {:#}", "❌".red(), e),
        }
        if line.starts_with(':') {
            print_status(&reconciler);
        }
    }

    Ok(())
}
