//! `crowdcount session`: interactive REPL over the guarded call path.
//!
//! Each plain line counts as one request to the default service.  Slash
//! commands make calls to a specific service, submit user credentials and
//! show usage.

use std::sync::Arc;

use crowd_domain::config::Config;
use crowd_domain::{CredentialSource, Error, Service};

use crate::bootstrap;
use crate::guard::{guarded_call, CallOutcome};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive session REPL until `/exit` or Ctrl+D.
pub fn session(config: Arc<Config>, mut session_key: String) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config)?;
    state.sessions.resolve_or_create(&session_key);

    let mut rl = rustyline::DefaultEditor::new()?;

    eprintln!("crowdcount interactive session");
    eprintln!("Session: {session_key}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        match rl.readline("crowd> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                match parse_command(trimmed) {
                    Ok(cmd) => {
                        if execute(&state, &mut session_key, cmd) {
                            break;
                        }
                    }
                    Err(usage) => eprintln!("{usage}"),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    end_all_sessions(&state);
    eprintln!("Goodbye!");
    Ok(())
}

/// Sessions switched away from with `/session` stay live until exit.
fn end_all_sessions(state: &AppState) {
    for ctx in state.sessions.list() {
        state.sessions.end_session(&ctx.key);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Command parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Call(Service),
    Stats,
    KeyOpenAi(String),
    KeyAws {
        access_key_id: String,
        secret_key: String,
        region: Option<String>,
    },
    /// `None` clears every service.
    Clear(Option<Service>),
    Using,
    /// `None` prints the current session.
    Session(Option<String>),
    Help,
    Exit,
}

/// Parse one input line.  On failure the error is a usage message.
pub fn parse_command(input: &str) -> Result<ReplCommand, String> {
    let input = input.trim();
    let Some(rest) = input.strip_prefix('/') else {
        return Ok(ReplCommand::Call(Service::OpenAi));
    };

    let mut words = rest.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let cmd = match (cmd, args.as_slice()) {
        ("exit" | "quit", _) => ReplCommand::Exit,
        ("help", _) => ReplCommand::Help,
        ("stats", _) => ReplCommand::Stats,
        ("using", _) => ReplCommand::Using,

        ("call", []) => ReplCommand::Call(Service::OpenAi),
        ("call", [service]) => ReplCommand::Call(parse_service(service)?),
        ("call", _) => return Err("Usage: /call [openai|aws]".into()),

        ("key", [service, rest @ ..]) => parse_key(parse_service(service)?, rest)?,
        ("key", []) => return Err(KEY_USAGE.into()),

        ("clear", []) => ReplCommand::Clear(None),
        ("clear", [service]) => ReplCommand::Clear(Some(parse_service(service)?)),
        ("clear", _) => return Err("Usage: /clear [openai|aws]".into()),

        ("session", []) => ReplCommand::Session(None),
        ("session", [name]) => ReplCommand::Session(Some((*name).to_string())),
        ("session", _) => return Err("Usage: /session <name>".into()),

        (other, _) => return Err(format!("Unknown command: /{other}  (type /help for a list)")),
    };
    Ok(cmd)
}

const KEY_USAGE: &str =
    "Usage: /key openai <api_key>  |  /key aws <access_key_id> <secret> [region]";

fn parse_service(s: &str) -> Result<Service, String> {
    s.parse::<Service>().map_err(|e| e.to_string())
}

fn parse_key(service: Service, args: &[&str]) -> Result<ReplCommand, String> {
    let cmd = match (service, args) {
        (Service::OpenAi, [key]) => ReplCommand::KeyOpenAi((*key).to_string()),
        (Service::OpenAi, []) => ReplCommand::KeyOpenAi(String::new()),
        (Service::Aws, [id, secret]) => ReplCommand::KeyAws {
            access_key_id: (*id).to_string(),
            secret_key: (*secret).to_string(),
            region: None,
        },
        (Service::Aws, [id, secret, region]) => ReplCommand::KeyAws {
            access_key_id: (*id).to_string(),
            secret_key: (*secret).to_string(),
            region: Some((*region).to_string()),
        },
        _ => return Err(KEY_USAGE.into()),
    };
    Ok(cmd)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Command execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run a parsed command.  Returns `true` if the REPL should exit.
fn execute(state: &AppState, session_key: &mut String, cmd: ReplCommand) -> bool {
    match cmd {
        ReplCommand::Exit => return true,

        ReplCommand::Help => print_help(),

        ReplCommand::Call(service) => match guarded_call(state, session_key.as_str(), service) {
            Ok(CallOutcome::Allowed { credentials, stats }) => {
                let source = match credentials.source() {
                    CredentialSource::User => "your",
                    CredentialSource::Default => "operator",
                };
                println!("{service} call allowed using {source} credentials");
                for (field, value) in credentials.masked() {
                    println!("  {field} = {value}");
                }
                println!(
                    "  usage: {}/{} (total {}/{})",
                    stats.session_calls,
                    stats.daily_user_limit,
                    stats.total_calls,
                    stats.daily_total_limit,
                );
            }
            Ok(CallOutcome::Rejected { reason, .. }) => {
                eprintln!("\x1B[33m{reason}\x1B[0m");
            }
            Err(Error::MissingCredentials(missing)) => {
                eprintln!(
                    "\x1B[31mMissing credentials: {}. \
                     Please set these in your .env file or secrets.\x1B[0m",
                    missing.join(", ")
                );
            }
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },

        ReplCommand::Stats => {
            let stats = state
                .sessions
                .with_session(session_key.as_str(), |s| state.limiter.usage_stats(s));
            println!("{stats}");
        }

        ReplCommand::KeyOpenAi(key) => {
            let own = state.sessions.with_session(session_key.as_str(), |s| {
                state.credentials.submit_openai(s, &key);
                state.credentials.is_using_own_credentials(s, Service::OpenAi)
            });
            report_submission(Service::OpenAi, own);
        }

        ReplCommand::KeyAws {
            access_key_id,
            secret_key,
            region,
        } => {
            let own = state.sessions.with_session(session_key.as_str(), |s| {
                state
                    .credentials
                    .submit_aws(s, &access_key_id, &secret_key, region.as_deref());
                state.credentials.is_using_own_credentials(s, Service::Aws)
            });
            report_submission(Service::Aws, own);
        }

        ReplCommand::Clear(service) => {
            state.sessions.with_session(session_key.as_str(), |s| match service {
                Some(service) => state.credentials.clear_service_credentials(s, service),
                None => state.credentials.clear_credentials(s),
            });
            match service {
                Some(service) => eprintln!("Cleared {service} credentials."),
                None => eprintln!("Cleared all user credentials."),
            }
        }

        ReplCommand::Using => {
            let flags: Vec<(Service, bool)> =
                state.sessions.with_session(session_key.as_str(), |s| {
                    Service::ALL
                        .into_iter()
                        .map(|svc| (svc, state.credentials.is_using_own_credentials(s, svc)))
                        .collect()
                });
            for (service, own) in flags {
                let who = if own { "own (next call only)" } else { "operator" };
                println!("  {service}: {who}");
            }
        }

        ReplCommand::Session(Some(name)) => {
            *session_key = name;
            let is_new = state.sessions.resolve_or_create(session_key.as_str());
            if is_new {
                eprintln!("Session switched to: {session_key} (new)");
            } else {
                eprintln!("Session switched to: {session_key}");
            }
        }

        ReplCommand::Session(None) => {
            eprintln!("Current session: {session_key}");
            eprintln!("Usage: /session <name>");
        }
    }

    false
}

fn report_submission(service: Service, own: bool) {
    if own {
        eprintln!("Your {service} credentials will be used for the next {service} call.");
    } else {
        eprintln!("Using operator {service} credentials.");
    }
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  <any text>                          Make one openai call");
    eprintln!("  /call [openai|aws]                  Make one call to a service");
    eprintln!("  /stats                              Show today's usage");
    eprintln!("  /key openai <api_key>               Use your key for the next call");
    eprintln!("  /key aws <id> <secret> [region]     Use your AWS keys for the next call");
    eprintln!("  /clear [openai|aws]                 Forget your submitted credentials");
    eprintln!("  /using                              Show which credentials apply");
    eprintln!("  /session <name>                     Switch to a named session");
    eprintln!("  /exit, /quit                        Exit the session");
    eprintln!("  /help                               Show this help");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
