//! Interactive REPL for running selectors against a loaded root node.
//!
//! Launch with `hq repl`. Any line not starting with `/` is run as a
//! selector; type `/help` for commands, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::Value;

use hateoas_query::{selector, QueryOptions, TraversalConfig};

use crate::session::QuerySession;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/root", "Load a new root node (href or JSON file)"),
    ("/show", "Print the current root node"),
    ("/steps", "Show how a selector is parsed"),
    ("/strict", "Toggle strict mode (or /strict on|off)"),
    ("/only", "Restrict final nodes to keys (/only id,name; empty clears)"),
    ("/origin", "Toggle printing of _origin back-references"),
    ("/isolated", "Toggle unreduced (nested) output"),
    ("/responses", "Toggle printing of every response met"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper completing commands and the root's step names.
#[derive(Default)]
struct QueryHelper {
    steps: Vec<String>,
}

impl QueryHelper {
    /// Collect link, action and attribute names offered by `root`.
    fn refresh(&mut self, root: &Value, config: &TraversalConfig) {
        let mut steps = Vec::new();
        if let Some(Value::Object(links)) = root.get(&config.links_key) {
            steps.extend(links.keys().cloned());
        }
        if let Some(Value::Object(actions)) = root.get(&config.actions_key) {
            steps.extend(actions.keys().map(|name| format!("@{name}")));
        }
        if let Value::Object(map) = root {
            steps.extend(
                map.keys()
                    .filter(|k| **k != config.links_key && **k != config.actions_key)
                    .cloned(),
            );
        }
        steps.sort();
        steps.dedup();
        self.steps = steps;
    }
}

impl Completer for QueryHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if input.starts_with('/') {
            if input.contains(' ') {
                return Ok((pos, Vec::new()));
            }
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Only the first step is known ahead of time.
        if input.contains('.') {
            return Ok((pos, Vec::new()));
        }
        let matches: Vec<Pair> = self
            .steps
            .iter()
            .filter(|s| s.starts_with(input))
            .map(|s| Pair {
                display: s.clone(),
                replacement: s.clone(),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for QueryHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for QueryHelper {}
impl Validator for QueryHelper {}
impl Helper for QueryHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Per-REPL display and query settings.
#[derive(Debug, Default)]
struct ReplState {
    strict: Option<bool>,
    only: Vec<String>,
    with_origin: bool,
    isolated: bool,
    show_responses: bool,
}

impl ReplState {
    fn options(&self) -> QueryOptions {
        let mut options = QueryOptions::new();
        options.strict = self.strict;
        if !self.only.is_empty() {
            options = options.only_keys(self.only.iter().cloned());
        }
        options
    }
}

/// Run the interactive REPL.
pub async fn run(mut session: QuerySession) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mhq v{}\x1b[0m \x1b[90m\u{2014} hypermedia selector shell\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("    Root: {}", session.root_source());
    eprintln!();
    eprintln!(
        "    Type a selector to run it, \x1b[36m/\x1b[0m to browse commands, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<QueryHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    let mut helper = QueryHelper::default();
    helper.refresh(session.root(), session.config());
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".hq_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState::default();
    let prompt = " \x1b[36mhq>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let Some(input) = line.strip_prefix('/') else {
                    run_selector(&session, &state, line).await;
                    continue;
                };
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "root" => {
                        if cmd_root(args, &mut session).await {
                            if let Some(helper) = rl.helper_mut() {
                                helper.refresh(session.root(), session.config());
                            }
                        }
                    }
                    "show" => print_json(session.root()),
                    "steps" => cmd_steps(args),
                    "strict" => cmd_strict(args, &session, &mut state),
                    "only" => {
                        state.only = args
                            .split(',')
                            .map(str::trim)
                            .filter(|k| !k.is_empty())
                            .map(String::from)
                            .collect();
                        if state.only.is_empty() {
                            eprintln!("  Showing all keys");
                        } else {
                            eprintln!("  Only: {}", state.only.join(", "));
                        }
                    }
                    "origin" => {
                        state.with_origin = !state.with_origin;
                        eprintln!("  Origins: {}", on_off(state.with_origin));
                    }
                    "isolated" => {
                        state.isolated = !state.isolated;
                        eprintln!("  Isolated output: {}", on_off(state.isolated));
                    }
                    "responses" => {
                        state.show_responses = !state.show_responses;
                        eprintln!("  Responses: {}", on_off(state.show_responses));
                    }
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

async fn run_selector(session: &QuerySession, state: &ReplState, selector: &str) {
    let options = state.options();
    let result = if state.isolated {
        session
            .query_isolated(selector, &options)
            .await
            .map(|(raw, responses)| (raw.to_json(state.with_origin), responses))
    } else {
        session
            .query(selector, &options)
            .await
            .map(|(outcome, responses)| (outcome.to_json(state.with_origin), responses))
    };

    match result {
        Ok((value, responses)) => {
            print_json(&value);
            if state.show_responses {
                eprintln!("  {} responses (most recent first):", responses.len());
                print_json(&Value::Array(responses));
            }
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Selectors: a.b.c  links[]  items[2]  @action  (Tab completes first step)");
    eprintln!();
}

async fn cmd_root(args: &str, session: &mut QuerySession) -> bool {
    if args.is_empty() {
        eprintln!("  Usage: /root <href|file.json>");
        return false;
    }
    match session.load_root(Some(args)).await {
        Ok(()) => {
            eprintln!("  Loaded: {}", session.root_source());
            true
        }
        Err(e) => {
            eprintln!("  Failed to load: {e}");
            false
        }
    }
}

fn cmd_steps(args: &str) {
    if args.is_empty() {
        eprintln!("  Usage: /steps <selector>");
        return;
    }
    for (i, step) in selector::parse(args).iter().enumerate() {
        let kind = if step.is_action() { "action" } else { "link/attribute" };
        let fan_out = match step.filter() {
            Some(n) => format!("item {n}"),
            None if step.is_iterable() => "all items".to_string(),
            None => "-".to_string(),
        };
        eprintln!("    {i:>2}. {:<24} {kind:<16} fan-out: {fan_out}", step.name());
    }
}

fn cmd_strict(args: &str, session: &QuerySession, state: &mut ReplState) {
    let current = state.strict.unwrap_or(session.config().strict);
    state.strict = Some(match args {
        "on" | "true" => true,
        "off" | "false" => false,
        _ => !current,
    });
    eprintln!("  Strict mode: {}", on_off(state.strict.unwrap_or(current)));
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("  Cannot render result: {e}"),
    }
}
