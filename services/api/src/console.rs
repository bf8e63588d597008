//! Terminal front end: an interactive session, a one-shot predict, and the
//! historical trends table. Results go to stdout and logs to stderr.

use crate::infra::{load_workflow, Workflow};
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use wildflame::config::AppConfig;
use wildflame::error::AppError;
use wildflame::telemetry::{self, LogSink};
use wildflame::workflows::history::HistoricalTrends;
use wildflame::workflows::prediction::{
    FeatureSchema, FieldOutcome, FireClassifier, PredictionBlocked, PredictionSession,
    PredictionSnapshot, ReverseGeocoder,
};

#[derive(Args, Debug, Default)]
pub(crate) struct PredictArgs {
    /// Feature assignment; repeat for each feature in the schema
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub(crate) assignments: Vec<(String, String)>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TrendsArgs {
    /// Historical records export (defaults to WILDFLAME_HISTORY_CSV)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn prepare() -> Result<Workflow, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;
    load_workflow(&config)
}

pub(crate) fn run_session() -> Result<(), AppError> {
    let workflow = prepare()?;
    let handle = workflow.create()?;
    info!(session = %handle.id, "console session started");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = handle.lock();
    drive(&mut *session, stdin.lock(), &mut stdout)?;
    Ok(())
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let workflow = prepare()?;
    let handle = workflow.create()?;
    let mut session = handle.lock();
    let mut stdout = io::stdout();

    for (name, value) in args.assignments {
        if session.set_feature(&name, value).is_err() {
            writeln!(stdout, "unknown feature '{name}'")?;
        }
    }
    predict(&mut *session, &mut stdout)?;
    Ok(())
}

pub(crate) fn run_trends(args: TrendsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let path = args.csv.unwrap_or(config.artifacts.history_csv);
    let trends = HistoricalTrends::from_path(&path)?;
    render_trends(&trends, &mut io::stdout())?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Set { name: String, value: String },
    Predict,
    Reset,
    Show,
    Features,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    match head.to_ascii_lowercase().as_str() {
        "set" => {
            let rest = rest.trim_start();
            let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if name.is_empty() {
                return Err("usage: set <feature> <value>".to_string());
            }
            Ok(ConsoleCommand::Set {
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        }
        "predict" => Ok(ConsoleCommand::Predict),
        "reset" => Ok(ConsoleCommand::Reset),
        "show" => Ok(ConsoleCommand::Show),
        "features" => Ok(ConsoleCommand::Features),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

const HELP: &str = "\
commands:
  set <feature> <value>   store a raw value (omit the value to clear it)
  predict                 classify the current inputs
  reset                   clear inputs and the last prediction
  show                    print inputs, phase, and the last prediction
  features                list the feature schema
  help                    print this message
  quit                    leave the session";

/// Reads commands until `quit` or end of input.
fn drive<C, G, R, W>(
    session: &mut PredictionSession<C, G>,
    input: R,
    out: &mut W,
) -> io::Result<()>
where
    C: FireClassifier,
    G: ReverseGeocoder,
    R: BufRead,
    W: Write,
{
    writeln!(out, "Wild Flame Watcher. Type 'help' for commands.")?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(ConsoleCommand::Set { name, value }) => set(session, &name, value, out)?,
            Ok(ConsoleCommand::Predict) => predict(session, out)?,
            Ok(ConsoleCommand::Reset) => {
                session.trigger_reset();
                writeln!(out, "session reset")?;
            }
            Ok(ConsoleCommand::Show) => show(session, out)?,
            Ok(ConsoleCommand::Features) => render_features(session.schema(), out)?,
            Ok(ConsoleCommand::Help) => writeln!(out, "{HELP}")?,
            Ok(ConsoleCommand::Quit) => break,
            Err(message) => writeln!(out, "{message}")?,
        }
    }

    Ok(())
}

fn set<C, G, W>(
    session: &mut PredictionSession<C, G>,
    name: &str,
    value: String,
    out: &mut W,
) -> io::Result<()>
where
    C: FireClassifier,
    G: ReverseGeocoder,
    W: Write,
{
    match session.set_feature(name, value) {
        Ok(FieldOutcome::Valid { .. }) => writeln!(out, "{name} set"),
        Ok(FieldOutcome::Unset) => writeln!(out, "{name} cleared"),
        Ok(FieldOutcome::Invalid { .. }) => {
            let warning = session
                .validation()
                .warnings()
                .into_iter()
                .find(|warning| warning.feature == name);
            match warning {
                Some(warning) => writeln!(out, "warning: {}", warning.message),
                None => writeln!(out, "warning: {name} is not valid"),
            }
        }
        Err(_) => writeln!(out, "unknown feature '{name}', see 'features'"),
    }
}

fn predict<C, G, W>(session: &mut PredictionSession<C, G>, out: &mut W) -> io::Result<()>
where
    C: FireClassifier,
    G: ReverseGeocoder,
    W: Write,
{
    match session.trigger_predict() {
        Ok(snapshot) => render_snapshot(snapshot, out),
        Err(blocked) => {
            writeln!(out, "{blocked}")?;
            match blocked {
                PredictionBlocked::Incomplete { missing } => {
                    writeln!(out, "missing: {}", missing.join(", "))
                }
                PredictionBlocked::Invalid { fields } => {
                    for field in fields {
                        writeln!(out, "  {}", field.message)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

fn show<C, G, W>(session: &PredictionSession<C, G>, out: &mut W) -> io::Result<()>
where
    C: FireClassifier,
    G: ReverseGeocoder,
    W: Write,
{
    writeln!(out, "phase: {}", session.phase().label())?;
    for (name, raw) in session.inputs().iter() {
        if raw.is_empty() {
            writeln!(out, "  {name} = <unset>")?;
        } else {
            writeln!(out, "  {name} = {raw}")?;
        }
    }
    match session.read_snapshot() {
        Some(snapshot) => render_snapshot(snapshot, out),
        None => writeln!(out, "no prediction yet"),
    }
}

fn render_snapshot<W: Write>(snapshot: &PredictionSnapshot, out: &mut W) -> io::Result<()> {
    if snapshot.is_positive() {
        writeln!(out, "prediction: {} (FIRE RISK)", snapshot.label)?;
        writeln!(out, "severity: {}", snapshot.severity_label())?;
    } else {
        writeln!(out, "prediction: {}", snapshot.label)?;
    }
    let location = &snapshot.location;
    writeln!(
        out,
        "location: {} ({})",
        location.place_name, location.coordinates
    )
}

fn render_features<W: Write>(schema: &FeatureSchema, out: &mut W) -> io::Result<()> {
    for feature in schema.features() {
        writeln!(out, "  {:<10} {}", feature.name, feature.kind.label())?;
        if let Some(details) = feature.description {
            writeln!(out, "             {}: {}", details.title, details.purpose)?;
            writeln!(out, "             range: {}", details.range)?;
            for note in details.significance {
                writeln!(out, "             - {note}")?;
            }
        }
    }
    Ok(())
}

fn render_trends<W: Write>(trends: &HistoricalTrends, out: &mut W) -> io::Result<()> {
    if trends.is_empty() {
        return writeln!(out, "no labelled records found");
    }

    write!(out, "{:<6}", "year")?;
    for label in &trends.labels {
        write!(out, " {label:>10}")?;
    }
    writeln!(out, " {:>10}", "total")?;

    for year in &trends.years {
        write!(out, "{:<6}", year.year)?;
        for label in &trends.labels {
            let count = year.counts.get(label).copied().unwrap_or(0);
            write!(out, " {count:>10}")?;
        }
        writeln!(out, " {:>10}", year.total)?;
    }
    Ok(())
}
