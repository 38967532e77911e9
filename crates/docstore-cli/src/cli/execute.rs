//! Implementation of the CLI commands.

use anyhow::{bail, Context, Result};
use docstore::{Evaluator, Filter, Operators, Scope, StoreConfig, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use super::{CheckArgs, MatchArgs};
use crate::output::{self, OutputConfig, OutputMode};

fn parse_filter(text: &str) -> Result<Filter> {
    text.parse::<Filter>()
        .with_context(|| format!("Invalid --filter '{text}'"))
}

/// Documents from `reader` that `filter` matches, in input order.
///
/// Line numbers in errors are 1-based.
pub(crate) fn matching_documents<R: BufRead>(
    reader: R,
    filter: &Filter,
    evaluator: &Evaluator<'_>,
    limit: Option<usize>,
) -> Result<Vec<serde_json::Value>> {
    let mut matched = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        if limit.is_some_and(|max| matched.len() >= max) {
            break;
        }

        let number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {number}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let json: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("Line {number} is not valid JSON"))?;
        let document = Value::from_json(&json)
            .with_context(|| format!("Line {number} holds an invalid extended JSON value"))?;

        if evaluator
            .matches(filter, Scope::Value(&document))
            .with_context(|| format!("Filter evaluation failed on line {number}"))?
        {
            matched.push(json);
        }
    }

    tracing::debug!(matched = matched.len(), "Finished scanning input");
    Ok(matched)
}

/// Execute the `match` command.
pub fn execute_match(args: &MatchArgs, config: &StoreConfig, mode: OutputMode) -> Result<()> {
    let filter = parse_filter(&args.filter)?;
    let operators = Operators::standard();
    operators
        .validate(&filter)
        .with_context(|| format!("Invalid --filter '{}'", args.filter))?;
    let evaluator = Evaluator::new(&operators, config);

    let matched = match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            matching_documents(BufReader::new(file), &filter, &evaluator, args.limit)?
        }
        None => matching_documents(io::stdin().lock(), &filter, &evaluator, args.limit)?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match (mode, args.count) {
        (OutputMode::Json, true) => {
            output::write_json(&mut out, &serde_json::json!({ "count": matched.len() }))?;
        }
        (OutputMode::Json, false) => output::write_json(&mut out, &matched)?,
        (OutputMode::Text, true) => {
            let config = OutputConfig::from_env();
            let noun = if matched.len() == 1 { "document" } else { "documents" };
            writeln!(
                out,
                "{}",
                output::success(&format!("{} matching {noun}", matched.len()), &config)
            )?;
        }
        (OutputMode::Text, false) => {
            for document in &matched {
                writeln!(out, "{document}")?;
            }
        }
    }
    Ok(())
}

/// Execute the `check` command.
pub fn execute_check(args: &CheckArgs, mode: OutputMode) -> Result<()> {
    let filter = parse_filter(&args.filter)?;
    let operators = Operators::standard();

    let used = filter.operators();
    let unknown: Vec<&str> = used
        .iter()
        .copied()
        .filter(|token| !operators.contains(token))
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match mode {
        OutputMode::Json => output::write_json(
            &mut out,
            &serde_json::json!({
                "valid": unknown.is_empty(),
                "operators": used,
                "unknown": unknown,
            }),
        )?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            if used.is_empty() {
                writeln!(out, "No operators used")?;
            }
            for token in &used {
                if unknown.contains(token) {
                    writeln!(out, "  {} (unknown)", output::error(token, &config))?;
                } else {
                    writeln!(out, "  {}", output::info(token, &config))?;
                }
            }
            if unknown.is_empty() {
                writeln!(out, "{}", output::success("Filter is valid", &config))?;
            }
        }
    }

    if !unknown.is_empty() {
        bail!("Unknown operator(s): {}", unknown.join(", "));
    }
    Ok(())
}
