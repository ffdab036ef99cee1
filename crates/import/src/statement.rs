use std::io::{self, BufRead};

use tally_core::CanonicalTransaction;
use thiserror::Error;

use crate::record::{parse_transaction_line, RecordError};

/// Every line up to and including the first one starting with this is preamble.
pub const HEADER_MARKER: &str = "Transaction Date";

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line_number} is not a valid statement row ({source}): {line}")]
    Record {
        line_number: usize,
        line: String,
        #[source]
        source: RecordError,
    },
}

/// Parses a bank statement from an already-open reader.
pub fn parse_statement<R: BufRead>(reader: R) -> Result<Vec<CanonicalTransaction>, StatementError> {
    parse_fallible_lines(reader.lines())
}

/// Parses a bank statement from lines that are already in memory.
pub fn parse_statement_lines<I, S>(lines: I) -> Result<Vec<CanonicalTransaction>, StatementError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_fallible_lines(lines.into_iter().map(Ok::<S, io::Error>))
}

fn parse_fallible_lines<I, S>(lines: I) -> Result<Vec<CanonicalTransaction>, StatementError>
where
    I: Iterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    let mut lines = lines.enumerate();

    let mut found_header = false;
    for (_, line) in lines.by_ref() {
        if is_header(line?.as_ref()) {
            found_header = true;
            break;
        }
    }
    if !found_header {
        tracing::warn!("No '{}' header line found, statement has no transactions", HEADER_MARKER);
        return Ok(Vec::new());
    }

    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in lines {
        let line = line?;
        let line = line.as_ref().trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;

        match parse_transaction_line(line) {
            Ok(Some(transaction)) => transactions.push(transaction),
            Ok(None) => tracing::trace!("Line {} is not reconciled: {}", line_number, line),
            Err(e) if e.is_recoverable() => {
                skipped += 1;
                tracing::error!("Unable to parse line {} ({}), skipping: {}", line_number, e, line);
            }
            Err(source) => {
                return Err(StatementError::Record {
                    line_number,
                    line: line.to_string(),
                    source,
                })
            }
        }
    }

    tracing::info!(
        parsed = transactions.len(),
        skipped,
        "Finished parsing bank statement"
    );
    Ok(transactions)
}

fn is_header(line: &str) -> bool {
    line.trim_start_matches('\u{feff}').starts_with(HEADER_MARKER)
}
