//! Interactive session
//!
//! Reads one subcommand line at a time and runs it against the open
//! session. Global options given on a line are ignored; the session keeps
//! the root and knowledge base it was opened with.

use std::io::{self, BufRead, Write};

use clap::Parser;

use dettect_core::{DtError, DtErrorKind, Result};

use super::session::Session;
use crate::cli::Cli;

const PROMPT: &str = "dettect> ";

/// Run the session over stdin/stdout
///
/// # Errors
///
/// Returns `Io` if the terminal cannot be read or written.
pub fn run(session: &Session) -> Result<()> {
    let stdin = io::stdin();
    run_with(session, stdin.lock(), io::stdout())
}

/// # Errors
///
/// Returns `Io` if `input` cannot be read or `output` written.
pub fn run_with(session: &Session, input: impl BufRead, mut output: impl Write) -> Result<()> {
    writeln!(
        output,
        "DeTTECT interactive session (output: {}). Type 'quit' to leave.",
        session.env().output_dir().display()
    )
    .map_err(terminal_error)?;

    let mut lines = input.lines();
    loop {
        write!(output, "{}", PROMPT).map_err(terminal_error)?;
        output.flush().map_err(terminal_error)?;

        let Some(line) = lines.next() else {
            writeln!(output).map_err(terminal_error)?;
            break;
        };
        let line = line.map_err(terminal_error)?;
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        let args = match split_line(line) {
            Ok(args) => args,
            Err(e) => {
                writeln!(output, "[!] {}", e).map_err(terminal_error)?;
                continue;
            }
        };

        let cli = match Cli::try_parse_from(std::iter::once("dettect".to_string()).chain(args)) {
            Ok(cli) => cli,
            Err(e) => {
                write!(output, "{}", e.render()).map_err(terminal_error)?;
                continue;
            }
        };

        let Some(command) = cli.command else {
            writeln!(
                output,
                "[!] Enter a mode: datasource, visibility, detection, group or generic"
            )
            .map_err(terminal_error)?;
            continue;
        };

        tracing::debug!(line = %line, "interactive command");
        if let Err(e) = session.execute(&command.into_request()) {
            writeln!(output, "Error: {}", e).map_err(terminal_error)?;
        }
    }

    Ok(())
}

fn terminal_error(err: io::Error) -> DtError {
    DtError::new(DtErrorKind::Io)
        .with_op("interactive")
        .with_message(err.to_string())
}

/// Split a line into arguments
///
/// Whitespace separates arguments except inside single or double quotes;
/// a backslash escapes the next character outside single quotes.
fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_arg = true;
                }
                None => return Err("trailing backslash".to_string()),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_arg = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} quote", q));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Vec<String> {
        split_line(line).unwrap()
    }

    #[test]
    fn test_split_on_whitespace() {
        assert_eq!(split("  ds  --fd lab.yaml -l "), vec!["ds", "--fd", "lab.yaml", "-l"]);
        assert!(split("   ").is_empty());
    }

    #[test]
    fn test_quotes_keep_queries_together() {
        assert_eq!(
            split(r#"d --sd "score >= 3 and applicable_to == 'all'" -l"#),
            vec!["d", "--sd", "score >= 3 and applicable_to == 'all'", "-l"]
        );
        assert_eq!(split("g -g 'APT 28'"), vec!["g", "-g", "APT 28"]);
        assert_eq!(split("x ''"), vec!["x", ""]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(split(r"a\ b c"), vec!["a b", "c"]);
        assert_eq!(split(r#""say \"hi\"""#), vec![r#"say "hi""#]);
        assert_eq!(split(r"'a\b'"), vec![r"a\b"]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert_eq!(split_line("ds -s \"open").unwrap_err(), "unterminated \" quote");
        assert!(split_line("ds \\").is_err());
    }
}
