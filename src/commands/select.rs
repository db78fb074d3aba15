//! Context selection: automatic for a single context, numbered prompt otherwise

use crate::error::{MeshError, Result};
use colored::Colorize;
use inquire::validator::Validation;
use inquire::{CustomType, CustomUserError};
use std::io::{self, BufRead, IsTerminal, Write};

/// Bad answers tolerated before giving up
pub const MAX_ATTEMPTS: usize = 3;

/// Pick a context, prompting on stdin when there is more than one
pub fn select_context(contexts: &[String]) -> Result<String> {
    if contexts.len() > 1 && io::stdin().is_terminal() {
        return prompt_context(contexts);
    }
    let stdin = io::stdin();
    choose_context(contexts, &mut stdin.lock(), &mut io::stdout())
}

fn print_contexts<W: Write>(out: &mut W, contexts: &[String]) -> io::Result<()> {
    writeln!(out, "List of available contexts:")?;
    for (i, ctx) in contexts.iter().enumerate() {
        writeln!(out, "({}) {}", i + 1, ctx)?;
    }
    Ok(())
}

fn parse_choice(answer: &str, count: usize) -> std::result::Result<usize, String> {
    let choice: usize = answer
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", answer.trim()))?;
    if (1..=count).contains(&choice) {
        Ok(choice)
    } else {
        Err(format!("choose a number between 1 and {}", count))
    }
}

/// Line-based selection over arbitrary reader/writer (pipes, tests)
pub fn choose_context<R, W>(contexts: &[String], input: &mut R, out: &mut W) -> Result<String>
where
    R: BufRead,
    W: Write,
{
    match contexts {
        [] => return Err(MeshError::NoContexts),
        [only] => return Ok(only.clone()),
        _ => {}
    }

    print_contexts(out, contexts)?;
    let mut last_error = String::new();
    for _ in 0..MAX_ATTEMPTS {
        write!(out, "Enter choice: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(MeshError::Cancelled);
        }
        match parse_choice(&line, contexts.len()) {
            Ok(choice) => return Ok(contexts[choice - 1].clone()),
            Err(msg) => {
                writeln!(out, "{}", msg)?;
                last_error = msg;
            }
        }
    }
    Err(MeshError::Selection(format!(
        "{} (gave up after {} attempts)",
        last_error, MAX_ATTEMPTS
    )))
}

/// TTY prompt; inquire re-prompts until the answer is in range
fn prompt_context(contexts: &[String]) -> Result<String> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", "List of available contexts:".bold())?;
    for (i, ctx) in contexts.iter().enumerate() {
        writeln!(stdout, "({}) {}", i + 1, ctx.cyan())?;
    }

    let count = contexts.len();
    let choice = CustomType::<usize>::new("Enter choice:")
        .with_error_message("Please type a number")
        .with_validator(move |choice: &usize| -> std::result::Result<Validation, CustomUserError> {
            Ok(match parse_choice(&choice.to_string(), count) {
                Ok(_) => Validation::Valid,
                Err(msg) => Validation::Invalid(msg.into()),
            })
        })
        .prompt()
        .map_err(|_| MeshError::Cancelled)?;

    Ok(contexts[choice - 1].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_contexts_is_error() {
        let mut out = Vec::new();
        let err = choose_context(&[], &mut Cursor::new(""), &mut out).unwrap_err();
        assert!(matches!(err, MeshError::NoContexts));
    }

    #[test]
    fn test_single_context_needs_no_prompt() {
        let mut input = Cursor::new("3\n");
        let mut out = Vec::new();
        let chosen = choose_context(&names(&["minikube"]), &mut input, &mut out).unwrap();
        assert_eq!(chosen, "minikube");
        assert!(out.is_empty());
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_pick_second_of_three() {
        let contexts = names(&["ctx-a", "ctx-b", "ctx-c"]);
        let mut out = Vec::new();
        let chosen = choose_context(&contexts, &mut Cursor::new("2\n"), &mut out).unwrap();
        assert_eq!(chosen, "ctx-b");

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("List of available contexts:\n(1) ctx-a\n(2) ctx-b\n(3) ctx-c\n"));
        assert!(printed.ends_with("Enter choice: "));
    }

    #[test]
    fn test_reprompts_on_bad_input() {
        let contexts = names(&["a", "b"]);
        let mut out = Vec::new();
        let chosen =
            choose_context(&contexts, &mut Cursor::new("abc\n0\n 1 \n"), &mut out).unwrap();
        assert_eq!(chosen, "a");

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("Enter choice: ").count(), 3);
        assert!(printed.contains("'abc' is not a number"));
        assert!(printed.contains("choose a number between 1 and 2"));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let contexts = names(&["a", "b"]);
        let mut out = Vec::new();
        let err = choose_context(&contexts, &mut Cursor::new("9\n9\n9\n1\n"), &mut out)
            .unwrap_err();
        assert!(matches!(err, MeshError::Selection(_)));
    }

    #[test]
    fn test_eof_cancels() {
        let contexts = names(&["a", "b"]);
        let mut out = Vec::new();
        let err = choose_context(&contexts, &mut Cursor::new(""), &mut out).unwrap_err();
        assert!(matches!(err, MeshError::Cancelled));
    }
}
