//! The `ehi` command shell.
//!
//! Each line is one command. Commands that change the page wait for the
//! dashboard to settle before returning, so a script reads top to bottom
//! without explicit waits.
//!
//! ```text
//! go /donors
//! type donors-search ada
//! press delete:12
//! press confirm
//! view
//! ```

use std::io::IsTerminal;
use std::path::Path;

use anyhow::Context;
use paging::table::action_slug;
use router::{NavigationOutcome, Resize};
use stage::{DocumentError, ElementRef, Target};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::app::{App, describe_routes};
use crate::events::SearchInput;

pub const HELP: &str = "\
commands:
  go PATH                  navigate (PATH may omit the mount prefix)
  back | forward           move through the history
  press LABEL [@ELEMENT]   activate a button, link or option
  action NAME ID [@TABLE]  run a row action, e.g. `action delete 12`
  type ELEMENT TEXT        type into a search box
  fill FIELD VALUE         set a field of the open form
  resize WIDTH HEIGHT      resize the window
  view                     print the page
  wait                     wait for pending work
  routes                   list the routes
  help                     show this help
  quit | exit              leave the shell";

/// Errors raised by a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("unknown command \"{0}\" (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("no element with id \"{0}\"")]
    NoElement(String),

    #[error("{0} is not a number")]
    NotANumber(String),

    #[error("nothing to go {0} to")]
    NoHistory(&'static str),

    #[error("no form is open")]
    NoModal,

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Whether the shell keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Describes a navigation result for the operator.
#[must_use]
pub fn describe_outcome(outcome: &NavigationOutcome) -> String {
    match outcome {
        NavigationOutcome::Rendered { path } => format!("at {path}"),
        NavigationOutcome::Superseded { path } => format!("navigation to {path} was superseded"),
        NavigationOutcome::FellBack { failed, default } => {
            format!("{failed} could not be loaded; showing {default}")
        }
        NavigationOutcome::Failed { path, error } => format!("{path} failed: {error}"),
    }
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, ShellError> {
    text.parse()
        .map_err(|_| ShellError::NotANumber(text.to_string()))
}

/// Splits a trailing `@element` off the arguments.
fn scoped<'a>(args: &[&'a str]) -> (Vec<&'a str>, Option<&'a str>) {
    if let Some((&last, rest)) = args.split_last() {
        if let Some(id) = last.strip_prefix('@').filter(|id| !id.is_empty()) {
            return (rest.to_vec(), Some(id));
        }
    }
    (args.to_vec(), None)
}

/// Runs commands against one [`App`].
#[derive(Debug)]
pub struct Shell<'a> {
    app: &'a App,
}

impl<'a> Shell<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }

    fn element(&self, id: &str) -> Result<ElementRef, ShellError> {
        self.app
            .document()
            .get_element_by_id(id)
            .ok_or_else(|| ShellError::NoElement(id.to_string()))
    }

    fn press(&self, label: &str, scope: Option<&str>) -> Result<usize, ShellError> {
        let document = self.app.document();
        let reached = match scope {
            Some(id) => document.activate_in(self.app.bus(), &self.element(id)?, label)?,
            None => document.activate(self.app.bus(), label)?,
        };
        Ok(reached)
    }

    /// Runs one line and returns what to print.
    pub async fn execute(&self, line: &str) -> Result<(Flow, String), ShellError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok((Flow::Continue, String::new()));
        }
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let rest = line[command.len()..].trim();
        debug!(command, ?args, "shell command");

        let output = match command {
            "go" => {
                let [path] = args.as_slice() else {
                    return Err(ShellError::Usage("go PATH"));
                };
                describe_outcome(&self.app.visit(path).await)
            }
            "back" | "forward" => {
                let history = self.app.router().history();
                let moved = if command == "back" {
                    history.back()
                } else {
                    history.forward()
                };
                if moved.is_none() {
                    return Err(ShellError::NoHistory(if command == "back" {
                        "back"
                    } else {
                        "forward"
                    }));
                }
                self.app.settle().await;
                format!("at {}", history.current())
            }
            "press" => {
                let (label, scope) = scoped(&args);
                let [label] = label.as_slice() else {
                    return Err(ShellError::Usage("press LABEL [@ELEMENT]"));
                };
                self.press(label, scope)?;
                self.app.settle().await;
                format!("pressed {label}")
            }
            "action" => {
                let (words, scope) = scoped(&args);
                let [name, id] = words.as_slice() else {
                    return Err(ShellError::Usage("action NAME ID [@TABLE]"));
                };
                let label = format!("{}:{id}", action_slug(name));
                let scope = scope.map(|key| {
                    if key.ends_with("-table") {
                        key.to_string()
                    } else {
                        format!("{key}-table")
                    }
                });
                self.press(&label, scope.as_deref())?;
                self.app.settle().await;
                format!("pressed {label}")
            }
            "type" => {
                // `type ELEMENT` alone clears the box.
                let (id, text) = match rest.split_once(char::is_whitespace) {
                    Some(pair) => pair,
                    None if !rest.is_empty() => (rest, ""),
                    None => return Err(ShellError::Usage("type ELEMENT TEXT")),
                };
                let text = text.trim();
                let el = self.element(id)?;
                self.app.document().set_input(&el, "value", text)?;
                self.app.bus().emit(
                    el.target(),
                    &SearchInput {
                        value: text.to_string(),
                    },
                );
                self.app.settle().await;
                format!("typed {text:?} into {id}")
            }
            "fill" => {
                let Some((field, value)) = rest.split_once(char::is_whitespace) else {
                    return Err(ShellError::Usage("fill FIELD VALUE"));
                };
                let document = self.app.document();
                let modal = document.modal();
                if document.inputs(&modal)?.is_empty() {
                    return Err(ShellError::NoModal);
                }
                let value = value.trim();
                document.set_input(&modal, field, value)?;
                format!("{field} = {value:?}")
            }
            "resize" => {
                let [width, height] = args.as_slice() else {
                    return Err(ShellError::Usage("resize WIDTH HEIGHT"));
                };
                let resize = Resize {
                    width: parse_number(width)?,
                    height: parse_number(height)?,
                };
                self.app.bus().emit(Target::Window, &resize);
                self.app.settle().await;
                format!("window is {}x{}", resize.width, resize.height)
            }
            "view" => self.app.render_view(),
            "wait" => {
                self.app.settle().await;
                "idle".to_string()
            }
            "routes" => describe_routes(self.app.router().routes()),
            "help" => HELP.to_string(),
            "quit" | "exit" => return Ok((Flow::Quit, String::new())),
            other => return Err(ShellError::Unknown(other.to_string())),
        };
        Ok((Flow::Continue, output))
    }
}

/// Runs every line of `script`, printing each result. Stops at the first
/// failing command.
pub async fn run_script(app: &App, script: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let shell = Shell::new(app);
    for (number, line) in text.lines().enumerate() {
        let (flow, output) = shell
            .execute(line)
            .await
            .with_context(|| format!("{}:{}: {}", script.display(), number + 1, line.trim()))?;
        if !output.is_empty() {
            println!("{output}");
        }
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(())
}

/// Reads commands from stdin until `quit` or end of input. Failed commands
/// are reported and the shell keeps going.
pub async fn interactive(app: &App) -> anyhow::Result<()> {
    let shell = Shell::new(app);
    let prompt = std::io::stdin().is_terminal();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if prompt {
            stdout.write_all(b"ehi> ").await?;
            stdout.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match shell.execute(&line).await {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, output)) => {
                if !output.is_empty() {
                    stdout.write_all(output.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_splits_element() {
        assert_eq!(
            scoped(&["page:2", "@users-pager"]),
            (vec!["page:2"], Some("users-pager"))
        );
        assert_eq!(scoped(&["confirm"]), (vec!["confirm"], None));
        assert_eq!(scoped(&["@"]), (vec!["@"], None));
    }

    #[test]
    fn test_outcome_text() {
        let text = describe_outcome(&NavigationOutcome::FellBack {
            failed: "/ehi/nowhere".into(),
            default: "/ehi/dashboard".into(),
        });
        assert_eq!(text, "/ehi/nowhere could not be loaded; showing /ehi/dashboard");
    }
}
