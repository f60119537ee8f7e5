//! Interactive browsing
//!
//! Reads filter commands from stdin, one per line, and re-renders whenever
//! the fetcher publishes a new view. Search text goes through the session's
//! debouncer exactly as keystrokes would.

use std::sync::Arc;

use anyhow::Result;
use inspection_core::{BrowseSession, County, DataFetcher, FilterEvent, FilterMode};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render::{render, ViewFormat};

pub const HELP: &str = "\
Commands:
  mode <none|county|city|zipcode|restaurant>   switch filter (clears selections)
  county <Sussex|Kent|New Castle>              select a county
  city <name>                                  select a city
  zip <digits>                                 enter a zip code
  search <text>                                type a restaurant name
  cities                                       list cities for the city filter
  show                                         print the current results
  help                                         this message
  quit                                         exit
";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(FilterEvent),
    Cities,
    Show,
    Help,
    Quit,
}

/// Parse a command line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "mode" => Command::Event(FilterEvent::Mode(rest.parse::<FilterMode>()?)),
        "county" => Command::Event(FilterEvent::County(
            rest.parse::<County>().map_err(|e| e.to_string())?,
        )),
        "city" => Command::Event(FilterEvent::City(rest.to_string())),
        "zip" | "zipcode" => Command::Event(FilterEvent::ZipCode(rest.to_string())),
        // Keep the raw text, trailing spaces included, as a text box would
        "search" => Command::Event(FilterEvent::SearchText(
            line[word.len()..].trim_start().to_string(),
        )),
        "cities" => Command::Cities,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };
    Ok(Some(command))
}

/// Run the interactive loop until `quit` or end of input
pub async fn run(fetcher: Arc<DataFetcher>, format: ViewFormat) -> Result<()> {
    let mut session = BrowseSession::new(fetcher.clone());
    let mut views = fetcher.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Refresh tasks are detached: outcomes and failures arrive through `views`
    let _ = session.start();
    eprint!("{}", HELP);

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                print!("{}", render(&view, format)?);
            }
            Some(settled) = session.next_settled_search() => {
                tracing::debug!(search = %settled, "Search text settled");
                let _ = session.apply(FilterEvent::DebouncedSearch(settled));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => eprint!("{}", HELP),
                    Ok(Some(Command::Show)) => {
                        print!("{}", render(&fetcher.snapshot(), format)?);
                    }
                    Ok(Some(Command::Cities)) => {
                        let cities = fetcher.snapshot().results.cities;
                        if cities.is_empty() {
                            println!("(no cities loaded)");
                        }
                        for city in cities {
                            println!("{}", city);
                        }
                    }
                    Ok(Some(Command::Event(event))) => {
                        let _ = session.apply(event);
                    }
                    Err(message) => eprintln!("{}", message),
                }
            }
        }
    }

    Ok(())
}
