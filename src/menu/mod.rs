//! Interactive proxy selection
//!
//! Drives a two-state prompt loop over the frozen set of validated
//! proxies: pick one by number, then either switch to another or exit.
//! The set is never mutated here and validation is never re-run; bad
//! input of any kind just re-prompts.

use crate::proxy::geo::GeoClient;
use crate::proxy::models::ValidatedProxy;
use crate::system::SystemProxy;
use crate::Result;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Fallback display value when neither the list nor the geo endpoint
/// knows a candidate's country or ISP
const UNKNOWN: &str = "Unknown";

/// Where the selection loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No proxy chosen; the menu is shown and a 1-based index is expected
    Unchosen,
    /// A proxy is applied; `change` and `exit` are the valid inputs
    Chosen(usize),
}

/// What the driver should do after a line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive selector over a frozen, non-empty proxy set
pub struct Selector<S: SystemProxy> {
    proxies: Vec<ValidatedProxy>,
    state: SelectionState,
    geo: GeoClient,
    system: Arc<S>,
}

impl<S: SystemProxy> Selector<S> {
    /// Create a selector. The proxy set must be non-empty; callers handle
    /// the empty case before ever constructing a selector.
    pub fn new(proxies: Vec<ValidatedProxy>, geo: GeoClient, system: Arc<S>) -> Self {
        debug_assert!(!proxies.is_empty());
        Self {
            proxies,
            state: SelectionState::Unchosen,
            geo,
            system,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Apply one line of input to the state machine.
    ///
    /// Invalid input never mutates state and never calls the system proxy
    /// collaborator; `exit` is reported to the driver, which owns the
    /// disable-then-terminate sequence.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        let input = line.trim();
        match self.state {
            SelectionState::Unchosen => {
                match input.parse::<usize>() {
                    Ok(choice) if (1..=self.proxies.len()).contains(&choice) => {
                        let proxy = &self.proxies[choice - 1];
                        self.system
                            .apply(&proxy.candidate.ip, proxy.candidate.port)
                            .await;
                        self.state = SelectionState::Chosen(choice - 1);
                    }
                    _ => {
                        println!("{}", "Invalid choice, try again".red());
                    }
                }
                Flow::Continue
            }
            SelectionState::Chosen(_) => match input {
                "change" => {
                    self.state = SelectionState::Unchosen;
                    Flow::Continue
                }
                "exit" => Flow::Exit,
                _ => Flow::Continue,
            },
        }
    }

    /// Run the prompt loop until `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            self.print_prompt().await;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let before = self.state;
            match self.handle_line(&line).await {
                Flow::Exit => break,
                Flow::Continue => {
                    if before == SelectionState::Unchosen
                        && matches!(self.state, SelectionState::Chosen(_))
                    {
                        self.print_connection_info().await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn print_prompt(&self) {
        match self.state {
            SelectionState::Unchosen => {
                self.print_proxies().await;
                print!("Select a proxy number: ");
            }
            SelectionState::Chosen(_) => {
                print!("Enter 'change' to switch proxy or 'exit' to quit: ");
            }
        }
        let _ = std::io::stdout().flush();
    }

    async fn print_proxies(&self) {
        println!("\nAvailable proxies:");
        for (i, proxy) in self.proxies.iter().enumerate() {
            let (country, isp) = self
                .geo
                .lookup(
                    &proxy.candidate.ip,
                    proxy.candidate.country.as_deref().unwrap_or(UNKNOWN),
                    proxy.candidate.isp.as_deref().unwrap_or(UNKNOWN),
                )
                .await;

            let latency = proxy.latency_ms;
            let latency_str = match latency {
                0..=100 => latency.to_string().green(),
                101..=300 => latency.to_string().yellow(),
                _ => latency.to_string().red(),
            };

            println!(
                "{:3}. {} ({}, ping: {} ms, ISP: {})",
                (i + 1).to_string().blue().bold(),
                proxy.candidate.addr().cyan(),
                country,
                latency_str,
                isp
            );
        }
    }

    async fn print_connection_info(&self) {
        let SelectionState::Chosen(index) = self.state else {
            return;
        };
        let proxy = &self.proxies[index];

        println!(
            "{} {}",
            "Connected to proxy (SOCKS5):".green().bold(),
            proxy.candidate.addr().cyan()
        );

        let (country, isp) = self
            .geo
            .lookup(
                &proxy.candidate.ip,
                proxy.candidate.country.as_deref().unwrap_or(UNKNOWN),
                proxy.candidate.isp.as_deref().unwrap_or(UNKNOWN),
            )
            .await;
        println!(
            "Connection info: IP={}, Port={}, Ping={} ms, Country={}, ISP={}",
            proxy.candidate.ip, proxy.candidate.port, proxy.latency_ms, country, isp
        );
    }
}
