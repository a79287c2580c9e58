//! Prompt randomizer TUI.
//!
//! A terminal interface for the randomized prompt-composition engine:
//! reroll grouped category pools under budgets, pin items, freeze cards and
//! watch the rendered output live.
//!
//! # Headless Mode
//!
//! Run with `--headless` for scripted output suitable for piping:
//!
//! ```bash
//! cargo run -p rng-prompt -- --headless --rolls 5 --seed 7
//! ```

mod app;
mod events;
mod headless;
mod ui;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rng_core::{PromptSession, SessionConfig};
use std::io::{self, stdout};
use std::time::Duration;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|a| a == "--headless") {
        let config = headless::parse_config_from_args(&args);
        return headless::run_headless(config).await;
    }

    // Build the session before touching the terminal so fetch warnings
    // stay readable.
    let session = PromptSession::new(session_config_from_args(&args)).await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(session)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// Session configuration from command line flags and the environment.
fn session_config_from_args(args: &[String]) -> SessionConfig {
    let mut config = SessionConfig::new();

    if let Some(base) = flag_value(args, "--api") {
        config = config.with_base_url(base);
    }
    if args.iter().any(|a| a == "--cycled") {
        config = config.with_cycled_sampling();
    }
    if let Some(path) = flag_value(args, "--store") {
        config = config.with_store_path(path);
    }

    config
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        // Process any pending save operation
        if let Some(path) = app.pending_save.take() {
            match app.session.save(&path).await {
                Ok(()) => app.set_status(format!("Saved to {}", path.display())),
                Err(e) => app.set_status(format!("Save failed: {e}")),
            }
        }

        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn print_help() {
    println!("rng-prompt - randomized prompt composer");
    println!();
    println!("USAGE:");
    println!("  rng-prompt [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help         Show this help message");
    println!("  --api <URL>        Content API base URL (default: RNG_PROMPT_API_BASE)");
    println!("  --cycled           Sample without replacement through shuffle bags");
    println!("  --store <PATH>     Persist group limits and shuffle bags to a file");
    println!("  --headless         Print rolled outputs instead of running the TUI");
    println!();
    println!("HEADLESS OPTIONS (only with --headless):");
    println!("  --rolls <N>        Number of rerolls to print (default: 1)");
    println!("  --seed <N>         Seed the random source for reproducible output");
    println!("  --offline          Skip the content API and use the built-in dataset");
    println!();
    println!("KEYS (TUI):");
    println!("  r / R              Reroll everything / reroll the current tab");
    println!("  f                  Refresh the selected card");
    println!("  space              Check or uncheck the selected card");
    println!("  x / t / L          Freeze card / pin item / unlock everything");
    println!("  + - m M n N        Quantity and group budget steppers");
    println!("  [ ]                Switch tabs, s saves, q quits");
}
