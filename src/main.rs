use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foliant::app::{App, Popup};
use foliant::config::AppConfig;
use foliant::ui;

#[derive(Parser, Debug)]
#[command(name = "foliant")]
#[command(version = "0.1.0")]
#[command(about = "A terminal-friendly page toolkit demo")]
struct Args {
    /// Dump the initialized demo page as JSON and exit
    #[arg(short, long)]
    inspect: bool,

    /// Fragment anchor: force the named pane open at load
    #[arg(short, long)]
    anchor: Option<String>,

    /// Simulated server response delay in milliseconds (overrides config;
    /// without it the server never responds and the retry cycle shows)
    #[arg(long)]
    server_delay: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(delay) = args.server_delay {
        config.demo.server_delay_ms = Some(delay);
    }

    // Handle CLI-only commands
    if args.inspect {
        return print_inspect(&config, args.anchor);
    }

    run_tui(config, args.anchor).await
}

fn print_inspect(config: &AppConfig, anchor: Option<String>) -> Result<()> {
    let host = App::build_host(config, anchor);
    println!("{}", serde_json::to_string_pretty(&host.inspect())?);
    Ok(())
}

async fn run_tui(config: AppConfig, anchor: Option<String>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config, anchor)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app, Instant::now()))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') if app.popup == Popup::None && !app.is_typing() => {
                        return Ok(())
                    }
                    KeyCode::Char('c')
                        if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                    {
                        return Ok(())
                    }
                    _ => {
                        // Handle key and catch any errors to prevent crashes
                        if let Err(e) = app.handle_key(key) {
                            app.status_message = Some(format!("Error: {}", e));
                        }
                    }
                },
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        // Periodic refresh
        app.tick();
    }
}
