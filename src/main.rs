use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_client_rs::app::App;
use chat_client_rs::client::{ChatClient, LocalClient};
use chat_client_rs::config::Config;

/// Log to a file; the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_client(config: &Config) -> Result<Arc<dyn ChatClient>> {
    let client = match config.seed_path() {
        Some(path) => {
            info!(path = %path.display(), "loading workspace seed");
            LocalClient::from_seed_file(config.username.clone(), &path)?
        }
        None => LocalClient::demo(config.username.clone()),
    };
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config)?;
    info!(config_dir = %config.config_dir.display(), "starting");

    let client = build_client(&config)?;
    let mut app = App::new(config, client).await?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Save state before exiting (even if there was an error)
    if let Err(err) = app.save_state() {
        error!(error = %err, "could not save config");
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = %err, "exited with error");
    }
    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    let mut dirty = true;
    loop {
        dirty |= app.tick();
        if dirty {
            terminal.draw(|f| app.draw(f))?;
            dirty = false;
        }

        if !event::poll(Duration::from_millis(50))? {
            // Let spawned fetches and actions make progress.
            tokio::task::yield_now().await;
            continue;
        }
        dirty = true;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                let alt = key.modifiers.contains(KeyModifiers::ALT);
                match key.code {
                    // Ctrl+Q: Quit
                    KeyCode::Char('q') if ctrl => break,
                    // Ctrl+S: Channel picker
                    KeyCode::Char('s') if ctrl => app.open_picker(),
                    // Ctrl+N: Next send channel
                    KeyCode::Char('n') if ctrl => app.cycle_send_channel(),
                    // Alt+0..9: Tabs
                    KeyCode::Char(c) if alt && c.is_ascii_digit() => {
                        app.switch_tab(c.to_digit(10).unwrap_or(1));
                    }
                    KeyCode::Enter if alt => app.handle_newline(),
                    KeyCode::Enter => app.handle_enter(),
                    KeyCode::Esc => app.handle_esc(),
                    KeyCode::Tab => app.handle_tab(),
                    KeyCode::Up => app.handle_up(),
                    KeyCode::Down => app.handle_down(),
                    KeyCode::PageUp => app.handle_page_up(),
                    KeyCode::PageDown => app.handle_page_down(),
                    KeyCode::Left => app.handle_input_left(),
                    KeyCode::Right => app.handle_input_right(),
                    KeyCode::Home => app.handle_home(),
                    KeyCode::End => app.handle_end(),
                    KeyCode::Backspace => app.handle_backspace(),
                    KeyCode::Delete => app.handle_delete(),
                    KeyCode::Char(c) if !ctrl => app.handle_char(c),
                    _ => {}
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.scroll_messages(-3),
                MouseEventKind::ScrollDown => app.scroll_messages(3),
                _ => {}
            },
            _ => {}
        }
    }

    Ok(())
}
