use std::io::Write;
use std::sync::Arc;

use eyre::{Context, Result};
use parley::backend::new_backend;
use parley::cli::{self, Action, Command};
use parley::config::constants::STORAGE_KEY;
use parley::config::{Configuration, init_logger, verbose};
use parley::models::Event;
use parley::session::{ConversationStore, Session};
use parley::storage::{Persistence, new_blob_store};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return Ok(());
    }

    let Some(action) = cmd.action() else {
        return Command::print_help();
    };

    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let config = cmd.get_config()?;
    init_logger(&config.log)?;
    Configuration::init(config.clone())?;
    verbose!("[+] Logger initialized");

    verbose!("[+] Initializing backend...");
    let backend = new_backend(&config.backend)?;

    verbose!("[+] Initializing storage...");
    let blobs = new_blob_store(&config.storage).wrap_err("initializing storage")?;
    let store = ConversationStore::open(Persistence::new(blobs, STORAGE_KEY));
    verbose!("[+] Loaded {} conversations", store.conversations().len());

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let session = Session::new(store, backend.clone())
        .with_event_tx(Arc::new(event_tx))
        .with_settings(config.session.settings())
        .with_auto_title(config.backend.auto_title)
        .with_title_keep_alive(config.backend.title_keep_alive.as_str());

    let printer = tokio::spawn(print_events(event_rx));

    let res = match action {
        Action::Chat(args) => {
            match cli::chat(args, &session, config.general.default_model.as_deref()).await {
                Ok(0) => Ok(()),
                Ok(failures) => Err(eyre::eyre!("{} replies failed", failures)),
                Err(err) => Err(err),
            }
        }
        action => cli::execute(action, &session, &backend, &mut std::io::stdout()).await,
    };

    // Titles still being generated must land before the store goes away.
    session.wait_background().await;
    drop(session);

    if let Err(err) = printer.await {
        log::error!("Task error: {}", err);
    }

    res
}

/// Render session events on the terminal until every sender is gone.
async fn print_events(mut event_rx: mpsc::UnboundedReceiver<Event>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = event_rx.recv().await {
        let res = match event {
            Event::Fragment { text, .. } => write!(stdout, "{}", text).and_then(|_| stdout.flush()),
            Event::LoadingChanged(false) => writeln!(stdout),
            Event::LoadingChanged(true) => Ok(()),
            Event::CompletionFailed { reason, .. } => {
                eprintln!("Error: {}", reason);
                Ok(())
            }
            Event::ConversationRenamed { id, title } => {
                verbose!("[+] Conversation {} titled {:?}", id, title);
                Ok(())
            }
        };

        if let Err(err) = res {
            log::error!("Failed to write to stdout: {}", err);
        }
    }
}
