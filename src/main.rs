use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;

use soundpad::audio_engine::{CpalBackend, DeviceRegistry};
use soundpad::commands::{Command, HELP, parse_command};
use soundpad::config::ConfigStore;
use soundpad::view::TextRenderer;
use soundpad::{ControllerEvent, SoundboardController, setup_logger};

fn main() {
    setup_logger();

    let path = ConfigStore::resolve_path();
    log::info!("Using config {}", path.display());

    let (tx, rx) = mpsc::channel();
    let mut controller = SoundboardController::new(
        ConfigStore::new(path),
        Box::new(CpalBackend::new()),
        DeviceRegistry::enumerate(),
        TextRenderer::new(io::stdout()),
        tx.clone(),
    );
    controller.start_watching();

    println!("{HELP}");
    if let Err(err) = thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || read_commands(tx))
    {
        log::error!("Failed to start command reader: {}", err);
        return;
    }

    controller.run(rx);
}

/// Forwards parsed stdin lines; end of input shuts the soundboard down.
fn read_commands(events: Sender<ControllerEvent>) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("Failed to read stdin: {}", err);
                break;
            }
        };

        match parse_command(&line) {
            Ok(Some(Command::Event(event))) => {
                let quit = event == ControllerEvent::Shutdown;
                if events.send(event).is_err() || quit {
                    return;
                }
            }
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(None) => {}
            Err(err) => {
                let mut stderr = io::stderr();
                writeln!(stderr, "{err}").ok();
            }
        }
    }
    events.send(ControllerEvent::Shutdown).ok();
}
