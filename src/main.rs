//! Binary entrypoint for the Local LLM Chat web server.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use local_llm_chat::start_local_llm_chat::{self, BACKGROUND_LOG_FILE, Cli};

fn print_banner(cli: &Cli, local_ip: &str) {
    let port = cli.port;
    println!("Starting Local LLM Chat...");
    println!("Mode: {}", if cli.debug { "Development" } else { "Production" });
    println!("Server listening on {}:{port}", cli.host);
    println!();
    println!("Access URLs:");
    println!("   This device:      http://127.0.0.1:{port}");
    println!("   Local network:    http://{local_ip}:{port}");
    println!();
    println!("To access from other devices on your network:");
    println!("   1. Open a web browser on any device");
    println!("   2. Navigate to: http://{local_ip}:{port}");
    println!("   3. If connection fails, check firewall settings");
    println!();
    if let Some(dir) = cli.resolved_storage_dir() {
        println!("Conversations will be saved to: {}", dir.display());
        println!();
    }
}

/// Detach into the background. Returns `false` if the caller should stay in the foreground.
fn detach(local_ip: &str, port: u16) -> bool {
    println!("Running in background mode...");
    println!("   Web server will continue running after terminal closes");
    println!("   To stop: Use the 'Shutdown Server' button in the web interface");
    println!("   Logs will be written to {BACKGROUND_LOG_FILE}");
    println!();

    match start_local_llm_chat::spawn_background() {
        Ok(pid) => {
            std::thread::sleep(Duration::from_secs(2));
            println!("Web server started successfully!");
            println!("Process ID: {pid}");
            println!("Logs: {BACKGROUND_LOG_FILE}");
            println!();
            println!("Open your browser and navigate to:");
            println!("   http://{local_ip}:{port}");
            true
        }
        Err(e) => {
            eprintln!("Failed to start in background mode: {e}");
            println!("Falling back to foreground mode...");
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let local_ip = start_local_llm_chat::local_ip();
    print_banner(&cli, &local_ip);

    if cli.wants_background() {
        if start_local_llm_chat::background_supported() {
            if detach(&local_ip, cli.port) {
                return ExitCode::SUCCESS;
            }
        } else {
            println!("Background mode not supported on this platform");
            println!("   Running in foreground mode instead...");
        }
    }

    println!("Press Ctrl+C to stop the server");
    println!("{}", "=".repeat(50));
    start_local_llm_chat::run(&cli)
}
