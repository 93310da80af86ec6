use assessd::config::Cli;
use assessd::{db, ipc, logging};
use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log);

    let mut state = ipc::AppState::new(cli.report_options());
    if let Some(path) = cli.workspace.as_ref() {
        match db::open_db(path) {
            Ok(conn) => {
                info!(path = %path.display(), "workspace opened at startup");
                state.workspace = Some(path.clone());
                state.db = Some(conn);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "startup workspace not opened"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                ipc::bad_json(e.to_string())
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
