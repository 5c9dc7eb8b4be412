use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use client::api::HttpApi;
use client::{load_controls, sync};
use curtidas_core::config::CurtidasConfig;
use curtidas_core::control::{ControlId, Dataset, Surface};
use curtidas_core::{Command, SyncCommand};

/// Interactive driver: binds the controls of a rendered page from a
/// JSON fixture, then replays clicks typed on stdin against the live
/// backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = CurtidasConfig::load_or_default(&CurtidasConfig::resolve_path())?;
    info!("backend at {}", config.base_url);

    let api = Arc::new(HttpApi::new(config.base_url.clone()));
    let engine = sync::Engine::new(api, config);
    let notifier = engine.notifier();

    // echo every banner change, the terminal stands in for the page
    let mut banner = notifier.lock().unwrap().subscribe();
    tokio::spawn(async move {
        while banner.changed().await.is_ok() {
            match banner.borrow_and_update().clone() {
                Some(message) => println!("[feedback] {}", message.text),
                None => println!("[feedback] (dismissed)"),
            }
        }
    });

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(sync::run(engine, rx));

    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        for (surface, dataset) in load_controls(&path)? {
            let reply = request(&tx, Command::Bind { surface, dataset }).await?;
            info!("{reply}");
        }
    }

    println!("commands: toggle <id> | open <k=v>... | close | prime <user> | status | quit");
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let mut words = line.split_whitespace();
        let cmd = match words.next() {
            Some(word) => word,
            None => continue,
        };
        let command = match cmd {
            "quit" | "q" => break,
            "toggle" => match words.next().and_then(|raw| raw.parse::<u32>().ok()) {
                Some(id) => Command::Toggle {
                    control: ControlId(id),
                },
                None => {
                    warn!("usage: toggle <control-id>");
                    continue;
                }
            },
            "prime" => match words.next().and_then(|raw| raw.parse().ok()) {
                Some(user) => Command::Prime { user },
                None => {
                    warn!("usage: prime <user-id>");
                    continue;
                }
            },
            "open" => {
                let mut dataset = Dataset::new();
                for pair in words {
                    match pair.split_once('=') {
                        Some((key, value)) => dataset.insert(key, value),
                        None => {
                            warn!("ignoring malformed pair: {pair}");
                        }
                    }
                }
                Command::OpenDetail { dataset }
            }
            "close" => Command::CloseDetail,
            "status" => Command::Snapshot,
            "bind" => {
                let mut dataset = Dataset::new();
                for pair in words {
                    if let Some((key, value)) = pair.split_once('=') {
                        dataset.insert(key, value);
                    }
                }
                Command::Bind {
                    surface: Surface::Feed,
                    dataset,
                }
            }
            other => {
                warn!("unknown command: {other}");
                continue;
            }
        };

        match request(&tx, command).await {
            Ok(reply) => println!("{reply}"),
            Err(err) => warn!("engine gone: {err}"),
        }
    }

    Ok(())
}

async fn request(
    tx: &mpsc::Sender<SyncCommand>,
    cmd: Command,
) -> anyhow::Result<curtidas_core::EngineReply> {
    let (resp, receiver) = oneshot::channel();
    tx.send(SyncCommand {
        cmd,
        resp: Some(resp),
    })
    .await?;
    Ok(receiver.await?)
}
