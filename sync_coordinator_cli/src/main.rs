use clap::Parser;
use slog::Drain;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use sync_coordinator::{
    AllowAll, ConnectionId, CoordinatorConfig, InMemoryFanOut, InMemoryPersistence,
    PersistenceRetryService, SyncCoordinator,
};
use sync_core::ReplicaId;
use sync_data_types::Value;
use sync_messages::OutgoingMessage;
use sync_replication::{Delta, Document, DocumentId, Path};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The document this session mutates.
    #[arg(short, long, default_value = "demo")]
    document: String,

    /// The replica identity local writes are stamped with. Defaults to a random id.
    #[arg(short, long)]
    replica: Option<String>,
}

type Coordinator = SyncCoordinator<InMemoryPersistence, InMemoryFanOut, AllowAll>;

#[tokio::main]
async fn main() {
    let _guard = init_logging();
    let args = Args::parse();

    let replica = args
        .replica
        .map(ReplicaId::from)
        .unwrap_or_else(ReplicaId::new_random);
    let document_id = DocumentId::from(args.document);

    log::info!("starting coordinator demo for replica {replica} on document {document_id}");

    let config = CoordinatorConfig::default();
    let persistence = Arc::new(InMemoryPersistence::new());
    let coordinator: Arc<Coordinator> = Arc::new(SyncCoordinator::new(
        replica.clone(),
        config.clone(),
        persistence.clone(),
        Arc::new(InMemoryFanOut::new()),
        Arc::new(AllowAll),
    ));

    let retry_handle = PersistenceRetryService::start(
        persistence,
        coordinator.pending_writes(),
        config.persistence_retry_interval,
    )
    .await
    .expect("persistence retry service");

    // Cross-server coordination (§4.6): re-apply deltas other coordinator processes publish
    // for this document, and rebroadcast them to this process's own subscribers. A single
    // in-memory fan-out adapter means this demo never actually hears from another process,
    // but the listener is wired exactly as a multi-process deployment would wire it.
    let fanout_handle = coordinator
        .clone()
        .start_fanout_listener(document_id.clone())
        .await
        .expect("fan-out listener");

    let observer_id = ConnectionId::from("observer");
    let (observer_tx, mut observer_rx) = tokio::sync::mpsc::channel(coordinator.config().subscriber_queue_capacity);
    coordinator
        .subscribe(document_id.clone(), observer_id, None, observer_tx)
        .await
        .expect("subscribe observer");

    tokio::spawn(async move {
        while let Some(message) = observer_rx.recv().await {
            if let OutgoingMessage::DeltaEcho { delta } = message {
                log::info!("observer saw {} change(s) broadcast", delta.len());
            }
        }
    });

    let mut doc = Document::new(document_id.clone(), replica.clone());
    let local_conn = ConnectionId::from("local");

    println!("sync_coordinator_cli — commands: set <path> <value> | delete <path> | get <path> | status | quit");

    let mut lines = BufReader::new(std::io::stdin()).lines();
    while let Some(Ok(line)) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let command = parts.next().unwrap_or_default();
        match command {
            "set" => {
                let (Some(path), Some(value)) = (parts.next(), parts.next()) else {
                    println!("usage: set <path> <value>");
                    continue;
                };
                let before = doc.clone();
                let value = Value::new(serde_json::Value::String(value.to_owned()));
                if let Err(e) = doc.set(Path::from(path), value) {
                    log::error!("local write failed: {e}");
                    continue;
                }
                forward_change(&coordinator, &doc, &before, &local_conn).await;
            }
            "delete" => {
                let Some(path) = parts.next() else {
                    println!("usage: delete <path>");
                    continue;
                };
                let before = doc.clone();
                if let Err(e) = doc.delete(Path::from(path)) {
                    log::error!("local delete failed: {e}");
                    continue;
                }
                forward_change(&coordinator, &doc, &before, &local_conn).await;
            }
            "get" => {
                let Some(path) = parts.next() else {
                    println!("usage: get <path>");
                    continue;
                };
                match doc.get(&Path::from(path)) {
                    Some(value) => println!("{path} = {value}"),
                    None => println!("{path} is unset"),
                }
            }
            "status" => {
                for path in doc.paths() {
                    match doc.get(path) {
                        Some(value) => println!("{path} = {value}"),
                        None => println!("{path} = <tombstone>"),
                    }
                }
                println!("clock: {:?}", doc.clock().iter().collect::<Vec<_>>());
            }
            "quit" | "exit" => break,
            other => println!("unknown command: {other}"),
        }
    }

    log::info!("shutting down coordinator demo");
    fanout_handle.abort();
    if let Err(e) = retry_handle.shutdown().await {
        log::error!("persistence retry service did not shut down cleanly: {e}");
    }
}

async fn forward_change(coordinator: &Coordinator, doc: &Document, before: &Document, conn: &ConnectionId) {
    let delta = Delta::compute(before, doc);
    if delta.is_empty() {
        return;
    }
    if let Err(e) = coordinator
        .handle_incoming_delta(delta, doc.clock(), conn)
        .await
    {
        log::error!("applying local change to coordinator failed: {e}");
    }
}

fn init_logging() -> slog_scope::GlobalLoggerGuard {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = std::sync::Mutex::new(drain).fuse();
    let logger = slog::Logger::root(drain, slog::o!());
    let guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().expect("bridge log crate to slog");
    guard
}
