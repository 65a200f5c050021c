use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// The thread that owns the connection. Dropped with the last `Database`
/// clone, which stops and joins it.
struct Worker {
    jobs: mpsc::Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.jobs.send(Message::Stop).is_err() {
            warn!("Database thread already gone at shutdown");
        }
        if thread.join().is_err() {
            error!("Database thread panicked");
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database at {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Could not switch to WAL journal: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    run_migrations(&mut conn).context("failed to run database migrations")?;

    Ok(conn)
}

fn serve(path: PathBuf, ready: mpsc::Sender<Result<()>>, jobs: mpsc::Receiver<Message>) {
    let mut conn = match open_connection(&path) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    for message in jobs {
        match message {
            Message::Run(job) => job(&mut conn),
            Message::Stop => break,
        }
    }
    info!("Database thread stopped");
}

/// Handle to the SQLite database. Cheap to clone; every query runs as a
/// closure on the owner thread, one at a time.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_path = db_path.clone();

        let thread = thread::Builder::new()
            .name("shortsguard-db".into())
            .spawn(move || serve(thread_path, ready_tx, jobs_rx))
            .context("failed to spawn database thread")?;

        let worker = Worker {
            jobs: jobs_tx,
            thread: Some(thread),
        };
        ready_rx
            .recv()
            .context("database thread exited during start-up")??;

        info!("Database ready at {}", db_path.display());
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // The caller may have timed out; the work still ran.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .send(Message::Run(job))
            .map_err(|_| anyhow!("database thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread dropped the request"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_queries_on_the_owner_thread() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("nested").join("db.sqlite3")).unwrap();

        let thread_name = db
            .execute(|_| Ok(thread::current().name().map(str::to_string)))
            .await
            .unwrap();
        assert_eq!(thread_name.as_deref(), Some("shortsguard-db"));

        let journal: String = db
            .execute(|conn| Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(journal.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn task_errors_reach_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("db.sqlite3")).unwrap();

        let result: Result<()> = db.execute(|_| Err(anyhow!("boom"))).await;
        assert!(result.is_err());

        // The thread keeps serving after a failed task.
        let one: i64 = db
            .execute(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(one, 1);
    }
}
