use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use modelsweep::store::memory::DEFAULT_PAGE_SIZE;
use modelsweep::{
    BulkTaggedDeleter, DeletionFailure, DeletionPolicy, InMemoryObjectStore, ObjectId, RelationKind,
    RepositoryObject, SnapshotFile, StoreSnapshot, SweepConfig, TagAllowList,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelsweep")]
#[command(about = "Delete repository objects by model tag")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete every object tagged with an allow-listed model
    Sweep {
        #[command(flatten)]
        target: SweepArgs,
        #[arg(long)]
        on_error: Option<DeletionPolicy>,
        #[arg(long)]
        concurrency: Option<usize>,
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// List the objects a sweep would delete
    Plan {
        #[command(flatten)]
        target: SweepArgs,
    },
    /// Add example objects of one model to a store snapshot
    Seed {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        model: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long, default_value = "changeme")]
        namespace: String,
    },
}

#[derive(Args)]
struct SweepArgs {
    /// Store snapshot file
    #[arg(long)]
    store: PathBuf,
    /// Allow-listed model tag (repeatable); defaults to Item and Collection
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    relation: Option<String>,
    #[arg(long)]
    page_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sweep {
            target,
            on_error,
            concurrency,
            dry_run,
        } => {
            let mut config = build_config(&target)?;
            if let Some(policy) = on_error {
                config = config.on_delete_error(policy);
            }
            if let Some(concurrency) = concurrency {
                config = config.concurrency(concurrency);
            }
            if dry_run {
                plan(&target.store, config).await
            } else {
                sweep(&target.store, config).await
            }
        }
        Command::Plan { target } => plan(&target.store, build_config(&target)?).await,
        Command::Seed {
            store,
            model,
            count,
            namespace,
        } => seed(&store, &model, count, &namespace).await,
    }
}

fn build_config(args: &SweepArgs) -> Result<SweepConfig> {
    let mut config = SweepConfig::from_env().context("Invalid MODELSWEEP_* environment")?;
    if !args.tags.is_empty() {
        config = config.allow_list(TagAllowList::new(&args.tags)?);
    }
    if let Some(relation) = &args.relation {
        config = config.relation(RelationKind::from(relation.as_str()));
    }
    if let Some(page_size) = args.page_size {
        config = config.page_size(page_size);
    }
    config.validate()?;
    Ok(config)
}

fn load_store(path: &Path, page_size: usize) -> Result<InMemoryObjectStore> {
    let snapshot = SnapshotFile::new(path)
        .load()
        .with_context(|| format!("Failed to load store snapshot '{}'", path.display()))?
        .ok_or_else(|| anyhow!("Store snapshot '{}' does not exist", path.display()))?;
    Ok(InMemoryObjectStore::from_snapshot(snapshot, page_size))
}

fn save_store(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    SnapshotFile::new(path)
        .save(snapshot)
        .with_context(|| format!("Failed to save store snapshot '{}'", path.display()))
}

async fn sweep(path: &Path, config: SweepConfig) -> Result<()> {
    let store = load_store(path, config.page_size)?;
    let deleter = BulkTaggedDeleter::new(config)?;

    let handle = deleter.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let outcome = deleter.run(&store).await;

    // Deletions are irreversible; persist whatever happened even on abort.
    save_store(path, &store.to_snapshot().await)?;

    let report = match outcome {
        Ok(report) => report,
        Err(err) => {
            print_failures(err.failures());
            return Err(err.into());
        }
    };
    print_failures(&report.failures);
    println!("Sweep complete: {}", report);
    Ok(())
}

fn print_failures(failures: &[DeletionFailure]) {
    for failure in failures {
        println!("failed  {}: {}", failure.id, failure.error);
    }
}

async fn plan(path: &Path, config: SweepConfig) -> Result<()> {
    let store = load_store(path, config.page_size)?;
    let deleter = BulkTaggedDeleter::new(config)?;

    let plan = deleter.plan(&store, &deleter.config().allow_list).await?;
    for candidate in &plan.candidates {
        println!("{}  ({})", candidate.id, candidate.tag);
    }
    println!(
        "{} of {} object(s) would be deleted",
        plan.len(),
        plan.scanned
    );
    Ok(())
}

async fn seed(path: &Path, model: &str, count: usize, namespace: &str) -> Result<()> {
    let file = SnapshotFile::new(path);
    let store = match file.load()? {
        Some(snapshot) => InMemoryObjectStore::from_snapshot(snapshot, DEFAULT_PAGE_SIZE),
        None => InMemoryObjectStore::new(),
    };

    let mut next = store.len().await + 1;
    for _ in 0..count {
        let mut id = ObjectId::new(format!("{}:{}", namespace, next));
        while store.contains(&id).await {
            next += 1;
            id = ObjectId::new(format!("{}:{}", namespace, next));
        }
        next += 1;
        store
            .insert(RepositoryObject::new(id).with_model(model))
            .await;
    }

    save_store(path, &store.to_snapshot().await)?;
    println!("Seeded {} {} object(s) into {}", count, model, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelsweep::SweepError;
    use tempfile::TempDir;

    fn snapshot_ids(path: &Path) -> Vec<String> {
        SnapshotFile::new(path)
            .load()
            .unwrap()
            .unwrap()
            .objects
            .into_iter()
            .map(|o| o.id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_seed_appends_without_reusing_ids() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        seed(&path, "Item", 2, "demo").await.unwrap();
        seed(&path, "Page", 1, "demo").await.unwrap();

        assert_eq!(snapshot_ids(&path), vec!["demo:1", "demo:2", "demo:3"]);
    }

    #[tokio::test]
    async fn test_sweep_saves_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        seed(&path, "Item", 2, "demo").await.unwrap();
        seed(&path, "Page", 1, "demo").await.unwrap();

        sweep(&path, SweepConfig::new()).await.unwrap();

        assert_eq!(snapshot_ids(&path), vec!["demo:3"]);
    }

    #[tokio::test]
    async fn test_aborted_sweep_still_saves_deletions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let snapshot = StoreSnapshot::new(
            vec![
                RepositoryObject::new("demo:1").with_model("Item"),
                RepositoryObject::new("demo:2").with_model("Item"),
                RepositoryObject::new("demo:3").with_model("Item"),
            ],
            vec![ObjectId::new("demo:2")],
        );
        SnapshotFile::new(&path).save(&snapshot).unwrap();

        let err = sweep(&path, SweepConfig::new()).await.unwrap_err();

        let err = err.downcast::<SweepError>().unwrap();
        assert!(matches!(err, SweepError::Deletion { deleted: 1, .. }));
        assert_eq!(snapshot_ids(&path), vec!["demo:2", "demo:3"]);
    }

    #[tokio::test]
    async fn test_plan_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        seed(&path, "Collection", 2, "demo").await.unwrap();

        plan(&path, SweepConfig::new()).await.unwrap();

        assert_eq!(snapshot_ids(&path), vec!["demo:1", "demo:2"]);
    }

    #[tokio::test]
    async fn test_missing_store_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.json");

        let err = sweep(&path, SweepConfig::new()).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!path.exists());
    }
}
