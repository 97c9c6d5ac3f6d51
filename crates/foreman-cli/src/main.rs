use std::future::Future;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use foreman_core::app::{ConfigError, EngineConfig, Submitter, TaskOutput, WorkerDeps, WorkerPool};
use foreman_core::impls::channel_dispatch;
use foreman_core::impls::{InMemoryContentStore, InMemoryDiscovery, WordCount};
use foreman_core::ports::resolve_with_retry;
use foreman_core::store::TaskStore;
use tracing_subscriber::EnvFilter;

const DISPATCHER_SERVICE: &str = "dispatcher";
const CONTENT_SERVICE: &str = "content-store";
const RESOLVE_ATTEMPTS: u32 = 5;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// master-slave 型パイプラインの入力（カンマ区切りの単語列）
const CORPUS: [&str; 5] = [
    "give,thanks,vowel,happy,get,thanks,happy,thanks,happy,thanks,give",
    "terse,word,terse,sad,choice,correct,word,word,work,terse,ties,correct,correct",
    "the,their,his,her,them,out,their,her,it,their,their,the,is,is,the,the,her,her",
    "grapple,who,is,she,grapple,who,is,is,is,been,benn,who,she,she,been,who,show",
    "asked,repeat,recent,try,what,asked,asked,repeat,repeat,repeat,recent,repeat,try,what,what,what,repeat,repeat",
];

/// `--config <path.json>` があればそれを読み、最後に環境変数で上書きする
fn load_config(args: &[String]) -> Result<EngineConfig, ConfigError> {
    let config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).ok_or_else(|| {
                ConfigError::Invalid("usage: foreman-cli [--config <path.json>]".to_string())
            })?;
            let mut config = EngineConfig::load(path)?;
            config.apply_env()?;
            config
        }
        None => EngineConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

/// Poll the store until every task is Done. Returns `false` if `interrupt`
/// resolves first.
async fn wait_all_done<F: Future>(store: &TaskStore, interrupt: F) -> bool {
    // 1 回だけ作って使い回す。ループごとに作ると間のシグナルを取りこぼす
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            _ = &mut interrupt => return false,
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                let counts = store.counts().await;
                tracing::debug!(?counts, "progress");
                if counts.all_done() {
                    return true;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };
    tracing::info!(?config, "configuration loaded");

    // 1) 各サービスが自分のアドレスを登録する
    let discovery = InMemoryDiscovery::new();
    discovery
        .register(DISPATCHER_SERVICE, "inproc://dispatcher")
        .await;
    discovery.register(CONTENT_SERVICE, "inproc://content").await;

    // 2) 起動時の解決に失敗したら止める（Fail-fast）
    for name in [DISPATCHER_SERVICE, CONTENT_SERVICE] {
        match resolve_with_retry(
            &discovery,
            name,
            config.call_timeout(),
            config.backoff(),
            RESOLVE_ATTEMPTS,
        )
        .await
        {
            Ok(address) => tracing::info!(service = name, %address, "service resolved"),
            Err(e) => {
                tracing::error!(service = name, error = %e, "cannot resolve service");
                process::exit(1);
            }
        }
    }

    // 3) TaskStore + dispatcher server
    let store = Arc::new(TaskStore::new(config.lease_duration()));
    let content = Arc::new(InMemoryContentStore::new());
    let (server, dispatcher) = channel_dispatch::channel(Arc::clone(&store), 64);
    let server_join = tokio::spawn(server.serve());

    // 4) 入力を登録
    let submitter = Submitter::new(Arc::clone(&store), content.clone());
    let ids = match submitter
        .submit_all(CORPUS.iter().map(|s| s.as_bytes().to_vec()))
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "failed to submit inputs");
            process::exit(1);
        }
    };

    // 5) ワーカーを起動
    let pool = WorkerPool::spawn(
        config.workers,
        WorkerDeps {
            dispatcher: Arc::new(dispatcher),
            content: content.clone(),
            transform: Arc::new(WordCount),
        },
        config.worker_settings(),
    );

    // 6) 全タスクが Done になるまで待つ
    if !wait_all_done(&store, tokio::signal::ctrl_c()).await {
        tracing::warn!("interrupted");
    }

    for id in &ids {
        match submitter.result(*id).await {
            Ok(TaskOutput::Ready(bytes)) => {
                println!("== {id}");
                print!("{}", String::from_utf8_lossy(&bytes));
            }
            Ok(TaskOutput::Empty) => println!("== {id}: finished without output"),
            Ok(TaskOutput::NotReady) => println!("== {id}: not finished"),
            Err(e) => println!("== {id}: {e}"),
        }
    }

    pool.shutdown_and_join().await;
    // ワーカーが持つクライアントが全部 drop されるとサーバも抜ける
    if let Err(e) = server_join.await {
        tracing::error!(error = %e, "dispatcher server panicked");
    }

    let counts = store.counts().await;
    tracing::info!(
        done = counts.done,
        pending = counts.pending,
        leased = counts.leased,
        "shutdown complete"
    );
}
