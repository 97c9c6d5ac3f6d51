//! End-to-end: submitter -> store -> channel dispatcher -> worker pool -> results.

use std::sync::Arc;
use std::time::Duration;

use foreman_core::app::{Submitter, TaskOutput, WorkerDeps, WorkerPool, WorkerSettings};
use foreman_core::domain::{TaskId, TaskState};
use foreman_core::impls::channel_dispatch::{self, ChannelDispatcher};
use foreman_core::impls::{ChannelSwap, InMemoryContentStore, WordCount};
use foreman_core::ports::{Dispatcher, Transform};
use foreman_core::store::TaskStore;

struct Pipeline {
    store: Arc<TaskStore>,
    content: Arc<InMemoryContentStore>,
    submitter: Submitter,
    client: ChannelDispatcher,
}

fn pipeline(lease: Duration) -> Pipeline {
    let store = Arc::new(TaskStore::new(lease));
    let content = Arc::new(InMemoryContentStore::new());
    let (server, client) = channel_dispatch::channel(Arc::clone(&store), 16);
    tokio::spawn(server.serve());
    Pipeline {
        submitter: Submitter::new(Arc::clone(&store), content.clone()),
        store,
        content,
        client,
    }
}

impl Pipeline {
    fn spawn_pool(&self, n: usize, transform: Arc<dyn Transform>) -> WorkerPool {
        WorkerPool::spawn(
            n,
            WorkerDeps {
                dispatcher: Arc::new(self.client.clone()),
                content: self.content.clone(),
                transform,
            },
            WorkerSettings::default(),
        )
    }

    async fn wait_all_done(&self) {
        while !self.store.counts().await.all_done() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn word_count_corpus_completes() {
    let p = pipeline(Duration::from_secs(120));
    let ids = p
        .submitter
        .submit_all(vec![
            b"give,thanks,vowel,happy,get,thanks,happy,thanks,happy,thanks,give".to_vec(),
            b"grapple,who,is,she,grapple,who,is,is,is,been,benn,who,she,she,been,who,show".to_vec(),
        ])
        .await
        .unwrap();

    let pool = p.spawn_pool(3, Arc::new(WordCount));
    p.wait_all_done().await;
    pool.shutdown_and_join().await;

    assert_eq!(
        p.submitter.result(ids[0]).await.unwrap(),
        TaskOutput::Ready(
            b"get : 1\ngive : 2\nhappy : 3\nthanks : 4\nvowel : 1\n".to_vec()
        )
    );
    assert_eq!(
        p.submitter.result(ids[1]).await.unwrap(),
        TaskOutput::Ready(
            b"been : 2\nbenn : 1\ngrapple : 2\nis : 4\nshe : 3\nshow : 1\nwho : 4\n".to_vec()
        )
    );
}

#[tokio::test(start_paused = true)]
async fn crashed_worker_lease_is_recovered() {
    let lease = Duration::from_secs(30);
    let p = pipeline(lease);
    let id = p.submitter.submit(b"a,b,a".to_vec()).await.unwrap();

    // 受け取ったまま消えるワーカー
    let abandoned = p.client.lease_next().await.unwrap().unwrap();
    assert_eq!(abandoned.id(), id);

    let pool = p.spawn_pool(2, Arc::new(WordCount));

    // 期限前は誰も取れない
    tokio::time::sleep(lease / 2).await;
    assert_eq!(p.store.get(id).await.unwrap().state(), TaskState::Leased);

    p.wait_all_done().await;
    pool.shutdown_and_join().await;

    let task = p.store.get(id).await.unwrap();
    assert_eq!(task.state(), TaskState::Done);
    assert!(task.lease_generation() >= 2);
    assert_eq!(
        p.submitter.result(id).await.unwrap(),
        TaskOutput::Ready(b"a : 2\nb : 1\n".to_vec())
    );
}

#[tokio::test(start_paused = true)]
async fn bad_pixels_finish_without_output() {
    let p = pipeline(Duration::from_secs(120));
    let good = p
        .submitter
        .submit(vec![10, 20, 30, 0, 1, 2, 3, 4])
        .await
        .unwrap();
    let bad = p.submitter.submit(vec![1, 2, 3]).await.unwrap();

    let pool = p.spawn_pool(1, Arc::new(ChannelSwap));
    p.wait_all_done().await;
    pool.shutdown_and_join().await;

    assert_eq!(
        p.submitter.result(good).await.unwrap(),
        TaskOutput::Ready(vec![20, 10, 30, 255, 2, 1, 3, 255])
    );
    assert_eq!(p.submitter.result(bad).await.unwrap(), TaskOutput::Empty);
}

#[tokio::test(start_paused = true)]
async fn late_completion_from_the_crashed_worker_is_harmless() {
    let p = pipeline(Duration::from_secs(10));
    let id = p.submitter.submit(b"x".to_vec()).await.unwrap();
    p.client.lease_next().await.unwrap().unwrap();

    let pool = p.spawn_pool(1, Arc::new(WordCount));
    p.wait_all_done().await;
    pool.shutdown_and_join().await;

    let before = p.store.get(id).await.unwrap();

    // 最初のワーカーが今さら報告してくる（出力なし）
    let completion = p.client.task_finished(id, None).await.unwrap();
    assert!(completion.is_committed());
    let after = p.store.get(id).await.unwrap();
    assert_eq!(after.state(), TaskState::Done);
    assert_eq!(after.lease_generation(), before.lease_generation());

    let unknown = p.client.task_finished(TaskId::new(42), None).await.unwrap();
    assert!(!unknown.is_committed());
}
