use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::{execute, Completion, Dispatch, SheetService};

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Runs service calls on a tokio runtime and queues their completions for
/// the UI thread.
///
/// Completions are only ever consumed through [`RequestWorker::try_next`] (or
/// [`RequestWorker::next`]), so all session state stays on one thread.
pub struct RequestWorker {
    handle: Handle,
    service: Arc<dyn SheetService>,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    waker: Option<Waker>,
}

impl RequestWorker {
    pub fn new(handle: Handle, service: Arc<dyn SheetService>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            handle,
            service,
            tx,
            rx,
            waker: None,
        }
    }

    /// Called after each completion is queued, e.g. to request a repaint.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn dispatch(&self, dispatch: Dispatch) {
        log::debug!(
            "dispatching {} request (generation {})",
            dispatch.call.kind(),
            dispatch.generation
        );
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        self.handle.spawn(async move {
            let completion = execute(service.as_ref(), dispatch).await;
            if tx.send(completion).is_err() {
                log::debug!("completion dropped, worker is gone");
                return;
            }
            if let Some(wake) = waker {
                wake();
            }
        });
    }

    /// Next queued completion, without blocking.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next completion.
    pub async fn next(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::SearchRequest;
    use crate::data::model::{ResultRow, StagedFile};
    use crate::net::{
        RequestKind, ServiceCall, ServiceError, ServiceReply, SheetResponse, UploadResponse,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SlowSearch;

    #[async_trait]
    impl SheetService for SlowSearch {
        async fn upload(&self, file: &StagedFile) -> Result<UploadResponse, ServiceError> {
            Ok(UploadResponse {
                message: None,
                sheets: vec![file.name.clone()],
            })
        }

        async fn select_sheet(&self, name: &str) -> Result<SheetResponse, ServiceError> {
            Err(ServiceError::Rejected(format!("no sheet {name}")))
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, ServiceError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut row = ResultRow::new();
            row.insert("filters".into(), request.filter.as_str().into());
            Ok(vec![row])
        }
    }

    #[tokio::test]
    async fn completions_carry_kind_and_generation() {
        let mut worker = RequestWorker::new(Handle::current(), Arc::new(SlowSearch));
        worker.dispatch(Dispatch {
            generation: 7,
            call: ServiceCall::Upload(StagedFile::new("book.xlsx", vec![1u8, 2, 3])),
        });

        let completion = worker.next().await.unwrap();
        assert_eq!(completion.kind, RequestKind::Upload);
        assert_eq!(completion.generation, 7);
        match completion.outcome {
            Ok(ServiceReply::Uploaded(response)) => assert_eq!(response.sheets, ["book.xlsx"]),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_are_delivered_as_completions() {
        let mut worker = RequestWorker::new(Handle::current(), Arc::new(SlowSearch));
        worker.dispatch(Dispatch {
            generation: 1,
            call: ServiceCall::SelectSheet("Mar".into()),
        });

        let completion = worker.next().await.unwrap();
        assert_eq!(completion.kind, RequestKind::Sheet);
        assert!(matches!(completion.outcome, Err(ServiceError::Rejected(_))));
    }

    #[tokio::test]
    async fn waker_runs_after_each_completion() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let mut worker = RequestWorker::new(Handle::current(), Arc::new(SlowSearch))
            .with_waker(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        for generation in 1..=2 {
            worker.dispatch(Dispatch {
                generation,
                call: ServiceCall::Search(SearchRequest::default()),
            });
        }
        worker.next().await.unwrap();
        worker.next().await.unwrap();

        assert_eq!(wakes.load(Ordering::SeqCst), 2);
        assert!(worker.try_next().is_none());
    }
}
