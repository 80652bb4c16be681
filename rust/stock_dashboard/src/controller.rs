// src/controller.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::{self, JoinSet};

use crate::client::AnalysisBackend;
use crate::error::FetchError;
use crate::form::Symbol;
use crate::models::StockAnalysis;

/// Correlation token minted once per submission, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(value: u64) -> Self {
        RequestId(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The dashboard's only mutable state.
///
/// A terminal variant always carries the id of the request it came from, and that id is
/// always the latest one issued.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading(RequestId),
    Success(Arc<StockAnalysis>, RequestId),
    Error(FetchError, RequestId),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading(_))
    }

    pub fn analysis(&self) -> Option<&StockAnalysis> {
        match self {
            FetchState::Success(analysis, _) => Some(analysis),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Error(err, _) => Some(err),
            _ => None,
        }
    }
}

// Result of one backend call, tagged with the request that issued it
#[derive(Debug)]
pub struct Resolution {
    pub request_id: RequestId,
    pub symbol: Symbol,
    pub outcome: Result<StockAnalysis, FetchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The resolution belonged to the latest request and is now the current state.
    Applied(RequestId),
    /// A superseded request finished, or its task died; nothing changed.
    Discarded(RequestId),
}

/// Owns [`FetchState`] and issues one backend call per accepted submission.
///
/// `submit` returns as soon as the state is `Loading`; the call runs on the tokio runtime
/// and its result is applied by `settle`/`wait` only if no newer submission was made in
/// the meantime. Superseded calls are not cancelled, their results are discarded.
///
/// A task that dies without a result (a panicking backend) is settled like a network
/// failure of the request that spawned it.
pub struct FetchController<B> {
    backend: Arc<B>,
    state: FetchState,
    issued: u64,
    tasks: JoinSet<Resolution>,
    pending: HashMap<task::Id, (RequestId, Symbol)>,
}

impl<B: AnalysisBackend> FetchController<B> {
    pub fn new(backend: B) -> Self {
        FetchController {
            backend: Arc::new(backend),
            state: FetchState::Idle,
            issued: 0,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        (self.issued > 0).then_some(RequestId::new(self.issued))
    }

    // Backend calls not yet settled, superseded ones included
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start a request for `symbol`, superseding any request still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, symbol: Symbol) -> RequestId {
        self.issued += 1;
        let request_id = RequestId::new(self.issued);

        if let FetchState::Loading(previous) = self.state {
            log::debug!("Request {previous} superseded by {request_id}");
        }
        log::info!("Requesting analysis for {symbol} ({request_id})");
        self.state = FetchState::Loading(request_id);

        let backend = Arc::clone(&self.backend);
        let task_symbol = symbol.clone();
        let handle = self.tasks.spawn(async move {
            let outcome = backend.fetch_analysis(task_symbol.as_str()).await;
            Resolution {
                request_id,
                symbol: task_symbol,
                outcome,
            }
        });
        self.pending.insert(handle.id(), (request_id, symbol));

        request_id
    }

    /// Apply a finished call if it answers the latest request, otherwise drop it.
    pub fn resolve(&mut self, resolution: Resolution) -> Settlement {
        let Resolution {
            request_id,
            symbol,
            outcome,
        } = resolution;

        if !matches!(self.state, FetchState::Loading(current) if current == request_id) {
            log::debug!("Discarding stale response for {symbol} ({request_id})");
            return Settlement::Discarded(request_id);
        }

        self.state = match outcome {
            Ok(analysis) => {
                log::info!("Analysis for {symbol} ({request_id}) received");
                FetchState::Success(Arc::new(analysis), request_id)
            }
            Err(err) => {
                log::warn!("Analysis for {symbol} ({request_id}) failed: {err}");
                FetchState::Error(err, request_id)
            }
        };
        Settlement::Applied(request_id)
    }

    /// Wait for the next in-flight call to finish and resolve it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn settle(&mut self) -> Option<Settlement> {
        loop {
            let err = match self.tasks.join_next_with_id().await? {
                Ok((task_id, resolution)) => {
                    self.pending.remove(&task_id);
                    return Some(self.resolve(resolution));
                }
                Err(err) => err,
            };

            let Some((request_id, symbol)) = self.pending.remove(&err.id()) else {
                log::error!("Untracked analysis task ended without a result: {err}");
                continue;
            };
            log::error!("Analysis task for {symbol} ({request_id}) ended without a result: {err}");
            return Some(self.resolve(Resolution {
                request_id,
                symbol,
                outcome: Err(FetchError::Network(
                    "request task ended without a result".to_string(),
                )),
            }));
        }
    }

    /// Settle calls until the latest request has reached a terminal state.
    pub async fn wait(&mut self) -> &FetchState {
        while self.state.is_loading() {
            if self.settle().await.is_none() {
                break;
            }
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Answers each symbol after a fixed delay on the (paused) tokio clock
    #[derive(Default)]
    struct ScriptedBackend {
        script: HashMap<String, (Duration, Result<StockAnalysis, FetchError>)>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn answer(mut self, symbol: &str, delay_ms: u64, outcome: Result<StockAnalysis, FetchError>) -> Self {
            self.script
                .insert(symbol.to_string(), (Duration::from_millis(delay_ms), outcome));
            self
        }
    }

    impl AnalysisBackend for ScriptedBackend {
        async fn fetch_analysis(&self, symbol: &str) -> Result<StockAnalysis, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "BOOM" {
                panic!("backend exploded");
            }
            let (delay, outcome) = self
                .script
                .get(symbol)
                .cloned()
                .unwrap_or((Duration::ZERO, Err(FetchError::Http(404))));
            tokio::time::sleep(delay).await;
            outcome
        }
    }

    fn analysis(name: &str) -> StockAnalysis {
        let body = format!(
            r#"{{ "stock_analysis": {{ "current_price": 100, "company_info": {{ "name": "{name}" }} }} }}"#
        );
        StockAnalysis::from_json(body.as_bytes()).unwrap()
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn company_name(state: &FetchState) -> Option<&str> {
        state.analysis().map(|a| a.company_info().name.as_str())
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let controller = FetchController::new(ScriptedBackend::default());

        assert_eq!(controller.state(), &FetchState::Idle);
        assert_eq!(controller.latest_request(), None);
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_enters_loading_then_success() {
        let backend = ScriptedBackend::default().answer("NVDA", 20, Ok(analysis("NVIDIA")));
        let mut controller = FetchController::new(backend);

        let id = controller.submit(symbol("NVDA"));
        assert_eq!(controller.state(), &FetchState::Loading(id));

        let state = controller.wait().await;
        assert!(matches!(state, FetchState::Success(_, got) if *got == id));
        assert_eq!(company_name(controller.state()), Some("NVIDIA"));
        assert_eq!(controller.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_ids_increase() {
        let mut controller = FetchController::new(ScriptedBackend::default());

        let first = controller.submit(symbol("A"));
        let second = controller.submit(symbol("B"));
        let third = controller.submit(symbol("C"));

        assert!(first < second && second < third);
        assert_eq!(controller.latest_request(), Some(third));
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_request_resolving_last_is_discarded() {
        let backend = ScriptedBackend::default()
            .answer("AAA", 50, Ok(analysis("Slow A")))
            .answer("BBB", 10, Ok(analysis("Fast B")));
        let mut controller = FetchController::new(backend);

        let a = controller.submit(symbol("AAA"));
        let b = controller.submit(symbol("BBB"));

        assert_eq!(controller.settle().await, Some(Settlement::Applied(b)));
        assert_eq!(controller.settle().await, Some(Settlement::Discarded(a)));
        assert_eq!(controller.settle().await, None);

        assert!(matches!(controller.state(), FetchState::Success(_, id) if *id == b));
        assert_eq!(company_name(controller.state()), Some("Fast B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_request_resolving_first_is_discarded() {
        let backend = ScriptedBackend::default()
            .answer("AAA", 10, Ok(analysis("Fast A")))
            .answer("BBB", 50, Ok(analysis("Slow B")));
        let mut controller = FetchController::new(backend);

        let a = controller.submit(symbol("AAA"));
        let b = controller.submit(symbol("BBB"));

        assert_eq!(controller.settle().await, Some(Settlement::Discarded(a)));
        assert_eq!(controller.state(), &FetchState::Loading(b));

        controller.wait().await;
        assert_eq!(company_name(controller.state()), Some("Slow B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_failure_is_ignored() {
        let backend = ScriptedBackend::default()
            .answer("AAA", 50, Err(FetchError::Http(500)))
            .answer("BBB", 10, Ok(analysis("B")));
        let mut controller = FetchController::new(backend);

        controller.submit(symbol("AAA"));
        let b = controller.submit(symbol("BBB"));
        while controller.settle().await.is_some() {}

        assert!(matches!(controller.state(), FetchState::Success(_, id) if *id == b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_failure_wins_over_stale_success() {
        let backend = ScriptedBackend::default()
            .answer("AAA", 50, Ok(analysis("A")))
            .answer("BBB", 10, Err(FetchError::Network("connection reset".to_string())));
        let mut controller = FetchController::new(backend);

        controller.submit(symbol("AAA"));
        let b = controller.submit(symbol("BBB"));
        while controller.settle().await.is_some() {}

        assert!(matches!(controller.state(), FetchState::Error(_, id) if *id == b));
        assert_eq!(controller.state().error().map(FetchError::kind), Some(ErrorKind::Network));
        assert!(controller.state().analysis().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_keeps_status() {
        let backend = ScriptedBackend::default().answer("NVDA", 5, Err(FetchError::Http(500)));
        let mut controller = FetchController::new(backend);

        let id = controller.submit(symbol("NVDA"));
        controller.wait().await;

        assert_eq!(controller.state(), &FetchState::Error(FetchError::Http(500), id));
        assert_eq!(controller.state().error().map(FetchError::kind), Some(ErrorKind::Http(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_replaced_by_next_submission() {
        let backend = ScriptedBackend::default()
            .answer("AAA", 5, Ok(analysis("A")))
            .answer("BBB", 5, Ok(analysis("B")));
        let mut controller = FetchController::new(backend);

        controller.submit(symbol("AAA"));
        controller.wait().await;
        let first = controller.state().clone();

        let b = controller.submit(symbol("BBB"));
        assert_eq!(controller.state(), &FetchState::Loading(b));
        controller.wait().await;

        assert_eq!(company_name(&first), Some("A"));
        assert_eq!(company_name(controller.state()), Some("B"));
    }

    #[tokio::test]
    async fn test_resolve_ignores_unknown_request() {
        let mut controller = FetchController::new(ScriptedBackend::default());

        let settlement = controller.resolve(Resolution {
            request_id: RequestId::new(7),
            symbol: symbol("NVDA"),
            outcome: Ok(analysis("Ghost")),
        });

        assert_eq!(settlement, Settlement::Discarded(RequestId::new(7)));
        assert_eq!(controller.state(), &FetchState::Idle);
    }

    #[tokio::test]
    async fn test_panicking_backend_ends_in_network_error() {
        let mut controller = FetchController::new(ScriptedBackend::default());

        let id = controller.submit(symbol("BOOM"));
        let state = controller.wait().await;

        assert!(matches!(state, FetchState::Error(FetchError::Network(_), got) if *got == id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_task_dying_fails_without_waiting_for_older_request() {
        let backend = ScriptedBackend::default().answer("AAA", 30_000, Ok(analysis("Slow A")));
        let mut controller = FetchController::new(backend);
        let started = tokio::time::Instant::now();

        let a = controller.submit(symbol("AAA"));
        let b = controller.submit(symbol("BOOM"));

        assert_eq!(controller.settle().await, Some(Settlement::Applied(b)));
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(matches!(
            controller.state(),
            FetchState::Error(FetchError::Network(_), id) if *id == b
        ));
        assert_eq!(controller.in_flight(), 1);

        assert_eq!(controller.settle().await, Some(Settlement::Discarded(a)));
        assert!(matches!(controller.state(), FetchState::Error(_, id) if *id == b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_task_dying_is_discarded() {
        let backend = ScriptedBackend::default().answer("BBB", 50, Ok(analysis("B")));
        let mut controller = FetchController::new(backend);

        let a = controller.submit(symbol("BOOM"));
        let b = controller.submit(symbol("BBB"));

        assert_eq!(controller.settle().await, Some(Settlement::Discarded(a)));
        assert_eq!(controller.state(), &FetchState::Loading(b));

        controller.wait().await;
        assert_eq!(company_name(controller.state()), Some("B"));
    }
}
