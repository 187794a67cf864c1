use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stackrun::errors::{Result, StackError};
use stackrun::exec::{ModuleInvocation, ModuleRunner, RunOutput};
use tokio_util::sync::CancellationToken;

/// Something the fake runner observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct FakeState {
    failing: HashSet<String>,
    unrunnable: HashSet<String>,
    stderr: HashMap<String, String>,
    delay: Option<Duration>,
    /// Trigger module (any module when `None`) and the token it cancels.
    cancel_on: Option<(Option<String>, CancellationToken)>,
    events: Mutex<Vec<RunEvent>>,
    invocations: Mutex<Vec<ModuleInvocation>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

/// A fake runner that:
/// - records every invocation and start/finish events
/// - tracks the highest number of modules running at once
/// - fails the modules it was told to fail, succeeds the rest.
///
/// Clones share state, so keep one clone for assertions and hand another to
/// the engine.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<FakeState>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(mut self, f: impl FnOnce(&mut FakeState)) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("configure FakeRunner before cloning it");
        f(state);
        self
    }

    /// Module exits non-zero.
    pub fn failing(self, id: &str) -> Self {
        self.configure(|s| {
            s.failing.insert(id.to_string());
        })
    }

    /// Module cannot be started at all (runner returns `Err`).
    pub fn unrunnable(self, id: &str) -> Self {
        self.configure(|s| {
            s.unrunnable.insert(id.to_string());
        })
    }

    pub fn with_stderr(self, id: &str, stderr: &str) -> Self {
        self.configure(|s| {
            s.stderr.insert(id.to_string(), stderr.to_string());
        })
    }

    /// Every module takes this long.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.delay = Some(delay))
    }

    /// Cancel `token` as soon as module `id` starts.
    pub fn cancel_when_started(self, id: &str, token: CancellationToken) -> Self {
        self.configure(|s| s.cancel_on = Some((Some(id.to_string()), token)))
    }

    /// Cancel `token` as soon as any module starts.
    pub fn cancel_on_first_start(self, token: CancellationToken) -> Self {
        self.configure(|s| s.cancel_on = Some((None, token)))
    }

    pub fn shared(&self) -> Arc<dyn ModuleRunner> {
        Arc::new(self.clone())
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.state.events.lock().unwrap().clone()
    }

    /// Module ids in the order they were started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Started(id) => Some(id),
                RunEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn invocations(&self) -> Vec<ModuleInvocation> {
        self.state.invocations.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.state.max_running.load(Ordering::SeqCst)
    }
}

impl ModuleRunner for FakeRunner {
    fn run_module(
        &self,
        invocation: ModuleInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>> {
        Box::pin(async move {
            let state = &self.state;
            let id = invocation.module_id.clone();

            state.invocations.lock().unwrap().push(invocation);
            state.events.lock().unwrap().push(RunEvent::Started(id.clone()));

            let now = state.running.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_running.fetch_max(now, Ordering::SeqCst);

            if let Some((trigger, token)) = &state.cancel_on {
                if trigger.as_ref().is_none_or(|t| *t == id) {
                    token.cancel();
                }
            }

            match state.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            state.running.fetch_sub(1, Ordering::SeqCst);
            state.events.lock().unwrap().push(RunEvent::Finished(id.clone()));

            if state.unrunnable.contains(&id) {
                return Err(StackError::Other(anyhow::anyhow!("no such tool for module '{id}'")));
            }

            let stderr = state.stderr.get(&id).cloned().unwrap_or_default();
            if state.failing.contains(&id) {
                Ok(RunOutput::failure(1, stderr))
            } else {
                Ok(RunOutput {
                    success: true,
                    exit_code: Some(0),
                    stderr,
                })
            }
        })
    }
}
