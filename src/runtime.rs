//! Tokio driver for the interactive scheduler.
//!
//! [`TokioBackend`] runs each async call as its own task and reports the
//! result on a channel; [`Driver`] owns the [`FormScheduler`] and feeds
//! those results back into it on the current task.

#[cfg(feature = "http")]
pub mod http;

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    registry::RemoteRegistry,
    resolve::FieldAccessor,
    scheduler::{Abort, Backend, FormScheduler, Ticket, TransportError},
    value::{AsyncCall, Value},
    wire,
};

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Carries a `remote` call to its validator.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn call(&self, target: &str, args: &[Value]) -> Result<Value, TransportError>;
}

/// Calls validators from an in-process registry, through the same wire
/// encoding a network hop would use.
pub struct RegistryTransport {
    registry: Arc<RemoteRegistry>,
}

impl RegistryTransport {
    pub fn new(registry: Arc<RemoteRegistry>) -> Self {
        RegistryTransport { registry }
    }
}

#[async_trait]
impl RemoteTransport for RegistryTransport {
    async fn call(&self, target: &str, args: &[Value]) -> Result<Value, TransportError> {
        let request = wire::encode_request(args)?;
        let response = self.registry.dispatch_json(target, &request)?;
        Ok(wire::decode_response(&response)?)
    }
}

/// A finished call, on its way back to the scheduler.
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<Value, TransportError>,
}

/// Aborts the task running a call.
pub struct TaskHandle(JoinHandle<()>);

impl Abort for TaskHandle {
    fn abort(self) {
        self.0.abort();
    }
}

pub struct TokioBackend {
    transport: Arc<dyn RemoteTransport>,
    sender: UnboundedSender<Completion>,
}

impl TokioBackend {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> (Self, UnboundedReceiver<Completion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (TokioBackend { transport, sender }, receiver)
    }
}

impl Backend for TokioBackend {
    type Handle = TaskHandle;

    fn launch(&mut self, ticket: Ticket, call: &AsyncCall) -> Result<TaskHandle, TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::Runtime(e.to_string()))?;
        let sender = self.sender.clone();

        let task = match call.clone() {
            AsyncCall::Delay { millis, result } => runtime.spawn(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                let _ = sender.send(Completion {
                    ticket,
                    result: Ok(result),
                });
            }),
            AsyncCall::Remote { target, args } => {
                let transport = self.transport.clone();
                runtime.spawn(async move {
                    // A panicking transport still owes the scheduler an answer
                    let result = AssertUnwindSafe(transport.call(&target, &args))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Err(TransportError::Runtime(format!(
                                "remote call to '{}' panicked",
                                target
                            )))
                        });
                    if let Err(e) = &result {
                        warn!("Remote call to '{}' failed: {}", target, e);
                    }
                    // The driver may be gone; nobody is waiting then
                    let _ = sender.send(Completion { ticket, result });
                })
            }
        };
        Ok(TaskHandle(task))
    }
}

/// Owns a form's scheduler and pumps call results into it.
///
/// ```
/// use std::sync::Arc;
/// use validif_lang::resolve::FormFields;
/// use validif_lang::runtime::{Driver, RegistryTransport};
/// use validif_lang::{RemoteRegistry, Rule, Value};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let registry = RemoteRegistry::builder()
///     .register("/free", |args| Value::Boolean(args[0].to_text() != "taken"))
///     .build();
/// let mut driver = Driver::new(Arc::new(RegistryTransport::new(Arc::new(registry))));
///
/// let rule = Arc::new(Rule::parse("['remote',['str','/free']]").unwrap());
/// let key = driver.scheduler().attach("UserName", 0, rule);
/// let form = FormFields::new().text("UserName", "taken");
///
/// driver.scheduler().validate(&key, &form, |outcome| assert!(!outcome.unwrap()));
/// driver.run_until_idle(&form).await;
/// # });
/// ```
pub struct Driver {
    scheduler: FormScheduler<TokioBackend>,
    completions: UnboundedReceiver<Completion>,
}

impl Driver {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        let (backend, completions) = TokioBackend::new(transport);
        Driver {
            scheduler: FormScheduler::new(backend),
            completions,
        }
    }

    pub fn scheduler(&mut self) -> &mut FormScheduler<TokioBackend> {
        &mut self.scheduler
    }

    /// Deliver results until no slot is waiting on a call. Returns the
    /// number of results delivered, stale ones included.
    pub async fn run_until_idle(&mut self, form: &dyn FieldAccessor) -> usize {
        let mut delivered = 0;
        while !self.scheduler.is_idle() {
            let Some(completion) = self.completions.recv().await else {
                break;
            };
            delivered += 1;
            let progress = self
                .scheduler
                .complete(&completion.ticket, completion.result, form);
            debug!("Delivered result for {}: {:?}", completion.ticket.call, progress);
        }
        delivered
    }
}
