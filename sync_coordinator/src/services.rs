use crate::errors::Result;
use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::watch;

/// A generic interface for a background kind of service: something with internal state that
/// runs a loop until told to shut down.
#[async_trait]
pub trait Service {
    type Options;

    async fn run(&mut self) -> Result<()>;

    async fn shutdown(self) -> Result<()>;
}

#[derive(Debug)]
pub struct ServiceHandle {
    /// Identifies the service this handle belongs to, for logging.
    pub label: &'static str,
    shutdown: watch::Sender<bool>,
    join: tokio::task::JoinHandle<Result<()>>,
}

impl ServiceHandle {
    pub async fn shutdown(self) -> Result<()> {
        if self.shutdown.send(true).is_err() {
            log::warn!(
                "The {} service referenced by this handle was already dropped.",
                self.label
            );
            Ok(())
        } else {
            self.join.await.context(crate::errors::ServiceSnafu {
                label: self.label.to_owned(),
            })?
        }
    }
}

pub async fn start_service<Fut, F, S>(constructor: F, options: S::Options) -> Result<ServiceHandle>
where
    Fut: Future<Output = Result<S>> + Send,
    F: FnOnce(S::Options) -> Fut,
    S: Service + Send + 'static,
{
    let service_name = std::any::type_name::<S>();
    let mut service = constructor(options).await?;
    let (tx, mut rx) = watch::channel(false);
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = rx.changed() => {
                    drop(service);
                    break;
                }
                res = service.run() => {
                    if let Err(e) = res {
                        log::error!("Error during service '{service_name}' execution: {e}");
                    }
                }
            }
        }
        Ok(())
    });
    Ok(ServiceHandle {
        label: service_name,
        shutdown: tx,
        join,
    })
}
