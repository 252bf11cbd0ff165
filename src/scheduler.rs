//! The polling loop: resolve, reconcile, sleep, repeat.

use crate::config::Config;
use crate::detector::IpResolver;
use crate::error::Result;
use crate::providers::GlesysProvider;
use crate::reconciler::{Reconciler, RunReport};
use crate::records::DesiredState;
use std::future::Future;
use std::time::Duration;

/// What to do when the address cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailurePolicy {
    /// Log and try again at the next tick.
    Continue,
    /// Stop the loop and return the error.
    Exit,
}

/// Drives runs at a fixed interval.
pub struct Scheduler {
    resolver: IpResolver,
    reconciler: Reconciler,
    desired: DesiredState,
    interval: Duration,
    on_resolution_failure: ResolutionFailurePolicy,
}

impl Scheduler {
    pub fn new(
        resolver: IpResolver,
        reconciler: Reconciler,
        desired: DesiredState,
        interval: Duration,
        on_resolution_failure: ResolutionFailurePolicy,
    ) -> Self {
        Self {
            resolver,
            reconciler,
            desired,
            interval,
            on_resolution_failure,
        }
    }

    /// Build the scheduler for a validated configuration, talking to GleSYS.
    pub fn from_config(config: &Config) -> Result<Self> {
        let desired = DesiredState::parse(&config.domains)?;
        let resolver = IpResolver::new(config.ip_mode())?;
        let provider = GlesysProvider::new(config.username.clone(), config.api_key.clone())?;
        let reconciler = Reconciler::with_budget(
            Box::new(provider),
            config.ttl_override(),
            config.request_budget(),
        );

        let policy = if config.exit_on_ip_failure {
            ResolutionFailurePolicy::Exit
        } else {
            ResolutionFailurePolicy::Continue
        };

        Ok(Self::new(
            resolver,
            reconciler,
            desired,
            config.interval(),
            policy,
        ))
    }

    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    /// One iteration. Fails only when the address cannot be resolved.
    pub async fn run_once(&self) -> Result<RunReport> {
        tracing::debug!("Starting run @ {}", now());

        let ip = self.resolver.resolve().await?;
        tracing::debug!("Using IP: {}", ip);

        let report = self.reconciler.reconcile(ip, &self.desired).await;

        tracing::debug!("Finishing run @ {}", now());
        Ok(report)
    }

    /// Run until Ctrl-C, or until resolution fails under
    /// [`ResolutionFailurePolicy::Exit`].
    pub async fn run(&self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes. Shutdown is honoured both while a run
    /// is in flight and while waiting for the next tick.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                outcome = self.run_once() => {
                    if let Err(e) = outcome {
                        match self.on_resolution_failure {
                            ResolutionFailurePolicy::Exit => {
                                tracing::error!("Failed to get relevant IP, stopping. Reason: {}", e);
                                return Err(e);
                            }
                            ResolutionFailurePolicy::Continue => {
                                tracing::error!("Failed to get relevant IP, skipping run. Reason: {}", e);
                            }
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, shutting down");
                    return Ok(());
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, shutting down");
                    return Ok(());
                }
            }
        }
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
