//! Drives sync cycles: inbound (external → store), then outbound
//! (store → external), one record at a time.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use workbridge_core::{to_external, to_internal};
use workbridge_storage::{ClientError, Session, StoreClient, StoreConnector, UpsertOutcome};

use crate::external::ExternalStore;
use crate::report::CycleReport;

pub struct Orchestrator<C, E> {
    client: StoreClient<C>,
    external: E,
}

impl<C: StoreConnector, E: ExternalStore> Orchestrator<C, E> {
    pub fn new(client: StoreClient<C>, external: E) -> Self {
        Orchestrator { client, external }
    }

    pub fn client(&self) -> &StoreClient<C> {
        &self.client
    }

    pub fn external(&self) -> &E {
        &self.external
    }

    /// Run one full cycle.
    ///
    /// Only a failed connection is an error. Everything that goes wrong with
    /// a single record is logged, counted in the report and left for the
    /// next cycle. The store handle is closed before returning.
    pub async fn run_cycle(&self) -> Result<CycleReport, ClientError> {
        info!("starting sync cycle");
        let session = self.client.connect().await?;

        let mut report = CycleReport::default();
        self.inbound(&session, &mut report).await;
        self.outbound(&session, &mut report).await;
        session.close().await;

        info!(
            inbound_seen = report.inbound_seen,
            rejected = report.rejected,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            inbound_failed = report.inbound_failed,
            outbound_seen = report.outbound_seen,
            written = report.written,
            write_failed = report.write_failed,
            marked_synced = report.marked_synced,
            mark_failed = report.mark_failed,
            "sync cycle complete"
        );
        Ok(report)
    }

    async fn inbound(&self, session: &Session<'_, C>, report: &mut CycleReport) {
        info!("starting inbound processing");
        let batch = match self.external.list_inbound().await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "could not list inbound work orders");
                return;
            }
        };
        report.inbound_seen = batch.entries.len();
        report.rejected = batch.rejected;
        info!(count = batch.entries.len(), "found inbound work orders");

        for entry in &batch.entries {
            let order = to_internal(&entry.order);
            match session.upsert(&order).await {
                Ok(outcome) => {
                    match outcome {
                        UpsertOutcome::Inserted(_) => report.inserted += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                        UpsertOutcome::Unchanged => report.unchanged += 1,
                    }
                    if let Err(e) = self.external.acknowledge(entry).await {
                        error!(order_no = order.number, error = %e, "could not apply inbound policy");
                    }
                }
                Err(e) => {
                    report.inbound_failed += 1;
                    error!(order_no = order.number, error = %e, "failed to save inbound work order");
                }
            }
        }
        info!("inbound processing complete");
    }

    async fn outbound(&self, session: &Session<'_, C>, report: &mut CycleReport) {
        info!("starting outbound processing");
        let pending = session.fetch_unsynchronized().await;
        report.outbound_seen = pending.len();
        info!(count = pending.len(), "found outbound work orders");

        for doc in &pending {
            let order = to_external(&doc.order);
            match self.external.write_outbound(&order).await {
                Ok(_) => {
                    report.written += 1;
                    if session.mark_synced(&doc.id).await {
                        report.marked_synced += 1;
                    } else {
                        report.mark_failed += 1;
                    }
                }
                Err(e) => {
                    // Left unsynced; the next cycle picks it up again.
                    report.write_failed += 1;
                    error!(order_no = doc.order.number, error = %e, "failed to write outbound work order");
                }
            }
        }
        info!("outbound processing complete");
    }

    /// Run cycles back to back, `interval` apart, until `cancel` fires.
    ///
    /// Cancellation is observed between cycles and during the wait, never
    /// in the middle of a cycle. A cycle that cannot connect is logged and
    /// the loop carries on. Returns the number of cycles started.
    pub async fn run_continuously(&self, interval: Duration, cancel: CancellationToken) -> u64 {
        info!(interval_secs = interval.as_secs(), "starting continuous sync");
        let mut cycles = 0;
        while !cancel.is_cancelled() {
            cycles += 1;
            if let Err(e) = self.run_cycle().await {
                error!(cycle = cycles, error = %e, "sync cycle failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!(cycles, "sync service shutting down");
        cycles
    }
}
