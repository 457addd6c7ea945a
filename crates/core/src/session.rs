use crate::report::AnalysisReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    Idle,
    Ready { report: AnalysisReport },
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Holds the displayed result; the most recently started request wins.
///
/// A request started later supersedes every earlier one, so a slow response
/// that resolves after a newer request was issued is dropped, never shown.
#[derive(Debug)]
pub struct ResultSlot {
    issued: AtomicU64,
    state: Mutex<(u64, SlotState)>,
}

impl Default for ResultSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSlot {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            state: Mutex::new((0, SlotState::Idle)),
        }
    }

    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Stores the outcome if `ticket` is still the latest; returns whether it was applied.
    pub async fn complete(&self, ticket: RequestTicket, outcome: SlotState) -> bool {
        let mut guard = self.state.lock().await;
        if !self.is_latest(ticket) {
            tracing::debug!(
                seq = ticket.0,
                latest = self.issued.load(Ordering::SeqCst),
                "dropping superseded analysis result"
            );
            return false;
        }
        *guard = (ticket.0, outcome);
        true
    }

    pub async fn current(&self) -> SlotState {
        self.state.lock().await.1.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::RawPredictionResponse;
    use serde_json::json;

    fn ready(rec: &str) -> SlotState {
        SlotState::Ready {
            report: AnalysisReport::from_raw(&RawPredictionResponse::new(
                json!({"final_recommendation": rec}),
            )),
        }
    }

    #[tokio::test]
    async fn starts_idle() {
        let slot = ResultSlot::new();
        assert_eq!(slot.current().await, SlotState::Idle);
    }

    #[tokio::test]
    async fn latest_request_is_applied() {
        let slot = ResultSlot::new();
        let t = slot.begin();
        assert!(slot.complete(t, ready("WAIT")).await);
        assert!(matches!(slot.current().await, SlotState::Ready { .. }));
    }

    #[tokio::test]
    async fn superseded_response_is_dropped() {
        let slot = ResultSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(second > first);

        assert!(slot.complete(second, ready("BUY NOW")).await);
        assert!(!slot.complete(first, ready("WAIT")).await);

        match slot.current().await {
            SlotState::Ready { report } => assert_eq!(report.view.recommendation.as_str(), "BUY_NOW"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_failure_does_not_replace_newer_request() {
        let slot = ResultSlot::new();
        let first = slot.begin();
        let _second = slot.begin();
        assert!(!slot
            .complete(first, SlotState::Failed { error: "timeout".to_string() })
            .await);
        assert_eq!(slot.current().await, SlotState::Idle);
    }
}
