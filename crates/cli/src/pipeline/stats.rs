//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::LifecycleState;
use dispatcher::DeliverySnapshot;
use ingestion::StreamMetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Stream-side counters
    pub stream: StreamMetricsSnapshot,

    /// Delivery-side counters
    pub deliveries: DeliverySnapshot,

    /// Records submitted by the run loop
    pub submitted_running: u64,

    /// Records submitted while draining the relay
    pub submitted_draining: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// State the pipeline ended in
    pub final_state: LifecycleState,
}

impl PipelineStats {
    /// Delivered records per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.deliveries.delivered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed deliveries as percentage of resolved ones
    pub fn failure_rate(&self) -> f64 {
        let resolved = self.deliveries.delivered + self.deliveries.failed;
        if resolved > 0 {
            (self.deliveries.failed as f64 / resolved as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Stream Bridge Statistics ===\n");

        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Final state: {}", self.final_state);
        println!("   Throughput: {:.2} msg/s", self.throughput());

        println!("\nStream");
        println!("   Received: {}", self.stream.messages_received);
        println!("   Relayed: {}", self.stream.messages_relayed);
        if self.stream.read_errors > 0 {
            println!("   Read errors: {}", self.stream.read_errors);
        }

        println!("\nDeliveries");
        println!(
            "   Submitted: {} ({} running, {} draining)",
            self.deliveries.submitted, self.submitted_running, self.submitted_draining
        );
        println!("   Delivered: {}", self.deliveries.delivered);
        println!(
            "   Failed: {} ({:.2}%)",
            self.deliveries.failed,
            self.failure_rate()
        );
        if self.deliveries.abandoned > 0 {
            println!("   Abandoned at drain timeout: {}", self.deliveries.abandoned);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = PipelineStats {
            stream: StreamMetricsSnapshot::default(),
            deliveries: DeliverySnapshot {
                submitted: 10,
                delivered: 8,
                failed: 2,
                abandoned: 0,
                in_flight: 0,
            },
            submitted_running: 7,
            submitted_draining: 3,
            duration: Duration::from_secs(2),
            final_state: LifecycleState::Stopped,
        };
        assert!((stats.throughput() - 4.0).abs() < 1e-9);
        assert!((stats.failure_rate() - 20.0).abs() < 1e-9);
    }
}
