//! Timeslot negotiation: validate the requested reservation length locally,
//! then ask the remote service whether it can be booked.

use lrerun_core::{InvalidDuration, PostRunAction, TimeslotDuration};
use lrerun_gateway::{GatewayError, RemoteJobGateway, TimeslotRequest};

#[derive(Debug, thiserror::Error)]
pub enum TimeslotError {
    #[error("invalid timeslot duration: {0}")]
    InvalidDuration(#[from] InvalidDuration),

    #[error("timeslot unavailable: {}", .0.join(" | "))]
    Unavailable(Vec<String>),

    #[error("timeslot availability check failed: {0}")]
    Remote(#[source] GatewayError),
}

/// Resources and post-processing the reservation is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceProfile {
    pub use_vuds: bool,
    pub vuds_amount: u32,
    pub post_run_action: PostRunAction,
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self {
            use_vuds: false,
            vuds_amount: 0,
            post_run_action: PostRunAction::default(),
        }
    }
}

impl ResourceProfile {
    /// The reservation payload shared by the availability check and start-run.
    pub fn reservation(
        &self,
        duration: TimeslotDuration,
        test_instance_id: u64,
    ) -> TimeslotRequest {
        TimeslotRequest::new(
            duration,
            self.use_vuds,
            self.vuds_amount,
            self.post_run_action,
            test_instance_id,
        )
    }
}

pub struct TimeslotNegotiator<G> {
    gateway: G,
}

impl<G: RemoteJobGateway> TimeslotNegotiator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Succeeds with the validated duration when the remote reports no
    /// conflicts. Conflicts are returned verbatim; nothing is rescheduled.
    pub async fn check_availability(
        &self,
        test_id: u64,
        test_instance_id: u64,
        requested_minutes: u32,
        profile: &ResourceProfile,
    ) -> Result<TimeslotDuration, TimeslotError> {
        let duration = TimeslotDuration::from_minutes(requested_minutes)?;
        let request = profile.reservation(duration, test_instance_id);

        tracing::info!(
            test_id,
            test_instance_id,
            duration = %duration,
            post_run_action = %profile.post_run_action,
            "checking timeslot availability"
        );
        let conflicts = self
            .gateway
            .calculate_timeslot_availability(test_id, &request)
            .await
            .map_err(TimeslotError::Remote)?;

        if !conflicts.is_empty() {
            for conflict in &conflicts {
                tracing::error!(test_id, conflict = %conflict, "timeslot conflict");
            }
            return Err(TimeslotError::Unavailable(conflicts));
        }
        tracing::info!(test_id, duration = %duration, "timeslot available");
        Ok(duration)
    }
}
