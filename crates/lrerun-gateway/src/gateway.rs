//! `RemoteJobGateway`: the authenticated RPC surface of the remote service.
//! Mockable so the run workflow can be tested without a server.

use std::future::Future;

use lrerun_core::RunStatusSnapshot;

use crate::error::GatewayError;
use crate::models::{
    Credentials, RunLaunch, TestInstance, TestInstanceCreateRequest, TestSet,
    TestSetCreateRequest, TestSetFolder, TestSetFolderCreateRequest, TimeslotRequest,
};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Job lifecycle operations consumed by the run workflow.
pub trait RemoteJobGateway: Send + Sync {
    fn login(&self, credentials: &Credentials) -> impl Future<Output = GatewayResult<bool>> + Send;

    fn logout(&self) -> impl Future<Output = GatewayResult<()>> + Send;

    fn fetch_test_instances(
        &self,
        test_id: u64,
    ) -> impl Future<Output = GatewayResult<Vec<TestInstance>>> + Send;

    fn create_test_set(
        &self,
        req: &TestSetCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestSet>> + Send;

    fn create_test_set_folder(
        &self,
        req: &TestSetFolderCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestSetFolder>> + Send;

    fn fetch_all_test_sets(&self) -> impl Future<Output = GatewayResult<Vec<TestSet>>> + Send;

    fn fetch_all_test_set_folders(
        &self,
    ) -> impl Future<Output = GatewayResult<Vec<TestSetFolder>>> + Send;

    fn create_test_instance(
        &self,
        req: &TestInstanceCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestInstance>> + Send;

    /// Empty result means the timeslot is available.
    fn calculate_timeslot_availability(
        &self,
        test_id: u64,
        req: &TimeslotRequest,
    ) -> impl Future<Output = GatewayResult<Vec<String>>> + Send;

    fn start_run(
        &self,
        test_id: u64,
        req: &TimeslotRequest,
    ) -> impl Future<Output = GatewayResult<RunLaunch>> + Send;

    fn fetch_run_status(
        &self,
        run_id: u64,
    ) -> impl Future<Output = GatewayResult<RunStatusSnapshot>> + Send;

    fn abort_run(&self, run_id: u64) -> impl Future<Output = GatewayResult<()>> + Send;
}

impl<T: RemoteJobGateway + ?Sized> RemoteJobGateway for &T {
    fn login(&self, credentials: &Credentials) -> impl Future<Output = GatewayResult<bool>> + Send {
        (**self).login(credentials)
    }

    fn logout(&self) -> impl Future<Output = GatewayResult<()>> + Send {
        (**self).logout()
    }

    fn fetch_test_instances(
        &self,
        test_id: u64,
    ) -> impl Future<Output = GatewayResult<Vec<TestInstance>>> + Send {
        (**self).fetch_test_instances(test_id)
    }

    fn create_test_set(
        &self,
        req: &TestSetCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestSet>> + Send {
        (**self).create_test_set(req)
    }

    fn create_test_set_folder(
        &self,
        req: &TestSetFolderCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestSetFolder>> + Send {
        (**self).create_test_set_folder(req)
    }

    fn fetch_all_test_sets(&self) -> impl Future<Output = GatewayResult<Vec<TestSet>>> + Send {
        (**self).fetch_all_test_sets()
    }

    fn fetch_all_test_set_folders(
        &self,
    ) -> impl Future<Output = GatewayResult<Vec<TestSetFolder>>> + Send {
        (**self).fetch_all_test_set_folders()
    }

    fn create_test_instance(
        &self,
        req: &TestInstanceCreateRequest,
    ) -> impl Future<Output = GatewayResult<TestInstance>> + Send {
        (**self).create_test_instance(req)
    }

    fn calculate_timeslot_availability(
        &self,
        test_id: u64,
        req: &TimeslotRequest,
    ) -> impl Future<Output = GatewayResult<Vec<String>>> + Send {
        (**self).calculate_timeslot_availability(test_id, req)
    }

    fn start_run(
        &self,
        test_id: u64,
        req: &TimeslotRequest,
    ) -> impl Future<Output = GatewayResult<RunLaunch>> + Send {
        (**self).start_run(test_id, req)
    }

    fn fetch_run_status(
        &self,
        run_id: u64,
    ) -> impl Future<Output = GatewayResult<RunStatusSnapshot>> + Send {
        (**self).fetch_run_status(run_id)
    }

    fn abort_run(&self, run_id: u64) -> impl Future<Output = GatewayResult<()>> + Send {
        (**self).abort_run(run_id)
    }
}
