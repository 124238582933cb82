//! Scripted in-memory `RemoteJobGateway` for workflow tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use lrerun_core::{RunState, RunStatusSnapshot};
use lrerun_gateway::{
    Credentials, GatewayError, GatewayResult, RemoteJobGateway, RunLaunch, TestInstance,
    TestInstanceCreateRequest, TestSet, TestSetCreateRequest, TestSetFolder,
    TestSetFolderCreateRequest, TimeslotRequest,
};

pub(crate) const RUN_ID: u64 = 501;

/// One scripted answer to `fetch_run_status`.
#[derive(Debug, Clone)]
pub(crate) enum Poll {
    State(RunState),
    Counters(RunState, u64, u64),
    Fail,
    /// Never completes.
    Hang,
}

#[derive(Debug, Default)]
pub(crate) struct Script {
    pub login_rejected: bool,
    pub login_error: bool,
    pub logout_error: bool,
    pub instances: Vec<TestInstance>,
    pub test_sets: Vec<TestSet>,
    pub folders: Vec<TestSetFolder>,
    pub fail_fetch_instances: bool,
    pub conflicts: Vec<String>,
    pub fail_start: bool,
    pub fail_abort: bool,
    /// Consumed in order; the last entry repeats once the queue is drained.
    pub polls: VecDeque<Poll>,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<String>,
    last_poll: Option<Poll>,
    created_folders: Vec<TestSetFolderCreateRequest>,
    created_sets: Vec<TestSetCreateRequest>,
    created_instances: Vec<TestInstanceCreateRequest>,
    timeslot_requests: Vec<TimeslotRequest>,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedGateway {
    script: Mutex<Script>,
    recorded: Mutex<Recorded>,
}

fn remote_error(operation: &'static str) -> GatewayError {
    GatewayError::Status {
        operation,
        status: 500,
        body: format!("{operation} exploded"),
    }
}

impl ScriptedGateway {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn with_polls(polls: impl IntoIterator<Item = Poll>) -> Self {
        Self::new(Script {
            polls: polls.into_iter().collect(),
            ..Script::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.recorded.lock().unwrap().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn created_folders(&self) -> Vec<TestSetFolderCreateRequest> {
        self.recorded.lock().unwrap().created_folders.clone()
    }

    pub fn created_sets(&self) -> Vec<TestSetCreateRequest> {
        self.recorded.lock().unwrap().created_sets.clone()
    }

    pub fn created_instances(&self) -> Vec<TestInstanceCreateRequest> {
        self.recorded.lock().unwrap().created_instances.clone()
    }

    pub fn timeslot_requests(&self) -> Vec<TimeslotRequest> {
        self.recorded.lock().unwrap().timeslot_requests.clone()
    }

    fn record(&self, call: &str) {
        self.recorded.lock().unwrap().calls.push(call.to_string());
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    fn next_poll(&self) -> Poll {
        let next = self.with_script(|s| s.polls.pop_front());
        let mut recorded = self.recorded.lock().unwrap();
        match next {
            Some(poll) => {
                recorded.last_poll = Some(poll.clone());
                poll
            }
            None => recorded.last_poll.clone().unwrap_or(Poll::Fail),
        }
    }
}

impl RemoteJobGateway for ScriptedGateway {
    async fn login(&self, _credentials: &Credentials) -> GatewayResult<bool> {
        self.record("login");
        let (rejected, error) = self.with_script(|s| (s.login_rejected, s.login_error));
        if error {
            return Err(remote_error("authenticate"));
        }
        Ok(!rejected)
    }

    async fn logout(&self) -> GatewayResult<()> {
        self.record("logout");
        if self.with_script(|s| s.logout_error) {
            return Err(remote_error("logout"));
        }
        Ok(())
    }

    async fn fetch_test_instances(&self, _test_id: u64) -> GatewayResult<Vec<TestInstance>> {
        self.record("fetch_test_instances");
        let (fail, instances) = self.with_script(|s| (s.fail_fetch_instances, s.instances.clone()));
        if fail {
            return Err(remote_error("fetch test instances"));
        }
        Ok(instances)
    }

    async fn create_test_set(&self, req: &TestSetCreateRequest) -> GatewayResult<TestSet> {
        self.record("create_test_set");
        self.recorded.lock().unwrap().created_sets.push(req.clone());
        Ok(TestSet {
            name: req.name.clone(),
            comment: Some(req.comment.clone()),
            parent_id: req.parent_id,
            test_set_id: 900,
        })
    }

    async fn create_test_set_folder(
        &self,
        req: &TestSetFolderCreateRequest,
    ) -> GatewayResult<TestSetFolder> {
        self.record("create_test_set_folder");
        self.recorded.lock().unwrap().created_folders.push(req.clone());
        Ok(TestSetFolder {
            name: req.name.clone(),
            parent_id: req.parent_id,
            test_set_folder_id: 800,
        })
    }

    async fn fetch_all_test_sets(&self) -> GatewayResult<Vec<TestSet>> {
        self.record("fetch_all_test_sets");
        Ok(self.with_script(|s| s.test_sets.clone()))
    }

    async fn fetch_all_test_set_folders(&self) -> GatewayResult<Vec<TestSetFolder>> {
        self.record("fetch_all_test_set_folders");
        Ok(self.with_script(|s| s.folders.clone()))
    }

    async fn create_test_instance(
        &self,
        req: &TestInstanceCreateRequest,
    ) -> GatewayResult<TestInstance> {
        self.record("create_test_instance");
        self.recorded.lock().unwrap().created_instances.push(req.clone());
        Ok(TestInstance {
            test_id: req.test_id,
            test_set_id: req.test_set_id,
            test_instance_id: 700,
        })
    }

    async fn calculate_timeslot_availability(
        &self,
        _test_id: u64,
        req: &TimeslotRequest,
    ) -> GatewayResult<Vec<String>> {
        self.record("calculate_timeslot_availability");
        self.recorded.lock().unwrap().timeslot_requests.push(req.clone());
        Ok(self.with_script(|s| s.conflicts.clone()))
    }

    async fn start_run(&self, _test_id: u64, _req: &TimeslotRequest) -> GatewayResult<RunLaunch> {
        self.record("start_run");
        if self.with_script(|s| s.fail_start) {
            return Err(remote_error("start run"));
        }
        Ok(RunLaunch {
            run_id: RUN_ID,
            internal_run_id: 11,
            dashboard_url: format!("https://lre.test/Loadtest/pcx-tab/run/{RUN_ID}/dashboard"),
        })
    }

    async fn fetch_run_status(&self, run_id: u64) -> GatewayResult<RunStatusSnapshot> {
        self.record("fetch_run_status");
        match self.next_poll() {
            Poll::State(state) => Ok(RunStatusSnapshot::new(run_id, state)),
            Poll::Counters(state, errors, failed) => {
                Ok(RunStatusSnapshot::new(run_id, state).with_counters(errors, failed))
            }
            Poll::Fail => Err(GatewayError::transport("fetch run status", "connection reset")),
            Poll::Hang => std::future::pending().await,
        }
    }

    async fn abort_run(&self, _run_id: u64) -> GatewayResult<()> {
        self.record("abort_run");
        if self.with_script(|s| s.fail_abort) {
            return Err(remote_error("abort run"));
        }
        Ok(())
    }
}

pub(crate) fn credentials() -> Credentials {
    Credentials {
        username: "svc-perf".into(),
        password: "secret".into(),
        token_auth: false,
    }
}
