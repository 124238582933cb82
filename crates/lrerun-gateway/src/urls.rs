//! Endpoint layout of the remote REST API.

const TEST_INSTANCES: &str = "testinstances";
const TEST_SETS: &str = "testsets";
const TEST_SET_FOLDERS: &str = "testfolders";
const RUNS: &str = "Runs";

/// Builds every URL the gateway calls from the server root, domain and project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    server: String,
    base: String,
    resources: String,
    web: String,
    domain: String,
    project: String,
}

impl UrlBuilder {
    pub fn new(server_url: &str, domain: &str, project: &str) -> Self {
        let server = server_url.trim_end_matches('/').to_string();
        let base = format!("{server}/loadTest/rest");
        let resources = format!("{base}/domains/{domain}/projects/{project}");
        let web = format!("{server}/loadTest/rest-pcweb");
        Self {
            server,
            base,
            resources,
            web,
            domain: domain.to_string(),
            project: project.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn basic_auth(&self) -> String {
        format!("{}/authentication-point/authenticate", self.base)
    }

    pub fn token_auth(&self) -> String {
        format!("{}/authentication-point/authenticateclient", self.base)
    }

    pub fn logout(&self) -> String {
        format!("{}/authentication-point/logout", self.base)
    }

    pub fn web_login(&self) -> String {
        format!("{}/login/LoginToProject", self.web)
    }

    pub fn test_instances(&self) -> String {
        format!("{}/{TEST_INSTANCES}", self.resources)
    }

    /// Query value selecting the instances of one test.
    pub fn test_instance_query(test_id: u64) -> String {
        format!("{{test-id[\"{test_id}\"]}}")
    }

    pub fn test_sets(&self) -> String {
        format!("{}/{TEST_SETS}", self.resources)
    }

    pub fn test_set_folders(&self) -> String {
        format!("{}/{TEST_SET_FOLDERS}", self.resources)
    }

    pub fn timeslot_check(&self) -> String {
        format!("{}/designLoadTest/CalculateAvailability", self.web)
    }

    pub fn start_run(&self) -> String {
        format!("{}/designLoadTest/StartRun", self.web)
    }

    pub fn run_status(&self, run_id: u64) -> String {
        format!("{}/{RUNS}/{run_id}/Extended", self.resources)
    }

    pub fn abort_run(&self, run_id: u64) -> String {
        format!("{}/{RUNS}/{run_id}/abort", self.resources)
    }

    pub fn dashboard(&self, run_id: u64) -> String {
        format!("{}/Loadtest/pcx-tab/run/{run_id}/dashboard", self.server)
    }
}
