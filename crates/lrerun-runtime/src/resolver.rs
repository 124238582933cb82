//! Test instance resolution: reuse the newest instance of a test, or bind the
//! test to the default test set (creating set and folder on demand).

use lrerun_gateway::{
    DEFAULT_TEST_SET_FOLDER_NAME, GatewayError, RemoteJobGateway, TestInstanceCreateRequest,
    TestSetCreateRequest, TestSetFolderCreateRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not resolve test instance for test {test_id}: {step} failed: {source}")]
    Remote {
        test_id: u64,
        step: &'static str,
        #[source]
        source: GatewayError,
    },
}

fn remote(test_id: u64, step: &'static str) -> impl FnOnce(GatewayError) -> ResolveError {
    move |source| ResolveError::Remote {
        test_id,
        step,
        source,
    }
}

pub struct TestInstanceResolver<G> {
    gateway: G,
}

impl<G: RemoteJobGateway> TestInstanceResolver<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Returns the test instance id to run `test_id` with.
    pub async fn resolve(&self, test_id: u64) -> Result<u64, ResolveError> {
        tracing::info!(test_id, "fetching test instances");
        let instances = self
            .gateway
            .fetch_test_instances(test_id)
            .await
            .map_err(remote(test_id, "fetch test instances"))?;
        tracing::debug!(test_id, count = instances.len(), "retrieved test instances");

        if let Some(latest) = instances.iter().max_by_key(|i| i.test_instance_id) {
            tracing::info!(
                test_id,
                test_instance_id = latest.test_instance_id,
                "using existing test instance"
            );
            return Ok(latest.test_instance_id);
        }

        tracing::info!(test_id, "no test instance found, creating one");
        let test_set_id = self
            .find_or_create_test_set()
            .await
            .map_err(remote(test_id, "resolve test set"))?;
        let instance = self
            .gateway
            .create_test_instance(&TestInstanceCreateRequest {
                test_id,
                test_set_id,
            })
            .await
            .map_err(remote(test_id, "create test instance"))?;
        tracing::info!(
            test_id,
            test_set_id,
            test_instance_id = instance.test_instance_id,
            "test instance created"
        );
        Ok(instance.test_instance_id)
    }

    async fn find_or_create_test_set(&self) -> Result<u64, GatewayError> {
        let test_sets = self.gateway.fetch_all_test_sets().await?;
        if let Some(latest) = test_sets.iter().max_by_key(|s| s.test_set_id) {
            tracing::info!(
                count = test_sets.len(),
                test_set = %latest.name,
                test_set_id = latest.test_set_id,
                "using existing test set"
            );
            return Ok(latest.test_set_id);
        }

        let folder_id = self.find_or_create_default_folder().await?;
        let created = self
            .gateway
            .create_test_set(&TestSetCreateRequest::default_in(folder_id))
            .await?;
        tracing::info!(
            test_set = %created.name,
            test_set_id = created.test_set_id,
            folder_id,
            "default test set created"
        );
        Ok(created.test_set_id)
    }

    async fn find_or_create_default_folder(&self) -> Result<u64, GatewayError> {
        let folders = self.gateway.fetch_all_test_set_folders().await?;
        if let Some(existing) = folders
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(DEFAULT_TEST_SET_FOLDER_NAME))
        {
            tracing::debug!(folder_id = existing.test_set_folder_id, "default folder exists");
            return Ok(existing.test_set_folder_id);
        }

        tracing::info!(folder = DEFAULT_TEST_SET_FOLDER_NAME, "creating default test set folder");
        let folder = self
            .gateway
            .create_test_set_folder(&TestSetFolderCreateRequest::default())
            .await?;
        Ok(folder.test_set_folder_id)
    }
}
