//! lrerun-gateway: IO boundary to the remote test-execution service.
//! Defines the mockable `RemoteJobGateway` trait, the wire models and a thin
//! REST adapter. No workflow logic lives here.

pub mod error;
pub mod gateway;
pub mod models;
pub mod rest;
pub mod urls;

pub use error::GatewayError;
pub use gateway::{GatewayResult, RemoteJobGateway};
pub use models::{
    Credentials, DEFAULT_TEST_SET_FOLDER_NAME, DEFAULT_TEST_SET_NAME, RunLaunch, TestInstance,
    TestInstanceCreateRequest, TestSet, TestSetCreateRequest, TestSetFolder,
    TestSetFolderCreateRequest, TimeslotRequest,
};
pub use rest::{DEFAULT_REQUEST_TIMEOUT, RestConfig, RestGateway};
pub use urls::UrlBuilder;
