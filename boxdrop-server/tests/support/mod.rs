use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum_test::TestServer;
use tempfile::TempDir;

use boxdrop_core::domain::receipts::{
    Destination, DispatchError, Dispatcher, ReceiptFields, ReceiptRenderer, RenderError,
};
use boxdrop_server::{
    AppState,
    infra::{app_state::Repositories, config::Config},
    routes::create_app,
};

/// Writes a small PNG instead of launching the HTML renderer.
#[derive(Debug, Default)]
pub struct FakeRenderer {
    pub fail: bool,
}

#[async_trait]
impl ReceiptRenderer for FakeRenderer {
    async fn render(&self, _fields: &ReceiptFields, target: &Path) -> Result<(), RenderError> {
        if self.fail {
            return Err(RenderError::Exited {
                code: Some(1),
                stderr: "renderer crashed".into(),
            });
        }
        image::RgbImage::new(4, 4)
            .save(target)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct FakeDispatcher {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, PathBuf, String)>>,
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn send(
        &self,
        destination: &Destination,
        file: &Path,
        caption: &str,
    ) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Exited {
                code: Some(1),
                stderr: "not logged in".into(),
            });
        }
        self.sent.lock().unwrap().push((
            destination.as_str().to_string(),
            file.to_path_buf(),
            caption.to_string(),
        ));
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub dispatcher: Arc<FakeDispatcher>,
    pub artifacts: TempDir,
}

pub fn build_test_app(renderer: FakeRenderer, dispatcher: FakeDispatcher) -> Result<TestApp> {
    let artifacts = tempfile::tempdir()?;
    let config = Config {
        artifact_dir: artifacts.path().to_path_buf(),
        ..Config::default()
    };
    let dispatcher = Arc::new(dispatcher);
    let state = AppState::new(
        Arc::new(config),
        Repositories::in_memory(),
        Arc::new(renderer),
        dispatcher.clone(),
    );

    let server = TestServer::builder()
        .build(create_app(state))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        dispatcher,
        artifacts,
    })
}
