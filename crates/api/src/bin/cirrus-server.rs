use std::sync::Arc;

use anyhow::Context;
use cirrus_api::{SELF_TEST_OK, ServerConfig, self_test, serve, shutdown_signal};
use cirrus_loader::ActionLoader;
use cirrus_runtime::ActionRuntime;
use clap::Parser;
use tokio::net::TcpListener;

fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    let _log = cirrus_log::auto_init()?;

    if config.self_test {
        self_test().context("self-test failed")?;
        println!("{SELF_TEST_OK}");
        return Ok(());
    }

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(threads) = config.worker_threads {
        runtime.worker_threads(threads.get());
    }
    runtime
        .build()
        .context("cannot start the async runtime")?
        .block_on(run(config))
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let policy = Arc::new(config.policy());
    tracing::info!(granted = policy.granted().len(), "invocation policy");

    let mut runtime = ActionRuntime::new(ActionLoader::new(policy));
    if let Some(dir) = &config.spill_dir {
        runtime = runtime.with_spill_dir(dir);
    }

    let listener = TcpListener::bind(config.address())
        .await
        .with_context(|| format!("cannot bind {}", config.address()))?;
    serve(listener, Arc::new(runtime), shutdown_signal())
        .await
        .context("server failed")
}
