/**
 * This is the main entrypoint for the render server.
 *
 * It loads the configuration from the environment, prepares the output
 * directory, and serves the render API until it receives a shutdown signal.
 */
use render_api::{AppContext, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging and the application context
    let context: AppContext =
        rv_app::create_app_context::<AppContext, Config>().await?;

    let config = context.config();
    let addr = config.listen_addr();

    if let Some(max_age) = config.video_retention() {
        rv_render::retention::spawn_sweeper(
            context.output().path().to_path_buf(),
            max_age,
            config.retention_sweep_interval(),
        );
    }

    tracing::info!(
        "rendering with the {:?} strategy, workspaces under {}",
        context.engine().strategy(),
        context.temp_dir().display()
    );

    rv_axum::run_app(render_api::app(context), addr).await?;

    Ok(())
}
