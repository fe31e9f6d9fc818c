use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use rag_deployer::{configuration::get_configuration, startup::Application};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let tracing_subscriber =
        get_tracing_subscriber("rag_deployer".into(), "info".into(), std::io::stdout);
    init_tracing_subscriber(tracing_subscriber);

    // Panics if the configuration can't be read
    let configuration = get_configuration().expect("Failed to read configuration.");

    let application = match Application::build(configuration).await {
        Ok(application) => application,
        Err(error) => panic!("Failed to build application: {:?}", error),
    };

    match application.run().await {
        Ok(report) => info!(?report, "Deployment report"),
        Err(error) => {
            error!(?error, "Deployment failed");
            std::process::exit(1);
        }
    }

    Ok(())
}
