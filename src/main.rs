use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    moxa_wifi_analyzer::run().await
}
