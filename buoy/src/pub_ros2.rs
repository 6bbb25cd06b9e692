use buoy::backend::native::Native;
use buoy::{ProbeConfig, PubCli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = PubCli::parse_with_ros_args();
    let config = ProbeConfig::from_cli(cli.probe)?;
    let mut middleware = Native::new(config.domain_id);

    let report = buoy::publish(&mut middleware, &config, cli.color).await;
    println!("{report}");

    Ok(())
}
