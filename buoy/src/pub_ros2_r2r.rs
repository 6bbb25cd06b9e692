use buoy::backend::rcl::Rcl;
use buoy::{ProbeConfig, PubCli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = PubCli::parse_with_ros_args();
    let config = ProbeConfig::from_cli(cli.probe)?;

    let report = buoy::publish(&mut Rcl, &config, cli.color).await;
    println!("{report}");

    Ok(())
}
