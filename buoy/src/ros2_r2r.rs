use buoy::backend::rcl::Rcl;
use buoy::{Cli, ProbeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = ProbeConfig::from_cli(Cli::parse_with_ros_args())?;

    let report = buoy::run(&mut Rcl, &config).await;
    println!("{report}");

    Ok(())
}
