use buoy::backend::native::Native;
use buoy::{Cli, ProbeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = ProbeConfig::from_cli(Cli::parse_with_ros_args())?;
    let mut middleware = Native::new(config.domain_id);

    let report = buoy::run(&mut middleware, &config).await;
    println!("{report}");

    Ok(())
}
