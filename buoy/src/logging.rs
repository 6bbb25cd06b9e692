use log::LevelFilter;

use crate::args::RosArgs;
use crate::error::{ProbeError, ProbeResult};

/// Environment variable that overrides any `--log-level` given as ROS argument.
pub const LOG_ENV: &str = "BUOY_LOG";

/// `env_logger` filter derived from the ROS arguments. Dotted ROS logger names
/// map onto module paths.
pub fn filter_from_args(args: &RosArgs) -> String {
    let default = args
        .log_level
        .and_then(|l| l.as_filter())
        .unwrap_or(LevelFilter::Info);

    let mut filter = default.to_string().to_lowercase();
    for (logger, level) in &args.logger_levels {
        if let Some(level) = level.as_filter() {
            filter.push_str(&format!(
                ",{}={}",
                logger.replace('.', "::"),
                level.to_string().to_lowercase()
            ));
        }
    }
    filter
}

pub fn configure(args: &RosArgs) -> ProbeResult<()> {
    let filter = filter_from_args(args);
    let env = env_logger::Env::new().filter_or(LOG_ENV, filter);
    env_logger::Builder::from_env(env)
        .try_init()
        .map_err(ProbeError::backend)
}

pub fn fini() -> ProbeResult<()> {
    log::logger().flush();
    Ok(())
}
