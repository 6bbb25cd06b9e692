use std::env::VarError;
use std::ffi::OsString;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Parser;

use crate::args::{DEFAULT_ROS_ARGS, ROS_ARGS_FLAG};
use crate::msg::ColorRgba;
use crate::qos::{DurabilityPolicy, Qos, QosProfile, ReliabilityPolicy};

pub const DEFAULT_NODE_NAME: &str = "NODE_NAME12";
pub const DEFAULT_NAMESPACE: &str = "/";
pub const DEFAULT_TOPIC: &str = "/rossina/rusina";
pub const DEFAULT_DELAY_MS: u64 = 2000;

#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
/// Buoy: subscribe to a ColorRGBA topic, wait for discovery, take one message and print it.
pub struct Cli {
    /// Node name [env: BUOY_NODE_NAME] [default: NODE_NAME12]
    #[arg(long)]
    pub node_name: Option<String>,

    /// Node namespace [env: BUOY_NAMESPACE] [default: /]
    #[arg(long)]
    pub namespace: Option<String>,

    /// Topic to subscribe to [env: BUOY_TOPIC] [default: /rossina/rusina]
    #[arg(long)]
    pub topic: Option<String>,

    /// Time given to discovery before the take [env: BUOY_DELAY_MS] [default: 2000]
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// QoS preset: sensor or system_default [env: BUOY_QOS]
    #[arg(long)]
    pub qos: Option<Qos>,

    /// Reliability override, rmw name or number
    #[arg(long)]
    pub reliability: Option<ReliabilityPolicy>,

    /// Durability override, rmw name or number
    #[arg(long)]
    pub durability: Option<DurabilityPolicy>,

    /// History depth override, 0 keeps all samples
    #[arg(long)]
    pub depth: Option<usize>,

    /// Everything from `--ros-args` on, split off before clap sees the command line.
    #[arg(skip)]
    pub ros_args: Vec<String>,
}

/// Splits the command line at the first `--ros-args`. The ROS part is converted
/// lossily, the rest goes to clap as is.
fn split_ros_args<I, T>(args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let ros_args = match args.iter().position(|arg| arg == ROS_ARGS_FLAG) {
        Some(start) => args
            .split_off(start)
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
        None => Vec::new(),
    };
    (args, ros_args)
}

impl Cli {
    /// Parses the process arguments, forwarding `--ros-args ...` to the middleware
    /// untouched. Exits with clap's message on a malformed command line.
    pub fn parse_with_ros_args() -> Self {
        Self::try_parse_from_with_ros_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_from_with_ros_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (args, ros_args) = split_ros_args(args);
        let mut cli = Self::try_parse_from(args)?;
        cli.ros_args = ros_args;
        Ok(cli)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
/// Buoy publisher: write one ColorRGBA sample for the probe to take.
pub struct PubCli {
    #[command(flatten)]
    pub probe: Cli,

    /// Sample to publish as `r,g,b,a`
    #[arg(long, default_value = "1,0,0,1")]
    pub color: ColorRgba,
}

impl PubCli {
    pub fn parse_with_ros_args() -> Self {
        Self::try_parse_from_with_ros_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_from_with_ros_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (args, ros_args) = split_ros_args(args);
        let mut cli = Self::try_parse_from(args)?;
        cli.probe.ros_args = ros_args;
        Ok(cli)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub node_name: String,
    pub namespace: String,
    pub topic: String,
    pub delay: Duration,
    pub qos: QosProfile,
    pub ros_args: Vec<String>,
    pub domain_id: Option<u16>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_owned(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            topic: DEFAULT_TOPIC.to_owned(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            qos: QosProfile::default(),
            ros_args: DEFAULT_ROS_ARGS.iter().map(|s| s.to_string()).collect(),
            domain_id: None,
        }
    }
}

fn env_or_default<F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match lookup(key) {
        Ok(value) => Ok(value),
        Err(e) => match e {
            VarError::NotPresent => Ok(default.to_owned()),
            VarError::NotUnicode(_os_string) => Err(anyhow!(
                "Could not fetch env variable {key} because it is not unicode"
            )),
        },
    }
}

impl ProbeConfig {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        Self::resolve(cli, |key| std::env::var(key))
    }

    /// Flags win over the environment, the environment wins over defaults.
    pub fn resolve<F>(cli: Cli, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let node_name = match cli.node_name {
            Some(name) => name,
            None => env_or_default(&lookup, "BUOY_NODE_NAME", DEFAULT_NODE_NAME)?,
        };
        let namespace = match cli.namespace {
            Some(ns) => ns,
            None => env_or_default(&lookup, "BUOY_NAMESPACE", DEFAULT_NAMESPACE)?,
        };
        let topic = match cli.topic {
            Some(topic) => topic,
            None => env_or_default(&lookup, "BUOY_TOPIC", DEFAULT_TOPIC)?,
        };
        let delay_ms = match cli.delay_ms {
            Some(ms) => ms,
            None => env_or_default(&lookup, "BUOY_DELAY_MS", &DEFAULT_DELAY_MS.to_string())?
                .parse()
                .context("BUOY_DELAY_MS must be a number of milliseconds")?,
        };
        let preset = match cli.qos {
            Some(qos) => qos,
            None => env_or_default(&lookup, "BUOY_QOS", "system_default")?.parse()?,
        };
        let domain_id = match env_or_default(&lookup, "ROS_DOMAIN_ID", "")? {
            id if id.is_empty() => None,
            id => Some(
                id.parse()
                    .with_context(|| format!("Invalid ROS_DOMAIN_ID '{id}'"))?,
            ),
        };
        let ros_args = if cli.ros_args.is_empty() {
            DEFAULT_ROS_ARGS.iter().map(|s| s.to_string()).collect()
        } else {
            cli.ros_args
        };

        Ok(Self {
            node_name,
            namespace,
            topic,
            delay: Duration::from_millis(delay_ms),
            qos: QosProfile::from(preset).with_overrides(cli.reliability, cli.durability, cli.depth),
            ros_args,
            domain_id,
        })
    }
}
