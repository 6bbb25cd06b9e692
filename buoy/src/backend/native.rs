use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::debug;
use ros2_client::ros2;
use ros2_client::{
    Context, ContextOptions, MessageTypeName, Name, Node, NodeName, NodeOptions, Publisher,
    Subscription,
};

use crate::args::RosArgs;
use crate::error::{ProbeError, ProbeResult};
use crate::middleware::{Middleware, Publish};
use crate::msg::{COLOR_RGBA_PACKAGE, COLOR_RGBA_TYPE, ColorRgba, MessageInfo};
use crate::names::split_path;
use crate::qos::{DurabilityPolicy, HistoryPolicy, QosProfile, ReliabilityPolicy};

fn dds_error(e: impl Debug) -> ProbeError {
    ProbeError::backend(format!("{e:?}"))
}

/// DDS time is seconds plus a 32 bit binary fraction since the unix epoch.
/// The reserved zero, invalid and infinite values map to `None`.
fn dds_time(ts: ros2::Timestamp) -> Option<DateTime<Utc>> {
    if ts == ros2::Timestamp::ZERO
        || ts == ros2::Timestamp::INVALID
        || ts == ros2::Timestamp::INFINITE
    {
        return None;
    }
    let ticks = ts.to_ticks();
    let seconds = ticks >> 32;
    let nanos = ((ticks & 0xFFFF_FFFF) * 1_000_000_000) >> 32;
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, u32::try_from(nanos).ok()?)
}

impl From<QosProfile> for ros2::QosPolicies {
    fn from(value: QosProfile) -> Self {
        let reliability = match value.reliability {
            ReliabilityPolicy::BestEffort => ros2::policy::Reliability::BestEffort,
            _ => ros2::policy::Reliability::Reliable {
                max_blocking_time: ros2::Duration::from_millis(100),
            },
        };
        let durability = match value.durability {
            DurabilityPolicy::TransientLocal => ros2::policy::Durability::TransientLocal,
            _ => ros2::policy::Durability::Volatile,
        };
        let history = match value.history {
            HistoryPolicy::KeepAll => ros2::policy::History::KeepAll,
            HistoryPolicy::KeepLast => ros2::policy::History::KeepLast {
                depth: i32::try_from(value.depth).unwrap_or(i32::MAX),
            },
        };

        ros2::QosPolicyBuilder::new()
            .durability(durability)
            .deadline(ros2::policy::Deadline(ros2::Duration::INFINITE))
            .ownership(ros2::policy::Ownership::Shared)
            .reliability(reliability)
            .history(history)
            .lifespan(ros2::policy::Lifespan {
                duration: ros2::Duration::INFINITE,
            })
            .build()
    }
}

// The field layout is the CDR layout of std_msgs/msg/ColorRGBA.
impl ros2_client::Message for ColorRgba {}

/// Pure Rust ROS2 through `ros2-client`. Needs no ROS installation.
#[derive(Debug, Default)]
pub struct Native {
    domain_id: Option<u16>,
    rosout: bool,
}

impl Native {
    pub fn new(domain_id: Option<u16>) -> Self {
        Self {
            domain_id,
            rosout: true,
        }
    }

    fn topic(
        node: &mut Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<ros2_client::rustdds::Topic> {
        let (namespace, base_name) = split_path(topic);
        node.create_topic(
            &Name::new(&namespace, &base_name).map_err(dds_error)?,
            MessageTypeName::new(COLOR_RGBA_PACKAGE, COLOR_RGBA_TYPE),
            &(*qos).into(),
        )
        .map_err(dds_error)
    }
}

impl Middleware for Native {
    type Context = Context;
    type Node = Node;
    type Subscription = Subscription<ColorRgba>;

    fn name(&self) -> &'static str {
        "ros2-native"
    }

    fn init(&mut self, args: &RosArgs) -> ProbeResult<Context> {
        self.rosout = args.rosout_logs.unwrap_or(true);
        let options = match self.domain_id {
            Some(id) => ContextOptions::new().domain_id(id),
            None => ContextOptions::new(),
        };
        let context = Context::with_options(options).map_err(dds_error)?;
        debug!("participant in domain {}", context.domain_id());
        Ok(context)
    }

    fn create_node(
        &mut self,
        context: &mut Context,
        name: &str,
        namespace: &str,
    ) -> ProbeResult<Node> {
        let node_name = NodeName::new(namespace, name).map_err(dds_error)?;
        context
            .new_node(node_name, NodeOptions::new().enable_rosout(self.rosout))
            .map_err(dds_error)
    }

    fn subscribe(
        &mut self,
        node: &mut Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<Subscription<ColorRgba>> {
        let topic = Self::topic(node, topic, qos)?;
        node.create_subscription::<ColorRgba>(&topic, None)
            .map_err(dds_error)
    }

    fn take(
        &mut self,
        _node: &mut Node,
        subscription: &mut Subscription<ColorRgba>,
    ) -> ProbeResult<Option<(ColorRgba, MessageInfo)>> {
        let taken = subscription.take().map_err(dds_error)?;
        Ok(taken.map(|(msg, info)| {
            let sequence_number = i64::from(info.sample_identity().sequence_number);
            let info = MessageInfo::received_now(Some(sequence_number))
                .with_source_timestamp(info.source_timestamp().and_then(dds_time))
                .with_received_at(dds_time(info.received_timestamp()));
            (msg, info)
        }))
    }

    fn fini_subscription(
        &mut self,
        subscription: Subscription<ColorRgba>,
        _node: &mut Node,
    ) -> ProbeResult<()> {
        drop(subscription);
        debug!("subscription reader deleted");
        Ok(())
    }

    fn fini_node(&mut self, node: Node) -> ProbeResult<()> {
        drop(node);
        debug!("node deleted");
        Ok(())
    }

    fn shutdown(&mut self, context: Context) -> ProbeResult<()> {
        drop(context);
        debug!("participant deleted");
        Ok(())
    }
}

impl Publish for Native {
    type Publisher = Publisher<ColorRgba>;

    fn advertise(
        &mut self,
        node: &mut Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<Publisher<ColorRgba>> {
        let topic = Self::topic(node, topic, qos)?;
        node.create_publisher::<ColorRgba>(&topic, None)
            .map_err(dds_error)
    }

    fn publish(
        &mut self,
        publisher: &mut Publisher<ColorRgba>,
        message: &ColorRgba,
    ) -> ProbeResult<()> {
        publisher.publish(*message).map_err(dds_error)
    }

    fn fini_publisher(
        &mut self,
        publisher: Publisher<ColorRgba>,
        _node: &mut Node,
    ) -> ProbeResult<()> {
        drop(publisher);
        debug!("publication writer deleted");
        Ok(())
    }
}
