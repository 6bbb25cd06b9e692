use std::time::Duration;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use log::{debug, warn};
use r2r::qos::{DurabilityPolicy as R2RDurability, HistoryPolicy as R2RHistory, ReliabilityPolicy as R2RReliability};
use r2r::std_msgs::msg::ColorRGBA;

use crate::args::{ROS_ARGS_FLAG, RosArgs};
use crate::error::{ProbeError, ProbeResult, RetCode};
use crate::middleware::{Middleware, Publish};
use crate::msg::{ColorRgba, MessageInfo};
use crate::qos::{DurabilityPolicy, HistoryPolicy, QosProfile, ReliabilityPolicy};

impl From<QosProfile> for r2r::QosProfile {
    fn from(value: QosProfile) -> Self {
        let reliability = match value.reliability {
            ReliabilityPolicy::SystemDefault => R2RReliability::SystemDefault,
            ReliabilityPolicy::Reliable => R2RReliability::Reliable,
            ReliabilityPolicy::BestEffort => R2RReliability::BestEffort,
            #[cfg(not(feature = "humble"))]
            ReliabilityPolicy::BestAvailable => R2RReliability::BestAvailable,
            #[cfg(feature = "humble")]
            ReliabilityPolicy::BestAvailable => R2RReliability::SystemDefault,
        };
        let durability = match value.durability {
            DurabilityPolicy::SystemDefault => R2RDurability::SystemDefault,
            DurabilityPolicy::TransientLocal => R2RDurability::TransientLocal,
            DurabilityPolicy::Volatile => R2RDurability::Volatile,
            #[cfg(not(feature = "humble"))]
            DurabilityPolicy::BestAvailable => R2RDurability::BestAvailable,
            #[cfg(feature = "humble")]
            DurabilityPolicy::BestAvailable => R2RDurability::SystemDefault,
        };
        let history = match value.history {
            HistoryPolicy::KeepLast => R2RHistory::KeepLast,
            HistoryPolicy::KeepAll => R2RHistory::KeepAll,
        };

        let mut profile = r2r::QosProfile::default();
        profile.history = history;
        profile.depth = value.depth;
        profile.reliability = reliability;
        profile.durability = durability;
        profile
    }
}

impl From<ColorRGBA> for ColorRgba {
    fn from(value: ColorRGBA) -> Self {
        Self {
            r: value.r,
            g: value.g,
            b: value.b,
            a: value.a,
        }
    }
}

impl From<ColorRgba> for ColorRGBA {
    fn from(value: ColorRgba) -> Self {
        Self {
            r: value.r,
            g: value.g,
            b: value.b,
            a: value.a,
        }
    }
}

/// ROS2 through the official rcl C API (`r2r`). Needs a sourced ROS2 installation.
///
/// `r2r::Context::create` hands rcl the process command line, there is no way to
/// pass other arguments. Without `--ros-args` on the command line the default
/// `--ros-args --log-level DEBUG` only reaches the `env_logger` side.
///
/// rcl applies `-r` rules itself, so nodes and topics are created with their
/// configured names. Remapping them beforehand would apply a rule chain such as
/// `/a:=/b` `/b:=/c` twice.
#[derive(Debug, Default)]
pub struct Rcl;

impl Middleware for Rcl {
    type Context = r2r::Context;
    type Node = r2r::Node;
    type Subscription = BoxStream<'static, ColorRGBA>;

    fn name(&self) -> &'static str {
        "ros2-c"
    }

    fn applies_remaps(&self) -> bool {
        true
    }

    fn init(&mut self, args: &RosArgs) -> ProbeResult<r2r::Context> {
        let on_command_line = std::env::args_os().any(|arg| arg == ROS_ARGS_FLAG);
        if !on_command_line && !args.ros.is_empty() {
            warn!(
                "rcl only sees the process command line, '{}' is not passed on",
                args.argv().join(" ")
            );
        }
        r2r::Context::create().map_err(ProbeError::backend)
    }

    fn create_node(
        &mut self,
        context: &mut r2r::Context,
        name: &str,
        namespace: &str,
    ) -> ProbeResult<r2r::Node> {
        r2r::Node::create(context.clone(), name, namespace).map_err(ProbeError::backend)
    }

    fn subscribe(
        &mut self,
        node: &mut r2r::Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<BoxStream<'static, ColorRGBA>> {
        let stream = node
            .subscribe::<ColorRGBA>(topic, (*qos).into())
            .map_err(ProbeError::backend)?;
        Ok(stream.boxed())
    }

    fn take(
        &mut self,
        node: &mut r2r::Node,
        subscription: &mut BoxStream<'static, ColorRGBA>,
    ) -> ProbeResult<Option<(ColorRgba, MessageInfo)>> {
        // r2r moves waiting messages into the stream while spinning
        node.spin_once(Duration::ZERO);
        match subscription.next().now_or_never() {
            Some(Some(msg)) => Ok(Some((msg.into(), MessageInfo::received_now(None)))),
            Some(None) => Err(ProbeError::new(
                RetCode::SubscriptionInvalid,
                "subscription stream closed",
            )),
            None => Ok(None),
        }
    }

    fn fini_subscription(
        &mut self,
        subscription: BoxStream<'static, ColorRGBA>,
        node: &mut r2r::Node,
    ) -> ProbeResult<()> {
        drop(subscription);
        // the node releases closed subscribers on its next spin
        node.spin_once(Duration::ZERO);
        debug!("subscription released");
        Ok(())
    }

    fn fini_node(&mut self, node: r2r::Node) -> ProbeResult<()> {
        drop(node);
        debug!("node released");
        Ok(())
    }

    fn shutdown(&mut self, context: r2r::Context) -> ProbeResult<()> {
        drop(context);
        debug!("context released");
        Ok(())
    }
}

impl Publish for Rcl {
    type Publisher = r2r::Publisher<ColorRGBA>;

    fn advertise(
        &mut self,
        node: &mut r2r::Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<r2r::Publisher<ColorRGBA>> {
        node.create_publisher::<ColorRGBA>(topic, (*qos).into())
            .map_err(ProbeError::backend)
    }

    fn publish(
        &mut self,
        publisher: &mut r2r::Publisher<ColorRGBA>,
        message: &ColorRgba,
    ) -> ProbeResult<()> {
        publisher
            .publish(&ColorRGBA::from(*message))
            .map_err(ProbeError::backend)
    }

    fn fini_publisher(
        &mut self,
        publisher: r2r::Publisher<ColorRGBA>,
        node: &mut r2r::Node,
    ) -> ProbeResult<()> {
        drop(publisher);
        node.spin_once(Duration::ZERO);
        debug!("publisher released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::qos::Qos;

    #[test]
    fn test_qos_conversion() {
        let profile: r2r::QosProfile = QosProfile::from(Qos::Sensor).into();
        assert_eq!(profile.depth, 5);
        assert!(matches!(profile.reliability, R2RReliability::BestEffort));
        assert!(matches!(profile.durability, R2RDurability::Volatile));
        assert!(matches!(profile.history, R2RHistory::KeepLast));
    }

    #[test]
    fn test_rcl_remaps_by_itself() {
        assert!(Rcl.applies_remaps());
        assert_eq!(Rcl.name(), "ros2-c");
    }

    #[test]
    fn test_color_into_rcl() {
        let msg = ColorRGBA::from(ColorRgba {
            r: 0.1,
            g: 0.2,
            b: 0.3,
            a: 0.4,
        });
        assert_eq!((msg.r, msg.g, msg.b, msg.a), (0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_color_conversion() {
        let msg = ColorRGBA {
            r: 0.25,
            g: 0.5,
            b: 0.75,
            a: 1.0,
        };
        assert_eq!(
            ColorRgba::from(msg),
            ColorRgba {
                r: 0.25,
                g: 0.5,
                b: 0.75,
                a: 1.0
            }
        );
    }
}
