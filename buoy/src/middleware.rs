//! =======================================================================
//! # Middleware seam
//!
//! One method per lifecycle call the probe makes. Backends wrap a ROS2 client
//! library, tests wrap a recorder. [`Publish`] adds the writing side used by
//! the `buoy-pub` binaries.
//!
//! # Notes
//! * Handles are owned values. Releasing one consumes it, so a handle can not
//!   be finalized twice.
//! * Logging configure/fini default to the process-wide `env_logger`.
//! =======================================================================

use crate::args::RosArgs;
use crate::error::ProbeResult;
use crate::logging;
use crate::msg::{ColorRgba, MessageInfo};
use crate::qos::QosProfile;

pub trait Middleware {
    type Context;
    type Node;
    type Subscription;

    /// Short name of the backend for log lines.
    fn name(&self) -> &'static str;

    /// True if the client library applies `-r` rules itself. Such a backend is
    /// handed node and topic names before remapping.
    fn applies_remaps(&self) -> bool {
        false
    }

    fn configure_logging(&mut self, args: &RosArgs) -> ProbeResult<()> {
        logging::configure(args)
    }

    /// Initializes the middleware. `args` are the already parsed ROS arguments.
    fn init(&mut self, args: &RosArgs) -> ProbeResult<Self::Context>;

    /// Creates a node. Name and namespace are validated by the caller.
    fn create_node(
        &mut self,
        context: &mut Self::Context,
        name: &str,
        namespace: &str,
    ) -> ProbeResult<Self::Node>;

    /// Subscribes to `std_msgs/msg/ColorRGBA` on the fully qualified `topic`.
    fn subscribe(
        &mut self,
        node: &mut Self::Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<Self::Subscription>;

    /// Non-blocking. `Ok(None)` means no message was waiting.
    fn take(
        &mut self,
        node: &mut Self::Node,
        subscription: &mut Self::Subscription,
    ) -> ProbeResult<Option<(ColorRgba, MessageInfo)>>;

    fn fini_subscription(
        &mut self,
        subscription: Self::Subscription,
        node: &mut Self::Node,
    ) -> ProbeResult<()>;

    fn fini_node(&mut self, node: Self::Node) -> ProbeResult<()>;

    fn shutdown(&mut self, context: Self::Context) -> ProbeResult<()>;

    fn fini_logging(&mut self) -> ProbeResult<()> {
        logging::fini()
    }
}

/// Writing `std_msgs/msg/ColorRGBA` samples.
pub trait Publish: Middleware {
    type Publisher;

    fn advertise(
        &mut self,
        node: &mut Self::Node,
        topic: &str,
        qos: &QosProfile,
    ) -> ProbeResult<Self::Publisher>;

    fn publish(&mut self, publisher: &mut Self::Publisher, message: &ColorRgba) -> ProbeResult<()>;

    fn fini_publisher(
        &mut self,
        publisher: Self::Publisher,
        node: &mut Self::Node,
    ) -> ProbeResult<()>;
}
