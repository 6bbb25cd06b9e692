use std::fmt;

use log::{debug, error, info};

use crate::args::RosArgs;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult, RetCode};
use crate::middleware::{Middleware, Publish};
use crate::msg::{ColorRgba, MessageInfo};
use crate::names;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ParseArguments,
    LoggingConfigure,
    Init,
    NodeInit,
    SubscriptionInit,
    PublisherInit,
    Take,
    Publish,
    SubscriptionFini,
    PublisherFini,
    NodeFini,
    Shutdown,
    LoggingFini,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ParseArguments => "parse_arguments",
            Step::LoggingConfigure => "logging_configure",
            Step::Init => "init",
            Step::NodeInit => "node_init",
            Step::SubscriptionInit => "subscription_init",
            Step::PublisherInit => "publisher_init",
            Step::Take => "take",
            Step::Publish => "publish",
            Step::SubscriptionFini => "subscription_fini",
            Step::PublisherFini => "publisher_fini",
            Step::NodeFini => "node_fini",
            Step::Shutdown => "shutdown",
            Step::LoggingFini => "logging_fini",
        };
        f.write_str(name)
    }
}

/// Everything one probe run observed.
#[derive(Debug, Clone)]
pub struct Report {
    pub steps: Vec<(Step, ProbeResult<()>)>,
    pub node_name: String,
    pub namespace: String,
    /// Fully qualified topic after remapping, `None` if it could not be resolved.
    pub topic: Option<String>,
    /// The receive buffer. Zeroed unless a take succeeded. A publishing run
    /// holds the sample it wrote.
    pub message: ColorRgba,
    pub info: Option<MessageInfo>,
}

impl Report {
    fn new(config: &ProbeConfig) -> Self {
        Self {
            steps: Vec::new(),
            node_name: config.node_name.clone(),
            namespace: config.namespace.clone(),
            topic: None,
            message: ColorRgba::default(),
            info: None,
        }
    }

    pub fn outcome(&self, step: Step) -> Option<&ProbeResult<()>> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, r)| r)
    }

    pub fn failures(&self) -> impl Iterator<Item = (Step, &ProbeError)> {
        self.steps
            .iter()
            .filter_map(|(step, r)| r.as_ref().err().map(|e| (*step, e)))
    }

    /// Logs and records the outcome of `step`, handing back the value on success.
    fn check<T>(&mut self, step: Step, result: ProbeResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                debug!("{step} ok");
                self.steps.push((step, Ok(())));
                Some(value)
            }
            Err(e) => {
                error!("{step} error {e}");
                self.steps.push((step, Err(e)));
                None
            }
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(info) = &self.info {
            write!(f, "\n{info}")?;
        }
        Ok(())
    }
}

fn missing(code: RetCode, what: &str) -> ProbeError {
    ProbeError::new(code, format!("{what} is not initialized"))
}

fn validate_node(name: &str, namespace: &str) -> ProbeResult<()> {
    names::validate_node_name(name)
        .map_err(|e| e.into_error(RetCode::NodeInvalidName, "node name", name))?;
    names::validate_namespace(namespace)
        .map_err(|e| e.into_error(RetCode::NodeInvalidNamespace, "namespace", namespace))
}

/// Context and node plus the arguments they were created from.
struct Session<M: Middleware> {
    args: RosArgs,
    context: Option<M::Context>,
    node: Option<M::Node>,
}

impl<M: Middleware> Session<M> {
    /// Parses the ROS arguments, configures logging, then creates context and node.
    fn open(middleware: &mut M, config: &ProbeConfig, report: &mut Report) -> Self {
        let args = report
            .check(Step::ParseArguments, RosArgs::parse(&config.ros_args))
            .unwrap_or_default();

        if report
            .check(Step::LoggingConfigure, middleware.configure_logging(&args))
            .is_some()
        {
            // failures from before the logger existed went nowhere
            for (step, e) in report.failures() {
                error!("{step} error {e}");
            }
        }
        debug!("argc {} argv {}", args.argv().len(), args.argv().join(" "));

        let mut context = report.check(Step::Init, middleware.init(&args));

        report.node_name = args.remapped_node_name(&config.node_name).to_owned();
        report.namespace = args
            .remapped_namespace(&config.node_name, &config.namespace)
            .to_owned();

        let (name, namespace) = if middleware.applies_remaps() {
            (config.node_name.as_str(), config.namespace.as_str())
        } else {
            (report.node_name.as_str(), report.namespace.as_str())
        };
        let result = match context.as_mut() {
            Some(context) => validate_node(name, namespace)
                .and_then(|_| middleware.create_node(context, name, namespace)),
            None => Err(missing(RetCode::NotInit, "context")),
        };
        let node = report.check(Step::NodeInit, result);

        Self {
            args,
            context,
            node,
        }
    }

    /// Resolves the topic and hands it to `create` together with the node.
    fn attach<T>(
        &mut self,
        middleware: &mut M,
        config: &ProbeConfig,
        report: &mut Report,
        step: Step,
        create: impl FnOnce(&mut M, &mut M::Node, &str) -> ProbeResult<T>,
    ) -> Option<T> {
        let result = match self.node.as_mut() {
            Some(node) => resolve_topic(
                &*middleware,
                &self.args,
                &config.topic,
                &report.node_name,
                &report.namespace,
            )
            .and_then(|(resolved, given)| {
                report.topic = Some(resolved);
                create(middleware, node, &given)
            }),
            None => Err(missing(RetCode::NodeInvalid, "node")),
        };
        report.check(step, result)
    }

    /// Releases node and context if they exist, then finalizes logging.
    fn close(self, middleware: &mut M, report: &mut Report) {
        if let Some(node) = self.node {
            report.check(Step::NodeFini, middleware.fini_node(node));
        }
        if let Some(context) = self.context {
            report.check(Step::Shutdown, middleware.shutdown(context));
        }
        report.check(Step::LoggingFini, middleware.fini_logging());
    }
}

/// Expands `topic` and applies the remap rules. Returns the resolved name and
/// the name the backend is given, which is not remapped if the backend does that
/// on its own.
fn resolve_topic<M: Middleware>(
    middleware: &M,
    args: &RosArgs,
    topic: &str,
    node_name: &str,
    namespace: &str,
) -> ProbeResult<(String, String)> {
    let expanded = names::expand_topic_name(topic, node_name, namespace)?;
    let resolved = args
        .remapped_topic(&expanded, node_name, namespace)?
        .unwrap_or_else(|| expanded.clone());
    let given = if middleware.applies_remaps() {
        expanded
    } else {
        resolved.clone()
    };
    Ok((resolved, given))
}

/// Runs the probe once against `middleware`.
///
/// Every step is attempted. A failed step is logged and recorded, later steps
/// that need its handle fail with the matching precondition code, and
/// teardown releases exactly the handles that were acquired, in reverse order.
pub async fn run<M: Middleware>(middleware: &mut M, config: &ProbeConfig) -> Report {
    let mut report = Report::new(config);
    let mut session = Session::open(middleware, config, &mut report);
    info!(
        "Probing {} on {} with the {} backend",
        config.topic,
        report.node_name,
        middleware.name()
    );

    let mut subscription = session.attach(
        middleware,
        config,
        &mut report,
        Step::SubscriptionInit,
        |middleware, node, topic| middleware.subscribe(node, topic, &config.qos),
    );

    debug!("Waiting {:?} for discovery", config.delay);
    tokio::time::sleep(config.delay).await;

    let result = match (session.node.as_mut(), subscription.as_mut()) {
        (Some(node), Some(subscription)) => middleware.take(node, subscription),
        _ => Err(missing(RetCode::SubscriptionInvalid, "subscription")),
    }
    .and_then(|taken| {
        taken.ok_or_else(|| {
            ProbeError::new(
                RetCode::SubscriptionTakeFailed,
                "no message available on the subscription",
            )
        })
    });
    if let Some((message, info)) = report.check(Step::Take, result) {
        report.message = message;
        report.info = Some(info);
    }

    if let Some(subscription) = subscription {
        let result = match session.node.as_mut() {
            Some(node) => middleware.fini_subscription(subscription, node),
            None => Err(missing(RetCode::NodeInvalid, "node")),
        };
        report.check(Step::SubscriptionFini, result);
    }
    session.close(middleware, &mut report);

    report
}

/// Writes `message` once on the configured topic.
///
/// The publisher waits `config.delay` for discovery before the write and stays
/// up for another `config.delay` after it. Failures are handled as in [`run`].
pub async fn publish<M: Publish>(
    middleware: &mut M,
    config: &ProbeConfig,
    message: ColorRgba,
) -> Report {
    let mut report = Report::new(config);
    let mut session = Session::open(middleware, config, &mut report);
    info!(
        "Publishing on {} from {} with the {} backend",
        config.topic,
        report.node_name,
        middleware.name()
    );

    let mut publisher = session.attach(
        middleware,
        config,
        &mut report,
        Step::PublisherInit,
        |middleware, node, topic| middleware.advertise(node, topic, &config.qos),
    );

    debug!("Waiting {:?} for discovery", config.delay);
    tokio::time::sleep(config.delay).await;

    let result = match publisher.as_mut() {
        Some(publisher) => middleware.publish(publisher, &message),
        None => Err(missing(RetCode::PublisherInvalid, "publisher")),
    };
    if report.check(Step::Publish, result).is_some() {
        report.message = message;
        tokio::time::sleep(config.delay).await;
    }

    if let Some(publisher) = publisher {
        let result = match session.node.as_mut() {
            Some(node) => middleware.fini_publisher(publisher, node),
            None => Err(missing(RetCode::NodeInvalid, "node")),
        };
        report.check(Step::PublisherFini, result);
    }
    session.close(middleware, &mut report);

    report
}
