//! ROS command line arguments.
//!
//! Everything between `--ros-args` and the next `--` belongs to the middleware, the
//! rest is handed back untouched. See
//! <http://design.ros2.org/articles/ros_command_line_arguments.html>.

use std::iter::Peekable;
use std::str::FromStr;

use log::warn;

use crate::error::{ProbeError, ProbeResult, RetCode};
use crate::names;

pub const ROS_ARGS_FLAG: &str = "--ros-args";
pub const ROS_ARGS_END: &str = "--";

/// Used when no ROS arguments were given at all.
pub const DEFAULT_ROS_ARGS: [&str; 3] = ["--ros-args", "--log-level", "DEBUG"];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogLevel {
    Unset,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl FromStr for LogLevel {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNSET" => Ok(LogLevel::Unset),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(ProbeError::new(
                RetCode::InvalidLogLevelRule,
                format!("Argument has an invalid logger level: '{s}'"),
            )),
        }
    }
}

impl LogLevel {
    /// The matching `env_logger` directive. `Unset` defers to the default.
    pub fn as_filter(self) -> Option<log::LevelFilter> {
        match self {
            LogLevel::Unset => None,
            LogLevel::Debug => Some(log::LevelFilter::Debug),
            LogLevel::Info => Some(log::LevelFilter::Info),
            LogLevel::Warn => Some(log::LevelFilter::Warn),
            // log has no fatal level
            LogLevel::Error | LogLevel::Fatal => Some(log::LevelFilter::Error),
        }
    }
}

/// A `FROM:=TO` rule, optionally prefixed with the node it applies to (`node:FROM:=TO`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    pub node: Option<String>,
    pub from: String,
    pub to: String,
}

impl FromStr for Remap {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ProbeError::new(
                RetCode::InvalidRemapRule,
                format!("Couldn't parse remap rule: '{s}'"),
            )
        };

        let (lhs, to) = s.split_once(":=").ok_or_else(invalid)?;
        // "~/foo" and "/foo" contain no node prefix; "node:foo" does.
        let (node, from) = match lhs.split_once(':') {
            Some((node, from)) if !node.is_empty() => (Some(node.to_owned()), from),
            Some(_) => return Err(invalid()),
            None => (None, lhs),
        };

        if from.is_empty() || to.is_empty() {
            return Err(invalid());
        }

        let checked = match from {
            "__node" | "__name" => names::validate_node_name(to),
            "__ns" => names::validate_namespace(to),
            special if special.starts_with("__") => return Err(invalid()),
            _ => names::validate_topic_name(from).and_then(|_| names::validate_topic_name(to)),
        };
        checked.map_err(|e| e.into_error(RetCode::InvalidRemapRule, "remap rule", s))?;

        Ok(Remap {
            node,
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }
}

impl Remap {
    fn applies_to(&self, node_name: &str) -> bool {
        self.node.as_deref().is_none_or(|n| n == node_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosArgs {
    /// Every token that belonged to a `--ros-args` section, without the markers.
    pub ros: Vec<String>,
    /// Non-ROS arguments in their original order.
    pub rest: Vec<String>,
    pub log_level: Option<LogLevel>,
    pub logger_levels: Vec<(String, LogLevel)>,
    pub remaps: Vec<Remap>,
    pub params: Vec<(String, String)>,
    pub params_files: Vec<String>,
    pub enclave: Option<String>,
    pub log_config_file: Option<String>,
    pub stdout_logs: Option<bool>,
    pub rosout_logs: Option<bool>,
    pub external_lib_logs: Option<bool>,
    pub unknown: Vec<String>,
}

impl RosArgs {
    pub fn parse<I, S>(args: I) -> ProbeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = RosArgs::default();
        let mut iter = args
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .peekable();
        let mut in_ros = false;

        while let Some(arg) = iter.next() {
            if arg == ROS_ARGS_FLAG {
                in_ros = true;
                continue;
            }
            if !in_ros {
                out.rest.push(arg);
                continue;
            }
            if arg == ROS_ARGS_END {
                in_ros = false;
                continue;
            }

            out.ros.push(arg.clone());
            match arg.as_str() {
                "--log-level" => {
                    let value = out.value_for(&arg, &mut iter)?;
                    match value.split_once(":=") {
                        Some((logger, level)) => {
                            out.logger_levels.push((logger.to_owned(), level.parse()?))
                        }
                        None => out.log_level = Some(value.parse()?),
                    }
                }
                "-r" | "--remap" => {
                    let value = out.value_for(&arg, &mut iter)?;
                    out.remaps.push(value.parse()?);
                }
                "-p" | "--param" => {
                    let value = out.value_for(&arg, &mut iter)?;
                    let param = value
                        .split_once(":=")
                        .filter(|(name, _)| !name.is_empty())
                        .ok_or_else(|| {
                            ProbeError::new(
                                RetCode::InvalidParamRule,
                                format!("Couldn't parse parameter override rule: '{value}'"),
                            )
                        })?;
                    out.params.push((param.0.to_owned(), param.1.to_owned()));
                }
                "--params-file" => {
                    let value = out.value_for(&arg, &mut iter)?;
                    out.params_files.push(value);
                }
                "-e" | "--enclave" => {
                    out.enclave = Some(out.value_for(&arg, &mut iter)?);
                }
                "--log-config-file" => {
                    out.log_config_file = Some(out.value_for(&arg, &mut iter)?);
                }
                "--enable-stdout-logs" => out.stdout_logs = Some(true),
                "--disable-stdout-logs" => out.stdout_logs = Some(false),
                "--enable-rosout-logs" => out.rosout_logs = Some(true),
                "--disable-rosout-logs" => out.rosout_logs = Some(false),
                "--enable-external-lib-logs" => out.external_lib_logs = Some(true),
                "--disable-external-lib-logs" => out.external_lib_logs = Some(false),
                _ => {
                    warn!("Ignoring unknown ROS argument '{arg}'");
                    out.unknown.push(arg);
                }
            }
        }

        Ok(out)
    }

    fn value_for<I>(&mut self, flag: &str, iter: &mut Peekable<I>) -> ProbeResult<String>
    where
        I: Iterator<Item = String>,
    {
        match iter.next_if(|next| next != ROS_ARGS_END && next != ROS_ARGS_FLAG) {
            Some(value) => {
                self.ros.push(value.clone());
                Ok(value)
            }
            None => Err(ProbeError::new(
                RetCode::InvalidRosArgs,
                format!("Argument '{flag}' expects a value"),
            )),
        }
    }

    /// The argument vector as the middleware would receive it.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(ROS_ARGS_FLAG.to_owned())
            .chain(self.ros.iter().cloned())
            .collect()
    }

    /// Node name after `__node:=` remapping.
    pub fn remapped_node_name<'a>(&'a self, node_name: &'a str) -> &'a str {
        self.remaps
            .iter()
            .find(|r| matches!(r.from.as_str(), "__node" | "__name") && r.applies_to(node_name))
            .map_or(node_name, |r| r.to.as_str())
    }

    /// Namespace after `__ns:=` remapping. `node_name` is the name before remapping.
    pub fn remapped_namespace<'a>(&'a self, node_name: &str, namespace: &'a str) -> &'a str {
        self.remaps
            .iter()
            .find(|r| r.from == "__ns" && r.applies_to(node_name))
            .map_or(namespace, |r| r.to.as_str())
    }

    /// Applies the first topic rule whose expanded `FROM` equals `expanded_topic`.
    /// Returns the expanded target, or `None` if no rule matched.
    pub fn remapped_topic(
        &self,
        expanded_topic: &str,
        node_name: &str,
        namespace: &str,
    ) -> ProbeResult<Option<String>> {
        let rules = self
            .remaps
            .iter()
            .filter(|r| !r.from.starts_with("__") && r.applies_to(node_name));
        for rule in rules {
            let from = names::expand_topic_name(&rule.from, node_name, namespace)?;
            if from == expanded_topic {
                return names::expand_topic_name(&rule.to, node_name, namespace).map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = RosArgs::parse(DEFAULT_ROS_ARGS).unwrap();
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.ros, vec!["--log-level", "DEBUG"]);
        assert!(args.rest.is_empty());
        assert_eq!(args.argv(), DEFAULT_ROS_ARGS.to_vec());
    }

    #[test]
    fn test_log_level_and_enclave() {
        let args = RosArgs::parse(
            "--ros-args --log-level DEBUG --enclave /enclave".split_whitespace(),
        )
        .unwrap();
        assert_eq!(args.ros, vec!["--log-level", "DEBUG", "--enclave", "/enclave"]);
        assert_eq!(args.enclave.as_deref(), Some("/enclave"));
    }

    #[test]
    fn test_rest_args_are_kept_in_order() {
        let args = RosArgs::parse(
            "first --ros-args -r __node:=probe -- second --ros-args --disable-rosout-logs"
                .split_whitespace(),
        )
        .unwrap();
        assert_eq!(args.rest, vec!["first", "second"]);
        assert_eq!(args.rosout_logs, Some(false));
        assert_eq!(args.remaps.len(), 1);
    }

    #[test]
    fn test_outside_ros_args_is_not_parsed() {
        let args = RosArgs::parse(["--log-level", "bogus"]).unwrap();
        assert_eq!(args.log_level, None);
        assert_eq!(args.rest, vec!["--log-level", "bogus"]);
    }

    #[test]
    fn test_logger_specific_level() {
        let args =
            RosArgs::parse(["--ros-args", "--log-level", "buoy.probe:=warn"]).unwrap();
        assert_eq!(args.log_level, None);
        assert_eq!(
            args.logger_levels,
            vec![("buoy.probe".to_owned(), LogLevel::Warn)]
        );
    }

    #[test]
    fn test_invalid_log_level() {
        let err = RosArgs::parse(["--ros-args", "--log-level", "LOUD"]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidLogLevelRule);
    }

    #[test]
    fn test_missing_value() {
        let err = RosArgs::parse(["--ros-args", "--remap"]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidRosArgs);

        let err = RosArgs::parse(["--ros-args", "--enclave", "--"]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidRosArgs);
    }

    #[test]
    fn test_invalid_remap_and_param() {
        let err = RosArgs::parse(["--ros-args", "-r", "no_separator"]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidRemapRule);

        let err = RosArgs::parse(["--ros-args", "-r", "foo:="]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidRemapRule);

        let err = RosArgs::parse(["--ros-args", "-p", ":=3"]).unwrap_err();
        assert_eq!(err.code, RetCode::InvalidParamRule);
    }

    #[test]
    fn test_params() {
        let args = RosArgs::parse([
            "--ros-args",
            "-p",
            "rate:=10",
            "--params-file",
            "params.yaml",
        ])
        .unwrap();
        assert_eq!(args.params, vec![("rate".to_owned(), "10".to_owned())]);
        assert_eq!(args.params_files, vec!["params.yaml"]);
    }

    #[test]
    fn test_unknown_ros_arg_is_kept() {
        let args = RosArgs::parse(["--ros-args", "--frobnicate"]).unwrap();
        assert_eq!(args.unknown, vec!["--frobnicate"]);
    }

    #[test]
    fn test_node_targeted_remap() {
        let remap: Remap = "other:__node:=renamed".parse().unwrap();
        assert_eq!(remap.node.as_deref(), Some("other"));
        assert_eq!(remap.from, "__node");

        let args = RosArgs {
            remaps: vec![remap],
            ..Default::default()
        };
        assert_eq!(args.remapped_node_name("NODE_NAME12"), "NODE_NAME12");
        assert_eq!(args.remapped_node_name("other"), "renamed");
    }

    #[test]
    fn test_first_matching_remap_wins() {
        let args = RosArgs::parse([
            "--ros-args",
            "-r",
            "__ns:=/first",
            "-r",
            "__ns:=/second",
        ])
        .unwrap();
        assert_eq!(args.remapped_namespace("n", "/"), "/first");
    }

    #[test]
    fn test_topic_remap() {
        let args = RosArgs::parse([
            "--ros-args",
            "-r",
            "rusina:=/other/topic",
            "-r",
            "/rossina/rusina:=/wrong",
        ])
        .unwrap();
        assert_eq!(
            args.remapped_topic("/rossina/rusina", "n", "/rossina").unwrap(),
            Some("/other/topic".to_owned())
        );
        assert_eq!(
            args.remapped_topic("/rossina/rusina", "n", "/").unwrap(),
            Some("/wrong".to_owned())
        );
        assert_eq!(args.remapped_topic("/unrelated", "n", "/").unwrap(), None);
    }

    #[test]
    fn test_remap_names_are_validated() {
        for rule in [
            "/rossina/rusina:=bad topic!",
            "bad topic!:=/rossina/rusina",
            "__ns:=relative",
            "__node:=bad-name",
            "__bogus:=x",
        ] {
            let err = RosArgs::parse(["--ros-args", "-r", rule]).unwrap_err();
            assert_eq!(err.code, RetCode::InvalidRemapRule, "{rule}");
        }

        let args = RosArgs::parse(["--ros-args", "-r", "__name:=alias"]).unwrap();
        assert_eq!(args.remapped_node_name("NODE_NAME12"), "alias");
    }

    #[test]
    fn test_remap_target_errors_are_reported() {
        let args = RosArgs::parse(["--ros-args", "-r", "/rossina/rusina:={bogus}/x"]).unwrap();
        let err = args
            .remapped_topic("/rossina/rusina", "NODE_NAME12", "/")
            .unwrap_err();
        assert_eq!(err.code, RetCode::UnknownSubstitution);
    }
}
