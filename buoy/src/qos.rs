use std::str::FromStr;

use anyhow::anyhow;

/// Named QoS presets selectable from the command line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Qos {
    Sensor,
    #[default]
    SystemDefault,
}

impl FromStr for Qos {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensor" => Ok(Qos::Sensor),
            "system_default" => Ok(Qos::SystemDefault),
            _ => Err(anyhow!("Invalid QoS value '{s}', expected sensor or system_default")),
        }
    }
}

impl TryFrom<String> for Qos {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Looks a policy up by its rmw name, falling back to the numeric value.
fn parse_policy<T: Copy>(s: &str, kind: &str, table: &[(&str, i32, T)]) -> anyhow::Result<T> {
    if let Some((_, _, policy)) = table.iter().find(|(name, _, _)| *name == s) {
        return Ok(*policy);
    }
    let Ok(value) = s.parse::<i32>() else {
        return Err(anyhow!("Unknown encoding format for {kind} kind"));
    };
    table
        .iter()
        .find(|(_, v, _)| *v == value)
        .map(|(_, _, policy)| *policy)
        .ok_or_else(|| anyhow!("Unknown number for {kind} kind"))
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReliabilityPolicy {
    /// Implementation specific default
    SystemDefault = 0,
    /// Guarantee that samples are delivered, may retry multiple times.
    Reliable = 1,
    /// Attempt to deliver samples, but some may be lost if the network is not robust
    BestEffort = 2,
    /// Will match the majority of endpoints and use a reliable policy if possible
    BestAvailable = 4,
}

impl FromStr for ReliabilityPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ReliabilityPolicy::*;
        parse_policy(
            s,
            "Reliability",
            &[
                ("system_default", 0, SystemDefault),
                ("reliable", 1, Reliable),
                ("best_effort", 2, BestEffort),
                ("best_available", 4, BestAvailable),
            ],
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DurabilityPolicy {
    /// Implementation specific default
    SystemDefault = 0,
    /// The publisher keeps samples for late-joining subscriptions
    TransientLocal = 1,
    /// Samples are not persistent
    Volatile = 2,
    /// Will match the majority of endpoints and use a transient local policy if possible
    BestAvailable = 4,
}

impl FromStr for DurabilityPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DurabilityPolicy::*;
        parse_policy(
            s,
            "Durability",
            &[
                ("system_default", 0, SystemDefault),
                ("transient_local", 1, TransientLocal),
                ("volatile", 2, Volatile),
                ("best_available", 4, BestAvailable),
            ],
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HistoryPolicy {
    /// Only store up to `depth` samples, dropping the oldest
    KeepLast,
    /// Store all samples, subject to resource limits
    KeepAll,
}

/// Backend-neutral subscription QoS. Each backend converts it into its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosProfile {
    pub history: HistoryPolicy,
    pub depth: usize,
    pub reliability: ReliabilityPolicy,
    pub durability: DurabilityPolicy,
}

impl From<Qos> for QosProfile {
    fn from(value: Qos) -> Self {
        match value {
            Qos::Sensor => QosProfile {
                history: HistoryPolicy::KeepLast,
                depth: 5,
                reliability: ReliabilityPolicy::BestEffort,
                durability: DurabilityPolicy::Volatile,
            },
            Qos::SystemDefault => QosProfile {
                history: HistoryPolicy::KeepLast,
                depth: 1,
                reliability: ReliabilityPolicy::Reliable,
                durability: DurabilityPolicy::Volatile,
            },
        }
    }
}

impl Default for QosProfile {
    fn default() -> Self {
        Qos::default().into()
    }
}

impl QosProfile {
    pub fn with_overrides(
        mut self,
        reliability: Option<ReliabilityPolicy>,
        durability: Option<DurabilityPolicy>,
        depth: Option<usize>,
    ) -> Self {
        if let Some(reliability) = reliability {
            self.reliability = reliability;
        }
        if let Some(durability) = durability {
            self.durability = durability;
        }
        match depth {
            Some(0) => self.history = HistoryPolicy::KeepAll,
            Some(depth) => {
                self.history = HistoryPolicy::KeepLast;
                self.depth = depth;
            }
            None => {}
        }
        self
    }
}
