// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative workflow/job/step definitions (§3) and their YAML
//! (de)serialization, including the dual sequence-or-map form for both
//! `jobs` and `steps`.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

/// Top-level workflow description.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDef {
    #[serde(default)]
    pub vars: IndexMap<String, serde_yaml::Value>,
    /// Static executor discovery config, keyed by action name. Values are
    /// either a path to a subprocess binary or the literal `"in-process"`.
    #[serde(default)]
    pub executors: IndexMap<String, String>,
    #[serde(deserialize_with = "deserialize_jobs")]
    pub jobs: Vec<JobDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub needs: Vec<String>,
    #[serde(default)]
    pub repeat: Option<RepeatDef>,
    #[serde(default)]
    pub defaults: IndexMap<String, String>,
    #[serde(deserialize_with = "deserialize_steps")]
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepeatDef {
    pub count: u32,
    #[serde(default)]
    pub interval: Option<String>,
}

impl RepeatDef {
    /// Negative or zero interval is treated as zero, per §4.F.
    pub fn interval_duration(&self) -> Duration {
        self.interval
            .as_deref()
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepDef {
    #[serde(default)]
    pub name: String,
    pub uses: String,
    #[serde(default)]
    pub with: IndexMap<String, String>,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub echo: Option<String>,
    #[serde(default)]
    pub iter: Option<Vec<IndexMap<String, serde_yaml::Value>>>,
    #[serde(default)]
    pub retry: Option<RetryDef>,
    #[serde(default)]
    pub wait: Option<String>,
}

impl StepDef {
    pub fn wait_duration(&self) -> Option<Duration> {
        self.wait.as_deref().and_then(|s| humantime::parse_duration(s).ok())
    }
}

/// Exponential-backoff retry discipline (§4.E). Missing fields fall back
/// to the documented defaults: `max_attempts=3, initial_interval=1s,
/// factor=2, max_interval=60s, jitter=0`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryDef {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_interval: Option<String>,
    #[serde(default)]
    pub factor: Option<f64>,
    #[serde(default)]
    pub max_interval: Option<String>,
    #[serde(default)]
    pub jitter: Option<f64>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_FACTOR: f64 = 2.0;
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_JITTER: f64 = 0.0;

impl RetryDef {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
            .as_deref()
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(DEFAULT_INITIAL_INTERVAL)
    }

    pub fn factor(&self) -> f64 {
        self.factor.unwrap_or(DEFAULT_FACTOR)
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
            .as_deref()
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(DEFAULT_MAX_INTERVAL)
    }

    pub fn jitter(&self) -> f64 {
        self.jitter.unwrap_or(DEFAULT_JITTER)
    }
}

/// Deserializes `jobs` from either a YAML sequence (`jobs: [...]`) or a
/// map of labeled job blocks (`jobs: {name: {...}}`), injecting the map
/// key as the job's name when the sequence form's `name` field is absent.
fn deserialize_jobs<'de, D>(deserializer: D) -> Result<Vec<JobDef>, D::Error>
where
    D: Deserializer<'de>,
{
    struct JobsVisitor;

    impl<'de> Visitor<'de> for JobsVisitor {
        type Value = Vec<JobDef>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a sequence of jobs or a map of named job blocks")
        }

        fn visit_seq<S>(self, seq: S) -> Result<Vec<JobDef>, S::Error>
        where
            S: SeqAccess<'de>,
        {
            Vec::deserialize(de::value::SeqAccessDeserializer::new(seq))
        }

        fn visit_map<M>(self, map: M) -> Result<Vec<JobDef>, M::Error>
        where
            M: MapAccess<'de>,
        {
            let index_map: IndexMap<String, JobDef> =
                IndexMap::deserialize(de::value::MapAccessDeserializer::new(map))?;
            Ok(index_map
                .into_iter()
                .map(|(key, mut job)| {
                    if job.name.is_empty() {
                        job.name = key;
                    }
                    job
                })
                .collect())
        }
    }

    deserializer.deserialize_any(JobsVisitor)
}

/// Deserializes `steps` the same way `jobs` are: sequence or labeled map.
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<StepDef>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StepsVisitor;

    impl<'de> Visitor<'de> for StepsVisitor {
        type Value = Vec<StepDef>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a sequence of steps or a map of named step blocks")
        }

        fn visit_seq<S>(self, seq: S) -> Result<Vec<StepDef>, S::Error>
        where
            S: SeqAccess<'de>,
        {
            Vec::deserialize(de::value::SeqAccessDeserializer::new(seq))
        }

        fn visit_map<M>(self, map: M) -> Result<Vec<StepDef>, M::Error>
        where
            M: MapAccess<'de>,
        {
            let index_map: IndexMap<String, StepDef> =
                IndexMap::deserialize(de::value::MapAccessDeserializer::new(map))?;
            Ok(index_map
                .into_iter()
                .map(|(key, mut step)| {
                    if step.name.is_empty() {
                        step.name = key;
                    }
                    step
                })
                .collect())
        }
    }

    deserializer.deserialize_any(StepsVisitor)
}

/// Converts a loaded YAML scalar/sequence/mapping into a [`probe_core::Value`].
pub fn yaml_to_value(v: &serde_yaml::Value) -> probe_core::Value {
    use probe_core::Value;
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => Value::List(seq.iter().map(yaml_to_value).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                if let serde_yaml::Value::String(k) = k {
                    out.insert(k.clone(), yaml_to_value(v));
                }
            }
            Value::Map(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
