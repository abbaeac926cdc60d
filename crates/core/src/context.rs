// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rolling evaluation context (§3): `env`, `vars`, `steps` (indexed by
//! ordinal and by name), `job`, and user-declared `outputs`.

use crate::value::Value;
use indexmap::IndexMap;
use std::time::Duration;

/// Metadata about the job currently executing, exposed to templates as
/// `job.*`.
#[derive(Debug, Clone)]
pub struct JobView {
    pub name: String,
    pub iteration: u32,
}

/// A committed step's result, in the uniform shape described by §3's
/// Result type: `{req, res, rt, status}`.
#[derive(Debug, Clone)]
pub struct StepView {
    pub req: Value,
    pub res: Value,
    pub rt: Duration,
    pub status: i32,
}

impl StepView {
    pub fn to_value(&self) -> Value {
        let mut m = IndexMap::new();
        m.insert("req".to_string(), self.req.clone());
        m.insert("res".to_string(), self.res.clone());
        m.insert(
            "rt".to_string(),
            Value::Duration(self.rt),
        );
        m.insert("status".to_string(), Value::Int(self.status as i64));
        Value::Map(m)
    }
}

#[derive(Debug, Clone, Default)]
struct StepSlot {
    view: Option<StepView>,
    frozen: bool,
}

/// The rolling context. One instance lives per job execution; after a job
/// completes its committed step results are merged into the workflow-scoped
/// read-only view available to downstream jobs (§5's shared-resources
/// model) by the engine constructing a fresh `Context` per job that starts
/// from the prior jobs' `outputs`.
#[derive(Debug, Clone)]
pub struct Context {
    pub env: IndexMap<String, String>,
    pub vars: IndexMap<String, Value>,
    pub outputs: IndexMap<String, Value>,
    pub job: JobView,
    slots: Vec<StepSlot>,
    names: IndexMap<String, usize>,
}

impl Context {
    pub fn new(job: JobView, env: IndexMap<String, String>, vars: IndexMap<String, Value>) -> Self {
        Self {
            env,
            vars,
            outputs: IndexMap::new(),
            job,
            slots: Vec::new(),
            names: IndexMap::new(),
        }
    }

    /// Reserves (or re-reserves, for a new repeat iteration) the slot for
    /// step `ordinal`, unfreezing it so the upcoming iteration's result can
    /// replace whatever the previous iteration committed there — per
    /// §4.F's "current iteration's results replace the same slot".
    pub fn begin_iteration_slot(&mut self, ordinal: usize, name: Option<&str>) {
        if self.slots.len() <= ordinal {
            self.slots.resize(ordinal + 1, StepSlot::default());
        }
        self.slots[ordinal] = StepSlot::default();
        if let Some(name) = name {
            self.names.insert(name.to_string(), ordinal);
        }
    }

    /// Commits a step's result. At-most-once per iteration: once frozen,
    /// subsequent commits to the same ordinal are ignored (testable
    /// property 7).
    pub fn commit_step(&mut self, ordinal: usize, view: StepView) {
        if self.slots.len() <= ordinal {
            self.slots.resize(ordinal + 1, StepSlot::default());
        }
        let slot = &mut self.slots[ordinal];
        if slot.frozen {
            return;
        }
        slot.view = Some(view);
        slot.frozen = true;
    }

    /// Reads a step's committed result by ordinal. Returns `None` if the
    /// step has not yet executed (null-safe: callers render this as the
    /// empty string / falsy, never an error, except in the template
    /// evaluator's explicit "not yet executed" check per §4.C).
    pub fn step_by_ordinal(&self, ordinal: usize) -> Option<&StepView> {
        self.slots.get(ordinal).and_then(|s| s.view.as_ref())
    }

    pub fn step_by_name(&self, name: &str) -> Option<&StepView> {
        let ordinal = *self.names.get(name)?;
        self.step_by_ordinal(ordinal)
    }

    pub fn has_step_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Builds the `steps` sub-tree exposed to templates: keyed by both
    /// ordinal (as a decimal string) and, for named steps, by name.
    pub fn steps_value(&self) -> Value {
        let mut m = IndexMap::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(view) = &slot.view {
                m.insert(i.to_string(), view.to_value());
            }
        }
        for (name, ordinal) in &self.names {
            if let Some(view) = self.slots.get(*ordinal).and_then(|s| s.view.as_ref()) {
                m.insert(name.clone(), view.to_value());
            }
        }
        Value::Map(m)
    }

    pub fn job_value(&self) -> Value {
        let mut m = IndexMap::new();
        m.insert("name".to_string(), Value::String(self.job.name.clone()));
        m.insert("iteration".to_string(), Value::Int(self.job.iteration as i64));
        Value::Map(m)
    }

    pub fn env_value(&self) -> Value {
        Value::Map(
            self.env
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    pub fn vars_value(&self) -> Value {
        Value::Map(self.vars.clone())
    }

    pub fn outputs_value(&self) -> Value {
        Value::Map(self.outputs.clone())
    }
}
