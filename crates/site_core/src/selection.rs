//! Dependent tab/accordion selection state.
//!
//! Axes are declared parent-first. Selecting a value on one axis re-evaluates
//! every axis below it, resetting any whose value left its allowed set.

use std::collections::HashMap;

use shared::{
    domain::AxisName,
    error::{AxisConfigError, SelectionError},
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Keep the current value while it stays allowed.
    #[default]
    OnInvalid,
    /// Jump to the rule default whenever the parent changes.
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisRule {
    pub allowed: Vec<String>,
    pub default: String,
}

#[derive(Debug, Clone)]
pub struct AxisSpec {
    name: AxisName,
    values: Vec<String>,
    default: Option<String>,
    parent: Option<AxisName>,
    rules: HashMap<String, AxisRule>,
    reset: ResetPolicy,
}

impl AxisSpec {
    /// An axis whose default is its first value.
    pub fn new<V: Into<String>>(
        name: impl Into<AxisName>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            default: values.first().cloned(),
            values,
            parent: None,
            rules: HashMap::new(),
            reset: ResetPolicy::default(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn depends_on(mut self, parent: impl Into<AxisName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Restricts this axis while the parent holds `parent_value`.
    pub fn rule<V: Into<String>>(
        mut self,
        parent_value: impl Into<String>,
        allowed: impl IntoIterator<Item = V>,
        default: impl Into<String>,
    ) -> Self {
        self.rules.insert(
            parent_value.into(),
            AxisRule {
                allowed: allowed.into_iter().map(Into::into).collect(),
                default: default.into(),
            },
        );
        self
    }

    pub fn reset(mut self, policy: ResetPolicy) -> Self {
        self.reset = policy;
        self
    }
}

#[derive(Debug, Default)]
pub struct SelectionBuilder {
    axes: Vec<AxisSpec>,
}

impl SelectionBuilder {
    pub fn axis(mut self, spec: AxisSpec) -> Self {
        self.axes.push(spec);
        self
    }

    pub fn build(self) -> Result<SelectionMachine, AxisConfigError> {
        let mut machine = SelectionMachine { axes: Vec::new() };

        for spec in self.axes {
            if machine.position(spec.name.as_str()).is_some() {
                return Err(AxisConfigError::DuplicateAxis { axis: spec.name });
            }
            let parent = match &spec.parent {
                Some(parent) => Some(machine.position(parent.as_str()).ok_or_else(|| {
                    AxisConfigError::UnknownParent {
                        axis: spec.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };

            if let Some(default) = &spec.default {
                if !spec.values.contains(default) {
                    return Err(AxisConfigError::DefaultNotAllowed {
                        axis: spec.name.clone(),
                        default: default.clone(),
                    });
                }
            }
            for rule in spec.rules.values() {
                if !rule.allowed.contains(&rule.default) {
                    return Err(AxisConfigError::DefaultNotAllowed {
                        axis: spec.name.clone(),
                        default: rule.default.clone(),
                    });
                }
            }

            let current = spec.default.clone();
            machine.axes.push(AxisState {
                spec,
                parent,
                current,
            });

            let position = machine.axes.len() - 1;
            if let Some(current) = &machine.axes[position].current {
                if !machine.allowed_at(position).contains(current) {
                    let axis = &machine.axes[position].spec.name;
                    return Err(AxisConfigError::DefaultNotAllowed {
                        axis: axis.clone(),
                        default: current.clone(),
                    });
                }
            }
        }

        Ok(machine)
    }
}

#[derive(Debug, Clone)]
struct AxisState {
    spec: AxisSpec,
    parent: Option<usize>,
    current: Option<String>,
}

/// Current value of every axis, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSnapshot {
    values: Vec<(AxisName, Option<String>)>,
}

impl SelectionSnapshot {
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name.as_str() == axis)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AxisName, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name, value.as_deref()))
    }
}

#[derive(Debug, Clone)]
pub struct SelectionMachine {
    axes: Vec<AxisState>,
}

impl SelectionMachine {
    pub fn builder() -> SelectionBuilder {
        SelectionBuilder::default()
    }

    /// `None` only while the axis has no allowed values.
    pub fn current_value(&self, axis: &str) -> Result<Option<&str>, SelectionError> {
        let position = self.require(axis)?;
        Ok(self.axes[position].current.as_deref())
    }

    pub fn allowed_values(&self, axis: &str) -> Result<&[String], SelectionError> {
        let position = self.require(axis)?;
        Ok(self.allowed_at(position))
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            values: self
                .axes
                .iter()
                .map(|state| (state.spec.name.clone(), state.current.clone()))
                .collect(),
        }
    }

    pub fn select(&mut self, axis: &str, value: &str) -> Result<SelectionSnapshot, SelectionError> {
        let position = self.require(axis)?;
        if !self.allowed_at(position).iter().any(|allowed| allowed == value) {
            debug!(axis, value, "selection: rejected value outside allowed set");
            return Err(SelectionError::InvalidSelection {
                axis: self.axes[position].spec.name.clone(),
                value: value.to_string(),
            });
        }

        if self.axes[position].current.as_deref() != Some(value) {
            self.axes[position].current = Some(value.to_string());
            self.propagate(position);
        }
        Ok(self.snapshot())
    }

    /// Replaces the value domain of an axis, e.g. tabs derived from freshly
    /// loaded groups, then applies the reset rule to it and its dependents.
    pub fn replace_values<V: Into<String>>(
        &mut self,
        axis: &str,
        values: impl IntoIterator<Item = V>,
        default: Option<&str>,
    ) -> Result<SelectionSnapshot, SelectionError> {
        let position = self.require(axis)?;
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        let spec = &mut self.axes[position].spec;
        let previous = spec.default.take();
        spec.default = default
            .filter(|candidate| values.iter().any(|value| value == candidate))
            .map(str::to_string)
            .or_else(|| previous.filter(|previous| values.contains(previous)))
            .or_else(|| values.first().cloned());
        spec.values = values;

        if self.reconcile(position, false) {
            self.propagate(position);
        }
        Ok(self.snapshot())
    }

    fn require(&self, axis: &str) -> Result<usize, SelectionError> {
        self.position(axis).ok_or_else(|| SelectionError::UnknownAxis {
            axis: AxisName::from(axis),
        })
    }

    fn position(&self, axis: &str) -> Option<usize> {
        self.axes
            .iter()
            .position(|state| state.spec.name.as_str() == axis)
    }

    fn active_rule(&self, position: usize) -> Option<&AxisRule> {
        let state = &self.axes[position];
        let parent_value = self.axes[state.parent?].current.as_deref()?;
        state.spec.rules.get(parent_value)
    }

    fn allowed_at(&self, position: usize) -> &[String] {
        match self.active_rule(position) {
            Some(rule) => &rule.allowed,
            None => &self.axes[position].spec.values,
        }
    }

    fn default_at(&self, position: usize) -> Option<String> {
        if let Some(rule) = self.active_rule(position) {
            return Some(rule.default.clone());
        }
        let spec = &self.axes[position].spec;
        spec.default
            .clone()
            .filter(|default| spec.values.contains(default))
            .or_else(|| spec.values.first().cloned())
    }

    /// Brings one axis back inside its allowed set. Returns whether its
    /// value changed.
    fn reconcile(&mut self, position: usize, parent_changed: bool) -> bool {
        let current = self.axes[position].current.clone();
        let force = parent_changed && self.axes[position].spec.reset == ResetPolicy::Always;
        let still_allowed = current
            .as_ref()
            .is_some_and(|value| self.allowed_at(position).contains(value));

        let next = if force || !still_allowed {
            self.default_at(position)
        } else {
            current.clone()
        };
        if next == current {
            return false;
        }

        info!(
            axis = %self.axes[position].spec.name,
            from = current.as_deref().unwrap_or("<none>"),
            to = next.as_deref().unwrap_or("<none>"),
            "selection: reset dependent axis"
        );
        self.axes[position].current = next;
        true
    }

    /// Declaration order is parent-first, so one forward sweep visits every
    /// descendant after its parent has settled.
    fn propagate(&mut self, changed: usize) {
        let mut dirty = vec![false; self.axes.len()];
        dirty[changed] = true;

        for position in changed + 1..self.axes.len() {
            let Some(parent) = self.axes[position].parent else {
                continue;
            };
            if dirty[parent] && self.reconcile(position, true) {
                dirty[position] = true;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
