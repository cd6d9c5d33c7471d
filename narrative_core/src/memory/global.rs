//! Story-wide context that is not owned by a single entity.

use serde::{Deserialize, Serialize};

/// Locations, relationships and plot points collected across chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalContext {
    pub locations: Vec<String>,
    pub relationships: Vec<String>,
    pub plot_points: Vec<String>,
}

impl GlobalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a location unless already known. Returns whether it was new.
    pub fn add_location(&mut self, location: impl Into<String>) -> bool {
        push_unique(&mut self.locations, location.into())
    }

    /// Record a relationship description unless already known.
    pub fn add_relationship(&mut self, description: impl Into<String>) -> bool {
        push_unique(&mut self.relationships, description.into())
    }

    /// Plot points always append; the same beat may recur.
    pub fn add_plot_point(&mut self, plot_point: impl Into<String>) {
        self.plot_points.push(plot_point.into());
    }

    /// The last `n` relationships, oldest first.
    pub fn recent_relationships(&self, n: usize) -> &[String] {
        tail(&self.relationships, n)
    }

    /// The last `n` plot points, oldest first.
    pub fn recent_plot_points(&self, n: usize) -> &[String] {
        tail(&self.plot_points, n)
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.relationships.is_empty() && self.plot_points.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

fn tail(values: &[String], n: usize) -> &[String] {
    &values[values.len().saturating_sub(n)..]
}
