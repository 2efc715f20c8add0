//! In-Memory Grid Model
//!
//! A small bus-branch model: buses, and the generators, loads and lines
//! attached to them. Element ids are unique across the whole network.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::element::{Element, ElementType};
use super::{NetworkError, NetworkResult};

/// Free-form string attributes attached to an element
pub type Properties = BTreeMap<String, String>;

/// Default upper active power limit for generators created without one
pub const DEFAULT_MAX_P: f64 = 9999.0;

/// Electrical node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Nominal voltage in kV
    pub nominal_v: f64,
    /// Voltage magnitude in kV, once computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_mag: Option<f64>,
    /// Voltage angle in degrees, once computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_angle: Option<f64>,
    /// Connected component number, once computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Bus {
    pub fn new(id: impl Into<String>, nominal_v: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            nominal_v,
            v_mag: None,
            v_angle: None,
            island: None,
            properties: Properties::new(),
        }
    }
}

/// Reactive power bounds in MVar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactiveLimits {
    pub min_q: f64,
    pub max_q: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus_id: String,
    /// Active power set point in MW
    pub target_p: f64,
    /// Reactive power set point in MVar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_q: Option<f64>,
    #[serde(default)]
    pub min_p: f64,
    #[serde(default = "default_max_p")]
    pub max_p: f64,
    #[serde(default)]
    pub voltage_regulator_on: bool,
    #[serde(default = "default_true")]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactive_limits: Option<ReactiveLimits>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Generator {
    pub fn new(id: impl Into<String>, bus_id: impl Into<String>, target_p: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            bus_id: bus_id.into(),
            target_p,
            target_q: None,
            min_p: 0.0,
            max_p: DEFAULT_MAX_P,
            voltage_regulator_on: false,
            connected: true,
            reactive_limits: None,
            properties: Properties::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus_id: String,
    /// Active power consumption set point in MW
    pub p0: f64,
    /// Reactive power consumption set point in MVar
    #[serde(default)]
    pub q0: f64,
    /// Computed active power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    /// Computed reactive power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(default = "default_true")]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Load {
    pub fn new(id: impl Into<String>, bus_id: impl Into<String>, p0: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            bus_id: bus_id.into(),
            p0,
            q0: 0.0,
            p: None,
            q: None,
            connected: true,
            properties: Properties::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus1_id: String,
    pub bus2_id: String,
    /// Series resistance in ohm
    pub r: f64,
    /// Series reactance in ohm
    pub x: f64,
    /// Shunt susceptance in siemens
    #[serde(default)]
    pub b: f64,
    /// Computed active power flow at side 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    #[serde(default = "default_true")]
    pub connected1: bool,
    #[serde(default = "default_true")]
    pub connected2: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Line {
    pub fn new(
        id: impl Into<String>,
        bus1_id: impl Into<String>,
        bus2_id: impl Into<String>,
        r: f64,
        x: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            bus1_id: bus1_id.into(),
            bus2_id: bus2_id.into(),
            r,
            x,
            b: 0.0,
            p1: None,
            connected1: true,
            connected2: true,
            properties: Properties::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_p() -> f64 {
    DEFAULT_MAX_P
}

// =============================================================================
// Network
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    pub loads: Vec<Load>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Network {
    /// An empty network
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            buses: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Check id uniqueness and bus references, e.g. after import
    pub fn validate(&self) -> NetworkResult<()> {
        if self.id.is_empty() {
            return Err(NetworkError::Invalid("network id must not be empty".to_string()));
        }
        let mut seen = HashSet::new();
        for (ty, id) in self.all_ids() {
            if id.is_empty() {
                return Err(NetworkError::Invalid(format!("{} with empty id", ty)));
            }
            if !seen.insert(id) {
                return Err(NetworkError::DuplicateId(id.to_string()));
            }
        }
        check_bus_refs(self, &self.generators)?;
        check_bus_refs(self, &self.loads)?;
        check_bus_refs(self, &self.lines)?;
        self.check_values()
    }

    /// Reject NaN and infinities in stored doubles. NaN is the absent
    /// sentinel on the wire and neither survives JSON export.
    pub fn check_values(&self) -> NetworkResult<()> {
        self.buses.iter().try_for_each(Element::check_values)?;
        self.generators.iter().try_for_each(Element::check_values)?;
        self.loads.iter().try_for_each(Element::check_values)?;
        self.lines.iter().try_for_each(Element::check_values)
    }

    fn all_ids(&self) -> impl Iterator<Item = (ElementType, &str)> {
        let buses = self.buses.iter().map(|e| (ElementType::Bus, e.id()));
        let generators = self.generators.iter().map(|e| (ElementType::Generator, e.id()));
        let loads = self.loads.iter().map(|e| (ElementType::Load, e.id()));
        let lines = self.lines.iter().map(|e| (ElementType::Line, e.id()));
        buses.chain(generators).chain(loads).chain(lines)
    }

    /// Whether any element uses `id`
    pub fn contains_id(&self, id: &str) -> bool {
        self.all_ids().any(|(_, existing)| existing == id)
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// Element ids of one type, in storage order
    pub fn ids(&self, element_type: ElementType) -> Vec<String> {
        match element_type {
            ElementType::Bus => ids_of(&self.buses),
            ElementType::Generator => ids_of(&self.generators),
            ElementType::Load => ids_of(&self.loads),
            ElementType::Line => ids_of(&self.lines),
        }
    }

    pub fn element_count(&self, element_type: ElementType) -> usize {
        match element_type {
            ElementType::Bus => self.buses.len(),
            ElementType::Generator => self.generators.len(),
            ElementType::Load => self.loads.len(),
            ElementType::Line => self.lines.len(),
        }
    }

    /// Append new elements. Ids must be new and bus references must resolve;
    /// on any violation nothing is added.
    pub fn add<T: Element>(&mut self, elements: Vec<T>) -> NetworkResult<usize> {
        let mut batch = HashSet::new();
        for element in &elements {
            let id = element.id();
            if id.is_empty() {
                return Err(NetworkError::Invalid(format!("{} with empty id", T::TYPE)));
            }
            if !batch.insert(id) || self.contains_id(id) {
                return Err(NetworkError::DuplicateId(id.to_string()));
            }
            element.check_values()?;
        }
        check_bus_refs(self, &elements)?;

        let added = elements.len();
        T::collection_mut(self).extend(elements);
        Ok(added)
    }

    /// Remove elements by id. Every id must exist, and a bus may only go
    /// once nothing references it; on any violation nothing is removed.
    pub fn remove(&mut self, element_type: ElementType, ids: &[&str]) -> NetworkResult<usize> {
        match element_type {
            ElementType::Bus => {
                for bus_id in ids {
                    if let Some(user) = self.bus_user(bus_id) {
                        return Err(NetworkError::BusInUse {
                            bus_id: bus_id.to_string(),
                            element_id: user.to_string(),
                        });
                    }
                }
                remove_from::<Bus>(self, ids)
            }
            ElementType::Generator => remove_from::<Generator>(self, ids),
            ElementType::Load => remove_from::<Load>(self, ids),
            ElementType::Line => remove_from::<Line>(self, ids),
        }
    }

    fn bus_user(&self, bus_id: &str) -> Option<&str> {
        fn find<'n, T: Element>(elements: &'n [T], bus_id: &str) -> Option<&'n str> {
            elements
                .iter()
                .find(|e| e.bus_refs().contains(&bus_id))
                .map(Element::id)
        }
        find(&self.generators, bus_id)
            .or_else(|| find(&self.loads, bus_id))
            .or_else(|| find(&self.lines, bus_id))
    }
}

pub(crate) fn check_finite(element_id: &str, values: &[(&str, Option<f64>)]) -> NetworkResult<()> {
    for &(field, value) in values {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(NetworkError::Invalid(format!(
                    "{} of '{}' must be finite, got {}",
                    field, element_id, v
                )));
            }
        }
    }
    Ok(())
}

fn ids_of<T: Element>(elements: &[T]) -> Vec<String> {
    elements.iter().map(|e| e.id().to_string()).collect()
}

fn check_bus_refs<T: Element>(network: &Network, elements: &[T]) -> NetworkResult<()> {
    for element in elements {
        for bus_id in element.bus_refs() {
            if network.bus(bus_id).is_none() {
                return Err(NetworkError::UnknownBus {
                    element_id: element.id().to_string(),
                    bus_id: bus_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn remove_from<T: Element>(network: &mut Network, ids: &[&str]) -> NetworkResult<usize> {
    let targets: HashSet<&str> = ids.iter().copied().collect();
    let collection = T::collection(network);
    for id in &targets {
        if !collection.iter().any(|e| e.id() == *id) {
            return Err(NetworkError::UnknownElement {
                element_type: T::TYPE,
                id: id.to_string(),
            });
        }
    }
    let collection = T::collection_mut(network);
    let before = collection.len();
    collection.retain(|e| !targets.contains(e.id()));
    Ok(before - collection.len())
}
