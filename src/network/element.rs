//! Element Types
//!
//! The closed set of network element kinds a caller can address, and the
//! per-kind storage access used by the generic [`Network`] operations.

use std::fmt;
use std::str::FromStr;

use libc::c_int;

use super::model::{check_finite, Bus, Generator, Line, Load, Network};
use super::{NetworkError, NetworkResult};
use crate::error::BridgeError;

/// Kind of network element, as tagged on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ElementType {
    Bus = 0,
    Generator = 1,
    Load = 2,
    Line = 3,
}

impl ElementType {
    pub const ALL: [ElementType; 4] = [
        ElementType::Bus,
        ElementType::Generator,
        ElementType::Load,
        ElementType::Line,
    ];

    pub fn tag(self) -> c_int {
        self as c_int
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::Bus => "bus",
            ElementType::Generator => "generator",
            ElementType::Load => "load",
            ElementType::Line => "line",
        }
    }
}

impl TryFrom<c_int> for ElementType {
    type Error = BridgeError;

    fn try_from(tag: c_int) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ElementType::Bus),
            1 => Ok(ElementType::Generator),
            2 => Ok(ElementType::Load),
            3 => Ok(ElementType::Line),
            other => Err(BridgeError::unsupported("element type", other)),
        }
    }
}

impl FromStr for ElementType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetworkError::Invalid(format!("unknown element type '{}'", s)))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record stored in one of the network's element collections
pub trait Element: Sized {
    const TYPE: ElementType;

    fn id(&self) -> &str;

    /// Ids of the buses this element connects to
    fn bus_refs(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Every stored double must be finite
    fn check_values(&self) -> NetworkResult<()>;

    fn collection(network: &Network) -> &Vec<Self>;

    fn collection_mut(network: &mut Network) -> &mut Vec<Self>;
}

impl Element for Bus {
    const TYPE: ElementType = ElementType::Bus;

    fn id(&self) -> &str {
        &self.id
    }

    fn check_values(&self) -> NetworkResult<()> {
        check_finite(
            &self.id,
            &[
                ("nominal_v", Some(self.nominal_v)),
                ("v_mag", self.v_mag),
                ("v_angle", self.v_angle),
            ],
        )
    }

    fn collection(network: &Network) -> &Vec<Self> {
        &network.buses
    }

    fn collection_mut(network: &mut Network) -> &mut Vec<Self> {
        &mut network.buses
    }
}

impl Element for Generator {
    const TYPE: ElementType = ElementType::Generator;

    fn id(&self) -> &str {
        &self.id
    }

    fn bus_refs(&self) -> Vec<&str> {
        vec![self.bus_id.as_str()]
    }

    fn check_values(&self) -> NetworkResult<()> {
        let limits = self.reactive_limits;
        check_finite(
            &self.id,
            &[
                ("target_p", Some(self.target_p)),
                ("target_q", self.target_q),
                ("min_p", Some(self.min_p)),
                ("max_p", Some(self.max_p)),
                ("min_q", limits.map(|l| l.min_q)),
                ("max_q", limits.map(|l| l.max_q)),
            ],
        )
    }

    fn collection(network: &Network) -> &Vec<Self> {
        &network.generators
    }

    fn collection_mut(network: &mut Network) -> &mut Vec<Self> {
        &mut network.generators
    }
}

impl Element for Load {
    const TYPE: ElementType = ElementType::Load;

    fn id(&self) -> &str {
        &self.id
    }

    fn bus_refs(&self) -> Vec<&str> {
        vec![self.bus_id.as_str()]
    }

    fn check_values(&self) -> NetworkResult<()> {
        check_finite(
            &self.id,
            &[
                ("p0", Some(self.p0)),
                ("q0", Some(self.q0)),
                ("p", self.p),
                ("q", self.q),
            ],
        )
    }

    fn collection(network: &Network) -> &Vec<Self> {
        &network.loads
    }

    fn collection_mut(network: &mut Network) -> &mut Vec<Self> {
        &mut network.loads
    }
}

impl Element for Line {
    const TYPE: ElementType = ElementType::Line;

    fn id(&self) -> &str {
        &self.id
    }

    fn bus_refs(&self) -> Vec<&str> {
        vec![self.bus1_id.as_str(), self.bus2_id.as_str()]
    }

    fn check_values(&self) -> NetworkResult<()> {
        check_finite(
            &self.id,
            &[
                ("r", Some(self.r)),
                ("x", Some(self.x)),
                ("b", Some(self.b)),
                ("p1", self.p1),
            ],
        )
    }

    fn collection(network: &Network) -> &Vec<Self> {
        &network.lines
    }

    fn collection_mut(network: &mut Network) -> &mut Vec<Self> {
        &mut network.lines
    }
}
