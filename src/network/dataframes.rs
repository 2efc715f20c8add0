//! Element Dataframes
//!
//! One [`DataframeMapper`] per element type, created on first use. Each maps
//! the element's attributes to series, marks the caller-writable ones, and
//! backs the read, update, create and metadata entry points.

use once_cell::sync::Lazy;

use super::element::ElementType;
use super::model::{Bus, Generator, Line, Load, Network, Properties, ReactiveLimits, DEFAULT_MAX_P};
use crate::dataframe::{
    BooleanView, ColumnView, Dataframe, DataframeMapper, DataframeReader, Sentinel, StringView,
};
use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// Mappers
// =============================================================================

// Optional attributes are cleared by an absent value on update; required
// ones keep their current value.

static BUS_MAPPER: Lazy<DataframeMapper<Bus>> = Lazy::new(|| {
    DataframeMapper::builder()
        .index("id", |b: &Bus| b.id.as_str())
        .strings("name", |b: &Bus| b.name.as_deref())
        .doubles("nominal_v", |b: &Bus| Some(b.nominal_v))
        .doubles_mut("v_mag", |b: &Bus| b.v_mag, |b: &mut Bus, v| b.v_mag = v.present())
        .doubles_mut("v_angle", |b: &Bus| b.v_angle, |b: &mut Bus, v| b.v_angle = v.present())
        .ints("island", |b: &Bus| b.island)
        .properties(|b: &Bus| &b.properties)
        .build()
});

static GENERATOR_MAPPER: Lazy<DataframeMapper<Generator>> = Lazy::new(|| {
    DataframeMapper::builder()
        .index("id", |g: &Generator| g.id.as_str())
        .strings("name", |g: &Generator| g.name.as_deref())
        .strings("bus_id", |g: &Generator| Some(g.bus_id.as_str()))
        .doubles_mut(
            "target_p",
            |g: &Generator| Some(g.target_p),
            |g: &mut Generator, v| {
                if let Some(v) = v.present() {
                    g.target_p = v;
                }
            },
        )
        .doubles_mut(
            "target_q",
            |g: &Generator| g.target_q,
            |g: &mut Generator, v| g.target_q = v.present(),
        )
        .doubles("min_p", |g: &Generator| Some(g.min_p))
        .doubles("max_p", |g: &Generator| Some(g.max_p))
        .doubles("min_q", |g: &Generator| g.reactive_limits.map(|l| l.min_q))
        .doubles("max_q", |g: &Generator| g.reactive_limits.map(|l| l.max_q))
        .booleans_mut(
            "voltage_regulator_on",
            |g: &Generator| g.voltage_regulator_on,
            |g: &mut Generator, v| g.voltage_regulator_on = v,
        )
        .booleans_mut(
            "connected",
            |g: &Generator| g.connected,
            |g: &mut Generator, v| g.connected = v,
        )
        .properties(|g: &Generator| &g.properties)
        .build()
});

static LOAD_MAPPER: Lazy<DataframeMapper<Load>> = Lazy::new(|| {
    DataframeMapper::builder()
        .index("id", |l: &Load| l.id.as_str())
        .strings("name", |l: &Load| l.name.as_deref())
        .strings("bus_id", |l: &Load| Some(l.bus_id.as_str()))
        .doubles_mut(
            "p0",
            |l: &Load| Some(l.p0),
            |l: &mut Load, v| {
                if let Some(v) = v.present() {
                    l.p0 = v;
                }
            },
        )
        .doubles_mut(
            "q0",
            |l: &Load| Some(l.q0),
            |l: &mut Load, v| {
                if let Some(v) = v.present() {
                    l.q0 = v;
                }
            },
        )
        .doubles("p", |l: &Load| l.p)
        .doubles("q", |l: &Load| l.q)
        .booleans_mut("connected", |l: &Load| l.connected, |l: &mut Load, v| l.connected = v)
        .properties(|l: &Load| &l.properties)
        .build()
});

static LINE_MAPPER: Lazy<DataframeMapper<Line>> = Lazy::new(|| {
    DataframeMapper::builder()
        .index("id", |l: &Line| l.id.as_str())
        .strings("name", |l: &Line| l.name.as_deref())
        .strings("bus1_id", |l: &Line| Some(l.bus1_id.as_str()))
        .strings("bus2_id", |l: &Line| Some(l.bus2_id.as_str()))
        .doubles_mut(
            "r",
            |l: &Line| Some(l.r),
            |l: &mut Line, v| {
                if let Some(v) = v.present() {
                    l.r = v;
                }
            },
        )
        .doubles_mut(
            "x",
            |l: &Line| Some(l.x),
            |l: &mut Line, v| {
                if let Some(v) = v.present() {
                    l.x = v;
                }
            },
        )
        .doubles("b", |l: &Line| Some(l.b))
        .doubles("p1", |l: &Line| l.p1)
        .booleans_mut("connected1", |l: &Line| l.connected1, |l: &mut Line, v| l.connected1 = v)
        .booleans_mut("connected2", |l: &Line| l.connected2, |l: &mut Line, v| l.connected2 = v)
        .properties(|l: &Line| &l.properties)
        .build()
});

// =============================================================================
// Read and update
// =============================================================================

/// All elements of one type as a dataframe, one row per element
pub fn elements_dataframe(
    network: &Network,
    element_type: ElementType,
    include_properties: bool,
) -> BridgeResult<Dataframe> {
    match element_type {
        ElementType::Bus => BUS_MAPPER.build_with(&network.buses, include_properties),
        ElementType::Generator => {
            GENERATOR_MAPPER.build_with(&network.generators, include_properties)
        }
        ElementType::Load => LOAD_MAPPER.build_with(&network.loads, include_properties),
        ElementType::Line => LINE_MAPPER.build_with(&network.lines, include_properties),
    }
}

/// Name, type, index flag and writability of each declared series
pub fn series_metadata(element_type: ElementType) -> BridgeResult<Dataframe> {
    match element_type {
        ElementType::Bus => BUS_MAPPER.metadata_dataframe(),
        ElementType::Generator => GENERATOR_MAPPER.metadata_dataframe(),
        ElementType::Load => LOAD_MAPPER.metadata_dataframe(),
        ElementType::Line => LINE_MAPPER.metadata_dataframe(),
    }
}

/// Apply a caller dataframe to existing elements, matched by `id`
pub fn update_elements(
    network: &mut Network,
    element_type: ElementType,
    reader: &DataframeReader<'_>,
) -> BridgeResult<usize> {
    check_doubles(reader)?;
    match element_type {
        ElementType::Bus => BUS_MAPPER.update(&mut network.buses, reader),
        ElementType::Generator => GENERATOR_MAPPER.update(&mut network.generators, reader),
        ElementType::Load => LOAD_MAPPER.update(&mut network.loads, reader),
        ElementType::Line => LINE_MAPPER.update(&mut network.lines, reader),
    }
}

/// Caller doubles are finite or the absent sentinel; infinities are refused
fn check_doubles(reader: &DataframeReader<'_>) -> BridgeResult<()> {
    for series in reader.all_series() {
        if let ColumnView::Double(values) = series.data {
            if let Some(row) = values.iter().position(|v| v.is_infinite()) {
                return Err(BridgeError::InvalidInput(format!(
                    "series '{}' has a non-finite value at row {}",
                    series.name, row
                )));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Create
// =============================================================================

const BUS_COLUMNS: &[&str] = &["id", "name", "nominal_v", "v_mag", "v_angle", "island"];
const GENERATOR_COLUMNS: &[&str] = &[
    "id",
    "name",
    "bus_id",
    "target_p",
    "target_q",
    "min_p",
    "max_p",
    "min_q",
    "max_q",
    "voltage_regulator_on",
    "connected",
];
const LOAD_COLUMNS: &[&str] = &["id", "name", "bus_id", "p0", "q0", "connected"];
const LINE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "bus1_id",
    "bus2_id",
    "r",
    "x",
    "b",
    "connected1",
    "connected2",
];

/// Create new elements from a caller dataframe.
///
/// Required series: bus `id, nominal_v`; generator `id, bus_id, target_p`;
/// load `id, bus_id, p0`; line `id, bus1_id, bus2_id, r, x`. Other known
/// series are optional and sentinels mean "not given". Nothing is created
/// unless every row is valid.
pub fn create_elements(
    network: &mut Network,
    element_type: ElementType,
    reader: &DataframeReader<'_>,
) -> BridgeResult<usize> {
    check_doubles(reader)?;
    let rows = Rows::new(reader, element_type)?;
    let created = match element_type {
        ElementType::Bus => network.add(rows.buses()?)?,
        ElementType::Generator => network.add(rows.generators()?)?,
        ElementType::Load => network.add(rows.loads()?)?,
        ElementType::Line => network.add(rows.lines()?)?,
    };
    Ok(created)
}

/// Row-wise access to a creation dataframe
struct Rows<'r, 'a> {
    reader: &'r DataframeReader<'a>,
    ids: StringView<'a>,
}

impl<'r, 'a> Rows<'r, 'a> {
    fn new(reader: &'r DataframeReader<'a>, element_type: ElementType) -> BridgeResult<Self> {
        let known = match element_type {
            ElementType::Bus => BUS_COLUMNS,
            ElementType::Generator => GENERATOR_COLUMNS,
            ElementType::Load => LOAD_COLUMNS,
            ElementType::Line => LINE_COLUMNS,
        };
        if let Some(unknown) = reader
            .all_series()
            .iter()
            .find(|s| !known.contains(&s.name))
        {
            return Err(BridgeError::InvalidInput(format!(
                "unknown series '{}' for {} creation",
                unknown.name, element_type
            )));
        }
        let ids = reader.required_strings("id")?;
        Ok(Self { reader, ids })
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn id(&self, row: usize) -> BridgeResult<String> {
        Ok(self.ids.get(row)?.to_string())
    }

    fn required_string(&self, name: &str, row: usize) -> BridgeResult<String> {
        Ok(self.reader.required_strings(name)?.get(row)?.to_string())
    }

    fn optional_string(&self, name: &str, row: usize) -> BridgeResult<Option<String>> {
        match self.reader.optional_strings(name)? {
            Some(view) => Ok(view.get_opt(row)?.map(str::to_string)),
            None => Ok(None),
        }
    }

    fn required_double(&self, name: &str, row: usize) -> BridgeResult<f64> {
        let value = self.reader.required_doubles(name)?[row];
        value.present().filter(|v| v.is_finite()).ok_or_else(|| {
            BridgeError::InvalidInput(format!("series '{}' has no value at row {}", name, row))
        })
    }

    fn optional_double(&self, name: &str, row: usize) -> BridgeResult<Option<f64>> {
        self.reader.double_opt(name, row)
    }

    fn optional_int(&self, name: &str, row: usize) -> BridgeResult<Option<i32>> {
        self.reader.int_opt(name, row)
    }

    fn boolean_or(&self, name: &str, row: usize, default: bool) -> BridgeResult<bool> {
        let view: Option<BooleanView<'a>> = self.reader.optional_booleans(name)?;
        Ok(view.and_then(|v| v.get(row)).unwrap_or(default))
    }

    fn reactive_limits(&self, row: usize) -> BridgeResult<Option<ReactiveLimits>> {
        match (self.optional_double("min_q", row)?, self.optional_double("max_q", row)?) {
            (Some(min_q), Some(max_q)) => Ok(Some(ReactiveLimits { min_q, max_q })),
            (None, None) => Ok(None),
            _ => Err(BridgeError::InvalidInput(format!(
                "min_q and max_q must be given together (row {})",
                row
            ))),
        }
    }

    fn buses(&self) -> BridgeResult<Vec<Bus>> {
        (0..self.len())
            .map(|row| {
                Ok(Bus {
                    id: self.id(row)?,
                    name: self.optional_string("name", row)?,
                    nominal_v: self.required_double("nominal_v", row)?,
                    v_mag: self.optional_double("v_mag", row)?,
                    v_angle: self.optional_double("v_angle", row)?,
                    island: self.optional_int("island", row)?,
                    properties: Properties::new(),
                })
            })
            .collect()
    }

    fn generators(&self) -> BridgeResult<Vec<Generator>> {
        (0..self.len())
            .map(|row| {
                Ok(Generator {
                    id: self.id(row)?,
                    name: self.optional_string("name", row)?,
                    bus_id: self.required_string("bus_id", row)?,
                    target_p: self.required_double("target_p", row)?,
                    target_q: self.optional_double("target_q", row)?,
                    min_p: self.optional_double("min_p", row)?.unwrap_or(0.0),
                    max_p: self.optional_double("max_p", row)?.unwrap_or(DEFAULT_MAX_P),
                    voltage_regulator_on: self.boolean_or("voltage_regulator_on", row, false)?,
                    connected: self.boolean_or("connected", row, true)?,
                    reactive_limits: self.reactive_limits(row)?,
                    properties: Properties::new(),
                })
            })
            .collect()
    }

    fn loads(&self) -> BridgeResult<Vec<Load>> {
        (0..self.len())
            .map(|row| {
                Ok(Load {
                    id: self.id(row)?,
                    name: self.optional_string("name", row)?,
                    bus_id: self.required_string("bus_id", row)?,
                    p0: self.required_double("p0", row)?,
                    q0: self.optional_double("q0", row)?.unwrap_or(0.0),
                    p: None,
                    q: None,
                    connected: self.boolean_or("connected", row, true)?,
                    properties: Properties::new(),
                })
            })
            .collect()
    }

    fn lines(&self) -> BridgeResult<Vec<Line>> {
        (0..self.len())
            .map(|row| {
                Ok(Line {
                    id: self.id(row)?,
                    name: self.optional_string("name", row)?,
                    bus1_id: self.required_string("bus1_id", row)?,
                    bus2_id: self.required_string("bus2_id", row)?,
                    r: self.required_double("r", row)?,
                    x: self.required_double("x", row)?,
                    b: self.optional_double("b", row)?.unwrap_or(0.0),
                    p1: None,
                    connected1: self.boolean_or("connected1", row, true)?,
                    connected2: self.boolean_or("connected2", row, true)?,
                    properties: Properties::new(),
                })
            })
            .collect()
    }
}
