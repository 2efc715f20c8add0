//! Record-to-Dataframe Mapping
//!
//! A [`DataframeMapper`] describes, once per record type, which series a
//! dataframe of those records has and how each value is read from (and
//! optionally written back to) a record.
//!
//! ```text
//! records ──build──► Dataframe ──into_ffi──► caller
//! records ◄─update── DataframeReader ◄────── caller
//! ```
//!
//! Accessors return `Option`; `None` becomes the sentinel of the column type
//! when the dataframe is built, never a shorter column.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::column::{ColumnData, ColumnType};
use super::frame::{Dataframe, Series};
use super::reader::{ColumnView, DataframeReader};
use super::sentinel::Sentinel;
use crate::error::{BridgeError, BridgeResult};

type StrGetter<T> = Box<dyn for<'r> Fn(&'r T) -> Option<&'r str> + Send + Sync>;
type Getter<T, V> = Box<dyn Fn(&T) -> Option<V> + Send + Sync>;
type StrSetter<T> = Box<dyn Fn(&mut T, &str) + Send + Sync>;
type Setter<T, V> = Box<dyn Fn(&mut T, V) + Send + Sync>;
type PropertiesGetter<T> = Box<dyn for<'r> Fn(&'r T) -> &'r BTreeMap<String, String> + Send + Sync>;

enum Accessor<T> {
    String(StrGetter<T>),
    Double(Getter<T, f64>),
    Int(Getter<T, i32>),
    Boolean(Getter<T, bool>),
}

enum Updater<T> {
    String(StrSetter<T>),
    Double(Setter<T, f64>),
    Int(Setter<T, i32>),
    Boolean(Setter<T, bool>),
}

impl<T> Accessor<T> {
    fn column_type(&self) -> ColumnType {
        match self {
            Accessor::String(_) => ColumnType::String,
            Accessor::Double(_) => ColumnType::Double,
            Accessor::Int(_) => ColumnType::Int,
            Accessor::Boolean(_) => ColumnType::Boolean,
        }
    }
}

struct Column<T> {
    name: String,
    index: bool,
    accessor: Accessor<T>,
    updater: Option<Updater<T>>,
}

fn str_getter<T, F>(f: F) -> StrGetter<T>
where
    F: for<'r> Fn(&'r T) -> Option<&'r str> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Description of one declared series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMetadata {
    pub name: String,
    pub column_type: ColumnType,
    pub index: bool,
    pub modifiable: bool,
}

// =============================================================================
// Builder
// =============================================================================

/// Declares the series of a [`DataframeMapper`], in output order
pub struct DataframeMapperBuilder<T> {
    columns: Vec<Column<T>>,
    properties: Option<PropertiesGetter<T>>,
}

impl<T: 'static> Default for DataframeMapperBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> DataframeMapperBuilder<T> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            properties: None,
        }
    }

    fn push(mut self, name: &str, index: bool, accessor: Accessor<T>, updater: Option<Updater<T>>) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            index,
            accessor,
            updater,
        });
        self
    }

    /// The key series. Its values identify records on update.
    pub fn index<F>(self, name: &str, get: F) -> Self
    where
        F: for<'r> Fn(&'r T) -> &'r str + Send + Sync + 'static,
    {
        let accessor = Accessor::String(str_getter(move |r: &T| Some(get(r))));
        self.push(name, true, accessor, None)
    }

    pub fn strings<F>(self, name: &str, get: F) -> Self
    where
        F: for<'r> Fn(&'r T) -> Option<&'r str> + Send + Sync + 'static,
    {
        self.push(name, false, Accessor::String(str_getter(get)), None)
    }

    pub fn strings_mut<F, S>(self, name: &str, get: F, set: S) -> Self
    where
        F: for<'r> Fn(&'r T) -> Option<&'r str> + Send + Sync + 'static,
        S: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        self.push(
            name,
            false,
            Accessor::String(str_getter(get)),
            Some(Updater::String(Box::new(set))),
        )
    }

    pub fn doubles<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&T) -> Option<f64> + Send + Sync + 'static,
    {
        self.push(name, false, Accessor::Double(Box::new(get)), None)
    }

    /// A double series the caller may write. The setter receives the raw
    /// value, sentinel included.
    pub fn doubles_mut<F, S>(self, name: &str, get: F, set: S) -> Self
    where
        F: Fn(&T) -> Option<f64> + Send + Sync + 'static,
        S: Fn(&mut T, f64) + Send + Sync + 'static,
    {
        self.push(
            name,
            false,
            Accessor::Double(Box::new(get)),
            Some(Updater::Double(Box::new(set))),
        )
    }

    pub fn ints<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&T) -> Option<i32> + Send + Sync + 'static,
    {
        self.push(name, false, Accessor::Int(Box::new(get)), None)
    }

    pub fn ints_mut<F, S>(self, name: &str, get: F, set: S) -> Self
    where
        F: Fn(&T) -> Option<i32> + Send + Sync + 'static,
        S: Fn(&mut T, i32) + Send + Sync + 'static,
    {
        self.push(
            name,
            false,
            Accessor::Int(Box::new(get)),
            Some(Updater::Int(Box::new(set))),
        )
    }

    pub fn booleans<F>(self, name: &str, get: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let accessor = Accessor::Boolean(Box::new(move |r: &T| Some(get(r))));
        self.push(name, false, accessor, None)
    }

    pub fn booleans_mut<F, S>(self, name: &str, get: F, set: S) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
        S: Fn(&mut T, bool) + Send + Sync + 'static,
    {
        let accessor = Accessor::Boolean(Box::new(move |r: &T| Some(get(r))));
        self.push(name, false, accessor, Some(Updater::Boolean(Box::new(set))))
    }

    /// Free-form string properties, emitted as extra string series after the
    /// declared ones
    pub fn properties<F>(mut self, get: F) -> Self
    where
        F: for<'r> Fn(&'r T) -> &'r BTreeMap<String, String> + Send + Sync + 'static,
    {
        self.properties = Some(Box::new(get));
        self
    }

    pub fn build(self) -> DataframeMapper<T> {
        DataframeMapper {
            columns: self.columns,
            properties: self.properties,
        }
    }
}

// =============================================================================
// Mapper
// =============================================================================

/// Converts records of `T` to dataframes and applies caller dataframes back
pub struct DataframeMapper<T> {
    columns: Vec<Column<T>>,
    properties: Option<PropertiesGetter<T>>,
}

/// A validated write of one caller series into records
enum Assignment<'m, 'a, T> {
    String(&'m StrSetter<T>, Vec<&'a str>),
    Double(&'m Setter<T, f64>, &'a [f64]),
    Int(&'m Setter<T, i32>, &'a [i32]),
    Boolean(&'m Setter<T, bool>, Vec<bool>),
}

impl<T> Assignment<'_, '_, T> {
    fn apply(&self, record: &mut T, row: usize) {
        match self {
            Assignment::String(set, values) => set(record, values[row]),
            Assignment::Double(set, values) => set(record, values[row]),
            Assignment::Int(set, values) => set(record, values[row]),
            Assignment::Boolean(set, values) => set(record, values[row]),
        }
    }
}

impl<T: 'static> DataframeMapper<T> {
    pub fn builder() -> DataframeMapperBuilder<T> {
        DataframeMapperBuilder::new()
    }

    fn column(&self, name: &str) -> Option<&Column<T>> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of the key series, if one was declared
    pub fn index_name(&self) -> Option<&str> {
        self.columns.iter().find(|c| c.index).map(|c| c.name.as_str())
    }

    /// Build a dataframe including property series
    pub fn build(&self, records: &[T]) -> BridgeResult<Dataframe> {
        self.build_with(records, true)
    }

    /// Build a dataframe: one row per record in input order, declared series
    /// first, then one string series per property key in byte order.
    pub fn build_with(&self, records: &[T], include_properties: bool) -> BridgeResult<Dataframe> {
        let mut series = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let data = match &column.accessor {
                Accessor::String(get) => ColumnData::String(
                    records
                        .iter()
                        .map(|r| String::or_absent(get(r).map(str::to_string)))
                        .collect(),
                ),
                Accessor::Double(get) => {
                    ColumnData::Double(records.iter().map(|r| f64::or_absent(get(r))).collect())
                }
                Accessor::Int(get) => {
                    ColumnData::Int(records.iter().map(|r| i32::or_absent(get(r))).collect())
                }
                Accessor::Boolean(get) => {
                    ColumnData::Boolean(records.iter().map(|r| bool::or_absent(get(r))).collect())
                }
            };
            series.push(Series {
                name: column.name.clone(),
                index: column.index,
                data,
            });
        }

        if let (true, Some(properties)) = (include_properties, &self.properties) {
            let keys: BTreeSet<&str> = records
                .iter()
                .flat_map(|r| properties(r).keys().map(String::as_str))
                .collect();
            for key in keys {
                if self.column(key).is_some() {
                    continue;
                }
                let values = records
                    .iter()
                    .map(|r| String::or_absent(properties(r).get(key).cloned()))
                    .collect();
                series.push(Series::new(key, ColumnData::String(values)));
            }
        }

        Dataframe::new(series)
    }

    /// Declared series, in output order
    pub fn metadata(&self) -> Vec<SeriesMetadata> {
        self.columns
            .iter()
            .map(|c| SeriesMetadata {
                name: c.name.clone(),
                column_type: c.accessor.column_type(),
                index: c.index,
                modifiable: c.updater.is_some(),
            })
            .collect()
    }

    /// [`DataframeMapper::metadata`] as a dataframe with series `name`
    /// (index), `type` (type tag), `is_index` and `modifiable`
    pub fn metadata_dataframe(&self) -> BridgeResult<Dataframe> {
        let metadata = self.metadata();
        Dataframe::new(vec![
            Series::index(
                "name",
                ColumnData::String(metadata.iter().map(|m| m.name.clone()).collect()),
            ),
            Series::new(
                "type",
                ColumnData::Int(metadata.iter().map(|m| m.column_type.tag()).collect()),
            ),
            Series::new(
                "is_index",
                ColumnData::Boolean(metadata.iter().map(|m| m.index).collect()),
            ),
            Series::new(
                "modifiable",
                ColumnData::Boolean(metadata.iter().map(|m| m.modifiable).collect()),
            ),
        ])
    }

    /// Apply a caller dataframe to `records`, matching rows by key.
    ///
    /// Every check (key series present, keys known and unique, series known,
    /// modifiable and of the declared type) runs before the first write, so a
    /// failed update leaves `records` untouched. Returns the number of rows
    /// applied.
    pub fn update(&self, records: &mut [T], reader: &DataframeReader<'_>) -> BridgeResult<usize> {
        let key_of = match self.columns.iter().find(|c| c.index) {
            Some(Column {
                accessor: Accessor::String(get),
                ..
            }) => get,
            _ => {
                return Err(BridgeError::InvalidInput(
                    "records have no string index series".to_string(),
                ))
            }
        };

        let index_name = reader.index_series()?.name;
        let keys = reader.index()?;

        let targets = {
            let positions: HashMap<&str, usize> = records
                .iter()
                .enumerate()
                .filter_map(|(i, r)| key_of(r).map(|k| (k, i)))
                .collect();
            let mut seen = HashSet::with_capacity(keys.len());
            let mut targets = Vec::with_capacity(keys.len());
            for row in 0..keys.len() {
                let key = keys.get(row)?;
                if !seen.insert(key) {
                    return Err(BridgeError::InvalidInput(format!(
                        "duplicate index value '{}'",
                        key
                    )));
                }
                let position = positions.get(key).copied().ok_or_else(|| {
                    BridgeError::InvalidInput(format!("element '{}' does not exist", key))
                })?;
                targets.push(position);
            }
            targets
        };

        let mut assignments = Vec::new();
        for series in reader.all_series() {
            if series.name == index_name {
                continue;
            }
            let column = self.column(series.name).ok_or_else(|| {
                BridgeError::InvalidInput(format!("unknown series '{}'", series.name))
            })?;
            let updater = column.updater.as_ref().ok_or_else(|| {
                BridgeError::InvalidInput(format!("series '{}' is not modifiable", series.name))
            })?;
            let assignment = match (updater, series.data) {
                (Updater::String(set), ColumnView::String(v)) => Assignment::String(set, v.to_vec()?),
                (Updater::Double(set), ColumnView::Double(v)) => Assignment::Double(set, v),
                (Updater::Int(set), ColumnView::Int(v)) => Assignment::Int(set, v),
                (Updater::Boolean(set), ColumnView::Boolean(v)) => Assignment::Boolean(set, v.to_vec()),
                (_, view) => {
                    return Err(BridgeError::WrongColumnType {
                        name: series.name.to_string(),
                        expected: column.accessor.column_type(),
                        actual: view.column_type(),
                    })
                }
            };
            assignments.push(assignment);
        }

        for (row, &position) in targets.iter().enumerate() {
            let record = &mut records[position];
            for assignment in &assignments {
                assignment.apply(record, row);
            }
        }
        Ok(targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::free_dataframe;

    #[derive(Debug, Clone, PartialEq)]
    struct Gen {
        id: String,
        name: Option<String>,
        p: f64,
        q: Option<f64>,
        island: Option<i32>,
        on: bool,
        properties: BTreeMap<String, String>,
    }

    fn gen(id: &str, q: Option<f64>) -> Gen {
        Gen {
            id: id.to_string(),
            name: None,
            p: 1.0,
            q,
            island: Some(0),
            on: true,
            properties: BTreeMap::new(),
        }
    }

    fn mapper() -> DataframeMapper<Gen> {
        DataframeMapper::builder()
            .index("id", |g: &Gen| g.id.as_str())
            .strings("name", |g: &Gen| g.name.as_deref())
            .doubles_mut("p", |g: &Gen| Some(g.p), |g: &mut Gen, v| g.p = v)
            .doubles_mut("q", |g: &Gen| g.q, |g: &mut Gen, v| g.q = v.present())
            .ints("island", |g: &Gen| g.island)
            .booleans_mut("on", |g: &Gen| g.on, |g: &mut Gen, v| g.on = v)
            .properties(|g: &Gen| &g.properties)
            .build()
    }

    fn update_with(records: &mut [Gen], df: Dataframe) -> BridgeResult<usize> {
        let raw = df.into_ffi().unwrap();
        let result = {
            let reader = unsafe { DataframeReader::from_raw(raw) }.unwrap();
            mapper().update(records, &reader)
        };
        unsafe { free_dataframe(raw) };
        result
    }

    #[test]
    fn test_build_substitutes_sentinels() {
        let mut records = vec![gen("g1", Some(2.0)), gen("g2", None)];
        records[1].island = None;
        let df = mapper().build(&records).unwrap();
        assert_eq!(df.row_count(), 2);

        match &df.get("q").unwrap().data {
            ColumnData::Double(v) => {
                assert_eq!(v[0], 2.0);
                assert!(v[1].is_nan());
            }
            other => panic!("Expected doubles, got {:?}", other.column_type()),
        }
        assert_eq!(df.get("island").unwrap().data, ColumnData::Int(vec![0, -99999]));
        assert_eq!(
            df.get("name").unwrap().data,
            ColumnData::String(vec![String::new(), String::new()])
        );
        assert!(df.get("id").unwrap().index);
    }

    #[test]
    fn test_property_columns_sorted_and_filled() {
        let mut records = vec![gen("g1", None), gen("g2", None)];
        records[0].properties.insert("zone".into(), "north".into());
        records[1].properties.insert("area".into(), "a1".into());
        records[1].properties.insert("p".into(), "shadowed".into());

        let df = mapper().build(&records).unwrap();
        let names: Vec<&str> = df.series().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "p", "q", "island", "on", "area", "zone"]);
        assert_eq!(
            df.get("zone").unwrap().data,
            ColumnData::String(vec!["north".to_string(), String::new()])
        );

        let without = mapper().build_with(&records, false).unwrap();
        assert_eq!(without.series_count(), 6);
    }

    #[test]
    fn test_metadata() {
        let metadata = mapper().metadata();
        assert_eq!(metadata.len(), 6);
        assert!(metadata[0].index);
        assert!(!metadata[0].modifiable);
        assert_eq!(metadata[2].column_type, ColumnType::Double);
        assert!(metadata[2].modifiable);

        let df = mapper().metadata_dataframe().unwrap();
        assert_eq!(df.row_count(), 6);
        assert!(df.get("name").unwrap().index);
    }

    #[test]
    fn test_update_by_key() {
        let mut records = vec![gen("g1", Some(1.0)), gen("g2", Some(2.0))];
        let df = Dataframe::new(vec![
            Series::index("id", ColumnData::String(vec!["g2".to_string()])),
            Series::new("q", ColumnData::Double(vec![f64::NAN])),
            Series::new("on", ColumnData::Boolean(vec![false])),
        ])
        .unwrap();

        assert_eq!(update_with(&mut records, df).unwrap(), 1);
        assert_eq!(records[0], gen("g1", Some(1.0)));
        assert_eq!(records[1].q, None);
        assert!(!records[1].on);
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let original = vec![gen("g1", Some(1.0)), gen("g2", Some(2.0))];

        let cases = vec![
            // unknown key in the second row
            Dataframe::new(vec![
                Series::index("id", ColumnData::String(vec!["g1".into(), "g9".into()])),
                Series::new("p", ColumnData::Double(vec![5.0, 6.0])),
            ]),
            // read-only series
            Dataframe::new(vec![
                Series::index("id", ColumnData::String(vec!["g1".into()])),
                Series::new("p", ColumnData::Double(vec![5.0])),
                Series::new("island", ColumnData::Int(vec![3])),
            ]),
            // wrong type
            Dataframe::new(vec![
                Series::index("id", ColumnData::String(vec!["g1".into()])),
                Series::new("p", ColumnData::Double(vec![5.0])),
                Series::new("on", ColumnData::Int(vec![1])),
            ]),
            // unknown series
            Dataframe::new(vec![
                Series::index("id", ColumnData::String(vec!["g1".into()])),
                Series::new("p", ColumnData::Double(vec![5.0])),
                Series::new("bogus", ColumnData::Double(vec![1.0])),
            ]),
            // duplicate key
            Dataframe::new(vec![
                Series::index("id", ColumnData::String(vec!["g1".into(), "g1".into()])),
                Series::new("p", ColumnData::Double(vec![5.0, 6.0])),
            ]),
        ];

        for df in cases {
            let mut records = original.clone();
            assert!(update_with(&mut records, df.unwrap()).is_err());
            assert_eq!(records, original);
        }
    }

    #[test]
    fn test_update_requires_id() {
        let mut records = vec![gen("g1", None)];
        let df = Dataframe::new(vec![Series::new("p", ColumnData::Double(vec![5.0]))]).unwrap();
        let err = update_with(&mut records, df).unwrap_err();
        assert_eq!(err.to_string(), "missing required column 'id'");
    }
}
