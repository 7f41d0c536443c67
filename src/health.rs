//! Public-health side tables behind the "Causes" page: mental hospitals
//! per country and a Global Burden of Disease extract.

use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::models::{BurdenRecord, InstitutionRecord};
use crate::source::Source;

/// GBD `measure_id` for incidence.
const INCIDENCE_MEASURE: i64 = 6;
/// GBD `metric_id` for percent.
const PERCENT_METRIC: i64 = 2;

const INSTITUTION_COLUMNS: [&str; 2] = ["Country", "Mental hospitals (per 100 000 population)"];
const BURDEN_COLUMNS: [&str; 6] = [
    "measure_id",
    "metric_id",
    "cause_name",
    "location_name",
    "year",
    "val",
];

#[derive(Debug, Deserialize)]
struct RawInstitutionRow {
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(
        rename = "Mental hospitals (per 100 000 population)",
        deserialize_with = "csv::invalid_option"
    )]
    hospitals_per_100k: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawBurdenRow {
    #[serde(deserialize_with = "csv::invalid_option")]
    measure_id: Option<i64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    metric_id: Option<i64>,
    cause_name: Option<String>,
    location_name: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    year: Option<i32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    val: Option<f64>,
}

#[derive(Debug, Default)]
pub struct HealthStats {
    institutions: Vec<InstitutionRecord>,
    burden: Vec<BurdenRecord>,
}

impl HealthStats {
    pub async fn load(institutions: Option<&Source>, burden: Option<&Source>) -> Result<Self> {
        let institutions = match institutions {
            Some(source) => {
                let rows: Vec<RawInstitutionRow> = source.load_rows(&INSTITUTION_COLUMNS).await?;
                let rows = clean_institutions(rows);
                info!(source = %source, rows = rows.len(), "loaded institution source");
                rows
            }
            None => Vec::new(),
        };
        let burden = match burden {
            Some(source) => {
                let rows: Vec<RawBurdenRow> = source.load_rows(&BURDEN_COLUMNS).await?;
                let rows = clean_burden(rows);
                info!(source = %source, rows = rows.len(), "loaded burden source");
                rows
            }
            None => Vec::new(),
        };
        Ok(Self::new(institutions, burden))
    }

    pub fn new(institutions: Vec<InstitutionRecord>, burden: Vec<BurdenRecord>) -> Self {
        Self {
            institutions,
            burden,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty() && self.burden.is_empty()
    }

    pub fn has_institutions(&self) -> bool {
        !self.institutions.is_empty()
    }

    pub fn has_burden(&self) -> bool {
        !self.burden.is_empty()
    }

    pub fn countries(&self) -> Vec<String> {
        distinct(self.institutions.iter().map(|row| &row.country))
    }

    pub fn causes(&self) -> Vec<String> {
        distinct(self.burden.iter().map(|row| &row.cause_name))
    }

    pub fn locations(&self) -> Vec<String> {
        distinct(self.burden.iter().map(|row| &row.location_name))
    }

    /// Selected countries, most hospitals first.
    pub fn hospitals_by_country(&self, countries: &HashSet<String>) -> Vec<&InstitutionRecord> {
        let mut rows: Vec<&InstitutionRecord> = self
            .institutions
            .iter()
            .filter(|row| countries.contains(&row.country))
            .collect();
        rows.sort_by(|a, b| b.hospitals_per_100k.total_cmp(&a.hospitals_per_100k));
        rows
    }

    /// Yearly values of one cause for the selected locations.
    pub fn cause_trend(&self, cause: &str, locations: &HashSet<String>) -> Vec<&BurdenRecord> {
        let mut rows: Vec<&BurdenRecord> = self
            .burden
            .iter()
            .filter(|row| row.cause_name == cause && locations.contains(&row.location_name))
            .collect();
        rows.sort_by(|a, b| {
            a.location_name
                .cmp(&b.location_name)
                .then(a.year.cmp(&b.year))
        });
        rows
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values.cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

fn clean_institutions(rows: Vec<RawInstitutionRow>) -> Vec<InstitutionRecord> {
    rows.into_iter()
        .filter_map(|row| {
            Some(InstitutionRecord {
                country: row.country?,
                hospitals_per_100k: row.hospitals_per_100k.filter(|v| v.is_finite())?,
            })
        })
        .collect()
}

fn clean_burden(rows: Vec<RawBurdenRow>) -> Vec<BurdenRecord> {
    rows.into_iter()
        .filter(|row| {
            row.measure_id == Some(INCIDENCE_MEASURE) && row.metric_id == Some(PERCENT_METRIC)
        })
        .filter_map(|row| {
            Some(BurdenRecord {
                cause_name: row.cause_name?,
                location_name: row.location_name?,
                year: row.year?,
                val: row.val.filter(|v| v.is_finite())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_rows;

    const BURDEN_CSV: &str = "measure_id,measure_name,location_name,cause_name,metric_id,year,val\n\
        6,Incidence,Global,Mental disorders,2,2001,0.031\n\
        6,Incidence,Global,Mental disorders,2,2000,0.030\n\
        6,Incidence,Switzerland,Mental disorders,2,2000,0.028\n\
        6,Incidence,Australia,Mental disorders,2,2000,0.035\n\
        6,Incidence,Global,Mental disorders,1,2000,1200\n\
        1,Deaths,Global,Mental disorders,2,2000,0.001\n\
        6,Incidence,Global,Anxiety disorders,2,2000,0.010\n";

    const INSTITUTION_CSV: &str = "Country,Year,Mental hospitals (per 100 000 population)\n\
        Australia,2016,0.1\n\
        Switzerland,2016,0.65\n\
        Japan,2016,0.85\n\
        Narnia,2016,\n";

    fn stats() -> HealthStats {
        let burden: Vec<RawBurdenRow> = parse_rows("gbd.csv", BURDEN_CSV, &BURDEN_COLUMNS).unwrap();
        let institutions: Vec<RawInstitutionRow> =
            parse_rows("mi.csv", INSTITUTION_CSV, &INSTITUTION_COLUMNS).unwrap();
        HealthStats::new(clean_institutions(institutions), clean_burden(burden))
    }

    fn set(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn keeps_only_incidence_percent_rows() {
        let stats = stats();
        assert_eq!(stats.causes(), vec!["Anxiety disorders", "Mental disorders"]);
        assert_eq!(stats.locations(), vec!["Australia", "Global", "Switzerland"]);
    }

    #[test]
    fn cause_trend_sorts_by_location_then_year() {
        let stats = stats();
        let trend = stats.cause_trend("Mental disorders", &set(&["Global", "Australia"]));
        let keys: Vec<(&str, i32)> = trend
            .iter()
            .map(|row| (row.location_name.as_str(), row.year))
            .collect();
        assert_eq!(
            keys,
            vec![("Australia", 2000), ("Global", 2000), ("Global", 2001)]
        );
        assert!(stats.cause_trend("Mental disorders", &HashSet::new()).is_empty());
    }

    #[test]
    fn hospitals_sorted_descending_and_incomplete_rows_dropped() {
        let stats = stats();
        assert_eq!(stats.countries(), vec!["Australia", "Japan", "Switzerland"]);
        let rows = stats.hospitals_by_country(&set(&["Australia", "Japan", "Switzerland"]));
        let countries: Vec<&str> = rows.iter().map(|row| row.country.as_str()).collect();
        assert_eq!(countries, vec!["Japan", "Switzerland", "Australia"]);
    }

    #[tokio::test]
    async fn loading_nothing_yields_empty_stats() {
        let stats = HealthStats::load(None, None).await.unwrap();
        assert!(stats.is_empty());
    }
}
