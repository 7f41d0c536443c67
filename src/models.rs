//! Raw CSV rows, enriched records and the row types each view returns.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// One survey row exactly as it appears in a source CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSurveyRow {
    #[serde(rename = "Employee ID", default)]
    pub employee_id: Option<String>,
    #[serde(rename = "Date of Joining", default)]
    pub date_of_joining: Option<String>,
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
    #[serde(rename = "Company Type", default)]
    pub company_type: Option<String>,
    #[serde(rename = "WFH Setup Available", default)]
    pub wfh_setup_available: Option<String>,
    #[serde(rename = "Designation", default, deserialize_with = "csv::invalid_option")]
    pub designation: Option<f64>,
    #[serde(
        rename = "Resource Allocation",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub resource_allocation: Option<f64>,
    #[serde(
        rename = "Mental Fatigue Score",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub mental_fatigue_score: Option<f64>,
    #[serde(rename = "Burn Rate", default, deserialize_with = "csv::invalid_option")]
    pub burn_rate: Option<f64>,
}

pub const REQUIRED_SURVEY_COLUMNS: [&str; 5] = [
    "Mental Fatigue Score",
    "Designation",
    "Resource Allocation",
    "Gender",
    "Burn Rate",
];

/// Synthetic team, displayed as `T<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamId(pub usize);

impl TeamId {
    /// Accepts only the canonical form produced by `Display`.
    pub fn parse(label: &str) -> Option<Self> {
        let digits = label.trim().strip_prefix('T')?;
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return None;
        }
        digits.parse().ok().map(TeamId)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl Serialize for TeamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FatigueBucket {
    Below2,
    From2To4,
    From4To6,
    From6To8,
    Above8,
}

impl FatigueBucket {
    pub const ALL: [FatigueBucket; 5] = [
        FatigueBucket::Below2,
        FatigueBucket::From2To4,
        FatigueBucket::From4To6,
        FatigueBucket::From6To8,
        FatigueBucket::Above8,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FatigueBucket::Below2 => "<2",
            FatigueBucket::From2To4 => "2-4",
            FatigueBucket::From4To6 => "4-6",
            FatigueBucket::From6To8 => "6-8",
            FatigueBucket::Above8 => ">8",
        }
    }
}

impl Serialize for FatigueBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A cleaned, enriched survey row.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub employee_code: String,
    pub team: TeamId,
    pub employee_id: Option<String>,
    pub date_of_joining: Option<String>,
    pub gender: String,
    pub company_type: Option<String>,
    pub wfh_setup_available: Option<String>,
    pub designation: f64,
    pub resource_allocation: f64,
    pub mental_fatigue_score: f64,
    pub burn_rate: f64,
    pub fatigue_bucket: FatigueBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamScore {
    pub team: TeamId,
    pub mean_score: f64,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketCount {
    pub bucket: FatigueBucket,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub gender: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeniorityPoint {
    pub employee_code: String,
    pub team: TeamId,
    pub designation: f64,
    pub mental_fatigue_score: f64,
    pub resource_allocation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstitutionRecord {
    pub country: String,
    pub hospitals_per_100k: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BurdenRecord {
    pub cause_name: String,
    pub location_name: String,
    pub year: i32,
    pub val: f64,
}
