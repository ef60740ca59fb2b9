//! Warehouse row types
//!
//! One struct per target table, with fields in staging-DDL column order.
//! The transformer fills vectors of these and the connector streams them
//! straight into the bulk-load protocol; no intermediate tabular object
//! exists in between.

use crate::domain::tables::{self, TableSpec};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Row for `raw_studies`: the verbatim payload plus replay metadata
#[derive(Debug, Clone)]
pub struct RawStudyRow {
    pub nct_id: String,
    pub last_updated_api: Option<DateTime<Utc>>,
    pub last_updated_api_str: Option<String>,
    pub ingestion_timestamp: DateTime<Utc>,
    pub payload: Value,
}

/// Row for `studies`
///
/// Date columns keep both the best-effort parsed date and the original
/// string, since the API emits partial dates like `2024-03` or `2024`.
#[derive(Debug, Clone)]
pub struct StudyRow {
    pub nct_id: String,
    pub brief_title: Option<String>,
    pub official_title: Option<String>,
    pub overall_status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_date_str: Option<String>,
    pub primary_completion_date: Option<NaiveDate>,
    pub primary_completion_date_str: Option<String>,
    pub study_type: Option<String>,
    pub brief_summary: Option<String>,
}

/// Row for `sponsors`
#[derive(Debug, Clone)]
pub struct SponsorRow {
    pub nct_id: String,
    pub agency_class: Option<String>,
    pub name: Option<String>,
    pub is_lead: bool,
}

/// Row for `conditions`
#[derive(Debug, Clone)]
pub struct ConditionRow {
    pub nct_id: String,
    pub name: String,
}

/// Row for `interventions`
#[derive(Debug, Clone)]
pub struct InterventionRow {
    pub nct_id: String,
    pub intervention_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Row for `intervention_arm_groups`
#[derive(Debug, Clone)]
pub struct InterventionArmGroupRow {
    pub nct_id: String,
    pub intervention_name: Option<String>,
    pub arm_group_label: String,
}

/// Row for `design_outcomes`
#[derive(Debug, Clone)]
pub struct DesignOutcomeRow {
    pub nct_id: String,
    pub outcome_type: String,
    pub measure: Option<String>,
    pub time_frame: Option<String>,
    pub description: Option<String>,
}

/// A batch of rows destined for one staging table
///
/// The variant identifies the table, so a batch can be handed to the
/// connector without a separate table-name argument getting out of sync
/// with the row type.
#[derive(Debug, Clone)]
pub enum TableBatch {
    RawStudies(Vec<RawStudyRow>),
    Studies(Vec<StudyRow>),
    Sponsors(Vec<SponsorRow>),
    Conditions(Vec<ConditionRow>),
    Interventions(Vec<InterventionRow>),
    InterventionArmGroups(Vec<InterventionArmGroupRow>),
    DesignOutcomes(Vec<DesignOutcomeRow>),
}

impl TableBatch {
    /// The table registry entry this batch belongs to
    pub fn spec(&self) -> &'static TableSpec {
        match self {
            TableBatch::RawStudies(_) => &tables::RAW_STUDIES,
            TableBatch::Studies(_) => &tables::STUDIES,
            TableBatch::Sponsors(_) => &tables::SPONSORS,
            TableBatch::Conditions(_) => &tables::CONDITIONS,
            TableBatch::Interventions(_) => &tables::INTERVENTIONS,
            TableBatch::InterventionArmGroups(_) => &tables::INTERVENTION_ARM_GROUPS,
            TableBatch::DesignOutcomes(_) => &tables::DESIGN_OUTCOMES,
        }
    }

    /// Number of rows in the batch
    pub fn len(&self) -> usize {
        match self {
            TableBatch::RawStudies(rows) => rows.len(),
            TableBatch::Studies(rows) => rows.len(),
            TableBatch::Sponsors(rows) => rows.len(),
            TableBatch::Conditions(rows) => rows.len(),
            TableBatch::Interventions(rows) => rows.len(),
            TableBatch::InterventionArmGroups(rows) => rows.len(),
            TableBatch::DesignOutcomes(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_reports_spec_and_len() {
        let batch = TableBatch::Conditions(vec![
            ConditionRow {
                nct_id: "NCT00000001".to_string(),
                name: "Hypertension".to_string(),
            },
            ConditionRow {
                nct_id: "NCT00000001".to_string(),
                name: "Diabetes".to_string(),
            },
        ]);

        assert_eq!(batch.spec().name, "conditions");
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let batch = TableBatch::RawStudies(vec![]);
        assert!(batch.is_empty());
        assert_eq!(batch.spec().name, "raw_studies");
    }
}
