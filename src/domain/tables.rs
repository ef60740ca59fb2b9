//! Static warehouse table registry
//!
//! Column lists, natural keys and the merge dependency order for every
//! warehouse table. Column order here is the contract for both the staging
//! DDL and the bulk-load protocol; the connector builds its COPY and merge
//! statements from these entries rather than interrogating the catalog at
//! run time.

/// Metadata for one warehouse table
#[derive(Debug)]
pub struct TableSpec {
    /// Target table name
    pub name: &'static str,
    /// All columns, in staging DDL order
    pub columns: &'static [&'static str],
    /// Natural key columns (the merge conflict target)
    pub key_columns: &'static [&'static str],
}

impl TableSpec {
    /// Name of the matching staging table
    pub fn staging_name(&self) -> String {
        format!("staging_{}", self.name)
    }

    /// Columns that are not part of the natural key
    pub fn non_key_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !self.key_columns.contains(c))
            .copied()
            .collect()
    }
}

pub static RAW_STUDIES: TableSpec = TableSpec {
    name: "raw_studies",
    columns: &[
        "nct_id",
        "last_updated_api",
        "last_updated_api_str",
        "ingestion_timestamp",
        "payload",
    ],
    key_columns: &["nct_id"],
};

pub static STUDIES: TableSpec = TableSpec {
    name: "studies",
    columns: &[
        "nct_id",
        "brief_title",
        "official_title",
        "overall_status",
        "start_date",
        "start_date_str",
        "primary_completion_date",
        "primary_completion_date_str",
        "study_type",
        "brief_summary",
    ],
    key_columns: &["nct_id"],
};

pub static SPONSORS: TableSpec = TableSpec {
    name: "sponsors",
    columns: &["nct_id", "agency_class", "name", "is_lead"],
    key_columns: &["nct_id", "name", "agency_class"],
};

pub static CONDITIONS: TableSpec = TableSpec {
    name: "conditions",
    columns: &["nct_id", "name"],
    key_columns: &["nct_id", "name"],
};

pub static INTERVENTIONS: TableSpec = TableSpec {
    name: "interventions",
    columns: &["nct_id", "intervention_type", "name", "description"],
    key_columns: &["nct_id", "intervention_type", "name"],
};

pub static INTERVENTION_ARM_GROUPS: TableSpec = TableSpec {
    name: "intervention_arm_groups",
    columns: &["nct_id", "intervention_name", "arm_group_label"],
    key_columns: &["nct_id", "intervention_name", "arm_group_label"],
};

pub static DESIGN_OUTCOMES: TableSpec = TableSpec {
    name: "design_outcomes",
    columns: &["nct_id", "outcome_type", "measure", "time_frame", "description"],
    key_columns: &["nct_id", "outcome_type", "measure"],
};

/// All tables in merge dependency order.
///
/// `raw_studies` first (every child FK points at it), then `studies`, then
/// the children in any order.
pub static MERGE_ORDER: [&TableSpec; 7] = [
    &RAW_STUDIES,
    &STUDIES,
    &SPONSORS,
    &CONDITIONS,
    &INTERVENTIONS,
    &INTERVENTION_ARM_GROUPS,
    &DESIGN_OUTCOMES,
];

/// Look up a table by name
pub fn by_name(name: &str) -> Option<&'static TableSpec> {
    MERGE_ORDER.iter().find(|t| t.name == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_name() {
        assert_eq!(RAW_STUDIES.staging_name(), "staging_raw_studies");
        assert_eq!(
            INTERVENTION_ARM_GROUPS.staging_name(),
            "staging_intervention_arm_groups"
        );
    }

    #[test]
    fn test_key_columns_are_subset_of_columns() {
        for table in MERGE_ORDER {
            for key in table.key_columns {
                assert!(
                    table.columns.contains(key),
                    "{}: key column {} missing from columns",
                    table.name,
                    key
                );
            }
        }
    }

    #[test]
    fn test_non_key_columns() {
        assert_eq!(
            STUDIES.non_key_columns(),
            vec![
                "brief_title",
                "official_title",
                "overall_status",
                "start_date",
                "start_date_str",
                "primary_completion_date",
                "primary_completion_date_str",
                "study_type",
                "brief_summary",
            ]
        );

        // Pure-key tables have nothing to update on conflict
        assert!(CONDITIONS.non_key_columns().is_empty());
        assert!(INTERVENTION_ARM_GROUPS.non_key_columns().is_empty());
    }

    #[test]
    fn test_merge_order_starts_with_parents() {
        assert_eq!(MERGE_ORDER[0].name, "raw_studies");
        assert_eq!(MERGE_ORDER[1].name, "studies");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("sponsors").unwrap().name, "sponsors");
        assert!(by_name("nonexistent").is_none());
    }
}
