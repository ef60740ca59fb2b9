//! Typed study records deserialized from the ClinicalTrials.gov V2 API
//!
//! These types mirror the subset of the API schema the warehouse consumes.
//! Unknown JSON fields are tolerated for forward compatibility; a field that
//! is present with the wrong JSON kind fails deserialization, which is how
//! structural validation is enforced.
//!
//! Dates stay in their original string form here. Partial dates (`YYYY-MM`,
//! `YYYY`) are legal API values and are only parsed during transformation.

use serde::Deserialize;

/// One study as returned in the `studies` array of a V2 API page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub protocol_section: ProtocolSection,
    #[serde(default)]
    pub has_results: Option<bool>,
}

/// The `protocolSection` object
///
/// Identification and status modules are the only ones the API guarantees;
/// everything else is optional per study.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSection {
    pub identification_module: IdentificationModule,
    pub status_module: StatusModule,
    #[serde(default)]
    pub sponsor_collaborators_module: Option<SponsorCollaboratorsModule>,
    #[serde(default)]
    pub description_module: Option<DescriptionModule>,
    #[serde(default)]
    pub conditions_module: Option<ConditionsModule>,
    #[serde(default)]
    pub design_module: Option<DesignModule>,
    #[serde(default)]
    pub arms_interventions_module: Option<ArmsInterventionsModule>,
    #[serde(default)]
    pub outcomes_module: Option<OutcomesModule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationModule {
    pub nct_id: String,
    #[serde(default)]
    pub brief_title: Option<String>,
    #[serde(default)]
    pub official_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusModule {
    #[serde(default)]
    pub overall_status: Option<String>,
    #[serde(default)]
    pub start_date_struct: Option<DateStruct>,
    #[serde(default)]
    pub primary_completion_date_struct: Option<DateStruct>,
    #[serde(default)]
    pub last_update_post_date_struct: Option<DateStruct>,
}

/// API date wrapper: the `date` string may be a full date, year-month or year
#[derive(Debug, Clone, Deserialize)]
pub struct DateStruct {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "type")]
    pub date_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorCollaboratorsModule {
    #[serde(default)]
    pub lead_sponsor: Option<Sponsor>,
    #[serde(default)]
    pub collaborators: Option<Vec<Sponsor>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sponsor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "class")]
    pub agency_class: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionsModule {
    #[serde(default)]
    pub conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignModule {
    #[serde(default)]
    pub study_type: Option<String>,
    #[serde(default)]
    pub phases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionModule {
    #[serde(default)]
    pub brief_summary: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmsInterventionsModule {
    #[serde(default)]
    pub arm_groups: Option<Vec<ArmGroup>>,
    #[serde(default)]
    pub interventions: Option<Vec<Intervention>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmGroup {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    #[serde(default, rename = "type")]
    pub intervention_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub arm_group_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomesModule {
    #[serde(default)]
    pub primary_outcomes: Option<Vec<Outcome>>,
    #[serde(default)]
    pub secondary_outcomes: Option<Vec<Outcome>>,
    #[serde(default)]
    pub other_outcomes: Option<Vec<Outcome>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    #[serde(default)]
    pub measure: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time_frame: Option<String>,
}

impl Study {
    /// The study's NCT ID
    pub fn nct_id(&self) -> &str {
        &self.protocol_section.identification_module.nct_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_study_deserializes() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000001" },
                "statusModule": { "overallStatus": "COMPLETED" }
            },
            "hasResults": false
        });

        let study: Study = serde_json::from_value(raw).unwrap();
        assert_eq!(study.nct_id(), "NCT00000001");
        assert_eq!(
            study.protocol_section.status_module.overall_status.as_deref(),
            Some("COMPLETED")
        );
        assert!(study.protocol_section.conditions_module.is_none());
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000002" },
                "statusModule": {},
                "oversightModule": { "isFdaRegulatedDrug": true }
            },
            "derivedSection": { "miscInfoModule": {} },
            "futureField": [1, 2, 3]
        });

        let study: Study = serde_json::from_value(raw).unwrap();
        assert_eq!(study.nct_id(), "NCT00000002");
    }

    #[test]
    fn test_missing_nct_id_is_rejected() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": {},
                "statusModule": {}
            }
        });

        assert!(serde_json::from_value::<Study>(raw).is_err());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        // briefTitle must be a string, not an array
        let raw = json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT00000003",
                    "briefTitle": ["not", "a", "string"]
                },
                "statusModule": {}
            }
        });

        assert!(serde_json::from_value::<Study>(raw).is_err());
    }

    #[test]
    fn test_sponsor_class_alias() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000004" },
                "statusModule": {},
                "sponsorCollaboratorsModule": {
                    "leadSponsor": { "name": "Acme Pharma", "class": "INDUSTRY" },
                    "collaborators": [
                        { "name": "University Hospital", "class": "OTHER" }
                    ]
                }
            }
        });

        let study: Study = serde_json::from_value(raw).unwrap();
        let module = study
            .protocol_section
            .sponsor_collaborators_module
            .unwrap();
        assert_eq!(
            module.lead_sponsor.unwrap().agency_class.as_deref(),
            Some("INDUSTRY")
        );
        assert_eq!(module.collaborators.unwrap().len(), 1);
    }

    #[test]
    fn test_intervention_arm_group_labels() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000005" },
                "statusModule": {},
                "armsInterventionsModule": {
                    "interventions": [{
                        "type": "DRUG",
                        "name": "Aspirin",
                        "armGroupLabels": ["Arm A", "Arm B"]
                    }]
                }
            }
        });

        let study: Study = serde_json::from_value(raw).unwrap();
        let interventions = study
            .protocol_section
            .arms_interventions_module
            .unwrap()
            .interventions
            .unwrap();
        assert_eq!(interventions[0].arm_group_labels.as_ref().unwrap().len(), 2);
    }
}
