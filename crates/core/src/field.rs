use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Separator between per-source segments of a merged field.
pub const SEGMENT_JOINER: &str = "<br>";
/// Separator between per-source segments of the description field.
pub const DESCRIPTION_JOINER: &str = " | ";
/// Separator between attachment paths.
pub const ATTACHMENT_JOINER: &str = ", ";
/// Separator between items inside one multi-value segment.
pub const MULTI_VALUE_JOINER: &str = ", ";

/// How a field is folded during merge and split during unmerge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Description,
    MultiValue,
    AttachmentPath,
}

/// The fixed column catalogue of a complaint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    VictimName,
    VictimGender,
    VictimAge,
    VictimEmail,
    VictimMobileNumbers,
    AcknowledgmentNo,
    CctnsNo,
    FirNo,
    DateOfComplaint,
    DateOfIncident,
    Time,
    CategoryOfComplaint,
    SubCategoryOfComplaint,
    PoliceStation,
    InvestigationOfficer,
    LostAmount,
    LienAmount,
    ItAct,
    Bns,
    ActionTaken,
    ForwardDate,
    OutNo,
    SuspectName,
    SuspectGender,
    SuspectAge,
    SuspectEmail,
    SuspectMobileNumbers,
    SuspectSocialHandles,
    SuspectAccNo,
    IfscCode,
    SuspectAddress,
    Description,
    FileName,
    FilePath,
}

impl Field {
    /// Every field, in column order.
    pub const ALL: [Field; 34] = [
        Field::VictimName,
        Field::VictimGender,
        Field::VictimAge,
        Field::VictimEmail,
        Field::VictimMobileNumbers,
        Field::AcknowledgmentNo,
        Field::CctnsNo,
        Field::FirNo,
        Field::DateOfComplaint,
        Field::DateOfIncident,
        Field::Time,
        Field::CategoryOfComplaint,
        Field::SubCategoryOfComplaint,
        Field::PoliceStation,
        Field::InvestigationOfficer,
        Field::LostAmount,
        Field::LienAmount,
        Field::ItAct,
        Field::Bns,
        Field::ActionTaken,
        Field::ForwardDate,
        Field::OutNo,
        Field::SuspectName,
        Field::SuspectGender,
        Field::SuspectAge,
        Field::SuspectEmail,
        Field::SuspectMobileNumbers,
        Field::SuspectSocialHandles,
        Field::SuspectAccNo,
        Field::IfscCode,
        Field::SuspectAddress,
        Field::Description,
        Field::FileName,
        Field::FilePath,
    ];

    /// Field whose segment count decides how many records an unmerge yields.
    pub const REFERENCE: Field = Field::VictimName;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VictimName => "victim_name",
            Self::VictimGender => "victim_gender",
            Self::VictimAge => "victim_age",
            Self::VictimEmail => "victim_email",
            Self::VictimMobileNumbers => "victim_mobile_numbers",
            Self::AcknowledgmentNo => "acknowledgment_no",
            Self::CctnsNo => "cctns_no",
            Self::FirNo => "fir_no",
            Self::DateOfComplaint => "date_of_complaint",
            Self::DateOfIncident => "date_of_incident",
            Self::Time => "time",
            Self::CategoryOfComplaint => "category_of_complaint",
            Self::SubCategoryOfComplaint => "sub_category_of_complaint",
            Self::PoliceStation => "police_station",
            Self::InvestigationOfficer => "investigation_officer",
            Self::LostAmount => "lost_amount",
            Self::LienAmount => "lien_amount",
            Self::ItAct => "it_act",
            Self::Bns => "bns",
            Self::ActionTaken => "action_taken",
            Self::ForwardDate => "forward_date",
            Self::OutNo => "out_no",
            Self::SuspectName => "suspect_name",
            Self::SuspectGender => "suspect_gender",
            Self::SuspectAge => "suspect_age",
            Self::SuspectEmail => "suspect_email",
            Self::SuspectMobileNumbers => "suspect_mobile_numbers",
            Self::SuspectSocialHandles => "suspect_social_handles",
            Self::SuspectAccNo => "suspect_acc_no",
            Self::IfscCode => "ifsc_code",
            Self::SuspectAddress => "suspect_address",
            Self::Description => "description",
            Self::FileName => "file_name",
            Self::FilePath => "file_path",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CoreError::UnknownField(s.to_string()))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Description => FieldKind::Description,
            Self::VictimMobileNumbers
            | Self::SuspectMobileNumbers
            | Self::SuspectSocialHandles
            | Self::SuspectAccNo
            | Self::IfscCode => FieldKind::MultiValue,
            Self::FilePath => FieldKind::AttachmentPath,
            _ => FieldKind::Scalar,
        }
    }

    /// Joinable fields carry exactly one segment per source in a merged record.
    pub fn is_joinable(&self) -> bool {
        self.kind() != FieldKind::AttachmentPath
    }

    /// Separator used to fold/split this field, `None` for attachment paths.
    pub fn joiner(&self) -> Option<&'static str> {
        match self.kind() {
            FieldKind::Description => Some(DESCRIPTION_JOINER),
            FieldKind::Scalar | FieldKind::MultiValue => Some(SEGMENT_JOINER),
            FieldKind::AttachmentPath => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_column() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.as_str()).unwrap(), field);
        }
        assert!(Field::parse("status").is_err());
    }

    #[test]
    fn joiners_by_kind() {
        assert_eq!(Field::VictimName.joiner(), Some("<br>"));
        assert_eq!(Field::SuspectAccNo.joiner(), Some("<br>"));
        assert_eq!(Field::Description.joiner(), Some(" | "));
        assert_eq!(Field::FilePath.joiner(), None);
        assert!(!Field::FilePath.is_joinable());
        assert!(Field::FileName.is_joinable());
    }

    #[test]
    fn serde_names_match_columns() {
        let json = serde_json::to_string(&Field::SubCategoryOfComplaint).unwrap();
        assert_eq!(json, "\"sub_category_of_complaint\"");
    }
}
