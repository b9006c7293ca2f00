use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const SLOT_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    Plan,
    Log,
}

impl RecordMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Log => "log",
        }
    }
}

impl std::str::FromStr for RecordMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "plan" => Ok(Self::Plan),
            "log" => Ok(Self::Log),
            other => Err(format!("mode must be plan or log, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DelegationPotential {
    #[serde(rename = "Only I Can Do This")]
    OnlyMe,
    #[serde(rename = "Someone Else Could Do This")]
    SomeoneElse,
    #[serde(rename = "Could Be Eliminated")]
    Eliminate,
}

impl DelegationPotential {
    pub const ALL: [Self; 3] = [Self::OnlyMe, Self::SomeoneElse, Self::Eliminate];

    pub fn label(self) -> &'static str {
        match self {
            Self::OnlyMe => "Only I Can Do This",
            Self::SomeoneElse => "Someone Else Could Do This",
            Self::Eliminate => "Could Be Eliminated",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Alignment {
    Aligned,
    Disruption,
}

impl Alignment {
    pub const ALL: [Self; 2] = [Self::Aligned, Self::Disruption];

    pub fn label(self) -> &'static str {
        match self {
            Self::Aligned => "Aligned (Planned Work)",
            Self::Disruption => "Disruption (Unplanned)",
        }
    }
}

/// What a purpose asks for beyond the activity description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtraInfoKind {
    #[default]
    None,
    Text,
    Person,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryColor {
    pub bg: String,
    pub border: String,
    pub text: String,
}

impl CategoryColor {
    pub fn new(bg: &str, border: &str, text: &str) -> Self {
        Self {
            bg: bg.to_string(),
            border: border.to_string(),
            text: text.to_string(),
        }
    }

    /// Styling used when a record points at a purpose the catalog no longer has.
    pub fn neutral() -> Self {
        Self::new("bg-slate-100", "border-slate-400", "text-slate-800")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PurposeCategory {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub extra_info_type: ExtraInfoKind,
    #[serde(default)]
    pub extra_info_prompt: String,
    pub color: CategoryColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_meeting: Option<bool>,
}

impl PurposeCategory {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "purpose.id")?;
        validate_non_empty(&self.label, "purpose.label")?;
        if self.extra_info_type != ExtraInfoKind::None {
            validate_non_empty(&self.extra_info_prompt, "purpose.extra_info_prompt")?;
        }
        Ok(())
    }

    /// An explicit flag wins; otherwise the label is searched for "meeting".
    pub fn counts_as_meeting(&self) -> bool {
        self.is_meeting
            .unwrap_or_else(|| self.label.to_lowercase().contains("meeting"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub name: String,
}

impl Person {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "person.id")?;
        validate_non_empty(&self.name, "person.name")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub date: NaiveDate,
    pub start_time: String,
    pub duration: u32,
}

impl TimeRange {
    pub fn new(date: NaiveDate, start_time: impl Into<String>, duration: u32) -> Self {
        Self {
            date,
            start_time: start_time.into(),
            duration,
        }
    }

    /// Shape checks only; fitting the range onto a grid is `SlotGrid::span_of`.
    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.start_time, "range.start_time")?;
        if self.duration == 0 {
            return Err("range.duration must be > 0".to_string());
        }
        if self.duration % SLOT_MINUTES != 0 {
            return Err(format!(
                "range.duration must be a multiple of {SLOT_MINUTES} minutes"
            ));
        }
        Ok(())
    }

    pub fn slot_count(&self) -> usize {
        (self.duration / SLOT_MINUTES) as usize
    }
}

/// Payload shared by every record kind the store keeps.
pub trait RecordDetails: Clone + PartialEq + Serialize + DeserializeOwned {
    const MODE: RecordMode;
    const ID_PREFIX: &'static str;

    fn purpose_id(&self) -> &str;
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    pub activity_description: String,
    #[serde(rename = "projectPurposeId")]
    pub purpose_id: String,
}

impl RecordDetails for PlanDetails {
    const MODE: RecordMode = RecordMode::Plan;
    const ID_PREFIX: &'static str = "plan";

    fn purpose_id(&self) -> &str {
        &self.purpose_id
    }

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.activity_description, "plan.activity_description")?;
        validate_non_empty(&self.purpose_id, "plan.purpose_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogDetails {
    pub activity_description: String,
    #[serde(rename = "projectPurposeId")]
    pub purpose_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose_extra_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    pub delegation_potential: DelegationPotential,
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disruption_reason: Option<String>,
}

impl LogDetails {
    /// Stored data may carry an empty string where no person was chosen.
    pub fn person_ref(&self) -> Option<&str> {
        self.person_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Applies the form rules for a save: a disruption needs a reason, and the extra
    /// info kept is only the kind the purpose asks for. Unknown purposes pass through.
    pub fn conform_to(mut self, purpose: Option<&PurposeCategory>) -> Result<Self, String> {
        if self.alignment == Alignment::Disruption
            && self
                .disruption_reason
                .as_deref()
                .is_none_or(|reason| reason.trim().is_empty())
        {
            return Err("log.disruption_reason is required for a disruption".to_string());
        }

        let Some(purpose) = purpose else {
            return Ok(self);
        };
        match purpose.extra_info_type {
            ExtraInfoKind::None => {
                self.purpose_extra_info = None;
                self.person_id = None;
            }
            ExtraInfoKind::Text => {
                if self
                    .purpose_extra_info
                    .as_deref()
                    .is_none_or(|value| value.trim().is_empty())
                {
                    return Err(format!("{} is required for this purpose", purpose.extra_info_prompt));
                }
                self.person_id = None;
            }
            ExtraInfoKind::Person => {
                if self.person_ref().is_none() {
                    return Err(format!(
                        "selecting a person for '{}' is required",
                        purpose.extra_info_prompt
                    ));
                }
                self.purpose_extra_info = None;
            }
        }
        Ok(self)
    }
}

impl RecordDetails for LogDetails {
    const MODE: RecordMode = RecordMode::Log;
    const ID_PREFIX: &'static str = "log";

    fn purpose_id(&self) -> &str {
        &self.purpose_id
    }

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.activity_description, "log.activity_description")?;
        validate_non_empty(&self.purpose_id, "log.purpose_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record<D> {
    pub id: String,
    #[serde(flatten)]
    pub range: TimeRange,
    #[serde(flatten)]
    pub details: D,
}

impl<D: RecordDetails> Record<D> {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "record.id")?;
        self.range.validate()?;
        self.details.validate()
    }

    pub fn to_draft(&self) -> RecordDraft<D> {
        RecordDraft {
            id: Some(self.id.clone()),
            range: self.range.clone(),
            details: self.details.clone(),
        }
    }
}

/// A record as the form hands it back: carries an id only when editing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordDraft<D> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub range: TimeRange,
    #[serde(flatten)]
    pub details: D,
}

impl<D> RecordDraft<D> {
    pub fn new(range: TimeRange, details: D) -> Self {
        Self {
            id: None,
            range,
            details,
        }
    }

    pub fn for_selection(selection: &Selection, details: D) -> Self {
        Self::new(selection.to_range(), details)
    }

    pub fn normalized_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

pub type PlanRecord = Record<PlanDetails>;
pub type LogRecord = Record<LogDetails>;
pub type PlanDraft = RecordDraft<PlanDetails>;
pub type LogDraft = RecordDraft<LogDetails>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub date: NaiveDate,
    pub start_time: String,
    pub duration: u32,
}

impl Selection {
    pub fn to_range(&self) -> TimeRange {
        TimeRange::new(self.date, self.start_time.clone(), self.duration)
    }
}

/// Initial form values for a new log record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogPrefill {
    pub selection: Selection,
    pub activity_description: String,
    pub purpose_id: Option<String>,
    pub delegation_potential: DelegationPotential,
    pub alignment: Alignment,
}

impl LogPrefill {
    /// A free-hand selection was not planned, so it starts out as a disruption.
    pub fn for_selection(selection: Selection) -> Self {
        Self {
            selection,
            activity_description: String::new(),
            purpose_id: None,
            delegation_potential: DelegationPotential::OnlyMe,
            alignment: Alignment::Disruption,
        }
    }

    pub fn from_plan(plan: &PlanRecord) -> Self {
        Self {
            selection: Selection {
                date: plan.range.date,
                start_time: plan.range.start_time.clone(),
                duration: plan.range.duration,
            },
            activity_description: plan.details.activity_description.clone(),
            purpose_id: Some(plan.details.purpose_id.clone()),
            delegation_potential: DelegationPotential::OnlyMe,
            alignment: Alignment::Aligned,
        }
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() || hour_str.len() != 2 || minute_str.len() != 2 {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

pub fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}
