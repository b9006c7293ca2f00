use crate::domain::catalog::Catalog;
use crate::domain::models::{Alignment, CategoryColor, DelegationPotential, LogDetails, LogRecord};
use crate::domain::record_store::DayBook;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub const UNCATEGORIZED_ID: &str = "uncategorized";
const UNCATEGORIZED_LABEL: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReportWindow {
    Today,
    Yesterday,
    #[default]
    ThisWeek,
    ThisMonth,
    LastMonth,
}

impl ReportWindow {
    pub const ALL: [Self; 5] = [
        Self::Today,
        Self::Yesterday,
        Self::ThisWeek,
        Self::ThisMonth,
        Self::LastMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::ThisWeek => "thisWeek",
            Self::ThisMonth => "thisMonth",
            Self::LastMonth => "lastMonth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::ThisWeek => "This Week",
            Self::ThisMonth => "This Month",
            Self::LastMonth => "Last Month",
        }
    }

    /// Weeks start on Monday; last month is the calendar month before today's.
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Today => date == today,
            Self::Yesterday => today.checked_sub_days(Days::new(1)) == Some(date),
            Self::ThisWeek => {
                let monday = today
                    .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                    .unwrap_or(today);
                let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
                monday <= date && date <= sunday
            }
            Self::ThisMonth => same_month(date, today),
            Self::LastMonth => today
                .checked_sub_months(Months::new(1))
                .is_some_and(|previous| same_month(date, previous)),
        }
    }
}

impl FromStr for ReportWindow {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|window| window.as_str() == value.trim())
            .ok_or_else(|| format!("unknown report window: {value}"))
    }
}

fn same_month(left: NaiveDate, right: NaiveDate) -> bool {
    left.year() == right.year() && left.month() == right.month()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurposeStat {
    pub id: String,
    pub label: String,
    pub color: CategoryColor,
    pub duration: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationStat<T> {
    pub value: T,
    pub label: &'static str,
    pub duration: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonStat {
    pub id: String,
    pub name: String,
    pub total: u32,
    pub planned_meeting: u32,
    pub unplanned_meeting: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub window: ReportWindow,
    pub today: NaiveDate,
    pub total_duration: u32,
    pub total_formatted: String,
    pub record_count: usize,
    pub purposes: Vec<PurposeStat>,
    pub delegation: Vec<ClassificationStat<DelegationPotential>>,
    pub alignment: Vec<ClassificationStat<Alignment>>,
    pub people: Vec<PersonStat>,
}

impl ReportSummary {
    pub fn share_of(&self, alignment: Alignment) -> f64 {
        self.alignment
            .iter()
            .find(|stat| stat.value == alignment)
            .map(|stat| stat.percentage)
            .unwrap_or(0.0)
    }

    pub fn aligned_share(&self) -> f64 {
        self.share_of(Alignment::Aligned)
    }

    pub fn disruption_share(&self) -> f64 {
        self.share_of(Alignment::Disruption)
    }
}

#[derive(Default)]
struct PersonTotals {
    total: u32,
    planned_meeting: u32,
    unplanned_meeting: u32,
}

pub fn build_report(
    entries: &DayBook<LogDetails>,
    catalog: &Catalog,
    window: ReportWindow,
    today: NaiveDate,
) -> ReportSummary {
    let selected = entries
        .records()
        .filter(|record| window.contains(record.range.date, today))
        .collect::<Vec<&LogRecord>>();

    let mut purpose_totals = HashMap::<&str, u32>::new();
    let mut uncategorized = 0u32;
    let mut delegation_totals = HashMap::<DelegationPotential, u32>::new();
    let mut alignment_totals = HashMap::<Alignment, u32>::new();
    let mut person_totals = HashMap::<&str, PersonTotals>::new();
    let mut total_duration = 0u32;

    for record in &selected {
        let duration = record.range.duration;
        let details = &record.details;
        total_duration += duration;
        *delegation_totals
            .entry(details.delegation_potential)
            .or_default() += duration;
        *alignment_totals.entry(details.alignment).or_default() += duration;

        let purpose = catalog.purpose(&details.purpose_id);
        match purpose {
            Some(purpose) => *purpose_totals.entry(purpose.id.as_str()).or_default() += duration,
            None => uncategorized += duration,
        }

        let Some(person) = details.person_ref().and_then(|id| catalog.person(id)) else {
            continue;
        };
        let totals = person_totals.entry(person.id.as_str()).or_default();
        totals.total += duration;
        if purpose.is_some_and(|purpose| purpose.counts_as_meeting()) {
            match details.alignment {
                Alignment::Aligned => totals.planned_meeting += duration,
                Alignment::Disruption => totals.unplanned_meeting += duration,
            }
        }
    }

    let percentage = |duration: u32| {
        if total_duration == 0 {
            0.0
        } else {
            f64::from(duration) / f64::from(total_duration) * 100.0
        }
    };

    let mut purposes = catalog
        .purpose_categories
        .iter()
        .map(|purpose| {
            let duration = purpose_totals.get(purpose.id.as_str()).copied().unwrap_or(0);
            PurposeStat {
                id: purpose.id.clone(),
                label: purpose.label.clone(),
                color: purpose.color.clone(),
                duration,
                percentage: percentage(duration),
            }
        })
        .collect::<Vec<_>>();
    if uncategorized > 0 {
        purposes.push(PurposeStat {
            id: UNCATEGORIZED_ID.to_string(),
            label: UNCATEGORIZED_LABEL.to_string(),
            color: CategoryColor::neutral(),
            duration: uncategorized,
            percentage: percentage(uncategorized),
        });
    }
    // sort_by is stable, so ties keep catalog order.
    purposes.sort_by(|left, right| right.duration.cmp(&left.duration));

    let mut delegation = DelegationPotential::ALL
        .into_iter()
        .map(|value| {
            let duration = delegation_totals.get(&value).copied().unwrap_or(0);
            ClassificationStat {
                value,
                label: value.label(),
                duration,
                percentage: percentage(duration),
            }
        })
        .collect::<Vec<_>>();
    delegation.sort_by(|left, right| right.duration.cmp(&left.duration));

    let mut alignment = Alignment::ALL
        .into_iter()
        .map(|value| {
            let duration = alignment_totals.get(&value).copied().unwrap_or(0);
            ClassificationStat {
                value,
                label: value.label(),
                duration,
                percentage: percentage(duration),
            }
        })
        .collect::<Vec<_>>();
    alignment.sort_by(|left, right| right.duration.cmp(&left.duration));

    let mut people = catalog
        .people
        .iter()
        .filter_map(|person| {
            let totals = person_totals.get(person.id.as_str())?;
            (totals.total > 0).then(|| PersonStat {
                id: person.id.clone(),
                name: person.name.clone(),
                total: totals.total,
                planned_meeting: totals.planned_meeting,
                unplanned_meeting: totals.unplanned_meeting,
                percentage: percentage(totals.total),
            })
        })
        .collect::<Vec<_>>();
    people.sort_by(|left, right| right.total.cmp(&left.total));

    ReportSummary {
        window,
        today,
        total_duration,
        total_formatted: format_minutes(total_duration),
        record_count: selected.len(),
        purposes,
        delegation,
        alignment,
        people,
    }
}

/// `45` -> "45m", `120` -> "2h", `75` -> "1h 15m".
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, rest) => format!("{rest}m"),
        (hours, 0) => format!("{hours}h"),
        (hours, rest) => format!("{hours}h {rest}m"),
    }
}
