use crate::domain::models::{
    CategoryColor, ExtraInfoKind, Person, PurposeCategory, validate_non_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colors handed out to new purposes, in rotation.
pub const COLOR_PALETTE: [(&str, &str, &str); 8] = [
    ("bg-purple-100", "border-purple-400", "text-purple-800"),
    ("bg-blue-100", "border-blue-400", "text-blue-800"),
    ("bg-green-100", "border-green-400", "text-green-800"),
    ("bg-yellow-100", "border-yellow-400", "text-yellow-800"),
    ("bg-red-100", "border-red-400", "text-red-800"),
    ("bg-indigo-100", "border-indigo-400", "text-indigo-800"),
    ("bg-pink-100", "border-pink-400", "text-pink-800"),
    ("bg-teal-100", "border-teal-400", "text-teal-800"),
];

pub fn palette_color(index: usize) -> CategoryColor {
    let (bg, border, text) = COLOR_PALETTE[index % COLOR_PALETTE.len()];
    CategoryColor::new(bg, border, text)
}

/// Form input for a new purpose category.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PurposeDraft {
    pub label: String,
    #[serde(default)]
    pub extra_info_type: ExtraInfoKind,
    #[serde(default)]
    pub extra_info_prompt: String,
    #[serde(default)]
    pub is_meeting: Option<bool>,
}

impl PurposeDraft {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.label, "purpose.label")?;
        if self.extra_info_type != ExtraInfoKind::None {
            validate_non_empty(&self.extra_info_prompt, "purpose.extra_info_prompt")?;
        }
        Ok(())
    }
}

/// Catalog additions a creation flow is allowed to make.
pub trait CatalogPort {
    fn add_purpose(
        &mut self,
        draft: PurposeDraft,
        now: DateTime<Utc>,
    ) -> Result<PurposeCategory, String>;

    fn add_person(&mut self, name: &str, now: DateTime<Utc>) -> Result<Person, String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub purpose_categories: Vec<PurposeCategory>,
    pub people: Vec<Person>,
}

impl Default for Catalog {
    fn default() -> Self {
        default_catalog()
    }
}

pub fn default_catalog() -> Catalog {
    let purpose = |id: &str, label: &str, kind: ExtraInfoKind, prompt: &str, color: usize| {
        PurposeCategory {
            id: id.to_string(),
            label: label.to_string(),
            extra_info_type: kind,
            extra_info_prompt: prompt.to_string(),
            color: palette_color(color),
            is_meeting: None,
        }
    };
    let person = |id: &str, name: &str| Person {
        id: id.to_string(),
        name: name.to_string(),
    };

    Catalog {
        purpose_categories: vec![
            purpose("bau_team_support", "BAU / Team Support", ExtraInfoKind::None, "", 0),
            purpose(
                "bigger_picture_strategy",
                "Bigger Picture / Strategy",
                ExtraInfoKind::None,
                "",
                1,
            ),
            purpose(
                "other_dept_support",
                "Other Dept Support",
                ExtraInfoKind::Person,
                "Who was it for?",
                2,
            ),
            purpose(
                "meeting",
                "Meeting",
                ExtraInfoKind::Person,
                "Who set the meeting?",
                3,
            ),
        ],
        people: vec![
            person("alan_f", "Alan F"),
            person("daz_f", "Daz F"),
            person("roxy", "Roxy"),
            person("michelle", "Michelle"),
            person("lee", "Lee"),
            person("laura", "Laura"),
            person("adam_me", "Adam (me)"),
        ],
    }
}

impl Catalog {
    pub fn new(purpose_categories: Vec<PurposeCategory>, people: Vec<Person>) -> Self {
        Self {
            purpose_categories,
            people,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for purpose in &self.purpose_categories {
            purpose.validate()?;
        }
        for person in &self.people {
            person.validate()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.purpose_categories.is_empty() && self.people.is_empty()
    }

    pub fn purpose(&self, id: &str) -> Option<&PurposeCategory> {
        self.purpose_categories
            .iter()
            .find(|purpose| purpose.id == id)
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == id)
    }

    pub fn color_for(&self, purpose_id: &str) -> CategoryColor {
        self.purpose(purpose_id)
            .map(|purpose| purpose.color.clone())
            .unwrap_or_else(CategoryColor::neutral)
    }

    pub fn label_for<'a>(&'a self, purpose_id: &'a str) -> &'a str {
        self.purpose(purpose_id)
            .map(|purpose| purpose.label.as_str())
            .unwrap_or(purpose_id)
    }

    fn unique_id(&self, base: String, taken: impl Fn(&Self, &str) -> bool) -> String {
        if !taken(self, &base) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !taken(self, &candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

impl CatalogPort for Catalog {
    fn add_purpose(
        &mut self,
        draft: PurposeDraft,
        now: DateTime<Utc>,
    ) -> Result<PurposeCategory, String> {
        draft.validate()?;
        let label = draft.label.trim().to_string();
        let id = self.unique_id(
            format!("{}_{}", slug(&label), now.timestamp_millis()),
            |catalog, id| catalog.purpose(id).is_some(),
        );
        let purpose = PurposeCategory {
            id,
            label,
            extra_info_type: draft.extra_info_type,
            extra_info_prompt: match draft.extra_info_type {
                ExtraInfoKind::None => String::new(),
                _ => draft.extra_info_prompt.trim().to_string(),
            },
            color: palette_color(self.purpose_categories.len()),
            is_meeting: draft.is_meeting,
        };
        self.purpose_categories.push(purpose.clone());
        Ok(purpose)
    }

    fn add_person(&mut self, name: &str, now: DateTime<Utc>) -> Result<Person, String> {
        validate_non_empty(name, "person.name")?;
        let name = name.trim().to_string();
        let id = self.unique_id(
            format!("{}_{}", slug(&name), now.timestamp_millis()),
            |catalog, id| catalog.person(id).is_some(),
        );
        let person = Person { id, name };
        self.people.push(person.clone());
        Ok(person)
    }
}

/// Lowercase ASCII alphanumerics with every other run collapsed to one underscore.
pub fn slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_separator = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }
    slug
}
