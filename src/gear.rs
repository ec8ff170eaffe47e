use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;

/// A single piece of equipment in the store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Gear {
    /// The ID of the record. Assigned on creation and never changed.
    pub id: Uuid,

    /// The name provided, e.g. the model.
    pub name: String,

    /// The kind of equipment.
    pub category: String,

    /// The manufacturer.
    pub brand: String,

    /// When it was bought. Defaults to the creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub purchase_date: OffsetDateTime,

    /// Free-form notes, if any.
    pub notes: Option<String>,

    /// A URL or path to a photo, if any. Never dereferenced.
    pub photo: Option<String>,
}

/// The fields submitted to create a record.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGear {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "purchase_date::deserialize_option")]
    pub purchase_date: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub photo: Option<String>,
}

impl NewGear {
    /// Builds the record to insert, reporting every missing required field
    /// at once.
    pub fn into_gear(self, id: Uuid, now: OffsetDateTime) -> Result<Gear, BackendError> {
        let mut missing = vec![];

        let name = required(self.name, "name", &mut missing);
        let category = required(self.category, "category", &mut missing);
        let brand = required(self.brand, "brand", &mut missing);

        match (name, category, brand) {
            (Some(name), Some(category), Some(brand)) => Ok(Gear {
                id,
                name,
                category,
                brand,
                purchase_date: self.purchase_date.unwrap_or(now),
                notes: self.notes,
                photo: self.photo,
            }),
            _ => Err(BackendError::MissingFields(missing)),
        }
    }
}

/// A partial update. A field that is absent, `null` or empty leaves the
/// stored value alone; any other value replaces it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "purchase_date::deserialize_option")]
    pub purchase_date: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub photo: Option<String>,
}

impl GearPatch {
    /// Merges the patch into `gear`.
    pub fn apply(self, gear: &mut Gear) {
        if let Some(name) = supplied(self.name) {
            gear.name = name;
        }

        if let Some(category) = supplied(self.category) {
            gear.category = category;
        }

        if let Some(brand) = supplied(self.brand) {
            gear.brand = brand;
        }

        if let Some(purchase_date) = self.purchase_date {
            gear.purchase_date = purchase_date;
        }

        if let Some(notes) = supplied(self.notes) {
            gear.notes = Some(notes);
        }

        if let Some(photo) = supplied(self.photo) {
            gear.photo = Some(photo);
        }
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    let value = supplied(value);

    if value.is_none() {
        missing.push(field);
    }

    value
}

fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Accepts either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date,
/// which is taken as midnight UTC. An empty string means no date.
pub mod purchase_date {
    use serde::{de, Deserialize, Deserializer};
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{Date, OffsetDateTime};

    pub fn parse(s: &str) -> Result<OffsetDateTime, String> {
        if let Ok(timestamp) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(timestamp);
        }

        Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map(|date| date.midnight().assume_utc())
            .map_err(|_| {
                format!(
                    "invalid purchaseDate {:?}: expected an RFC 3339 timestamp or YYYY-MM-DD",
                    s
                )
            })
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where D: Deserializer<'de> {
        let o: Option<String> = Deserialize::deserialize(deserializer)?;

        o.filter(|s| !s.is_empty())
            .map(|s| parse(&s).map_err(de::Error::custom))
            .transpose()
    }
}
