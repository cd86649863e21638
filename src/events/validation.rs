//! Input rules for event writes.
//!
//! Every check runs and every failure is reported, so a client can fix a
//! form in one round trip. On create all fields are required; on update a
//! field is only checked when the client sent it.

use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

use super::repo_types::EventChanges;
use crate::images::UploadItem;

const NOT_AN_IMAGE: &str = "Only image files are allowed.";

/// Raw fields as they arrived. `None` = the client did not send the field.
#[derive(Debug, Default)]
pub struct EventForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub image: Option<UploadItem>,
}

#[derive(Debug)]
pub struct NewEventInput {
    pub title: String,
    pub description: String,
    pub address: String,
    pub date: String,
    pub image: UploadItem,
}

/// Text changes plus the replacement image, which still has to be stored
/// before `changes.image` can be filled in.
#[derive(Debug)]
pub struct EventUpdate {
    pub changes: EventChanges,
    pub image: Option<UploadItem>,
}

/// Accepts the date shapes browsers and API clients commonly send: ISO 8601
/// with or without seconds and offset, slash dates, and month-name forms.
pub fn is_valid_date(value: &str) -> bool {
    let s = value.trim();

    let dates = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[year]/[month padding:none]/[day padding:none]"),
        format_description!("[month padding:none]/[day padding:none]/[year]"),
        format_description!(
            "[month repr:long case_sensitive:false] [day padding:none], [year]"
        ),
        format_description!(
            "[month repr:short case_sensitive:false] [day padding:none], [year]"
        ),
        format_description!(
            "[weekday repr:short case_sensitive:false] [month repr:short case_sensitive:false] [day] [year]"
        ),
    ];
    let local = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]Z"),
        format_description!("[year]/[month padding:none]/[day padding:none] [hour]:[minute]"),
        format_description!(
            "[year]/[month padding:none]/[day padding:none] [hour]:[minute]:[second]"
        ),
        format_description!(
            "[weekday repr:short case_sensitive:false] [month repr:short case_sensitive:false] [day] [year] [hour]:[minute]:[second]"
        ),
    ];
    let offset = [
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
        ),
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
        ),
    ];

    OffsetDateTime::parse(s, &Rfc3339).is_ok()
        || OffsetDateTime::parse(s, &Rfc2822).is_ok()
        || dates.iter().any(|f| Date::parse(s, *f).is_ok())
        || local.iter().any(|f| PrimitiveDateTime::parse(s, *f).is_ok())
        || offset.iter().any(|f| OffsetDateTime::parse(s, *f).is_ok())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn required(value: Option<String>, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if !is_blank(&v) => Some(v),
        _ => {
            errors.push(format!("{label} is required and cannot be blank."));
            None
        }
    }
}

fn optional(value: Option<String>, label: &str, errors: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if is_blank(&v) => {
            errors.push(format!("{label} cannot be blank if provided."));
            None
        }
        other => other,
    }
}

pub fn validate_new(form: EventForm) -> Result<NewEventInput, Vec<String>> {
    let mut errors = Vec::new();

    let title = required(form.title, "Title", &mut errors);
    let description = required(form.description, "Description", &mut errors);
    let address = required(form.address, "Address", &mut errors);
    let date = match required(form.date, "Date", &mut errors) {
        Some(d) if !is_valid_date(&d) => {
            errors.push("Date must be a valid date string.".into());
            None
        }
        other => other,
    };
    let image = match form.image {
        Some(img) if img.is_image() => Some(img),
        Some(_) => {
            errors.push(NOT_AN_IMAGE.into());
            None
        }
        None => {
            errors.push("Image is required.".into());
            None
        }
    };

    match (title, description, address, date, image) {
        (Some(title), Some(description), Some(address), Some(date), Some(image))
            if errors.is_empty() =>
        {
            Ok(NewEventInput {
                title,
                description,
                address,
                date,
                image,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_update(form: EventForm) -> Result<EventUpdate, Vec<String>> {
    let mut errors = Vec::new();

    let title = optional(form.title, "Title", &mut errors);
    let description = optional(form.description, "Description", &mut errors);
    let address = optional(form.address, "Address", &mut errors);
    let date = match optional(form.date, "Date", &mut errors) {
        Some(d) if !is_valid_date(&d) => {
            errors.push("Date must be a valid date string if provided.".into());
            None
        }
        other => other,
    };
    let image = match form.image {
        Some(img) if !img.is_image() => {
            errors.push(NOT_AN_IMAGE.into());
            None
        }
        other => other,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(EventUpdate {
        changes: EventChanges {
            title,
            description,
            address,
            date,
            image: None,
        },
        image,
    })
}
