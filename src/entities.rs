//! Canonical record schemas for the administration pages.

use serde::{Deserialize, Serialize};

use crate::{
    record::{Entity, FieldError, non_empty},
    types::{AppointmentStatus, KeyPolicy, RecordId, RouteStyle, Status},
};

/// Registered outpatient. Keyed by the hospital-issued outpatient ID.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpatient {
    /// Caller-assigned business key.
    #[serde(rename = "outpatientID")]
    pub outpatient_id: String,
    /// Full name.
    pub name: String,
    /// Age in years.
    #[serde(default)]
    pub age: Option<u32>,
    /// Gender as entered.
    pub gender: String,
    /// Clinic shift.
    pub shift: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone_number: String,
    /// Activity status.
    #[serde(default)]
    pub status: Status,
}

impl Entity for Outpatient {
    type Key = String;

    const LABEL: &'static str = "Outpatient";
    const COLLECTION: &'static str = "outpatients";
    const KEY_POLICY: KeyPolicy = KeyPolicy::CallerAssigned;
    const KEY_FIELD: &'static str = "outpatientID";
    const REQUIRED: &'static [&'static str] = &[
        "outpatientID",
        "name",
        "age",
        "gender",
        "shift",
        "email",
        "phoneNumber",
    ];
    const SEARCHABLE: &'static [&'static str] = &["name", "email"];
    const FILTERABLE: &'static [&'static str] = &["status", "gender", "shift"];

    fn key(&self) -> Option<String> {
        non_empty(&self.outpatient_id)
    }

    fn set_key(&mut self, key: Option<String>) {
        self.outpatient_id = key.unwrap_or_default();
    }

    fn key_from_seq(_seq: RecordId) -> Option<String> {
        None
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "outpatientID" => non_empty(&self.outpatient_id),
            "name" => non_empty(&self.name),
            "age" => self.age.map(|a| a.to_string()),
            "gender" => non_empty(&self.gender),
            "shift" => non_empty(&self.shift),
            "email" => non_empty(&self.email),
            "phoneNumber" => non_empty(&self.phone_number),
            "status" => Some(self.status.to_string()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        match name {
            "outpatientID" => self.outpatient_id = value.to_string(),
            "name" => self.name = value.to_string(),
            "age" => {
                let trimmed = value.trim();
                self.age = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse().map_err(|_| FieldError::Invalid {
                        field: "age",
                        value: value.to_string(),
                    })?)
                };
            }
            "gender" => self.gender = value.to_string(),
            "shift" => self.shift = value.to_string(),
            "email" => self.email = value.to_string(),
            "phoneNumber" => self.phone_number = value.to_string(),
            "status" => {
                self.status = Status::parse(value).ok_or_else(|| FieldError::Invalid {
                    field: "status",
                    value: value.to_string(),
                })?;
            }
            other => return Err(FieldError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn status(&self) -> Option<Status> {
        Some(self.status)
    }

    fn set_status(&mut self, status: Status) -> bool {
        self.status = status;
        true
    }

    fn describe(&self) -> String {
        format!("outpatient {} ({})", self.name, self.outpatient_id)
    }
}

/// Staff doctor. The store assigns `_id`; `doctorID` is a business field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    /// Store-assigned identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Hospital doctor number.
    #[serde(rename = "doctorID")]
    pub doctor_id: String,
    /// Full name.
    pub name: String,
    /// Medical specialization.
    pub specialization: String,
    /// Contact phone.
    #[serde(default)]
    pub contact_number: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Postal address.
    #[serde(default)]
    pub address: String,
}

impl Entity for Doctor {
    type Key = String;

    const LABEL: &'static str = "Doctor";
    const COLLECTION: &'static str = "doctors";
    const KEY_POLICY: KeyPolicy = KeyPolicy::StoreAssigned;
    const KEY_FIELD: &'static str = "_id";
    const REQUIRED: &'static [&'static str] = &["doctorID", "name", "specialization"];
    const SEARCHABLE: &'static [&'static str] = &["name", "specialization", "email"];
    const FILTERABLE: &'static [&'static str] = &["specialization"];
    const ROUTE_STYLE: RouteStyle = RouteStyle::Verbs;

    fn key(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_key(&mut self, key: Option<String>) {
        self.id = key;
    }

    fn key_from_seq(seq: RecordId) -> Option<String> {
        Some(seq.to_string())
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "_id" => self.id.clone(),
            "doctorID" => non_empty(&self.doctor_id),
            "name" => non_empty(&self.name),
            "specialization" => non_empty(&self.specialization),
            "contactNumber" => non_empty(&self.contact_number),
            "email" => non_empty(&self.email),
            "address" => non_empty(&self.address),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        match name {
            "_id" => self.id = non_empty(value),
            "doctorID" => self.doctor_id = value.to_string(),
            "name" => self.name = value.to_string(),
            "specialization" => self.specialization = value.to_string(),
            "contactNumber" => self.contact_number = value.to_string(),
            "email" => self.email = value.to_string(),
            "address" => self.address = value.to_string(),
            other => return Err(FieldError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Dr. {}", self.name)
    }
}

/// Pharmacy staff member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pharmacist {
    /// Store-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// Working shift, e.g. "Morning".
    #[serde(default)]
    pub shift: String,
    /// Activity status.
    #[serde(default)]
    pub status: Status,
}

impl Entity for Pharmacist {
    type Key = RecordId;

    const LABEL: &'static str = "Pharmacist";
    const COLLECTION: &'static str = "pharmacists";
    const KEY_POLICY: KeyPolicy = KeyPolicy::StoreAssigned;
    const KEY_FIELD: &'static str = "id";
    const REQUIRED: &'static [&'static str] = &["name", "email", "phone"];
    const SEARCHABLE: &'static [&'static str] = &["name", "email"];
    const FILTERABLE: &'static [&'static str] = &["shift", "status"];

    fn key(&self) -> Option<RecordId> {
        self.id
    }

    fn set_key(&mut self, key: Option<RecordId>) {
        self.id = key;
    }

    fn key_from_seq(seq: RecordId) -> Option<RecordId> {
        Some(seq)
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.map(|id| id.to_string()),
            "name" => non_empty(&self.name),
            "email" => non_empty(&self.email),
            "phone" => non_empty(&self.phone),
            "shift" => non_empty(&self.shift),
            "status" => Some(self.status.to_string()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        match name {
            "id" => {
                let trimmed = value.trim();
                self.id = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse().map_err(|_| FieldError::Invalid {
                        field: "id",
                        value: value.to_string(),
                    })?)
                };
            }
            "name" => self.name = value.to_string(),
            "email" => self.email = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "shift" => self.shift = value.to_string(),
            "status" => {
                self.status = Status::parse(value).ok_or_else(|| FieldError::Invalid {
                    field: "status",
                    value: value.to_string(),
                })?;
            }
            other => return Err(FieldError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn status(&self) -> Option<Status> {
        Some(self.status)
    }

    fn set_status(&mut self, status: Status) -> bool {
        self.status = status;
        true
    }

    fn describe(&self) -> String {
        format!("pharmacist {}", self.name)
    }
}

/// Booked appointment between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Appointment {
    /// Store-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Patient name.
    pub patient: String,
    /// Doctor name.
    pub doctor: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: AppointmentStatus,
}

impl Entity for Appointment {
    type Key = RecordId;

    const LABEL: &'static str = "Appointment";
    const COLLECTION: &'static str = "appointments";
    const KEY_POLICY: KeyPolicy = KeyPolicy::StoreAssigned;
    const KEY_FIELD: &'static str = "id";
    const REQUIRED: &'static [&'static str] = &["patient", "doctor", "date"];
    const SEARCHABLE: &'static [&'static str] = &["patient", "doctor"];
    const FILTERABLE: &'static [&'static str] = &["doctor", "status"];

    fn key(&self) -> Option<RecordId> {
        self.id
    }

    fn set_key(&mut self, key: Option<RecordId>) {
        self.id = key;
    }

    fn key_from_seq(seq: RecordId) -> Option<RecordId> {
        Some(seq)
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.map(|id| id.to_string()),
            "patient" => non_empty(&self.patient),
            "doctor" => non_empty(&self.doctor),
            "date" => non_empty(&self.date),
            "status" => Some(self.status.to_string()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: &str) -> Result<(), FieldError> {
        match name {
            "id" => {
                let trimmed = value.trim();
                self.id = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse().map_err(|_| FieldError::Invalid {
                        field: "id",
                        value: value.to_string(),
                    })?)
                };
            }
            "patient" => self.patient = value.to_string(),
            "doctor" => self.doctor = value.to_string(),
            "date" => self.date = value.to_string(),
            "status" => {
                self.status =
                    AppointmentStatus::parse(value).ok_or_else(|| FieldError::Invalid {
                        field: "status",
                        value: value.to_string(),
                    })?;
            }
            other => return Err(FieldError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("the appointment of {} with {} on {}", self.patient, self.doctor, self.date)
    }
}
