// src/models.rs

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{NaiveDate, NaiveDateTime};
use postgres_types::{FromSql, IsNull, ToSql, Type};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//------------------------------------------------------------------------------
// IDENTIFIER TYPES
//------------------------------------------------------------------------------
// Newtypes so job ids, user ids and reference ids can't be mixed up

/// Strongly typed identifier for Job records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for JobId {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        // Delegate to the implementation for i64
        self.0.to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as ToSql>::accepts(ty)
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.0.to_sql_checked(ty, out)
    }
}

impl<'a> FromSql<'a> for JobId {
    fn from_sql(ty: &Type, raw: &[u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let id = i64::from_sql(ty, raw)?;
        Ok(JobId(id))
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as FromSql>::accepts(ty)
    }
}

/// Identifier of the user owning a tracking link (the auth subject)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for UserId {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.0.to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <String as ToSql>::accepts(ty)
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.0.to_sql_checked(ty, out)
    }
}

impl<'a> FromSql<'a> for UserId {
    fn from_sql(ty: &Type, raw: &[u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let s = String::from_sql(ty, raw)?;
        Ok(UserId(s))
    }

    fn accepts(ty: &Type) -> bool {
        <String as FromSql>::accepts(ty)
    }
}

//------------------------------------------------------------------------------
// CORE DOMAIN MODELS
//------------------------------------------------------------------------------

/// A canonical job posting.
///
/// Jobs are created by ingestion (scrapers, manual entry, email analysis) and
/// are only ever removed by a merge, when they turn out to be the duplicate side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    /// Company name as it appeared on the posting
    pub business_name: String,
    pub location: Option<String>,
    pub pay: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields needed to create a job. The store assigns the id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub business_name: String,
    pub location: Option<String>,
    pub pay: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub posted_date: Option<NaiveDate>,
}

impl NewJob {
    pub fn new(title: impl Into<String>, business_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            business_name: business_name.into(),
            ..Default::default()
        }
    }
}

/// Where a user stands with a job they track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    New,
    Pending,
    Archived,
    Reviewed,
    Ghosting,
    Applied,
    Interviewing,
    TechnicalAssessment,
    Offered,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 10] = [
        Self::New,
        Self::Pending,
        Self::Archived,
        Self::Reviewed,
        Self::Ghosting,
        Self::Applied,
        Self::Interviewing,
        Self::TechnicalAssessment,
        Self::Offered,
        Self::Rejected,
    ];

    /// Converts the enum to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Archived => "archived",
            Self::Reviewed => "reviewed",
            Self::Ghosting => "ghosting",
            Self::Applied => "applied",
            Self::Interviewing => "interviewing",
            Self::TechnicalAssessment => "technical_assessment",
            Self::Offered => "offered",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    // Accepts the stored form plus the display forms the UI and the
    // email classifier produce ("TechnicalAssessment", "Technical Assessment").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();
        match key.as_str() {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "archived" => Ok(Self::Archived),
            "reviewed" => Ok(Self::Reviewed),
            "ghosting" => Ok(Self::Ghosting),
            "applied" => Ok(Self::Applied),
            "interviewing" => Ok(Self::Interviewing),
            "technicalassessment" => Ok(Self::TechnicalAssessment),
            "offered" => Ok(Self::Offered),
            "rejected" => Ok(Self::Rejected),
            _ => Err(anyhow::anyhow!("Unknown job status '{}'", s)),
        }
    }
}

/// A user's tracked application against one job.
///
/// At most one link exists per (user_id, job_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJobLink {
    pub user_id: UserId,
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An analyzed recruiting email that points at the job it was matched to.
///
/// Only the pointer matters here; the classification payload belongs to the
/// email pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReference {
    pub id: Uuid,
    pub user_id: UserId,
    pub matched_job_id: Option<JobId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_stored_form() {
        for status in JobStatus::ALL {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_parses_display_forms() {
        assert_eq!(
            "TechnicalAssessment".parse::<JobStatus>().unwrap(),
            JobStatus::TechnicalAssessment
        );
        assert_eq!(
            " Technical Assessment ".parse::<JobStatus>().unwrap(),
            JobStatus::TechnicalAssessment
        );
        assert_eq!("OFFERED".parse::<JobStatus>().unwrap(), JobStatus::Offered);
        assert!("hired".parse::<JobStatus>().is_err());
    }
}
