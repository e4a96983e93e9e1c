//! Reference entities: the small lookup tables job orders point at.
//!
//! These have no watermark. Every sync pass replaces them wholesale.

use crate::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A customer of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Role of a user-like staff record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Salesman,
    Designer,
    Manager,
    Production,
    Admin,
}

impl StaffRole {
    pub const ALL: [StaffRole; 5] = [
        StaffRole::Salesman,
        StaffRole::Designer,
        StaffRole::Manager,
        StaffRole::Production,
        StaffRole::Admin,
    ];
    /// Roles that may appear as the salesman of a job order.
    pub const SALES: [StaffRole; 2] = [StaffRole::Salesman, StaffRole::Manager];
    /// Roles that may appear as the designer of a job order.
    pub const DESIGN: [StaffRole; 1] = [StaffRole::Designer];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Salesman => "salesman",
            StaffRole::Designer => "designer",
            StaffRole::Manager => "manager",
            StaffRole::Production => "production",
            StaffRole::Admin => "admin",
        }
    }

    /// Match a remote role string, ignoring case and surrounding space.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn can_sell(&self) -> bool {
        Self::SALES.contains(self)
    }

    pub fn can_design(&self) -> bool {
        Self::DESIGN.contains(self)
    }
}

/// A salesman or designer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: StaffRole,
}

/// A catalogue job title (e.g. "Tarpaulin Printing").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTitle {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Anything stored in a table keyed by id.
pub trait Keyed {
    fn key(&self) -> &RecordId;
}

impl Keyed for Customer {
    fn key(&self) -> &RecordId {
        &self.id
    }
}

impl Keyed for StaffMember {
    fn key(&self) -> &RecordId {
        &self.id
    }
}

impl Keyed for JobTitle {
    fn key(&self) -> &RecordId {
        &self.id
    }
}

/// A complete fetch of all reference collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub customers: Vec<Customer>,
    pub salesmen: Vec<StaffMember>,
    pub designers: Vec<StaffMember>,
    pub job_titles: Vec<JobTitle>,
}

impl ReferenceData {
    /// Split a mixed staff list into the salesman and designer tables.
    ///
    /// A member whose role is both sales- and design-capable lands in both.
    pub fn from_staff(
        customers: Vec<Customer>,
        staff: Vec<StaffMember>,
        job_titles: Vec<JobTitle>,
    ) -> Self {
        let salesmen = staff.iter().filter(|s| s.role.can_sell()).cloned().collect();
        let designers = staff.into_iter().filter(|s| s.role.can_design()).collect();
        Self {
            customers,
            salesmen,
            designers,
            job_titles,
        }
    }
}

/// Local lookup tables read by the enricher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTables {
    pub(crate) customers: HashMap<RecordId, Customer>,
    pub(crate) salesmen: HashMap<RecordId, StaffMember>,
    pub(crate) designers: HashMap<RecordId, StaffMember>,
    pub(crate) job_titles: HashMap<RecordId, JobTitle>,
}

impl ReferenceTables {
    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.get(id)
    }

    pub fn salesman(&self, id: &str) -> Option<&StaffMember> {
        self.salesmen.get(id)
    }

    pub fn designer(&self, id: &str) -> Option<&StaffMember> {
        self.designers.get(id)
    }

    pub fn job_title(&self, id: &str) -> Option<&JobTitle> {
        self.job_titles.get(id)
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn salesmen(&self) -> impl Iterator<Item = &StaffMember> {
        self.salesmen.values()
    }

    pub fn designers(&self) -> impl Iterator<Item = &StaffMember> {
        self.designers.values()
    }

    pub fn job_titles(&self) -> impl Iterator<Item = &JobTitle> {
        self.job_titles.values()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
            && self.salesmen.is_empty()
            && self.designers.is_empty()
            && self.job_titles.is_empty()
    }
}

/// Build a keyed table from a list, last duplicate wins.
pub(crate) fn index_by_key<T: Keyed>(items: Vec<T>) -> HashMap<RecordId, T> {
    items
        .into_iter()
        .map(|item| (item.key().clone(), item))
        .collect()
}
