//! Case catalogue: the read-only startup configuration of users, cases and
//! annotation items.
//!
//! A catalogue is built from a [`CatalogueDraft`] (usually deserialised from
//! the catalogue file) and validated once. Every lookup afterwards is
//! infallible apart from "not configured".

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::user::{Username, UsernameValidationError};

mod case_id;
mod validation;


pub use case_id::{CASE_ID_MAX, CaseId, CaseIdValidationError};

/// Validation errors returned by [`CaseCatalogue::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogueValidationError {
    #[error("catalogue must list at least one case")]
    EmptyCaseList,
    #[error("catalogue must define at least one item")]
    EmptyItemList,
    #[error("invalid case id {value:?}: {source}")]
    InvalidCaseId {
        value: String,
        source: CaseIdValidationError,
    },
    #[error("case id {case_id} is listed more than once")]
    DuplicateCaseId { case_id: String },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("item id {item_id} is defined more than once")]
    DuplicateItemId { item_id: String },
    #[error("item id {item_id} is reserved for submission metadata")]
    ReservedItemId { item_id: String },
    #[error("diagnosis item id {item_id} is defined more than once")]
    DuplicateDiagnosisItemId { item_id: String },
    #[error("invalid username {value:?}: {source}")]
    InvalidUsername {
        value: String,
        source: UsernameValidationError,
    },
    #[error("user {username} is listed more than once")]
    DuplicateUsername { username: String },
    #[error("admin user {username} is not listed in the catalogue")]
    MissingAdmin { username: String },
    #[error("reference answers name unknown case {case_id}")]
    UnknownReferenceCase { case_id: String },
}

/// A slider shown for every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemDefinition {
    /// Key under which the value is stored in the payload.
    #[schema(example = "Item01")]
    pub id: String,
    /// Display label.
    pub name: String,
    /// Label of the slider's left end.
    pub left: String,
    /// Label of the slider's right end.
    pub right: String,
}

/// A categorical diagnosis question shown alongside the sliders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Credentials of one configured user.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UserAccountDraft {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for UserAccountDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccountDraft")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Unvalidated catalogue contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueDraft {
    pub users: Vec<UserAccountDraft>,
    pub case_ids: Vec<String>,
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub reference: Option<BTreeMap<String, BTreeMap<String, Value>>>,
    #[serde(default)]
    pub diagnosis_items: Vec<DiagnosisItem>,
}

/// Validated, read-only case catalogue.
///
/// # Examples
/// ```
/// use casedesk::domain::{CaseCatalogue, CatalogueDraft, ItemDefinition, UserAccountDraft, Username};
///
/// let draft = CatalogueDraft {
///     users: vec![
///         UserAccountDraft { username: "admin".into(), password: "pw".into() },
///         UserAccountDraft { username: "alice".into(), password: "pw".into() },
///     ],
///     case_ids: vec!["Case001".into()],
///     items: vec![ItemDefinition {
///         id: "Item01".into(),
///         name: "Erythema".into(),
///         left: "none".into(),
///         right: "severe".into(),
///     }],
///     ..CatalogueDraft::default()
/// };
/// let admin = Username::new("admin").expect("valid");
/// let catalogue = CaseCatalogue::new(draft, &admin).expect("valid catalogue");
/// assert_eq!(catalogue.total_cases(), 1);
/// assert!(catalogue.case("Case002").is_none());
/// ```
#[derive(Clone)]
pub struct CaseCatalogue {
    case_ids: Vec<CaseId>,
    case_index: HashSet<CaseId>,
    items: Vec<ItemDefinition>,
    diagnosis_items: Vec<DiagnosisItem>,
    reference: HashMap<CaseId, BTreeMap<String, Value>>,
    users: Vec<Username>,
    passwords: HashMap<Username, zeroize::Zeroizing<String>>,
    admin: Username,
}

impl fmt::Debug for CaseCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseCatalogue")
            .field("case_ids", &self.case_ids)
            .field("items", &self.items)
            .field("diagnosis_items", &self.diagnosis_items)
            .field("users", &self.users)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl CaseCatalogue {
    /// Validate `draft` and build the catalogue.
    pub fn new(draft: CatalogueDraft, admin: &Username) -> Result<Self, CatalogueValidationError> {
        let CatalogueDraft {
            users,
            case_ids,
            items,
            reference,
            diagnosis_items,
        } = draft;

        let case_ids = validation::case_ids(case_ids)?;
        let case_index: HashSet<CaseId> = case_ids.iter().cloned().collect();
        validation::items(&items)?;
        validation::diagnosis_items(&diagnosis_items)?;
        let (users, passwords) = validation::users(users, admin)?;

        let mut reference_by_case = HashMap::new();
        for (raw, answers) in reference.unwrap_or_default() {
            let case_id = CaseId::new(raw.clone())
                .ok()
                .filter(|id| case_index.contains(id))
                .ok_or(CatalogueValidationError::UnknownReferenceCase { case_id: raw })?;
            reference_by_case.insert(case_id, answers);
        }

        Ok(Self {
            case_ids,
            case_index,
            items,
            diagnosis_items,
            reference: reference_by_case,
            users,
            passwords,
            admin: admin.clone(),
        })
    }

    /// Cases in canonical (configured) order.
    pub fn case_ids(&self) -> &[CaseId] {
        &self.case_ids
    }

    pub fn total_cases(&self) -> usize {
        self.case_ids.len()
    }

    /// Look up a configured case by its raw identifier.
    pub fn case(&self, raw: &str) -> Option<&CaseId> {
        let candidate = CaseId::new(raw).ok()?;
        self.case_index.get(&candidate)
    }

    pub fn items(&self) -> &[ItemDefinition] {
        &self.items
    }

    /// Number of configured slider items; the completion threshold.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn diagnosis_items(&self) -> &[DiagnosisItem] {
        &self.diagnosis_items
    }

    /// Reference answers for `case_id`, when the catalogue carries them.
    pub fn reference_for(&self, case_id: &CaseId) -> Option<&BTreeMap<String, Value>> {
        self.reference.get(case_id)
    }

    /// All configured users in file order, the admin included.
    pub fn users(&self) -> &[Username] {
        &self.users
    }

    /// Configured users other than the admin.
    pub fn annotators(&self) -> impl Iterator<Item = &Username> {
        self.users.iter().filter(|name| **name != self.admin)
    }

    /// Resolve a raw name to a configured user.
    pub fn user(&self, raw: &str) -> Option<&Username> {
        self.users.iter().find(|name| name.as_ref() == raw)
    }

    pub fn admin(&self) -> &Username {
        &self.admin
    }

    /// Compare `password` with the configured password of `username`.
    ///
    /// Returns `None` when the user is not configured.
    pub fn password_matches(&self, username: &Username, password: &str) -> Option<bool> {
        self.passwords
            .get(username)
            .map(|expected| expected.as_str() == password)
    }
}
