//! Validation helpers used while building a [`super::CaseCatalogue`].

use std::collections::{HashMap, HashSet};

use zeroize::Zeroizing;

use super::{
    CaseId, CatalogueValidationError, DiagnosisItem, ItemDefinition, UserAccountDraft,
};
use crate::domain::record::ELAPSED_TIME_FIELD;
use crate::domain::user::Username;

pub(super) fn case_ids(raw: Vec<String>) -> Result<Vec<CaseId>, CatalogueValidationError> {
    if raw.is_empty() {
        return Err(CatalogueValidationError::EmptyCaseList);
    }
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .map(|value| {
            let case_id = CaseId::new(value.clone())
                .map_err(|source| CatalogueValidationError::InvalidCaseId { value, source })?;
            if !seen.insert(case_id.clone()) {
                return Err(CatalogueValidationError::DuplicateCaseId {
                    case_id: case_id.into(),
                });
            }
            Ok(case_id)
        })
        .collect()
}

pub(super) fn items(items: &[ItemDefinition]) -> Result<(), CatalogueValidationError> {
    if items.is_empty() {
        return Err(CatalogueValidationError::EmptyItemList);
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        ensure_non_empty(&item.id, "items.id")?;
        ensure_non_empty(&item.name, "items.name")?;
        if item.id == ELAPSED_TIME_FIELD {
            return Err(CatalogueValidationError::ReservedItemId {
                item_id: item.id.clone(),
            });
        }
        if !seen.insert(item.id.as_str()) {
            return Err(CatalogueValidationError::DuplicateItemId {
                item_id: item.id.clone(),
            });
        }
    }
    Ok(())
}

pub(super) fn diagnosis_items(items: &[DiagnosisItem]) -> Result<(), CatalogueValidationError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        ensure_non_empty(&item.id, "diagnosis_items.id")?;
        if !seen.insert(item.id.as_str()) {
            return Err(CatalogueValidationError::DuplicateDiagnosisItemId {
                item_id: item.id.clone(),
            });
        }
    }
    Ok(())
}

type Accounts = (Vec<Username>, HashMap<Username, Zeroizing<String>>);

pub(super) fn users(
    drafts: Vec<UserAccountDraft>,
    admin: &Username,
) -> Result<Accounts, CatalogueValidationError> {
    let mut names = Vec::with_capacity(drafts.len());
    let mut passwords = HashMap::with_capacity(drafts.len());
    for UserAccountDraft { username, password } in drafts {
        let name = Username::new(username.clone())
            .map_err(|source| CatalogueValidationError::InvalidUsername {
                value: username,
                source,
            })?;
        ensure_non_empty(&password, "users.password")?;
        if passwords
            .insert(name.clone(), Zeroizing::new(password))
            .is_some()
        {
            return Err(CatalogueValidationError::DuplicateUsername {
                username: name.into(),
            });
        }
        names.push(name);
    }
    if !passwords.contains_key(admin) {
        return Err(CatalogueValidationError::MissingAdmin {
            username: admin.to_string(),
        });
    }
    Ok((names, passwords))
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), CatalogueValidationError> {
    if value.trim().is_empty() {
        return Err(CatalogueValidationError::EmptyField { field });
    }
    Ok(())
}
