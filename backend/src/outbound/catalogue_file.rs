//! Loads the case catalogue from its JSON file at startup.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::{CaseCatalogue, CatalogueDraft, CatalogueValidationError, Username};

use super::cap_fs::read_file;

/// Errors returned while loading the catalogue file.
#[derive(Debug, Error)]
pub enum CatalogueLoadError {
    #[error("failed to read catalogue at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalogue at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalogue at {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CatalogueValidationError,
    },
}

/// Parse and validate catalogue JSON.
pub fn parse_catalogue(
    bytes: &[u8],
    admin: &Username,
    path: &Path,
) -> Result<CaseCatalogue, CatalogueLoadError> {
    let draft: CatalogueDraft =
        serde_json::from_slice(bytes).map_err(|source| CatalogueLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    CaseCatalogue::new(draft, admin).map_err(|source| CatalogueLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Read, parse and validate the catalogue at `path`.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use casedesk::domain::Username;
/// use casedesk::outbound::catalogue_file::load_catalogue;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let admin = Username::new("admin")?;
/// let catalogue = load_catalogue(Path::new("fixtures/catalogue.json"), &admin)?;
/// println!("{} cases", catalogue.total_cases());
/// # Ok(())
/// # }
/// ```
pub fn load_catalogue(path: &Path, admin: &Username) -> Result<CaseCatalogue, CatalogueLoadError> {
    let bytes = read_file(path).map_err(|source| CatalogueLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let catalogue = parse_catalogue(&bytes, admin, path)?;
    info!(
        path = %path.display(),
        cases = catalogue.total_cases(),
        items = catalogue.item_count(),
        users = catalogue.users().len(),
        "case catalogue loaded"
    );
    Ok(catalogue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::cap_fs::write_file;
    use rstest::{fixture, rstest};

    const VALID: &str = r#"{
        "users": [
            {"username": "admin", "password": "admin-pw"},
            {"username": "alice", "password": "alice-pw"}
        ],
        "case_ids": ["Case001", "Case002"],
        "items": [
            {"id": "Item01", "name": "Erythema", "left": "none", "right": "severe"}
        ],
        "reference": {"Case001": {"Item01": "80"}}
    }"#;

    #[fixture]
    fn admin() -> Username {
        Username::new("admin").expect("valid admin")
    }

    #[rstest]
    fn loads_a_valid_catalogue(admin: Username) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalogue.json");
        write_file(&path, VALID.as_bytes()).expect("write");

        let catalogue = load_catalogue(&path, &admin).expect("valid catalogue");
        assert_eq!(catalogue.total_cases(), 2);
        assert_eq!(catalogue.item_count(), 1);
        assert!(catalogue.user("alice").is_some());
    }

    #[rstest]
    fn bundled_fixture_is_valid(admin: Username) {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalogue.json");
        let catalogue = load_catalogue(&path, &admin).expect("fixture loads");
        assert_eq!(catalogue.annotators().count(), 2);
        assert_eq!(catalogue.diagnosis_items().len(), 1);
    }

    #[rstest]
    fn missing_file_is_a_read_error(admin: Username) {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_catalogue(&dir.path().join("nope.json"), &admin).expect_err("missing");
        assert!(matches!(err, CatalogueLoadError::Read { .. }));
    }

    #[rstest]
    #[case("{")]
    #[case(r#"{"users": [], "case_ids": [], "items": [], "colour": "red"}"#)]
    fn malformed_json_is_a_parse_error(admin: Username, #[case] body: &str) {
        let err = parse_catalogue(body.as_bytes(), &admin, Path::new("inline.json"))
            .expect_err("malformed");
        assert!(matches!(err, CatalogueLoadError::Parse { .. }), "{err}");
    }

    #[rstest]
    fn catalogue_without_the_admin_is_invalid() {
        let chief = Username::new("chief").expect("valid");
        let err = parse_catalogue(VALID.as_bytes(), &chief, Path::new("inline.json"))
            .expect_err("no admin");
        assert!(matches!(
            err,
            CatalogueLoadError::Invalid {
                source: CatalogueValidationError::MissingAdmin { .. },
                ..
            }
        ));
    }
}
