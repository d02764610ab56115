//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{
    CaseCatalogue, CatalogueDraft, DiagnosisItem, ItemDefinition, UserAccountDraft, Username,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub(crate) struct FixtureClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixtureClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(crate) fn fixture_clock() -> Arc<FixtureClock> {
    Arc::new(FixtureClock::new(fixture_timestamp()))
}

pub(crate) fn username(raw: &str) -> Username {
    Username::new(raw).expect("valid fixture username")
}

/// Three cases, three items, one diagnosis question, an admin and two
/// annotators.
///
/// Passwords are `<username>-pw`.
pub(crate) fn sample_catalogue() -> CaseCatalogue {
    let users = ["admin", "user1", "user2"]
        .into_iter()
        .map(|name| UserAccountDraft {
            username: name.to_owned(),
            password: format!("{name}-pw"),
        })
        .collect();
    let items = ["Item01", "Item02", "Item03"]
        .into_iter()
        .map(|id| ItemDefinition {
            id: id.to_owned(),
            name: format!("{id} label"),
            left: "absent".to_owned(),
            right: "marked".to_owned(),
        })
        .collect();
    let draft = CatalogueDraft {
        users,
        case_ids: vec!["Case001".into(), "Case002".into(), "Case003".into()],
        items,
        reference: None,
        diagnosis_items: vec![DiagnosisItem {
            id: "Diagnosis".to_owned(),
            name: "Working diagnosis".to_owned(),
            options: vec!["benign".to_owned(), "malignant".to_owned()],
        }],
    };
    CaseCatalogue::new(draft, &username("admin")).expect("valid fixture catalogue")
}
