//! Builders for the HTTP state from the configured record store.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use casedesk::domain::ports::{CatalogueLoginService, RecordRepository};
use casedesk::domain::{AnnotationPolicy, AnnotationService, CaseCatalogue};
use casedesk::inbound::http::state::{HttpState, HttpStatePorts};
use casedesk::outbound::memory::InMemoryRecordRepository;
use casedesk::outbound::persistence::{DbPool, DieselRecordRepository};

use super::ServerConfig;

/// Wire one annotation service over `records` into both driving ports.
fn ports_over<R>(
    records: Arc<R>,
    catalogue: &Arc<CaseCatalogue>,
    policy: AnnotationPolicy,
    clock: Arc<dyn Clock>,
) -> HttpStatePorts
where
    R: RecordRepository + 'static,
{
    let service = Arc::new(AnnotationService::new(
        records,
        catalogue.clone(),
        policy,
        clock,
    ));
    HttpStatePorts {
        login: Arc::new(CatalogueLoginService::new(catalogue.clone())),
        annotations: service.clone(),
        annotations_query: service,
    }
}

fn build_ports(
    db_pool: Option<&DbPool>,
    catalogue: &Arc<CaseCatalogue>,
    policy: AnnotationPolicy,
    clock: Arc<dyn Clock>,
) -> HttpStatePorts {
    match db_pool {
        Some(pool) => {
            info!("records stored in PostgreSQL");
            let records = Arc::new(DieselRecordRepository::new(pool.clone(), clock.clone()));
            ports_over(records, catalogue, policy, clock)
        }
        None => {
            warn!("no database configured; records are kept in memory and lost on restart");
            let records = Arc::new(InMemoryRecordRepository::new(clock.clone()));
            ports_over(records, catalogue, policy, clock)
        }
    }
}

/// Build the shared HTTP state, selecting the Diesel store when a pool is
/// configured and the in-memory store otherwise.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let ports = build_ports(
        config.db_pool.as_ref(),
        &config.catalogue,
        config.policy,
        Arc::new(DefaultClock),
    );
    web::Data::new(HttpState::new(ports))
}
