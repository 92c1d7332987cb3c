use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::notify::{plan_notice, readiness_notice, Notice};
use crate::planner::{plan_phase, readiness, PhaseInputs, PhasePlan};
use crate::platoon::demand::PlanMode;
use crate::platoon::event::EventType;
use crate::platoon::readiness::GuildReadiness;
use crate::roster::reconcile::display_names;
use crate::roster::types::MemberId;

// Last uploaded inputs and last plan, kept in memory only
pub struct AppState {
    pub config: Mutex<PlannerConfig>,
    pub inputs: Mutex<Option<PhaseInputs>>,
    pub last_plan: Mutex<Option<PlanResponse>>,
}

impl AppState {
    pub fn new(config: PlannerConfig) -> Self {
        AppState {
            config: Mutex::new(config),
            inputs: Mutex::new(None),
            last_plan: Mutex::new(None),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("state lock poisoned"))
}

fn default_mode() -> PlanMode {
    PlanMode::Recommend
}

#[derive(Deserialize)]
pub struct PlanRequest {
    /// Replaces the stored inputs; the previous upload is reused when absent
    #[serde(default)]
    inputs: Option<PhaseInputs>,
    #[serde(default)]
    config: Option<PlannerConfig>,
    #[serde(default = "default_mode")]
    mode: PlanMode,
}

#[derive(Clone, Serialize)]
pub struct PlanResponse {
    plan: PhasePlan,
    display_names: BTreeMap<MemberId, String>,
    notice: Notice,
}

#[derive(Deserialize)]
pub struct ReadinessRequest {
    #[serde(default)]
    inputs: Option<PhaseInputs>,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    readiness: GuildReadiness,
    display_names: BTreeMap<MemberId, String>,
    notice: Notice,
}

#[derive(Serialize)]
pub struct PhaseResponse {
    event: EventType,
    phase: u8,
}

fn error_response(err: &PlannerError) -> HttpResponse {
    let body = serde_json::json!({"success": false, "error": err.to_string()});
    match err {
        PlannerError::ConfigurationMissing(_) | PlannerError::UnknownEvent(_) => {
            HttpResponse::BadRequest().json(body)
        }
        PlannerError::DataUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Picks the request's inputs or falls back to the last upload, storing
/// whatever was sent.
fn resolve_inputs(state: &AppState, sent: Option<PhaseInputs>) -> Result<Option<PhaseInputs>> {
    let mut stored = lock(&state.inputs)?;
    if let Some(inputs) = sent {
        *stored = Some(inputs);
    }
    Ok(stored.clone())
}

async fn create_plan(req: web::Json<PlanRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let PlanRequest { inputs, config, mode } = req.into_inner();
    let Some(inputs) = resolve_inputs(&state, inputs)? else {
        return Ok(error_response(&PlannerError::DataUnavailable(
            "no roster uploaded".to_string(),
        )));
    };
    let config = {
        let mut stored = lock(&state.config)?;
        if let Some(config) = config {
            *stored = config;
        }
        stored.clone()
    };

    match plan_phase(&inputs, &config, mode, Utc::now()) {
        Ok(plan) => {
            info!(
                "Planned {} phase {}: {} donors, {} unassigned",
                plan.event,
                plan.phase,
                plan.result.assigned().count(),
                plan.result.unassigned_count()
            );
            let response = PlanResponse {
                notice: plan_notice(&plan),
                display_names: display_names(&inputs.snapshot.members),
                plan,
            };
            *lock(&state.last_plan)? = Some(response.clone());
            Ok(HttpResponse::Ok().json(response))
        }
        Err(err) => {
            error!("Planning failed: {}", err);
            Ok(error_response(&err))
        }
    }
}

async fn last_plan(state: web::Data<AppState>) -> Result<HttpResponse> {
    match lock(&state.last_plan)?.as_ref() {
        Some(plan) => Ok(HttpResponse::Ok().json(plan)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No plan available"}))),
    }
}

async fn compute_readiness(
    req: web::Json<ReadinessRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let Some(inputs) = resolve_inputs(&state, req.into_inner().inputs)? else {
        return Ok(error_response(&PlannerError::DataUnavailable(
            "no roster uploaded".to_string(),
        )));
    };
    let guild = readiness(&inputs);
    Ok(HttpResponse::Ok().json(ReadinessResponse {
        notice: readiness_notice(&guild),
        display_names: display_names(&inputs.snapshot.members),
        readiness: guild,
    }))
}

async fn get_phase(state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = lock(&state.config)?.clone();
    let resolved = config.event_type().and_then(|event| {
        config
            .resolve_phase(event, Utc::now())
            .map(|phase| PhaseResponse { event, phase })
    });
    match resolved {
        Ok(phase) => Ok(HttpResponse::Ok().json(phase)),
        Err(err) => Ok(error_response(&err)),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/plan", web::post().to(create_plan))
        .route("/api/plan/last", web::get().to(last_plan))
        .route("/api/readiness", web::post().to(compute_readiness))
        .route("/api/phase", web::get().to(get_phase));
}

pub async fn start_server(port: u16, config: PlannerConfig) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
