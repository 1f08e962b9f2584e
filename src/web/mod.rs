//! The web application: list, create, edit and delete movements.
//!
//! Each request opens its own movement collection from the configured storage. Messages that must
//! survive a redirect travel in a signed cookie.

mod flash;
mod form;
mod views;

pub use flash::Flash;
pub use form::{FieldError, MovementForm};

use crate::store::{self, StoreError};
use crate::{Config, Result};
use anyhow::{anyhow, Context};
use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// The state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    config: Config,
    key: Key,
}

impl AppState {
    /// Builds the state, deriving the cookie key from the configured secret.
    pub fn new(config: Config) -> Result<Self> {
        let secret = config.secret_key()?;
        let key = Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow!("Unable to use the secret key to sign cookies: {e}"))?;
        Ok(Self { config, key })
    }

    fn app(&self) -> &str {
        self.config.app_name()
    }

    /// Failure details are only shown to the user in debug mode.
    fn detail(&self, e: &StoreError) -> Option<String> {
        self.config.debug().then(|| e.to_string())
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/eliminar/{id}", get(delete))
        .route("/nuevo", get(new_form).post(create))
        .route("/editar/{id}", get(edit_form).post(update))
        .with_state(state)
}

/// Serves the web application on `bind` until the process is stopped.
pub async fn serve(config: Config, bind: SocketAddr) -> Result<()> {
    let state = AppState::new(config)?;
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Unable to listen on {bind}"))?;
    let addr = listener.local_addr().context("Unable to read the bound address")?;
    info!(
        "Serving {} on http://{addr} using {} storage",
        state.app(),
        state.config.storage()
    );
    if state.config.debug() {
        warn!("Debug mode is on, error details will be shown to users");
    }
    axum::serve(listener, router(state))
        .await
        .context("The web server failed")
}

async fn home(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let movements = store::open(&state.config).await;
    (jar, views::home(state.app(), flash, movements.movements())).into_response()
}

async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if id <= 0 {
        return (StatusCode::NOT_FOUND, views::not_found(state.app())).into_response();
    }
    let mut movements = store::open(&state.config).await;
    match movements.delete(id).await {
        Ok(()) => {
            info!("Deleted movement {id}");
            views::deleted(state.app(), id).into_response()
        }
        Err(e) => {
            warn!("Unable to delete movement {id}: {e}");
            views::error(state.app(), id, state.detail(&e).as_deref()).into_response()
        }
    }
}

async fn new_form(State(state): State<AppState>) -> Response {
    views::movement_form(
        state.app(),
        "Nuevo movimiento",
        "/nuevo",
        &MovementForm::default(),
        &[],
    )
    .into_response()
}

async fn create(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<MovementForm>,
) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        debug!("Rejected new movement: {errors:?}");
        return views::movement_form(state.app(), "Nuevo movimiento", "/nuevo", &form, &errors)
            .into_response();
    }
    // TODO: store the movement with Movements::add once creation is meant to persist.
    let movement = form.to_movement(None);
    debug!("Accepted new movement {movement}");
    (flash::put(jar, Flash::Created), Redirect::to("/")).into_response()
}

async fn edit_form(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let movements = store::open(&state.config).await;
    match movements.find_by_id(id).await {
        Ok(movement) => views::movement_form(
            state.app(),
            "Editar movimiento",
            &format!("/editar/{id}"),
            &MovementForm::from_movement(&movement),
            &[],
        )
        .into_response(),
        Err(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, views::not_found(state.app())).into_response()
        }
        Err(e) => {
            warn!("Unable to load movement {id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                views::error(state.app(), id, state.detail(&e).as_deref()),
            )
                .into_response()
        }
    }
}

async fn update(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(id): Path<i64>,
    Form(form): Form<MovementForm>,
) -> Response {
    let action = format!("/editar/{id}");
    let errors = form.validate();
    if !errors.is_empty() {
        debug!("Rejected changes to movement {id}: {errors:?}");
        return views::movement_form(state.app(), "Editar movimiento", &action, &form, &errors)
            .into_response();
    }

    // the id in the path wins over the hidden field
    let movement = form.to_movement(Some(id));
    let mut movements = store::open(&state.config).await;
    let outcome = match movements.edit(movement).await {
        Ok(1) => Flash::Updated,
        Ok(n) => {
            warn!("Editing movement {id} changed {n} records");
            Flash::Unknown
        }
        Err(e @ (StoreError::Backend(_) | StoreError::Unsupported(_) | StoreError::Invalid(_))) => {
            warn!("Unable to save movement {id}: {e}");
            Flash::NotSaved
        }
        Err(e) => {
            warn!("Unable to save movement {id}: {e}");
            Flash::Unknown
        }
    };
    (flash::put(jar, outcome), Redirect::to("/")).into_response()
}
