// src/handlers/stream.rs

// Snapshots em tempo real da oficina via SSE. Cada evento leva o nome da
// coleção (ou "settings") e o snapshot inteiro dela. Logout, troca de senha e
// mudança de permissões acordam o stream, que revalida a sessão: se ela caiu
// o stream termina; se o acesso mudou, os listeners são religados.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::Value;

use crate::{
    common::error::AppError,
    config::AppState,
    db::{
        change_feed::{Change, WatchTarget},
        store::DocumentStore,
    },
    middleware::{access::Access, rbac::RequireActiveSubscription},
    models::{access::AccessContext, records::TenantCollection},
    services::{
        listeners::TenantListeners,
        record_service::{ensure_active, ensure_any},
    },
};

const SETTINGS_EVENT: &str = "settings";

fn readable_collections(ctx: &AccessContext) -> Vec<TenantCollection> {
    TenantCollection::ALL
        .into_iter()
        .filter(|collection| ensure_any(ctx, collection.rule().read_any).is_ok())
        .collect()
}

fn watch_targets(ctx: &AccessContext, collections: &[TenantCollection]) -> Vec<WatchTarget> {
    let mut targets: Vec<WatchTarget> = collections
        .iter()
        .map(|collection| WatchTarget::Collection(ctx.scope.collection(*collection)))
        .collect();
    targets.push(WatchTarget::Document(ctx.scope.settings()));
    targets
}

/// Refaz o caminho do `auth_guard` + `access_guard` com o token do stream.
async fn revalidate(app_state: &AppState, token: &str) -> Result<AccessContext, AppError> {
    let identity = app_state.auth_service.identify(token).await?;
    let ctx = app_state.access_service.build_context(identity, Utc::now()).await?;
    ensure_active(&ctx)?;
    Ok(ctx)
}

enum Wake {
    Session,
    Change(WatchTarget, Change),
    Closed,
}

async fn collection_event(store: &Arc<dyn DocumentStore>, ctx: &AccessContext, collection: TenantCollection) -> Event {
    match store.list(&ctx.scope.collection(collection)).await {
        Ok(docs) => {
            let snapshot: Vec<Value> = docs.iter().map(|doc| doc.to_json_with_id()).collect();
            let json = serde_json::to_string(&snapshot).unwrap_or_default();
            Event::default().event(collection.as_str()).data(json)
        }
        Err(e) => {
            tracing::error!("Snapshot de {} falhou: {}", collection.as_str(), e);
            Event::default().event("error").data(collection.as_str())
        }
    }
}

async fn settings_event(store: &Arc<dyn DocumentStore>, ctx: &AccessContext) -> Event {
    match store.get(&ctx.scope.settings()).await {
        Ok(doc) => {
            let json = doc
                .map(|doc| doc.to_json_with_id())
                .unwrap_or(Value::Null)
                .to_string();
            Event::default().event(SETTINGS_EVENT).data(json)
        }
        Err(e) => {
            tracing::error!("Snapshot das configurações falhou: {}", e);
            Event::default().event("error").data(SETTINGS_EVENT)
        }
    }
}

// GET /api/stream
#[utoipa::path(
    get,
    path = "/api/stream",
    tag = "Realtime",
    responses(
        (status = 200, description = "text/event-stream com um snapshot por coleção liberada"),
        (status = 402, description = "Assinatura inativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn stream_snapshots(
    State(app_state): State<AppState>,
    _active: RequireActiveSubscription,
    Access(ctx): Access,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let store = app_state.store.clone();
    let token = bearer.token().to_string();
    let mut session = app_state.session_signals.subscribe(&ctx.identity.uid);

    let stream = async_stream::stream! {
        let mut ctx = ctx;
        let mut collections = readable_collections(&ctx);
        let mut listeners = TenantListeners::new();
        listeners.bind(&store, &ctx.scope, watch_targets(&ctx, &collections));

        for collection in &collections {
            yield Ok(collection_event(&store, &ctx, *collection).await);
        }
        yield Ok(settings_event(&store, &ctx).await);

        loop {
            // Sessão primeiro: nada sai depois de um logout já sinalizado.
            let wake = tokio::select! {
                biased;
                changed = session.changed() => match changed {
                    Ok(()) => Wake::Session,
                    Err(_) => Wake::Closed,
                },
                next = listeners.next_change() => match next {
                    Some((target, change)) => Wake::Change(target, change),
                    None => Wake::Closed,
                },
            };

            match wake {
                Wake::Closed => break,
                Wake::Session => match revalidate(&app_state, &token).await {
                    Ok(next) => {
                        let next_collections = readable_collections(&next);
                        let rebound = listeners.bind(&store, &next.scope, watch_targets(&next, &next_collections));
                        ctx = next;
                        collections = next_collections;
                        if rebound {
                            for collection in &collections {
                                yield Ok(collection_event(&store, &ctx, *collection).await);
                            }
                            yield Ok(settings_event(&store, &ctx).await);
                        }
                    }
                    Err(e) => {
                        tracing::info!("Stream de {} encerrado pela sessão: {}", ctx.identity.uid, e);
                        break;
                    }
                },
                Wake::Change(_, Change::Lagged) => {
                    // Eventos perdidos: reenvia tudo.
                    for collection in &collections {
                        yield Ok(collection_event(&store, &ctx, *collection).await);
                    }
                    yield Ok(settings_event(&store, &ctx).await);
                }
                Wake::Change(WatchTarget::Document(_), Change::Event(_)) => {
                    yield Ok(settings_event(&store, &ctx).await);
                }
                Wake::Change(WatchTarget::Collection(path), Change::Event(_)) => {
                    if let Some(collection) = TenantCollection::parse(path.id()) {
                        yield Ok(collection_event(&store, &ctx, collection).await);
                    }
                }
            }
        }

        listeners.release();
        tracing::info!("Stream de {} encerrado.", ctx.identity.uid);
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
