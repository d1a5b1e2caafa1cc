// src/main.rs

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização.
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // O reaper é o único processo de fundo do núcleo: varre reservas vencidas
    // usando as mesmas primitivas públicas de qualquer chamador.
    services::reaper::spawn(app_state.hold_service.clone(), app_state.reaper_interval);

    // Rotas do núcleo de inventário.
    let inventory_routes = Router::new()
        // Configuração (lotes de GA e planta de assentos)
        .route("/tiers", post(handlers::inventory::create_tier))
        .route("/seats", post(handlers::inventory::create_seats))
        // Bloqueios administrativos
        .route(
            "/blocks",
            post(handlers::inventory::create_block).delete(handlers::inventory::remove_blocks),
        )
        // Reservas de checkout
        .route("/holds", post(handlers::inventory::create_hold))
        .route(
            "/holds/{hold_id}",
            axum::routing::delete(handlers::inventory::release_hold),
        )
        .route(
            "/holds/{hold_id}/convert",
            post(handlers::inventory::convert_hold),
        )
        // Confirmação e estorno vindos do colaborador de pedidos/pagamentos
        .route("/sales", post(handlers::inventory::register_sale))
        .route("/refunds", post(handlers::inventory::register_refund))
        // Consultas de exibição
        .route("/summary", get(handlers::inventory::get_summary))
        .route("/activity", get(handlers::inventory::get_activity))
        // Reconciliação administrativa
        .route("/reconcile", post(handlers::inventory::reconcile_tier));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/inventory", inventory_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    // Inicia o servidor
    let addr = format!("0.0.0.0:{}", app_state.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
