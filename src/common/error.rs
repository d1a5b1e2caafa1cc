// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Taxonomia de erros do núcleo de inventário, com `thiserror` para melhor
// ergonomia. Erros de negócio carregam dados suficientes para o chamador
// montar uma mensagem ao usuário.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Requisição malformada detectada antes de qualquer transação começar.
    #[error("Requisição inválida: {0}")]
    InvalidRequest(String),

    #[error("Lote não encontrado")]
    TierNotFound,

    #[error("Um ou mais assentos não foram encontrados")]
    SeatNotFound(Vec<Uuid>),

    // Sinal de idempotência: desbloquear duas vezes não é erro fatal,
    // mas nunca credita capacidade em dobro. Reservas não precisam de um
    // análogo: liberar/converter uma reserva ausente devolve `false`.
    #[error("Bloqueio não encontrado ou já desativado")]
    BlockNotFound,

    #[error("Inventário insuficiente: solicitado {requested}, disponível {available}")]
    InsufficientInventory { requested: i32, available: i32 },

    // Tudo-ou-nada: nenhum assento muda de estado quando algum está ocupado.
    #[error("Um ou mais assentos não estão disponíveis")]
    SeatAlreadyTaken { seats: Vec<Uuid> },

    // Conflito da trava otimista após esgotar as retentativas internas.
    // O chamador pode repetir a operação.
    #[error("Conflito de transação, tente novamente")]
    TransactionConflict,

    // Os contadores divergem da trilha de auditoria. Nunca é reparado em
    // silêncio: o lote fica travado para mutação até reconciliação manual.
    #[error("Invariante do livro-razão violada no lote {tier_id}")]
    LedgerInvariantViolation { tier_id: Uuid },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),

            AppError::TierNotFound => (StatusCode::NOT_FOUND, "Lote não encontrado.".to_string()),
            AppError::SeatNotFound(ids) => {
                let body = Json(json!({
                    "error": "Um ou mais assentos não foram encontrados.",
                    "seatIds": ids,
                }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::BlockNotFound => (
                StatusCode::NOT_FOUND,
                "Bloqueio não encontrado ou já desativado.".to_string(),
            ),

            AppError::InsufficientInventory { requested, available } => (
                StatusCode::CONFLICT,
                format!(
                    "Inventário insuficiente: solicitado {requested}, disponível {available}."
                ),
            ),
            AppError::SeatAlreadyTaken { seats } => {
                let body = Json(json!({
                    "error": "Um ou mais assentos não estão disponíveis. Nenhum assento foi alterado.",
                    "seatIds": seats,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            AppError::TransactionConflict => (
                StatusCode::SERVICE_UNAVAILABLE,
                "O inventário está sob alta concorrência. Tente novamente.".to_string(),
            ),

            AppError::LedgerInvariantViolation { tier_id } => {
                tracing::error!(
                    %tier_id,
                    "Invariante do livro-razão violada: lote travado para reconciliação manual"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Inconsistência de inventário detectada. O lote foi travado para reconciliação.".to_string(),
                )
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe o genérico.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
