use crate::db::{Field, Row};
use crate::model::{parse_iso_date, Movement, MovementType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The smallest amount the form accepts.
const MIN_AMOUNT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// A validation failure attached to one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// The movement form as submitted by the browser. Every field is kept as raw text so that a bad
/// value can be reported next to its input instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementForm {
    pub id: String,
    pub fecha: String,
    pub concepto: String,
    pub tipo: String,
    pub cantidad: String,
}

impl MovementForm {
    /// Pre-fills the form from a stored movement.
    pub fn from_movement(movement: &Movement) -> Self {
        Self {
            id: movement.id().map(|id| id.to_string()).unwrap_or_default(),
            fecha: movement
                .date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            concepto: movement.concept().to_string(),
            tipo: movement.kind().code().to_string(),
            cantidad: movement.amount().to_string(),
        }
    }

    /// Checks each field in form order. At most one error is reported per field.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if parse_iso_date(self.fecha.trim()).is_none() {
            errors.push(FieldError {
                field: "fecha",
                message: "Debes indicar la fecha del movimiento",
            });
        }

        if self.concepto.trim().is_empty() {
            errors.push(FieldError {
                field: "concepto",
                message: "No has especificado un concepto para este movimiento",
            });
        }

        let valid_types = MovementType::all().map(|t| t.code());
        if !valid_types.contains(&self.tipo.as_str()) {
            errors.push(FieldError {
                field: "tipo",
                message: "Necesito saber si es un gasto o un ingreso",
            });
        }

        // a zero amount counts as missing
        match Decimal::from_str(self.cantidad.trim()) {
            Ok(amount) if amount.is_zero() => errors.push(FieldError {
                field: "cantidad",
                message: "No puede haber un movimiento sin una cantidad asociada",
            }),
            Ok(amount) if amount < MIN_AMOUNT => errors.push(FieldError {
                field: "cantidad",
                message: "No se permiten cantidades inferiores a 10 centimos",
            }),
            Ok(_) => {}
            Err(_) => errors.push(FieldError {
                field: "cantidad",
                message: "No puede haber un movimiento sin una cantidad asociada",
            }),
        }

        errors
    }

    /// Builds the movement described by the form, carrying `id` when given.
    pub fn to_movement(&self, id: Option<i64>) -> Movement {
        let mut row = Row::new()
            .with("fecha", Field::text(self.fecha.trim()))
            .with("concepto", Field::text(self.concepto.trim()))
            .with("tipo", Field::text(self.tipo.trim()))
            .with("cantidad", Field::text(self.cantidad.trim()));
        if let Some(id) = id {
            row.set("id", Field::Integer(id));
        }
        Movement::from_row(&row)
    }
}
