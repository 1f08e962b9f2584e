use crate::db::{Field, Row};
use crate::model::{amount, MovementType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The concept given to a movement whose raw data has none.
pub const DEFAULT_CONCEPT: &str = "Gastos varios";

/// A single income or expense entry.
///
/// A `Movement` is built from raw field values with [`Movement::from_row`], which never fails:
/// anything that cannot be validated is replaced by a safe default and described in
/// [`Movement::errors`]. The error list is fixed once the movement has been constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    id: Option<i64>,
    date: Option<NaiveDate>,
    concept: String,
    kind: MovementType,
    amount: Decimal,
    #[serde(skip)]
    errors: Vec<String>,
}

impl Movement {
    /// Builds a movement from a raw row keyed by `id`, `fecha`, `concepto`, `tipo` and `cantidad`.
    pub fn from_row(row: &Row) -> Self {
        let mut errors = Vec::new();

        let date = match row.get("fecha") {
            None => parse_date("", &mut errors),
            Some(Field::Text(s)) => parse_date(s, &mut errors),
            Some(Field::Date(d)) => Some(*d),
            Some(Field::Blob(bytes)) => match std::str::from_utf8(bytes) {
                Ok(s) => parse_date(s, &mut errors),
                Err(_) => {
                    errors.push(String::from("Error desconocido con la fecha"));
                    None
                }
            },
            Some(other) => {
                errors.push(format!("La fecha {other} no es una cadena"));
                None
            }
        };

        let amount = match amount::parse(row.get("cantidad")) {
            Ok(value) if value > Decimal::ZERO => value,
            Ok(_) => {
                errors.push(String::from(
                    "El importe de la cantidad debe ser un número mayor que cero",
                ));
                Decimal::ZERO
            }
            Err(_) => {
                errors.push(String::from("El valor no es convertible a número"));
                Decimal::ZERO
            }
        };

        let concept = match row.get("concepto") {
            None => DEFAULT_CONCEPT.to_string(),
            Some(Field::Null) => String::new(),
            Some(field) => field.to_string(),
        };

        let kind = match row.get("tipo") {
            None => MovementType::default(),
            Some(field) => {
                let code = field.to_string();
                MovementType::from_str(&code.trim().to_lowercase()).unwrap_or_else(|_| {
                    errors.push(format!(
                        "El tipo {code} no es un tipo de movimiento válido"
                    ));
                    MovementType::default()
                })
            }
        };

        Self {
            id: row.get("id").and_then(parse_id),
            date,
            concept,
            kind,
            amount,
            errors,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// `None` when the raw date was missing or invalid.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn kind(&self) -> MovementType {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the same movement carrying the identity `id`.
    pub(crate) fn with_id(self, id: i64) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// The persisted text form, in `id, fecha, concepto, tipo, cantidad` order.
    pub(crate) fn to_record(&self) -> [String; 5] {
        [
            self.id.map(|id| id.to_string()).unwrap_or_default(),
            self.date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            self.concept.clone(),
            self.kind.code().to_string(),
            self.amount.to_string(),
        ]
    }
}

impl Display for Movement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let date = self
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| String::from("????-??-??"));
        write!(
            f,
            "{date} | {} | {} | {}",
            self.concept,
            self.kind.code(),
            self.amount
        )
    }
}

fn parse_date(s: &str, errors: &mut Vec<String>) -> Option<NaiveDate> {
    let date = parse_iso_date(s);
    if date.is_none() {
        errors.push(format!("La fecha {s} no es una fecha ISO 8601 válida"));
    }
    date
}

/// Parses a calendar date written exactly as `YYYY-MM-DD`.
///
/// chrono's `%Y-%m-%d` also takes signed years and unpadded months or days, so the shape is
/// checked before parsing.
pub(crate) fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(ix, b)| match ix {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_id(field: &Field) -> Option<i64> {
    match field {
        Field::Integer(i) => Some(*i),
        Field::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}
