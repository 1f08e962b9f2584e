use serde::{Deserialize, Serialize};

/// Whether a movement brings money in or takes it out.
///
/// Stored and submitted as a one-letter code: `I` (ingreso) or `G` (gasto). Parsing also accepts
/// the full Spanish words and lowercase codes.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum MovementType {
    #[serde(rename = "I", alias = "i", alias = "Ingreso", alias = "ingreso")]
    Income,
    #[default]
    #[serde(rename = "G", alias = "g", alias = "Gasto", alias = "gasto")]
    Expense,
}

serde_plain::derive_display_from_serialize!(MovementType);
serde_plain::derive_fromstr_from_deserialize!(MovementType);

impl MovementType {
    /// The persisted one-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            MovementType::Income => "I",
            MovementType::Expense => "G",
        }
    }

    /// The human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MovementType::Income => "Ingreso",
            MovementType::Expense => "Gasto",
        }
    }

    pub fn all() -> [MovementType; 2] {
        [MovementType::Income, MovementType::Expense]
    }
}
