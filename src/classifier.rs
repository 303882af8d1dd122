use crate::fingerprint::normalize_description;
use crate::models::Direction;

pub const INCOME_FALLBACK: &str = "OTROS_INGRESOS";
pub const EXPENSE_FALLBACK: &str = "OTROS_EGRESOS";

// Ordered (keyword, code) rules, evaluated top to bottom; first match wins.
// Several keywords can match the same description, so order is part of the
// contract.
const INCOME_RULES: &[(&str, &str)] = &[
    ("CUOTA", "CUOTAS"),
    ("APORTACION", "APORTACIONES"),
    ("APORTE", "APORTACIONES"),
    ("INTERES", "INTERESES"),
    ("RENDIMIENTO", "INTERESES"),
    ("DONATIVO", "DONATIVOS"),
    ("DONACION", "DONATIVOS"),
];

const EXPENSE_RULES: &[(&str, &str)] = &[
    ("COMISION", "COMISIONES"),
    ("MANEJO DE CUENTA", "COMISIONES"),
    ("PAPELERIA", "PAPELERIA"),
    ("COPIAS", "PAPELERIA"),
    ("HONORARIO", "HONORARIOS"),
    ("CONTADOR", "HONORARIOS"),
    ("NOTARIO", "HONORARIOS"),
    ("MANTENIMIENTO", "MANTENIMIENTO"),
    ("REPARACION", "MANTENIMIENTO"),
    ("LIMPIEZA", "MANTENIMIENTO"),
    ("FESTEJO", "FESTEJOS"),
    ("POSADA", "FESTEJOS"),
    ("EVENTO", "FESTEJOS"),
    ("APOYO", "APOYOS"),
    ("AYUDA", "APOYOS"),
];

/// Map a free-text description to an income-source or expense-category code.
/// Never returns "unclassified": the direction's fallback bucket catches
/// everything the keyword table misses.
pub fn classify(description: &str, direction: Direction) -> &'static str {
    let normalized = normalize_description(description);
    let (rules, fallback) = match direction {
        Direction::Income => (INCOME_RULES, INCOME_FALLBACK),
        Direction::Expense => (EXPENSE_RULES, EXPENSE_FALLBACK),
    };
    for (keyword, code) in rules {
        if normalized.contains(keyword) {
            return code;
        }
    }
    fallback
}
