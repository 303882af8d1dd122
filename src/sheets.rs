use regex::Regex;

use crate::models::Period;

/// Sheet recognized as one monthly ledger cut-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSheet {
    pub name: String,
    pub period: Period,
}

const MONTHS: &[(&str, u32)] = &[
    ("ENERO", 1),
    ("FEBRERO", 2),
    ("MARZO", 3),
    ("ABRIL", 4),
    ("MAYO", 5),
    ("JUNIO", 6),
    ("JULIO", 7),
    ("AGOSTO", 8),
    ("SEPTIEMBRE", 9),
    ("SETIEMBRE", 9),
    ("OCTUBRE", 10),
    ("NOVIEMBRE", 11),
    ("DICIEMBRE", 12),
];

// Aggregate sheets that may be skipped without error; everything else that
// fails the cut-off pattern is a fatal condition.
const SUMMARY_MARKERS: &[&str] = &["RESUMEN", "ANUAL", "CONSOLIDADO", "TOTALES", "GRAFICA", "GRÁFICA"];

fn month_number(name: &str) -> Option<u32> {
    MONTHS.iter().find(|(m, _)| *m == name).map(|(_, n)| *n)
}

fn cutoff_pattern() -> Regex {
    let months: Vec<&str> = MONTHS.iter().map(|(m, _)| *m).collect();
    // Marker word, optional qualifier, month name, optional day-of-month
    // noise, then a two- or four-digit year; separators may be spaces,
    // hyphens or dots throughout.
    let pattern = format!(
        r"^CORTE(?:[\s.\-]+(?:AL|DEL|DE))?[\s.\-]+({})(?:[\s.\-]+\d{{1,2}})?[\s.\-]+(\d{{4}}|\d{{2}})$",
        months.join("|")
    );
    Regex::new(&pattern).unwrap()
}

pub fn is_summary_sheet(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    SUMMARY_MARKERS.iter().any(|m| upper.contains(m))
}

/// Extract the (year, month) period from a cut-off sheet name, or None if
/// the name does not follow the convention.
pub fn classify_sheet_name(name: &str) -> Option<Period> {
    let upper = name.trim().to_uppercase();
    let caps = cutoff_pattern().captures(&upper)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let year_raw = caps.get(2)?.as_str();
    let year: i32 = year_raw.parse().ok()?;
    // Two-digit years belong to the current century.
    let year = if year_raw.len() == 2 { 2000 + year } else { year };
    Some(Period::new(year, month))
}

/// Scan workbook sheet names and return the cut-off sheets sorted ascending
/// by period. A non-summary sheet that fails the pattern makes the whole
/// import fail: ledger data must never be silently skipped.
pub fn classify_sheets(names: &[String]) -> std::result::Result<Vec<ClassifiedSheet>, String> {
    let mut sheets = Vec::new();
    for name in names {
        match classify_sheet_name(name) {
            Some(period) => sheets.push(ClassifiedSheet {
                name: name.clone(),
                period,
            }),
            None if is_summary_sheet(name) => continue,
            None => {
                return Err(format!(
                    "Sheet \"{name}\" is not a recognizable ledger cut-off and is not a summary sheet"
                ));
            }
        }
    }
    if sheets.is_empty() {
        return Err("Workbook contains no recognizable ledger sheets".to_string());
    }
    sheets.sort_by_key(|s| s.period);
    Ok(sheets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_plain_names() {
        assert_eq!(classify_sheet_name("CORTE ENERO 2024"), Some(Period::new(2024, 1)));
        assert_eq!(classify_sheet_name("CORTE DE FEBRERO 2024"), Some(Period::new(2024, 2)));
        assert_eq!(classify_sheet_name("corte marzo 24"), Some(Period::new(2024, 3)));
    }

    #[test]
    fn test_classify_with_day_noise_and_two_digit_year() {
        assert_eq!(classify_sheet_name("CORTE OCTUBRE 31-25"), Some(Period::new(2025, 10)));
        assert_eq!(classify_sheet_name("CORTE NOVIEMBRE 30-25"), Some(Period::new(2025, 11)));
        assert_eq!(classify_sheet_name("CORTE AL DICIEMBRE 31 2023"), Some(Period::new(2023, 12)));
    }

    #[test]
    fn test_classify_tolerates_separators() {
        assert_eq!(classify_sheet_name("CORTE-JULIO-2025"), Some(Period::new(2025, 7)));
        assert_eq!(classify_sheet_name("CORTE.AGOSTO.25"), Some(Period::new(2025, 8)));
        assert_eq!(classify_sheet_name("  CORTE SEPTIEMBRE 2025  "), Some(Period::new(2025, 9)));
        assert_eq!(classify_sheet_name("CORTE SETIEMBRE 2025"), Some(Period::new(2025, 9)));
    }

    #[test]
    fn test_classify_rejects_non_cutoff_names() {
        assert_eq!(classify_sheet_name("RESUMEN ANUAL"), None);
        assert_eq!(classify_sheet_name("OCTUBRE 2025"), None);
        assert_eq!(classify_sheet_name("CORTE 2025"), None);
        assert_eq!(classify_sheet_name("CORTE FEBRERO"), None);
        assert_eq!(classify_sheet_name("Hoja1"), None);
    }

    #[test]
    fn test_is_summary_sheet() {
        assert!(is_summary_sheet("RESUMEN 2025"));
        assert!(is_summary_sheet("Concentrado anual"));
        assert!(is_summary_sheet("GRAFICAS"));
        assert!(!is_summary_sheet("CORTE ENERO 2025"));
        assert!(!is_summary_sheet("Hoja1"));
    }

    #[test]
    fn test_classify_sheets_sorts_by_period() {
        let names = vec![
            "CORTE NOVIEMBRE 30-25".to_string(),
            "RESUMEN ANUAL".to_string(),
            "CORTE OCTUBRE 31-25".to_string(),
            "CORTE ENERO 2025".to_string(),
        ];
        let sheets = classify_sheets(&names).unwrap();
        let periods: Vec<String> = sheets.iter().map(|s| s.period.to_string()).collect();
        assert_eq!(periods, vec!["2025-01", "2025-10", "2025-11"]);
    }

    #[test]
    fn test_classify_sheets_fails_on_unrecognized_non_summary_sheet() {
        let names = vec![
            "CORTE OCTUBRE 31-25".to_string(),
            "Hoja de trabajo".to_string(),
        ];
        let err = classify_sheets(&names).unwrap_err();
        assert!(err.contains("Hoja de trabajo"));
    }

    #[test]
    fn test_classify_sheets_fails_when_nothing_matches() {
        let names = vec!["RESUMEN".to_string(), "GRAFICAS".to_string()];
        let err = classify_sheets(&names).unwrap_err();
        assert!(err.contains("no recognizable ledger sheets"));
    }
}
