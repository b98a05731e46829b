//! # Column Resolver
//!
//! Maps arbitrary spreadsheet headers onto canonical participant fields.
//!
//! Headers and aliases are both normalized (lowercase, diacritics stripped,
//! only `[a-z0-9]` kept) and compared by substring containment in either
//! direction. Aliases are tried in table order and the first header that
//! matches the current alias wins, so alias order is the only priority rule.
//!
//! ```
//! use certforge::ingest::resolve::{CanonicalField, find_column};
//! use certforge::ingest::workbook::Row;
//!
//! let row: Row = [("CORREO ELECTRONICO INSTITUCIONAL", "ana@x.com")].into_iter().collect();
//! assert_eq!(find_column(&row, CanonicalField::Email.aliases()), "ana@x.com");
//! ```

use unicode_normalization::UnicodeNormalization;

use super::workbook::Row;

/// Normalize a header or alias for comparison.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .nfd()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Bidirectional containment on already-normalized strings.
///
/// A header that normalizes to nothing (e.g. `"#"`) is contained in every
/// alias, so it matches whatever field is looked up first.
fn matches(header: &str, alias: &str) -> bool {
    header.contains(alias) || alias.contains(header)
}

/// Return the value of the first column matching the aliases, in alias order.
///
/// The value is returned verbatim; an empty string means no header matched.
pub fn find_column<'a>(row: &'a Row, aliases: &[&str]) -> &'a str {
    for alias in aliases {
        let alias = normalize(alias);
        for (header, value) in row.cells() {
            if matches(&normalize(header), &alias) {
                return value;
            }
        }
    }
    ""
}

/// Canonical participant fields resolved from a spreadsheet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Email,
    FullName,
    DocumentId,
    Role,
    Timestamp,
    Gender,
    Phone,
    EmploymentRegime,
    OrgUnit,
    Survey,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Email,
        CanonicalField::FullName,
        CanonicalField::DocumentId,
        CanonicalField::Role,
        CanonicalField::Timestamp,
        CanonicalField::Gender,
        CanonicalField::Phone,
        CanonicalField::EmploymentRegime,
        CanonicalField::OrgUnit,
        CanonicalField::Survey,
    ];

    /// Header variants for this field, most specific first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Email => &[
                "correo electronico",
                "correo",
                "email",
                "e-mail",
                "mail",
                "correoelectronico",
            ],
            CanonicalField::FullName => &[
                "nombres y apellidos",
                "nombres apellidos",
                "nombre completo",
                "apellidos y nombres",
                "nombre",
                "participante",
            ],
            CanonicalField::DocumentId => &[
                "documento de identidad",
                "documento",
                "dni",
                "doc identidad",
                "cedula",
                "identificacion",
            ],
            CanonicalField::Role => &["cargo", "puesto", "funcion", "ocupacion"],
            CanonicalField::Timestamp => &["marca temporal", "timestamp", "fecha"],
            CanonicalField::Gender => &["genero", "sexo"],
            CanonicalField::Phone => &["numero de celular", "celular", "telefono", "movil"],
            CanonicalField::EmploymentRegime => &["regimen laboral", "regimen", "tipo contrato"],
            CanonicalField::OrgUnit => &[
                "organo o unidad organica",
                "unidad organica",
                "area",
                "departamento",
                "organo",
            ],
            CanonicalField::Survey => &["encuesta", "satisfaccion"],
        }
    }
}

/// A row after column resolution: every canonical field, trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRecord {
    pub email: String,
    pub full_name: String,
    pub document_id: String,
    pub role: String,
    pub timestamp: String,
    pub gender: String,
    pub phone: String,
    pub employment_regime: String,
    pub org_unit: String,
    pub survey: String,
}

impl ResolvedRecord {
    /// Resolve every canonical field of one row.
    pub fn from_row(row: &Row) -> Self {
        let mut record = Self::default();
        for field in CanonicalField::ALL {
            *record.slot(field) = find_column(row, field.aliases()).trim().to_string();
        }
        record
    }

    fn slot(&mut self, field: CanonicalField) -> &mut String {
        match field {
            CanonicalField::Email => &mut self.email,
            CanonicalField::FullName => &mut self.full_name,
            CanonicalField::DocumentId => &mut self.document_id,
            CanonicalField::Role => &mut self.role,
            CanonicalField::Timestamp => &mut self.timestamp,
            CanonicalField::Gender => &mut self.gender,
            CanonicalField::Phone => &mut self.phone,
            CanonicalField::EmploymentRegime => &mut self.employment_regime,
            CanonicalField::OrgUnit => &mut self.org_unit,
            CanonicalField::Survey => &mut self.survey,
        }
    }
}
