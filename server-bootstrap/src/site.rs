use std::io;
use strum::{AsRefStr, EnumIter};

use crate::config::SiteDefaults;
use crate::error::SetupError;
use crate::operator::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum SiteField {
    #[strum(serialize = "COUNTRY")]
    Country,
    #[strum(serialize = "STATE")]
    State,
    #[strum(serialize = "CITY")]
    City,
    #[strum(serialize = "ORGANIZATIONAL_UNIT")]
    OrgUnit,
}

impl SiteField {
    pub fn prompt(self) -> &'static str {
        match self {
            SiteField::Country => "Country code",
            SiteField::State => "State or province",
            SiteField::City => "City",
            SiteField::OrgUnit => "Organizational unit",
        }
    }

    fn default_in(self, defaults: &SiteDefaults) -> &str {
        match self {
            SiteField::Country => &defaults.country,
            SiteField::State => &defaults.state,
            SiteField::City => &defaults.city,
            SiteField::OrgUnit => &defaults.org_unit,
        }
    }
}

/// Values supplied up front (CLI flags); these skip the prompt.
#[derive(Debug, Clone, Default)]
pub struct SiteOverrides {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub org_unit: Option<String>,
}

impl SiteOverrides {
    fn get(&self, field: SiteField) -> Option<&str> {
        match field {
            SiteField::Country => self.country.as_deref(),
            SiteField::State => self.state.as_deref(),
            SiteField::City => self.city.as_deref(),
            SiteField::OrgUnit => self.org_unit.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub country: String,
    pub state: String,
    pub city: String,
    pub org_unit: String,
}

impl SiteInfo {
    pub fn get(&self, field: SiteField) -> &str {
        match field {
            SiteField::Country => &self.country,
            SiteField::State => &self.state,
            SiteField::City => &self.city,
            SiteField::OrgUnit => &self.org_unit,
        }
    }

    /// `provided orelse prompted orelse default`, per field.
    pub fn resolve(
        overrides: &SiteOverrides,
        defaults: &SiteDefaults,
        operator: &mut dyn Operator,
    ) -> io::Result<Self> {
        let mut resolve_field = |field: SiteField| -> io::Result<String> {
            let default = field.default_in(defaults);
            let value = match overrides.get(field) {
                Some(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => {
                    let answer = operator.ask(field.prompt(), default)?;
                    if answer.trim().is_empty() {
                        default.to_string()
                    } else {
                        answer.trim().to_string()
                    }
                }
            };
            check_value(field, &value)?;
            Ok(value)
        };
        Ok(Self {
            country: resolve_field(SiteField::Country)?,
            state: resolve_field(SiteField::State)?,
            city: resolve_field(SiteField::City)?,
            org_unit: resolve_field(SiteField::OrgUnit)?,
        })
    }
}

fn check_value(field: SiteField, value: &str) -> Result<(), SetupError> {
    if value.contains(['\n', '\r']) {
        return Err(SetupError::InvalidSiteValue {
            field: field.as_ref().to_string(),
            reason: "line breaks are not allowed".to_string(),
        });
    }
    Ok(())
}
