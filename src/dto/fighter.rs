//! Fighter payloads in the client shape and the backend shape, plus the
//! translation between them.

use serde::{Deserialize, Serialize};

/// Identifier assigned to fighters by the backend.
pub type FighterId = i64;

/// Weight classes known to the backend, lightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    /// Up to 52 kg.
    Strawweight,
    /// Up to 57 kg.
    Flyweight,
    /// Up to 61 kg.
    Bantamweight,
    /// Up to 66 kg.
    Featherweight,
    /// Up to 70 kg; also the class for an unknown weight.
    Lightweight,
    /// Up to 77 kg.
    Welterweight,
    /// Up to 84 kg.
    Middleweight,
    /// Up to 93 kg.
    #[serde(rename = "Light_Heavyweight")]
    LightHeavyweight,
    /// Up to 120 kg.
    Heavyweight,
    /// Above 120 kg.
    #[serde(rename = "Super_Heavyweight")]
    SuperHeavyweight,
}

/// One row of the weight-class table.
struct ClassBand {
    class: WeightClass,
    /// Inclusive upper bound in kg; `None` for the open-ended top class.
    upper_kg: Option<f64>,
    /// Weight reported for the class when only the label is known.
    representative_kg: f64,
}

/// The single canonical mapping between weights and classes.
const WEIGHT_TABLE: [ClassBand; 10] = [
    ClassBand {
        class: WeightClass::Strawweight,
        upper_kg: Some(52.0),
        representative_kg: 52.0,
    },
    ClassBand {
        class: WeightClass::Flyweight,
        upper_kg: Some(57.0),
        representative_kg: 57.0,
    },
    ClassBand {
        class: WeightClass::Bantamweight,
        upper_kg: Some(61.0),
        representative_kg: 61.0,
    },
    ClassBand {
        class: WeightClass::Featherweight,
        upper_kg: Some(66.0),
        representative_kg: 66.0,
    },
    ClassBand {
        class: WeightClass::Lightweight,
        upper_kg: Some(70.0),
        representative_kg: 70.0,
    },
    ClassBand {
        class: WeightClass::Welterweight,
        upper_kg: Some(77.0),
        representative_kg: 77.0,
    },
    ClassBand {
        class: WeightClass::Middleweight,
        upper_kg: Some(84.0),
        representative_kg: 84.0,
    },
    ClassBand {
        class: WeightClass::LightHeavyweight,
        upper_kg: Some(93.0),
        representative_kg: 93.0,
    },
    ClassBand {
        class: WeightClass::Heavyweight,
        upper_kg: Some(120.0),
        representative_kg: 120.0,
    },
    // Shares the heavyweight figure: the table is lossy at the top end.
    ClassBand {
        class: WeightClass::SuperHeavyweight,
        upper_kg: None,
        representative_kg: 120.0,
    },
];

/// Label fragments tried in order against a lowercased backend label; the
/// first rule whose fragments all appear wins. `Super_Heavyweight` falls
/// through to the `heavy` rule.
const LABEL_RULES: [(&[&str], WeightClass); 9] = [
    (&["straw"], WeightClass::Strawweight),
    (&["fly"], WeightClass::Flyweight),
    (&["bantam"], WeightClass::Bantamweight),
    (&["feather"], WeightClass::Featherweight),
    (&["light", "heavy"], WeightClass::LightHeavyweight),
    (&["light"], WeightClass::Lightweight),
    (&["welter"], WeightClass::Welterweight),
    (&["middle"], WeightClass::Middleweight),
    (&["heavy"], WeightClass::Heavyweight),
];

/// Weight reported when the class is missing or unrecognised.
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

impl WeightClass {
    /// Backend label for the class.
    pub fn label(self) -> &'static str {
        match self {
            WeightClass::Strawweight => "Strawweight",
            WeightClass::Flyweight => "Flyweight",
            WeightClass::Bantamweight => "Bantamweight",
            WeightClass::Featherweight => "Featherweight",
            WeightClass::Lightweight => "Lightweight",
            WeightClass::Welterweight => "Welterweight",
            WeightClass::Middleweight => "Middleweight",
            WeightClass::LightHeavyweight => "Light_Heavyweight",
            WeightClass::Heavyweight => "Heavyweight",
            WeightClass::SuperHeavyweight => "Super_Heavyweight",
        }
    }

    /// Class whose band contains `weight`. A missing or zero weight maps to
    /// [`WeightClass::Lightweight`].
    pub fn from_weight(weight: Option<f64>) -> Self {
        let weight = match weight {
            Some(kg) if kg != 0.0 && !kg.is_nan() => kg,
            _ => return WeightClass::Lightweight,
        };

        WEIGHT_TABLE
            .iter()
            .find(|band| band.upper_kg.is_none_or(|upper| weight <= upper))
            .map(|band| band.class)
            .unwrap_or(WeightClass::SuperHeavyweight)
    }

    /// Approximate weight for the class. Not the inverse of [`Self::from_weight`].
    pub fn representative_weight(self) -> f64 {
        WEIGHT_TABLE
            .iter()
            .find(|band| band.class == self)
            .map(|band| band.representative_kg)
            .unwrap_or(DEFAULT_WEIGHT_KG)
    }

    /// Match a free-form backend label by its fragments, case-insensitively.
    pub fn match_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        LABEL_RULES
            .iter()
            .find(|(fragments, _)| fragments.iter().all(|f| label.contains(f)))
            .map(|(_, class)| *class)
    }
}

/// Approximate weight for a backend class label.
pub fn category_to_weight(label: Option<&str>) -> f64 {
    label
        .and_then(WeightClass::match_label)
        .map(WeightClass::representative_weight)
        .unwrap_or(DEFAULT_WEIGHT_KG)
}

/// Fighter as the client works with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    /// Backend id; `None` until created.
    pub id: Option<FighterId>,
    /// Display name, derived from first/last name when the backend omits it.
    pub name: String,
    /// Given name as stored by the backend.
    pub first_name: Option<String>,
    /// Family name as stored by the backend.
    pub last_name: Option<String>,
    /// Weight in kg; approximated from the class when the backend omits it.
    pub weight: f64,
    /// Class label exactly as the backend sent it.
    pub category_weight: Option<String>,
    /// Fighting style, falling back to the club.
    pub style: String,
    /// Club or gym.
    pub club: Option<String>,
    /// Wins, from either naming convention.
    pub wins: u32,
    /// Losses, from either naming convention.
    pub losses: u32,
    /// Draws, from either naming convention.
    pub draws: u32,
    /// Backend win count, untouched.
    pub record_w: Option<u32>,
    /// Backend loss count, untouched.
    pub record_l: Option<u32>,
    /// Backend draw count, untouched.
    pub record_d: Option<u32>,
    /// Country, empty when unknown.
    pub country: String,
    /// Backend status label, e.g. `ACTIVE`.
    pub status: Option<String>,
}

/// Form input used to create or update a fighter. Either naming convention
/// may be filled in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FighterForm {
    /// Full name; split on whitespace into first and last name.
    pub name: Option<String>,
    /// Used when `name` yields no first token.
    pub first_name: Option<String>,
    /// Used when `name` has a single token.
    pub last_name: Option<String>,
    /// Weight in kg, turned into a class.
    pub weight: Option<f64>,
    /// Club; preferred over `style`.
    pub club: Option<String>,
    /// Style, sent as the club when no club is given.
    pub style: Option<String>,
    /// Wins; preferred over `record_w`.
    pub wins: Option<u32>,
    /// Losses; preferred over `record_l`.
    pub losses: Option<u32>,
    /// Draws; preferred over `record_d`.
    pub draws: Option<u32>,
    /// Backend-style win count.
    pub record_w: Option<u32>,
    /// Backend-style loss count.
    pub record_l: Option<u32>,
    /// Backend-style draw count.
    pub record_d: Option<u32>,
    /// Status label; `ACTIVE` when absent.
    pub status: Option<String>,
}

/// Body sent to the backend on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterPayload {
    /// First name token.
    pub first_name: String,
    /// Remaining name tokens joined by one space.
    pub last_name: String,
    /// Class derived from the form weight.
    pub category_weight: WeightClass,
    /// Club, else style, else empty.
    pub club: String,
    /// Wins.
    pub record_w: u32,
    /// Losses.
    pub record_l: u32,
    /// Draws.
    pub record_d: u32,
    /// Status label.
    pub status: String,
}

/// Fighter as returned by the backend. Every field is optional because the
/// backend is not consistent about which convention it uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FighterRecord {
    /// Backend id.
    pub id: Option<FighterId>,
    /// Display name, rarely sent.
    pub name: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Weight in kg, rarely sent.
    pub weight: Option<f64>,
    /// Class label such as `Light_Heavyweight`.
    pub category_weight: Option<String>,
    /// Fighting style.
    pub style: Option<String>,
    /// Club or gym.
    pub club: Option<String>,
    /// Client-style win count.
    pub wins: Option<u32>,
    /// Client-style loss count.
    pub losses: Option<u32>,
    /// Client-style draw count.
    pub draws: Option<u32>,
    /// Win count.
    pub record_w: Option<u32>,
    /// Loss count.
    pub record_l: Option<u32>,
    /// Draw count.
    pub record_d: Option<u32>,
    /// Country.
    pub country: Option<String>,
    /// Status label.
    pub status: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

impl From<&FighterForm> for FighterPayload {
    fn from(form: &FighterForm) -> Self {
        let name = form.name.as_deref().unwrap_or_default().trim();
        let mut parts = name.split_whitespace();
        let first_name = parts
            .next()
            .or_else(|| non_empty(form.first_name.as_deref()))
            .unwrap_or_default()
            .to_owned();
        let rest = parts.collect::<Vec<_>>().join(" ");
        let last_name = non_empty(Some(rest.as_str()))
            .or_else(|| non_empty(form.last_name.as_deref()))
            .unwrap_or_default()
            .to_owned();

        Self {
            first_name,
            last_name,
            category_weight: WeightClass::from_weight(form.weight),
            club: non_empty(form.club.as_deref())
                .or_else(|| non_empty(form.style.as_deref()))
                .unwrap_or_default()
                .to_owned(),
            record_w: form.wins.or(form.record_w).unwrap_or(0),
            record_l: form.losses.or(form.record_l).unwrap_or(0),
            record_d: form.draws.or(form.record_d).unwrap_or(0),
            status: non_empty(form.status.as_deref())
                .unwrap_or("Active")
                .to_owned(),
        }
    }
}

impl From<FighterRecord> for Fighter {
    fn from(record: FighterRecord) -> Self {
        let name = match non_empty(record.name.as_deref()) {
            Some(name) => name.to_owned(),
            None => format!(
                "{} {}",
                record.first_name.as_deref().unwrap_or_default(),
                record.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_owned(),
        };
        let weight = record
            .weight
            .filter(|kg| *kg != 0.0 && !kg.is_nan())
            .unwrap_or_else(|| category_to_weight(record.category_weight.as_deref()));
        let style = non_empty(record.style.as_deref())
            .or_else(|| non_empty(record.club.as_deref()))
            .unwrap_or_default()
            .to_owned();

        Self {
            id: record.id,
            name,
            weight,
            style,
            wins: record.wins.or(record.record_w).unwrap_or(0),
            losses: record.losses.or(record.record_l).unwrap_or(0),
            draws: record.draws.or(record.record_d).unwrap_or(0),
            country: record.country.unwrap_or_default(),
            first_name: record.first_name,
            last_name: record.last_name,
            category_weight: record.category_weight,
            club: record.club,
            record_w: record.record_w,
            record_l: record.record_l,
            record_d: record.record_d,
            status: record.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_bands_are_inclusive_on_the_upper_end() {
        assert_eq!(WeightClass::from_weight(Some(-3.0)), WeightClass::Strawweight);
        assert_eq!(WeightClass::from_weight(Some(48.5)), WeightClass::Strawweight);
        assert_eq!(WeightClass::from_weight(Some(52.0)), WeightClass::Strawweight);
        assert_eq!(WeightClass::from_weight(Some(52.1)), WeightClass::Flyweight);
        assert_eq!(WeightClass::from_weight(Some(61.0)), WeightClass::Bantamweight);
        assert_eq!(WeightClass::from_weight(Some(70.0)), WeightClass::Lightweight);
        assert_eq!(WeightClass::from_weight(Some(77.0)), WeightClass::Welterweight);
        assert_eq!(WeightClass::from_weight(Some(84.0)), WeightClass::Middleweight);
        assert_eq!(
            WeightClass::from_weight(Some(93.0)),
            WeightClass::LightHeavyweight
        );
        assert_eq!(WeightClass::from_weight(Some(120.0)), WeightClass::Heavyweight);
        assert_eq!(
            WeightClass::from_weight(Some(120.5)),
            WeightClass::SuperHeavyweight
        );
        assert_eq!(
            WeightClass::from_weight(Some(250.0)),
            WeightClass::SuperHeavyweight
        );
    }

    #[test]
    fn missing_or_zero_weight_is_lightweight() {
        assert_eq!(WeightClass::from_weight(None), WeightClass::Lightweight);
        assert_eq!(WeightClass::from_weight(Some(0.0)), WeightClass::Lightweight);
    }

    #[test]
    fn representative_weights_are_lossy() {
        assert_eq!(category_to_weight(Some("Strawweight")), 52.0);
        assert_eq!(category_to_weight(Some("Flyweight")), 57.0);
        assert_eq!(category_to_weight(Some("Bantamweight")), 61.0);
        assert_eq!(category_to_weight(Some("Featherweight")), 66.0);
        assert_eq!(category_to_weight(Some("Lightweight")), 70.0);
        assert_eq!(category_to_weight(Some("Welterweight")), 77.0);
        assert_eq!(category_to_weight(Some("Middleweight")), 84.0);
        assert_eq!(category_to_weight(Some("Light_Heavyweight")), 93.0);
        assert_eq!(category_to_weight(Some("Heavyweight")), 120.0);
        assert_eq!(category_to_weight(Some("Super_Heavyweight")), 120.0);

        // 64 kg lands in featherweight but comes back as 66.
        let class = WeightClass::from_weight(Some(64.0));
        assert_eq!(class.representative_weight(), 66.0);
        // 150 kg comes back as 120.
        let class = WeightClass::from_weight(Some(150.0));
        assert_eq!(class.representative_weight(), 120.0);
    }

    #[test]
    fn labels_match_case_insensitively_and_unknown_falls_back() {
        assert_eq!(
            WeightClass::match_label("light heavyweight"),
            Some(WeightClass::LightHeavyweight)
        );
        assert_eq!(
            WeightClass::match_label("LIGHTWEIGHT"),
            Some(WeightClass::Lightweight)
        );
        assert_eq!(WeightClass::match_label("open"), None);
        // Earlier rules win: "fly" is tried before "light".
        assert_eq!(
            WeightClass::match_label("Light Flyweight"),
            Some(WeightClass::Flyweight)
        );
        assert_eq!(
            WeightClass::match_label("Super_Heavyweight"),
            Some(WeightClass::Heavyweight)
        );
        assert_eq!(category_to_weight(Some("open")), DEFAULT_WEIGHT_KG);
        assert_eq!(category_to_weight(Some("")), DEFAULT_WEIGHT_KG);
        assert_eq!(category_to_weight(None), DEFAULT_WEIGHT_KG);
    }

    #[test]
    fn form_splits_display_name_and_defaults_record() {
        let form = FighterForm {
            name: Some("  Ana   Maria Lopez ".into()),
            weight: Some(57.0),
            style: Some("Muay Thai".into()),
            wins: Some(12),
            record_l: Some(3),
            ..FighterForm::default()
        };

        let payload = FighterPayload::from(&form);
        assert_eq!(payload.first_name, "Ana");
        assert_eq!(payload.last_name, "Maria Lopez");
        assert_eq!(payload.category_weight, WeightClass::Flyweight);
        assert_eq!(payload.club, "Muay Thai");
        assert_eq!((payload.record_w, payload.record_l, payload.record_d), (12, 3, 0));
        assert_eq!(payload.status, "Active");
    }

    #[test]
    fn form_without_display_name_uses_explicit_names() {
        let form = FighterForm {
            first_name: Some("Rui".into()),
            last_name: Some("Costa".into()),
            club: Some("Team Alpha".into()),
            style: Some("BJJ".into()),
            status: Some("Inactive".into()),
            ..FighterForm::default()
        };

        let payload = FighterPayload::from(&form);
        assert_eq!(payload.first_name, "Rui");
        assert_eq!(payload.last_name, "Costa");
        assert_eq!(payload.club, "Team Alpha");
        assert_eq!(payload.category_weight, WeightClass::Lightweight);
        assert_eq!(payload.status, "Inactive");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["categoryWeight"], "Lightweight");
        assert_eq!(json["recordW"], 0);
    }

    #[test]
    fn backend_record_is_completed_for_display() {
        let record: FighterRecord = serde_json::from_str(
            r#"{
                "id": 4,
                "firstName": "Joana",
                "lastName": "Silva",
                "categoryWeight": "Light_Heavyweight",
                "club": "Nova Uniao",
                "recordW": 9,
                "recordD": 1,
                "status": "Active"
            }"#,
        )
        .unwrap();

        let fighter = Fighter::from(record);
        assert_eq!(fighter.id, Some(4));
        assert_eq!(fighter.name, "Joana Silva");
        assert_eq!(fighter.weight, 93.0);
        assert_eq!(fighter.style, "Nova Uniao");
        assert_eq!((fighter.wins, fighter.losses, fighter.draws), (9, 0, 1));
        assert_eq!(fighter.record_l, None);
        assert_eq!(fighter.country, "");
    }

    #[test]
    fn record_prefers_client_convention_when_both_present() {
        let record = FighterRecord {
            name: Some("The Hammer".into()),
            weight: Some(81.0),
            wins: Some(20),
            record_w: Some(2),
            country: Some("PT".into()),
            ..FighterRecord::default()
        };

        let fighter = Fighter::from(record);
        assert_eq!(fighter.name, "The Hammer");
        assert_eq!(fighter.weight, 81.0);
        assert_eq!(fighter.wins, 20);
        assert_eq!(fighter.country, "PT");
    }
}
